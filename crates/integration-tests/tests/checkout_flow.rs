//! Checkout against the mock backend: totals, submission and cart cleanup.

#![allow(clippy::unwrap_used)]

use std::str::FromStr;

use emporium_core::checkout::{CustomerDetails, Field, PaymentDetails};
use emporium_core::coupon::CouponOutcome;
use emporium_core::{Money, PaymentMethod, ShippingMethodId};
use emporium_integration_tests::MockBackend;
use emporium_storefront::Storefront;
use emporium_storefront::api::ApiError;
use emporium_storefront::checkout::CheckoutError;
use rust_decimal::Decimal;
use serde_json::{Value, json};

fn amount(value: &Value) -> Decimal {
    Decimal::from_str(value.as_str().unwrap()).unwrap()
}

fn customer() -> CustomerDetails {
    CustomerDetails {
        first_name: "Rahim".to_string(),
        last_name: "Uddin".to_string(),
        email: "rahim@example.com".to_string(),
        phone: "01712345678".to_string(),
        street_address: "12 Lake Road".to_string(),
        city: "Dhaka".to_string(),
        state: "Dhaka".to_string(),
        zip_code: "1207".to_string(),
        country: None,
    }
}

fn payment() -> PaymentDetails {
    PaymentDetails {
        sender_number: "01712345678".to_string(),
        transaction_id: "TX12345".to_string(),
        payment_method: Some(PaymentMethod::Bkash),
        admin_account_number: Some("  ".to_string()),
    }
}

async fn add_shirts(storefront: &Storefront, quantity: u32) {
    let product = storefront.api().product_by_slug("linen-shirt").await.unwrap();
    let item = product.to_line_item(
        quantity,
        product.find_color("Navy").cloned(),
        product.find_size("M").cloned(),
    );
    storefront.cart().add(item).unwrap();
}

#[tokio::test]
async fn test_checkout_with_percentage_coupon() {
    let backend = MockBackend::start().await.unwrap();
    let storefront = backend.storefront().unwrap();
    add_shirts(&storefront, 2).await;

    let mut session = storefront.checkout();
    session
        .select_shipping_by_id(ShippingMethodId::new(1))
        .await
        .unwrap();
    let outcome = session.apply_coupon("save10").await;
    assert!(outcome.is_applied(), "{}", outcome.message());
    assert_eq!(outcome.message(), "SAVE10 applied successfully!");

    let totals = session.totals().totals;
    assert_eq!(totals.subtotal.amount(), Decimal::new(9998, 2));
    assert_eq!(totals.shipping_cost.amount(), Decimal::new(999, 2));
    assert_eq!(totals.discount_amount.amount(), Decimal::new(9998, 3));
    assert_eq!(totals.total.amount(), Decimal::new(99972, 3));

    session.set_customer(customer());
    let confirmation = session.submit(&payment()).await.unwrap();
    assert_eq!(confirmation.order_number, "ORD-1001");
    assert_eq!(confirmation.total_amount.amount(), Decimal::new(9997, 2));
    assert!(confirmation.warnings.is_empty());

    // The backend saw the cart as it was, the cart is now empty
    let coupon_request = &backend.coupon_requests()[0];
    assert_eq!(coupon_request["coupon_code"], "SAVE10");
    assert_eq!(amount(&coupon_request["cart_total"]), Decimal::new(9998, 2));
    assert_eq!(coupon_request["cart_items"], json!([{"quantity": 2, "product": 12}]));

    let order = &backend.submitted_orders()[0];
    assert_eq!(order["customer_name"], "Rahim Uddin");
    assert_eq!(order["shipping_method"], 1);
    assert_eq!(order["coupon_code"], "SAVE10");
    assert_eq!(order["shipping_address"]["country"], "Bangladesh");
    assert_eq!(order["items"][0]["product"], 12);
    assert_eq!(order["items"][0]["color"], 2);
    assert_eq!(order["items"][0]["size"], 3);
    assert_eq!(order["items"][0]["quantity"], 2);
    assert_eq!(order["payment"]["payment_method"], "bkash");
    assert!(order["payment"].get("admin_account_number").is_none());
    assert_eq!(amount(&order["frontend_total"]), Decimal::new(9997, 2));

    assert!(storefront.cart().cart().is_empty());
    assert!(session.applied_coupon().is_none());
    assert!(session.shipping().is_none());
}

#[tokio::test]
async fn test_incomplete_form_never_reaches_backend() {
    let backend = MockBackend::start().await.unwrap();
    let storefront = backend.storefront().unwrap();
    add_shirts(&storefront, 1).await;

    let mut session = storefront.checkout();
    let mut details = customer();
    details.email = "rahim-at-example".to_string();
    session.set_customer(details);

    let mut short_reference = payment();
    short_reference.transaction_id = "TX1".to_string();

    let err = session.submit(&short_reference).await.unwrap_err();
    let CheckoutError::Validation(errors) = err else {
        panic!("expected validation errors, got {err:?}");
    };
    assert!(errors.has(Field::ShippingMethod));
    assert!(errors.has(Field::Email));
    assert!(errors.has(Field::TransactionId));
    assert!(!errors.has(Field::Cart));

    assert!(backend.submitted_orders().is_empty());
    assert_eq!(storefront.cart().item_count(), 1);
}

#[tokio::test]
async fn test_backend_rejection_keeps_cart() {
    let backend = MockBackend::start().await.unwrap();
    backend.fail_orders(
        400,
        json!({"message": "Invalid order", "errors": {"transaction_id": ["Already used"]}}),
    );
    let storefront = backend.storefront().unwrap();
    add_shirts(&storefront, 1).await;

    let mut session = storefront.checkout();
    session
        .select_shipping_by_id(ShippingMethodId::new(2))
        .await
        .unwrap();
    session.set_customer(customer());

    let err = session.submit(&payment()).await.unwrap_err();
    match err {
        CheckoutError::Api(ApiError::Validation { message, errors }) => {
            assert_eq!(message, "Invalid order");
            assert_eq!(errors["transaction_id"][0], "Already used");
        }
        other => panic!("expected validation error from backend, got {other:?}"),
    }
    assert_eq!(storefront.cart().item_count(), 1);
    assert!(session.shipping().is_some());
}

#[tokio::test]
async fn test_html_error_page_is_unexpected_format() {
    let backend = MockBackend::start().await.unwrap();
    backend.serve_html_errors();
    let storefront = backend.storefront().unwrap();
    add_shirts(&storefront, 1).await;

    let mut session = storefront.checkout();
    session
        .select_shipping_by_id(ShippingMethodId::new(1))
        .await
        .unwrap();
    session.set_customer(customer());

    let err = session.submit(&payment()).await.unwrap_err();
    assert!(matches!(
        err,
        CheckoutError::Api(ApiError::UnexpectedFormat { status: 403 })
    ));
}

#[tokio::test]
async fn test_coupon_dropped_when_cart_shrinks_below_minimum() {
    let backend = MockBackend::start().await.unwrap();
    let storefront = backend.storefront().unwrap();
    add_shirts(&storefront, 2).await;

    let mut session = storefront.checkout();
    assert!(session.apply_coupon("SAVE10").await.is_applied());

    let key = storefront.cart().cart().items()[0].key.clone();
    storefront.cart().set_quantity(&key, 1).unwrap();

    assert!(session.coupon_rejection().is_some());
    let breakdown = session.totals();
    assert!(breakdown.rejection().is_some());
    assert!(breakdown.totals.discount_amount.is_zero());
    assert_eq!(breakdown.totals.total.amount(), Decimal::new(4999, 2));
    assert!(session.applied_coupon().is_none());
}

#[tokio::test]
async fn test_submit_after_cart_shrinks_reports_dropped_coupon() {
    let backend = MockBackend::start().await.unwrap();
    let storefront = backend.storefront().unwrap();
    add_shirts(&storefront, 2).await;

    let mut session = storefront.checkout();
    session
        .select_shipping_by_id(ShippingMethodId::new(1))
        .await
        .unwrap();
    assert!(session.apply_coupon("SAVE10").await.is_applied());
    session.set_customer(customer());

    let key = storefront.cart().cart().items()[0].key.clone();
    storefront.cart().set_quantity(&key, 1).unwrap();

    let err = session.submit(&payment()).await.unwrap_err();
    assert!(matches!(err, CheckoutError::CouponRejected(_)), "{err:?}");
    assert!(backend.submitted_orders().is_empty());
    assert!(session.applied_coupon().is_none());

    // The customer has been told; a second submit goes through at full price
    session.submit(&payment()).await.unwrap();
    let order = &backend.submitted_orders()[0];
    assert!(order.get("coupon_code").is_none_or(Value::is_null));
}

#[tokio::test]
async fn test_percentage_coupon_follows_cart_growth() {
    let backend = MockBackend::start().await.unwrap();
    let storefront = backend.storefront().unwrap();
    add_shirts(&storefront, 2).await;

    let mut session = storefront.checkout();
    let outcome = session.apply_coupon("SAVE10").await;
    let CouponOutcome::Applied(applied) = outcome else {
        panic!("expected SAVE10 to apply");
    };
    assert_eq!(applied.discount, Money::from_cents(1000));

    add_shirts(&storefront, 3).await;
    let totals = session.totals().totals;
    assert_eq!(totals.subtotal.amount(), Decimal::new(24995, 2));
    assert_eq!(totals.discount_amount.amount(), Decimal::new(24995, 3));
}

#[tokio::test]
async fn test_free_shipping_coupon_and_backend_warnings() {
    let backend = MockBackend::start().await.unwrap();
    let storefront = backend.storefront().unwrap();
    add_shirts(&storefront, 1).await;

    let mut session = storefront.checkout();
    session
        .select_shipping_by_id(ShippingMethodId::new(2))
        .await
        .unwrap();

    assert!(session.apply_coupon("SHIPFREE").await.is_applied());
    let totals = session.totals().totals;
    assert!(totals.shipping_cost.is_zero());
    assert_eq!(totals.total.amount(), Decimal::new(4999, 2));

    // A second code replaces the first
    assert!(session.apply_coupon("FLAT5").await.is_applied());
    let totals = session.totals().totals;
    assert_eq!(totals.shipping_cost.amount(), Decimal::new(2499, 2));
    assert_eq!(totals.discount_amount, Money::from_cents(500));

    session.set_customer(customer());
    let confirmation = session.submit(&payment()).await.unwrap();
    assert_eq!(confirmation.warnings, vec!["Coupon usage limit nearly reached"]);
}

#[tokio::test]
async fn test_rejected_coupon_keeps_previous() {
    let backend = MockBackend::start().await.unwrap();
    let storefront = backend.storefront().unwrap();
    add_shirts(&storefront, 1).await;

    let mut session = storefront.checkout();
    assert!(session.apply_coupon("FLAT5").await.is_applied());

    let outcome = session.apply_coupon("SAVE10").await;
    assert_eq!(
        outcome,
        CouponOutcome::rejected("Minimum purchase of 50.00 required")
    );
    assert_eq!(session.applied_coupon().unwrap().code.as_str(), "FLAT5");
}
