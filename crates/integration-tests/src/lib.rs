//! End-to-end tests for the Emporium storefront client.
//!
//! [`MockBackend`] serves the subset of the commerce REST API the client
//! uses from an in-process axum server on an ephemeral port. Tests point a
//! [`Storefront`] at it and inspect what the client sent.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p emporium-integration-tests
//! ```
//!
//! # Fixtures
//!
//! - Products: `linen-shirt` (49.99, Navy/M), `canvas-tote` (19.99 on sale
//!   at 14.99), `enamel-mug` (sold out)
//! - Shipping: Standard (9.99, 14.99 from 3 items), Express (24.99),
//!   Pickup (free)
//! - Coupons: `SAVE10` (10%, min. 50), `FLAT5` (5 off), `SHIPFREE` (free
//!   shipping)

use std::collections::HashMap;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use emporium_storefront::Storefront;
use emporium_storefront::config::StorefrontConfig;
use emporium_storefront::error::StorefrontError;
use emporium_storefront::storage::MemoryStore;
use rust_decimal::Decimal;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Shipping method whose quote endpoint can be made to fail.
pub const PICKUP_METHOD: i64 = 3;

/// A fake backend recording every request body it receives.
pub struct MockBackend {
    addr: SocketAddr,
    state: Arc<MockState>,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct MockState {
    data: Mutex<MockData>,
}

#[derive(Default)]
struct MockData {
    submitted_orders: Vec<Value>,
    coupon_requests: Vec<Value>,
    product_queries: Vec<HashMap<String, String>>,
    quote_requests: usize,
    fail_quotes: bool,
    order_failure: Option<(StatusCode, Value)>,
    html_errors: bool,
}

impl MockState {
    fn data(&self) -> MutexGuard<'_, MockData> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MockBackend {
    /// Start the backend on an ephemeral port.
    ///
    /// # Errors
    ///
    /// Returns an error if no local port can be bound.
    pub async fn start() -> std::io::Result<Self> {
        let state = Arc::new(MockState::default());
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let app = router(Arc::clone(&state));
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            addr,
            state,
            handle,
        })
    }

    /// Base URL of the backend.
    #[must_use]
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Client configuration pointing at this backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is rejected.
    pub fn config(&self) -> Result<StorefrontConfig, StorefrontError> {
        Ok(StorefrontConfig::for_api(&self.url())?)
    }

    /// A storefront backed by this server and an in-memory store.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be built.
    pub fn storefront(&self) -> Result<Storefront, StorefrontError> {
        Storefront::with_backend(self.config()?, Arc::new(MemoryStore::new()))
    }

    /// Bodies of every `POST /api/orders/submit/`, in order.
    #[must_use]
    pub fn submitted_orders(&self) -> Vec<Value> {
        self.state.data().submitted_orders.clone()
    }

    /// Bodies of every `POST /api/coupons/validate/`, in order.
    #[must_use]
    pub fn coupon_requests(&self) -> Vec<Value> {
        self.state.data().coupon_requests.clone()
    }

    /// Query parameters of every product listing request.
    #[must_use]
    pub fn product_queries(&self) -> Vec<HashMap<String, String>> {
        self.state.data().product_queries.clone()
    }

    /// Number of shipping quotes served.
    #[must_use]
    pub fn quote_requests(&self) -> usize {
        self.state.data().quote_requests
    }

    /// Make the Pickup quote endpoint return 500.
    pub fn fail_pickup_quotes(&self) {
        self.state.data().fail_quotes = true;
    }

    /// Reject the next order submissions with `status` and `body`.
    pub fn fail_orders(&self, status: u16, body: Value) {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_REQUEST);
        self.state.data().order_failure = Some((status, body));
    }

    /// Answer order submissions with a 403 HTML page, like a misrouted proxy.
    pub fn serve_html_errors(&self) {
        self.state.data().html_errors = true;
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

// =============================================================================
// Routes
// =============================================================================

fn router(state: Arc<MockState>) -> Router {
    Router::new()
        .route("/api/products/", get(list_products))
        .route("/api/products/{slug}/", get(product))
        .route("/api/categories/", get(categories))
        .route("/api/shipping-methods/", get(shipping_methods))
        .route(
            "/api/shipping-methods/{id}/price-for-quantity/",
            get(shipping_quote),
        )
        .route("/api/coupons/", get(coupons))
        .route("/api/coupons/validate/", post(validate_coupon))
        .route("/api/payment/accounts/", get(payment_accounts))
        .route("/api/orders/submit/", post(submit_order))
        .route("/api/orders/", get(orders))
        .route("/api/orders/{number}/", get(order))
        .with_state(state)
}

fn products() -> Vec<Value> {
    vec![
        json!({
            "id": 12,
            "name": "Linen Shirt",
            "slug": "linen-shirt",
            "description": "Breathable summer shirt.",
            "price": "49.99",
            "discount_price": null,
            "stock": 4,
            "brand": "Acme",
            "colors": [{"id": 2, "name": "Navy", "hex_code": "#001f3f"}],
            "sizes": [{"id": 3, "name": "M"}]
        }),
        json!({
            "id": 7,
            "name": "Canvas Tote",
            "slug": "canvas-tote",
            "price": "19.99",
            "discount_price": "14.99",
            "stock": 10,
            "brand": "Globex"
        }),
        json!({
            "id": 3,
            "name": "Enamel Mug",
            "slug": "enamel-mug",
            "price": 8.5,
            "stock": 0
        }),
    ]
}

fn shipping_fixture() -> Vec<Value> {
    vec![
        json!({"id": 1, "name": "Standard", "price": "9.99", "estimated_delivery": "5-7 business days"}),
        json!({"id": 2, "title": "Express", "price": "24.99", "estimated_delivery_time": "1-2 business days", "tracking_available": true}),
        json!({"id": PICKUP_METHOD, "name": "Pickup", "price": "0.00"}),
    ]
}

fn coupon_fixture() -> Vec<Value> {
    vec![
        json!({"code": "SAVE10", "discount_type": "percentage", "discount_value": "10", "minimum_amount": "50.00"}),
        json!({"code": "FLAT5", "discount_type": "fixed", "discount_value": "5.00"}),
        json!({"code": "SHIPFREE", "discount_type": "fixed", "discount_value": "0", "free_shipping": true}),
    ]
}

fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => Decimal::from_str(s).unwrap_or_default(),
        Value::Number(n) => Decimal::from_str(&n.to_string()).unwrap_or_default(),
        _ => Decimal::ZERO,
    }
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({"detail": "Not found."}))).into_response()
}

async fn list_products(
    State(state): State<Arc<MockState>>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    let results: Vec<Value> = products()
        .into_iter()
        .filter(|p| {
            query.get("search").is_none_or(|needle| {
                p["name"]
                    .as_str()
                    .is_some_and(|name| name.to_lowercase().contains(&needle.to_lowercase()))
            })
        })
        .collect();
    state.data().product_queries.push(query);

    Json(json!({
        "count": results.len(),
        "next": null,
        "previous": null,
        "results": results,
    }))
}

async fn product(Path(slug): Path<String>) -> Response {
    products()
        .into_iter()
        .find(|p| p["slug"] == slug.as_str())
        .map_or_else(not_found, |p| Json(p).into_response())
}

async fn categories() -> Json<Value> {
    Json(json!([
        {"id": 1, "name": "Apparel", "slug": "apparel", "subcategories": [
            {"id": 4, "name": "Shirts", "slug": "shirts"}
        ]},
        {"id": 2, "name": "Home", "slug": "home"}
    ]))
}

async fn shipping_methods() -> Json<Value> {
    Json(Value::Array(shipping_fixture()))
}

async fn shipping_quote(
    State(state): State<Arc<MockState>>,
    Path(id): Path<i64>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let fail = {
        let mut data = state.data();
        data.quote_requests += 1;
        data.fail_quotes
    };
    let quantity: u32 = query
        .get("quantity")
        .and_then(|q| q.parse().ok())
        .unwrap_or(1);

    match id {
        1 => {
            let price = if quantity >= 3 { "14.99" } else { "9.99" };
            Json(json!({"price": price, "base_price": "9.99", "has_tiers": true})).into_response()
        }
        2 => Json(json!({"price": "24.99", "base_price": "24.99", "has_tiers": false}))
            .into_response(),
        PICKUP_METHOD if fail => {
            (StatusCode::INTERNAL_SERVER_ERROR, "quote service down").into_response()
        }
        PICKUP_METHOD => {
            Json(json!({"price": "0.00", "base_price": "0.00", "has_tiers": false}))
                .into_response()
        }
        _ => not_found(),
    }
}

async fn coupons() -> Json<Value> {
    let mut listing = coupon_fixture();
    // Malformed entries are skipped by the client.
    listing.push(json!({"code": "BROKEN", "discount_type": "bogus", "discount_value": "5"}));
    Json(json!({"count": listing.len(), "next": null, "previous": null, "results": listing}))
}

async fn validate_coupon(
    State(state): State<Arc<MockState>>,
    Json(body): Json<Value>,
) -> Response {
    state.data().coupon_requests.push(body.clone());

    let code = body["coupon_code"].as_str().unwrap_or_default();
    let Some(coupon) = coupon_fixture()
        .into_iter()
        .find(|c| c["code"] == code)
    else {
        return not_found();
    };

    let total = decimal(&body["cart_total"]);
    let minimum = decimal(&coupon["minimum_amount"]);
    if total < minimum {
        return Json(json!({
            "valid": false,
            "message": format!("Minimum purchase of {minimum:.2} required"),
        }))
        .into_response();
    }

    let value = decimal(&coupon["discount_value"]);
    let discount = if coupon["discount_type"] == "percentage" {
        (total * value / Decimal::ONE_HUNDRED).round_dp(2)
    } else {
        value.min(total)
    };

    Json(json!({
        "valid": true,
        "discount_amount": discount.to_string(),
        "discount_type": coupon["discount_type"],
        "coupon": coupon,
    }))
    .into_response()
}

async fn payment_accounts() -> Json<Value> {
    Json(json!([
        {"id": 1, "payment_method": "bkash", "account_number": "01700000000", "is_active": false},
        {"id": 2, "payment_method": "nagad", "account_number": "01800000000", "account_name": "Emporium Ltd", "instructions": "Send Money, not Cash Out"}
    ]))
}

async fn submit_order(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    let mut data = state.data();

    if data.html_errors {
        return (
            StatusCode::FORBIDDEN,
            [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
            "<html><body>Forbidden</body></html>",
        )
            .into_response();
    }
    if let Some((status, error)) = data.order_failure.clone() {
        return (status, Json(error)).into_response();
    }

    data.submitted_orders.push(body.clone());
    let number = format!("ORD-{}", 1000 + data.submitted_orders.len());

    let mut warnings = Vec::new();
    if body["coupon_code"] == "FLAT5" {
        warnings.push("Coupon usage limit nearly reached");
    }

    Json(json!({
        "order_number": number,
        "total_amount": body["frontend_total"],
        "status": "PENDING",
        "payment_status": "UNPAID",
        "warnings": warnings,
        "message": "Order placed successfully. We will verify your payment shortly.",
    }))
    .into_response()
}

fn order_record(index: usize, body: &Value) -> Value {
    let items: Vec<Value> = body["items"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .map(|item| {
                    json!({
                        "product": format!("Product {}", item["product"]),
                        "quantity": item["quantity"],
                        "unit_price": item["unit_price"],
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    json!({
        "id": index + 1,
        "order_number": format!("ORD-{}", 1001 + index),
        "total_amount": body["frontend_total"],
        "status": "PENDING",
        "payment_status": "UNPAID",
        "ordered_at": "2026-10-01T09:30:00Z",
        "items": items,
        "updates": [
            {"status": "PENDING", "notes": "Awaiting payment verification", "timestamp": "2026-10-01T09:30:00Z"}
        ],
    })
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("Bearer "))
}

async fn orders(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "Authentication credentials were not provided."})),
        )
            .into_response();
    }
    let data = state.data();
    let orders: Vec<Value> = data
        .submitted_orders
        .iter()
        .enumerate()
        .map(|(i, body)| order_record(i, body))
        .collect();
    Json(json!({"count": orders.len(), "next": null, "previous": null, "results": orders}))
        .into_response()
}

async fn order(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Path(number): Path<String>,
) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let data = state.data();
    data.submitted_orders
        .iter()
        .enumerate()
        .map(|(i, body)| order_record(i, body))
        .find(|o| o["order_number"] == number.as_str())
        .map_or_else(not_found, |o| Json(o).into_response())
}
