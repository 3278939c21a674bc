//! Subcommand implementations.
//!
//! Output goes through `tracing` at info level, like every other message
//! the CLI prints. Set `RUST_LOG=emporium_cli=warn` to silence it.

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod orders;
