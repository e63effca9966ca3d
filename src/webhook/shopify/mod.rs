//! Shopify webhook integration module
//!
//! ## Submodules
//!
//! - [`routes`] - HTTP endpoint handler for the `orders/paid` webhook
//! - [`schemas`] - Data structures for the webhook payload
//! - [`security`] - HMAC signature verification of the raw body

pub mod routes;
pub mod schemas;
pub mod security;

pub use routes::receive;
