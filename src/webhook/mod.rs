//! Webhook handlers for external integrations
//!
//! ## Modules
//!
//! - [`shopify`] - Shopify `orders/paid` webhook, feeding the diamond counter
//! - [`errors`] - Plain text error responses shared by the handlers

pub mod errors;
pub mod routes;
pub mod shopify;

use crate::{config, services};

/// Per worker state shared by the webhook handlers
pub struct AppState {
    pub settings: config::WebhookSettings,
    pub credentials: services::ImplCredentialProvider,
    pub store: services::ImplMetafieldStore,
}
