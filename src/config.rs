//! Application configuration management with security considerations.
//!
//! This module handles all configuration values required for the application.
//! Sensitive fields are clearly marked and must never be logged.
//!
//! Handlers do not read [`APP_CONFIG`] directly: the server builds an immutable
//! [`WebhookSettings`] out of it and hands that to the app state.

use crate::{consts, webhook::shopify::security::SigningSecrets};
use anyhow::anyhow;
use envconfig::Envconfig;
use std::{convert::Infallible, str::FromStr, sync::OnceLock};

/// Line item property names that flag an item as a raffle unit.
///
/// Parsed from a comma separated list. Blank entries are dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerKeys(Vec<String>);

impl MarkerKeys {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(keys.into_iter().map(Into::into).collect())
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl Default for MarkerKeys {
    fn default() -> Self {
        Self::new(consts::DEFAULT_MARKER_KEYS)
    }
}

impl FromStr for MarkerKeys {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(
            s.split(',')
                .map(str::trim)
                .filter(|key| !key.is_empty())
                .map(String::from)
                .collect(),
        ))
    }
}

/// Application configuration with security-aware field management.
///
/// # Security Requirements
/// - All `SENSITIVE` fields must be stored securely
/// - Never log or expose sensitive values
/// - Rotating the webhook signing secret: keep the old one in
///   `SHOPIFY_WEBHOOK_SECRET` until every sender uses the new one
#[derive(Envconfig, Clone)]
pub struct AppConfig {
    /// Environment name to deploy the app (NON-SENSITIVE)
    /// Values: "local", "dev", "staging", "prod"
    #[envconfig(default = "local")]
    pub env: String,

    /// Port for web server binding (NON-SENSITIVE)
    #[envconfig(default = "8080")]
    pub web_server_port: u16,

    /// Path to SSL private key file (SENSITIVE PATH), prod only
    #[envconfig(default = "server.key")]
    pub private_key_path: String,

    /// Path to SSL certificate file (NON-SENSITIVE), prod only
    #[envconfig(default = "server.crt")]
    pub certificate_path: String,

    /// 🔒 SENSITIVE: shared key expected in the `key` query param of the webhook url
    pub webhook_key: String,

    /// 🔒 SENSITIVE: legacy webhook signing secret, tried first when present
    pub shopify_webhook_secret: Option<String>,

    /// Shopify app client id (SEMI-SENSITIVE)
    pub shopify_client_id: String,

    /// 🔒 SENSITIVE: Shopify app client secret.
    /// Used for the client credentials grant and as a webhook signing secret.
    pub shopify_client_secret: String,

    /// Store domain (NON-SENSITIVE)
    /// Example: "my-store.myshopify.com"
    pub shopify_store_domain: String,

    /// Admin API version (NON-SENSITIVE)
    #[envconfig(default = "2024-01")]
    pub shopify_admin_api_version: String,

    /// Handle of the product that holds the running total (NON-SENSITIVE)
    pub counter_product_handle: String,

    /// Upper bound of the counter (NON-SENSITIVE)
    #[envconfig(default = "10000")]
    pub counter_max: u64,

    /// Marker keys recognized on line item properties (NON-SENSITIVE)
    #[envconfig(default = "Diamante,NÃºmero,Numero")]
    pub raffle_marker_keys: MarkerKeys,

    /// 🔒 SENSITIVE: Logfire write token. Nothing is exported when missing.
    pub logfire_token: Option<String>,
}

impl AppConfig {
    /// Checks if running in production environment
    pub fn is_prod(&self) -> bool {
        self.env.to_lowercase() == "prod"
    }

    /// Ordered signing secrets: legacy webhook secret first, app secret second
    pub fn signing_secrets(&self) -> SigningSecrets {
        SigningSecrets::new(
            self.shopify_webhook_secret
                .iter()
                .chain(std::iter::once(&self.shopify_client_secret))
                .cloned(),
        )
    }

    /// Admin GraphQL endpoint of the configured store
    pub fn shopify_graphql_endpoint(&self) -> String {
        format!(
            "https://{shop}/admin/api/{version}/graphql.json",
            shop = self.shopify_store_domain,
            version = self.shopify_admin_api_version
        )
    }

    /// OAuth token endpoint of the configured store
    pub fn shopify_token_endpoint(&self) -> String {
        format!(
            "https://{shop}/admin/oauth/access_token",
            shop = self.shopify_store_domain
        )
    }

    pub fn webhook_settings(&self) -> WebhookSettings {
        WebhookSettings {
            access_key: self.webhook_key.clone(),
            signing_secrets: self.signing_secrets(),
            counter_product_handle: self.counter_product_handle.clone(),
            counter_max: self.counter_max,
            marker_keys: self.raffle_marker_keys.clone(),
        }
    }
}

/// Values the order paid webhook consumes on every request
#[derive(Debug, Clone)]
pub struct WebhookSettings {
    /// 🔒 SENSITIVE
    pub access_key: String,
    /// 🔒 SENSITIVE
    pub signing_secrets: SigningSecrets,
    pub counter_product_handle: String,
    pub counter_max: u64,
    pub marker_keys: MarkerKeys,
}

/// Global application configuration, set once by [`init_config`]
pub static APP_CONFIG: OnceLock<AppConfig> = OnceLock::new();

/// Loads the configuration from the environment.
///
/// Fails if a required variable is missing or malformed, or if called twice.
pub fn init_config() -> anyhow::Result<()> {
    let app_config = AppConfig::init_from_env()?;

    APP_CONFIG
        .set(app_config)
        .map_err(|_| anyhow!("app config already initialized"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn required_env() -> HashMap<String, String> {
        HashMap::from([
            ("WEBHOOK_KEY".to_string(), "k3y".to_string()),
            ("SHOPIFY_CLIENT_ID".to_string(), "client".to_string()),
            ("SHOPIFY_CLIENT_SECRET".to_string(), "app-secret".to_string()),
            ("SHOPIFY_STORE_DOMAIN".to_string(), "shop.myshopify.com".to_string()),
            ("COUNTER_PRODUCT_HANDLE".to_string(), "contador".to_string()),
        ])
    }

    #[test]
    fn test_defaults_from_env() {
        let app_config = AppConfig::init_from_hashmap(&required_env()).unwrap();

        assert_eq!(app_config.counter_max, 10_000);
        assert_eq!(app_config.shopify_admin_api_version, "2024-01");
        assert_eq!(app_config.raffle_marker_keys, MarkerKeys::default());
        assert!(app_config.shopify_webhook_secret.is_none());
        assert!(!app_config.is_prod());
        assert_eq!(
            app_config.shopify_graphql_endpoint(),
            "https://shop.myshopify.com/admin/api/2024-01/graphql.json"
        );
    }

    #[test]
    fn test_signing_secrets_keep_legacy_first() {
        let mut env = required_env();
        env.insert("SHOPIFY_WEBHOOK_SECRET".to_string(), "legacy".to_string());
        let app_config = AppConfig::init_from_hashmap(&env).unwrap();

        let secrets = app_config.signing_secrets();
        assert_eq!(secrets.as_slice(), ["legacy".to_string(), "app-secret".to_string()]);
    }

    #[test]
    fn test_marker_keys_from_str() {
        let keys: MarkerKeys = " Diamante, ,Numero ".parse().unwrap();
        assert_eq!(keys.as_slice(), ["Diamante".to_string(), "Numero".to_string()]);
    }
}
