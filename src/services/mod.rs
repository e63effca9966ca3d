pub mod shopify;

use async_trait::async_trait;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Bearer credential for the store admin API
#[derive(Clone, PartialEq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken([REDACTED])")
    }
}

/// The product holding the running total
#[derive(Debug, Clone, PartialEq)]
pub struct CounterProduct {
    pub id: String,
    pub current_value: i64,
}

/// Field level problem reported by a metafield mutation
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MetafieldUserError {
    #[serde(default)]
    pub field: Option<Vec<String>>,
    pub message: String,
}

#[derive(Debug, Display, Error)]
pub enum StoreError {
    #[display("could not get access token: {_0}")]
    Credential(#[error(not(source))] String),
    #[display("{_0}")]
    Transport(#[error(not(source))] String),
    #[display("{_0}")]
    Remote(#[error(not(source))] String),
    #[display("no product with handle {_0}")]
    NotFound(#[error(not(source))] String),
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        StoreError::Transport(err.to_string())
    }
}

/// Acquires credentials for the store on demand
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialProvider {
    async fn access_token(&self) -> Result<AccessToken, StoreError>;
}

/// Metafield reads and writes against the order/product store
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetafieldStore {
    /// Whether the order already contributed to the counter.
    /// A missing marker is `false`.
    async fn is_order_counted(
        &self,
        token: &AccessToken,
        order_gid: &str,
    ) -> Result<bool, StoreError>;

    /// Resolves the counter product by handle; a missing counter value is 0
    async fn get_counter_product(
        &self,
        token: &AccessToken,
        handle: &str,
    ) -> Result<CounterProduct, StoreError>;

    /// Sets the counter value and the order's counted marker in one batch.
    ///
    /// Returns the field level errors the store reported, empty on success.
    async fn set_counter_and_marker(
        &self,
        token: &AccessToken,
        product_id: &str,
        value: u64,
        order_gid: &str,
    ) -> Result<Vec<MetafieldUserError>, StoreError>;
}

pub type ImplCredentialProvider = Box<dyn CredentialProvider>;
pub type ImplMetafieldStore = Box<dyn MetafieldStore>;
