//! # Shopify Admin API Client
//!
//! Metafield reads and writes against the Shopify Admin GraphQL API, plus the
//! client credentials grant used to get an admin token.
//! Every call is a single request with no retries; callers decide what a
//! failure means.

use super::{
    AccessToken, CounterProduct, CredentialProvider, MetafieldStore, MetafieldUserError,
    StoreError,
};
use crate::{config, consts};
use async_trait::async_trait;
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Value, json};

const ORDER_COUNTED_QUERY: &str = r#"
query($id: ID!, $namespace: String!, $key: String!) {
  node(id: $id) {
    ... on Order {
      metafield(namespace: $namespace, key: $key) { value }
    }
  }
}
"#;

const COUNTER_PRODUCT_QUERY: &str = r#"
query($h: String!, $namespace: String!, $key: String!) {
  productByHandle(handle: $h) {
    id
    metafield(namespace: $namespace, key: $key) { value }
  }
}
"#;

const METAFIELDS_SET_MUTATION: &str = r#"
mutation($metafields: [MetafieldsSetInput!]!) {
  metafieldsSet(metafields: $metafields) {
    userErrors { field message }
  }
}
"#;

#[derive(Debug, Default, Deserialize)]
struct MetafieldValue {
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OrderCountedData {
    node: Option<OrderNode>,
}

#[derive(Debug, Deserialize)]
struct OrderNode {
    metafield: Option<MetafieldValue>,
}

#[derive(Debug, Deserialize)]
struct CounterProductData {
    #[serde(rename = "productByHandle")]
    product_by_handle: Option<ProductNode>,
}

#[derive(Debug, Deserialize)]
struct ProductNode {
    id: Option<String>,
    metafield: Option<MetafieldValue>,
}

#[derive(Debug, Deserialize)]
struct MetafieldsSetData {
    #[serde(rename = "metafieldsSet")]
    metafields_set: Option<MetafieldsSetPayload>,
}

#[derive(Debug, Deserialize)]
struct MetafieldsSetPayload {
    #[serde(rename = "userErrors", default)]
    user_errors: Vec<MetafieldUserError>,
}

/// Gets admin tokens through the OAuth client credentials grant.
///
/// A new token is requested on every call; nothing is cached between requests.
#[derive(Clone)]
pub struct ClientCredentialsProvider {
    client: reqwest::Client,
    endpoint: String,
    client_id: String,
    client_secret: String,
}

impl ClientCredentialsProvider {
    pub fn new(app_config: &config::AppConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: app_config.shopify_token_endpoint(),
            client_id: app_config.shopify_client_id.clone(),
            client_secret: app_config.shopify_client_secret.clone(),
        }
    }
}

#[async_trait]
impl CredentialProvider for ClientCredentialsProvider {
    #[tracing::instrument(skip(self))]
    async fn access_token(&self) -> Result<AccessToken, StoreError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("content-type", "application/json")
            .json(&token_grant_body(&self.client_id, &self.client_secret))
            .send()
            .await?;

        let is_success = response.status().is_success();
        let body = response.json::<Value>().await?;

        parse_access_token(is_success, body)
    }
}

fn token_grant_body(client_id: &str, client_secret: &str) -> Value {
    json!({
        "grant_type": "client_credentials",
        "client_id": client_id,
        "client_secret": client_secret,
        "scope": consts::SHOPIFY_TOKEN_SCOPE,
    })
}

fn parse_access_token(is_success: bool, body: Value) -> Result<AccessToken, StoreError> {
    match body.get("access_token").and_then(Value::as_str) {
        Some(token) if is_success && !token.is_empty() => Ok(AccessToken::new(token)),
        _ => Err(StoreError::Credential(body.to_string())),
    }
}

/// Shopify Admin GraphQL client for the raffle metafields
#[derive(Clone)]
pub struct ShopifyClient {
    client: reqwest::Client,
    endpoint: String,
}

impl ShopifyClient {
    pub fn new(app_config: &config::AppConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: app_config.shopify_graphql_endpoint(),
        }
    }

    fn graphql_request(
        &self,
        token: &AccessToken,
        query: &str,
        variables: Value,
    ) -> Result<reqwest::Request, StoreError> {
        Ok(self
            .client
            .post(&self.endpoint)
            .header("content-type", "application/json")
            .header(consts::SHOPIFY_ACCESS_TOKEN_HEADER, token.secret())
            .json(&json!({ "query": query, "variables": variables }))
            .build()?)
    }

    async fn graphql<T: DeserializeOwned>(
        &self,
        token: &AccessToken,
        query: &str,
        variables: Value,
    ) -> Result<Option<T>, StoreError> {
        let request = self.graphql_request(token, query, variables)?;
        let response = self.client.execute(request).await?;

        let is_success = response.status().is_success();
        let body = response.json::<Value>().await?;

        parse_graphql_data(is_success, body)
    }
}

/// Extracts `data` from a GraphQL response.
///
/// A failed status or any top-level `errors` is a remote error carrying those
/// errors, or the whole body when there are none.
fn parse_graphql_data<T: DeserializeOwned>(
    is_success: bool,
    mut body: Value,
) -> Result<Option<T>, StoreError> {
    let errors = body.get("errors").filter(|errors| !errors.is_null());
    if let Some(errors) = errors {
        return Err(StoreError::Remote(errors.to_string()));
    }
    if !is_success {
        return Err(StoreError::Remote(body.to_string()));
    }

    match body.get_mut("data").map(Value::take) {
        None | Some(Value::Null) => Ok(None),
        Some(data) => serde_json::from_value(data)
            .map(Some)
            .map_err(|err| StoreError::Remote(format!("unexpected response shape: {err}"))),
    }
}

fn order_counted_variables(order_gid: &str) -> Value {
    json!({
        "id": order_gid,
        "namespace": consts::RAFFLE_METAFIELD_NAMESPACE,
        "key": consts::COUNTED_METAFIELD_KEY,
    })
}

fn counter_product_variables(handle: &str) -> Value {
    json!({
        "h": handle,
        "namespace": consts::RAFFLE_METAFIELD_NAMESPACE,
        "key": consts::SOLD_DIAMONDS_METAFIELD_KEY,
    })
}

/// Counter total and order marker, written together in one `metafieldsSet`
fn counter_and_marker_variables(product_id: &str, value: u64, order_gid: &str) -> Value {
    json!({
        "metafields": [
            {
                "ownerId": product_id,
                "namespace": consts::RAFFLE_METAFIELD_NAMESPACE,
                "key": consts::SOLD_DIAMONDS_METAFIELD_KEY,
                "type": "number_integer",
                "value": value.to_string(),
            },
            {
                "ownerId": order_gid,
                "namespace": consts::RAFFLE_METAFIELD_NAMESPACE,
                "key": consts::COUNTED_METAFIELD_KEY,
                "type": "boolean",
                "value": "true",
            },
        ]
    })
}

fn parse_counter_value(metafield: Option<MetafieldValue>) -> i64 {
    metafield
        .and_then(|metafield| metafield.value)
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or_default()
}

#[async_trait]
impl MetafieldStore for ShopifyClient {
    #[tracing::instrument(skip(self, token))]
    async fn is_order_counted(
        &self,
        token: &AccessToken,
        order_gid: &str,
    ) -> Result<bool, StoreError> {
        let data: Option<OrderCountedData> = self
            .graphql(token, ORDER_COUNTED_QUERY, order_counted_variables(order_gid))
            .await?;

        let value = data
            .and_then(|data| data.node)
            .and_then(|node| node.metafield)
            .and_then(|metafield| metafield.value);

        Ok(value.as_deref() == Some("true"))
    }

    #[tracing::instrument(skip(self, token))]
    async fn get_counter_product(
        &self,
        token: &AccessToken,
        handle: &str,
    ) -> Result<CounterProduct, StoreError> {
        let data: Option<CounterProductData> = self
            .graphql(token, COUNTER_PRODUCT_QUERY, counter_product_variables(handle))
            .await?;

        let product = data
            .and_then(|data| data.product_by_handle)
            .filter(|product| product.id.as_deref().is_some_and(|id| !id.is_empty()))
            .ok_or_else(|| StoreError::NotFound(handle.to_string()))?;

        Ok(CounterProduct {
            id: product.id.unwrap_or_default(),
            current_value: parse_counter_value(product.metafield),
        })
    }

    #[tracing::instrument(skip(self, token))]
    async fn set_counter_and_marker(
        &self,
        token: &AccessToken,
        product_id: &str,
        value: u64,
        order_gid: &str,
    ) -> Result<Vec<MetafieldUserError>, StoreError> {
        let data: Option<MetafieldsSetData> = self
            .graphql(
                token,
                METAFIELDS_SET_MUTATION,
                counter_and_marker_variables(product_id, value, order_gid),
            )
            .await?;

        Ok(data
            .and_then(|data| data.metafields_set)
            .map(|payload| payload.user_errors)
            .unwrap_or_default())
    }
}
