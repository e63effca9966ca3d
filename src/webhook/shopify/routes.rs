//! Shopify `orders/paid` webhook endpoint
//!
//! # Security
//!
//! Two checks guard the endpoint, in this order:
//! 1. the `key` query param must match the configured access key
//! 2. the `X-Shopify-Hmac-Sha256` header must sign the raw body with one of
//!    the configured secrets
//!
//! Shopify redelivers on any non 2xx response, so failures are terminal for
//! the request and the counted marker on the order is what prevents a
//! redelivery from counting twice.

use super::schemas;
use crate::{
    api, consts, metric,
    webhook::{AppState, errors::WebhookError},
};
use ntex::{http::Method, util::Bytes, web};
use subtle::ConstantTimeEq;

/// Raw query pairs; a repeated param is kept instead of failing extraction
pub type QueryPairs = Vec<(String, String)>;

/// Webhook receiver for paid orders
///
/// Any method is routed here so the access key is checked before the method.
///
/// # Returns
/// - 200 with a plain text summary when the order is counted or skipped
/// - 401 on a bad access key or signature
/// - 405 on anything but POST
/// - 500 with the error detail otherwise
pub async fn receive(
    req: web::HttpRequest,
    query: web::types::Query<QueryPairs>,
    body: Bytes,
    app_state: web::types::State<AppState>,
) -> Result<web::HttpResponse, web::Error> {
    let _span = logfire::span!("orders_paid_webhook").entered();

    match process_delivery(&req, &query, &body, &app_state).await {
        Ok(outcome) => {
            metric::incr_webhook_outcome_statds(outcome.label());

            Ok(web::HttpResponse::Ok()
                .content_type("text/plain; charset=utf-8")
                .body(outcome.to_string()))
        }
        Err(err) => {
            metric::incr_webhook_outcome_statds(err.label());
            Err(err.into())
        }
    }
}

async fn process_delivery(
    req: &web::HttpRequest,
    query: &[(String, String)],
    body: &Bytes,
    app_state: &AppState,
) -> Result<api::raffle::CountOutcome, WebhookError> {
    let settings = &app_state.settings;

    if !is_access_key_valid(single_access_key(query), &settings.access_key) {
        logfire::warn!("Rejected orders paid webhook: invalid access key");
        return Err(WebhookError::InvalidKey);
    }

    if *req.method() != Method::POST {
        return Err(WebhookError::MethodNotAllowed);
    }

    let signature = req
        .headers()
        .get(consts::SHOPIFY_HMAC_HEADER)
        .and_then(|value| value.to_str().ok());
    if !settings.signing_secrets.verify_any(body, signature) {
        logfire::warn!("Rejected orders paid webhook: signature verification failed");
        return Err(WebhookError::InvalidSignature);
    }

    let order: schemas::OrderPaidPayload = serde_json::from_slice(body)
        .map_err(|err| WebhookError::MalformedPayload(err.to_string()))?;

    let outcome = api::raffle::record_order_diamonds(
        &order,
        settings,
        &app_state.credentials,
        &app_state.store,
    )
    .await?;

    Ok(outcome)
}

/// The `key` param, only when it is given exactly once
fn single_access_key(query: &[(String, String)]) -> Option<&str> {
    let mut keys = query
        .iter()
        .filter(|(name, _)| name == "key")
        .map(|(_, value)| value.as_str());

    match (keys.next(), keys.next()) {
        (Some(key), None) => Some(key),
        _ => None,
    }
}

/// Exact match of the query key; an unset expected key matches nothing
fn is_access_key_valid(provided: Option<&str>, expected: &str) -> bool {
    match provided {
        Some(provided) if !expected.is_empty() => {
            provided.len() == expected.len()
                && bool::from(provided.as_bytes().ct_eq(expected.as_bytes()))
        }
        _ => false,
    }
}
