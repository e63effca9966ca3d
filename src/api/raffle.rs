//! # Raffle Counter API Module
//!
//! Turns a paid order into diamonds and adds them, once, to the counter kept
//! on the counter product in the store.
//!
//! # Duplicate deliveries
//!
//! The only guard against counting an order twice is the `rifa.counted`
//! marker: it is read first and written together with the new total. Two
//! deliveries of the same order racing between that read and the write will
//! both be counted.

use crate::{
    config::{MarkerKeys, WebhookSettings},
    services::{self, MetafieldUserError, StoreError},
    webhook::shopify::schemas::OrderPaidPayload,
};
use derive_more::{Display, Error};

/// Successful end states of a delivery; the display text is the response body
#[derive(Debug, Clone, PartialEq, Display)]
pub enum CountOutcome {
    #[display("No diamonds")]
    NoDiamonds,
    #[display("No order id")]
    NoOrderId,
    #[display("Already counted")]
    AlreadyCounted,
    #[display("OK +{added} => {total}")]
    Counted { added: u64, total: u64 },
}

impl CountOutcome {
    /// Short label used for metrics
    pub fn label(&self) -> &'static str {
        match self {
            CountOutcome::NoDiamonds => "no_diamonds",
            CountOutcome::NoOrderId => "no_order_id",
            CountOutcome::AlreadyCounted => "already_counted",
            CountOutcome::Counted { .. } => "counted",
        }
    }
}

#[derive(Debug, Display, Error)]
pub enum CounterError {
    #[display("counter product not found: {_0}")]
    ProductNotFound(#[error(not(source))] String),
    /// Field errors reported by the batched write, as a JSON array
    #[display("{_0}")]
    FieldErrors(#[error(not(source))] String),
    #[display("{_0}")]
    Store(StoreError),
}

impl From<StoreError> for CounterError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(handle) => CounterError::ProductNotFound(handle),
            other => CounterError::Store(other),
        }
    }
}

/// Counts the diamonds in an order.
///
/// A line item counts when its properties carry any of the marker keys,
/// whatever the value; it contributes its quantity.
pub fn count_raffle_units(order: &OrderPaidPayload, marker_keys: &MarkerKeys) -> u64 {
    order
        .line_items
        .iter()
        .filter(|item| {
            let properties = item.properties.to_map();
            marker_keys
                .as_slice()
                .iter()
                .any(|key| properties.contains_key(key))
        })
        .fold(0u64, |total, item| total.saturating_add(item.quantity))
}

/// Adds `units` to `current` and keeps the result within `[0, max]`
pub fn clamp_counter(current: i64, units: u64, max: u64) -> u64 {
    let units = i64::try_from(units).unwrap_or(i64::MAX);
    let next = current.saturating_add(units).max(0) as u64;

    next.min(max)
}

/// Adds the diamonds of a paid order to the counter, at most once per order.
///
/// # Process
/// 1. Count diamonds; none means nothing to do
/// 2. Resolve the order id; none means nothing to attribute
/// 3. Get a token and skip orders already marked as counted
/// 4. Read the counter product
/// 5. Write the clamped total and the order marker in one batch
///
/// No step is retried and nothing is compensated if the batch is only
/// partially applied by the store.
pub async fn record_order_diamonds(
    order: &OrderPaidPayload,
    settings: &WebhookSettings,
    credentials: &services::ImplCredentialProvider,
    store: &services::ImplMetafieldStore,
) -> Result<CountOutcome, CounterError> {
    let _span = logfire::span!("record_order_diamonds").entered();

    let diamonds = count_raffle_units(order, &settings.marker_keys);
    if diamonds == 0 {
        return Ok(CountOutcome::NoDiamonds);
    }

    let Some(order_gid) = order.order_gid() else {
        logfire::warn!("Paid order with {diamonds} diamonds has no id", diamonds = diamonds as i64);
        return Ok(CountOutcome::NoOrderId);
    };

    let token = credentials.access_token().await?;

    if store.is_order_counted(&token, &order_gid).await? {
        logfire::info!("Order {order_gid} already counted", order_gid = order_gid.clone());
        return Ok(CountOutcome::AlreadyCounted);
    }

    let product = store
        .get_counter_product(&token, &settings.counter_product_handle)
        .await?;

    let total = clamp_counter(product.current_value, diamonds, settings.counter_max);

    let user_errors = store
        .set_counter_and_marker(&token, &product.id, total, &order_gid)
        .await?;
    if !user_errors.is_empty() {
        return Err(CounterError::FieldErrors(serialize_user_errors(&user_errors)));
    }

    logfire::info!(
        "Order {order_gid} added {diamonds} diamonds, counter at {total}",
        order_gid = order_gid,
        diamonds = diamonds as i64,
        total = total as i64
    );

    Ok(CountOutcome::Counted {
        added: diamonds,
        total,
    })
}

fn serialize_user_errors(user_errors: &[MetafieldUserError]) -> String {
    serde_json::to_string(user_errors).unwrap_or_else(|_| format!("{user_errors:?}"))
}
