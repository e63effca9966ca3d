use opentelemetry::{KeyValue, metrics::UpDownCounter};
use std::sync::LazyLock;

static STATDS: LazyLock<UpDownCounter<i64>> = LazyLock::new(|| {
    logfire::i64_up_down_counter("diamond_raffle_statds")
        .with_description("Diamond raffle webhook statistics")
        .with_unit("delivery")
        .build()
});

fn incr_statds(metric: &'static str, value: &'static str) {
    STATDS.add(1, &[KeyValue::new(metric, value)]);
}

/// Counts a webhook delivery by how it ended, success or failure
pub fn incr_webhook_outcome_statds(outcome: &'static str) {
    incr_statds("orders_paid_outcome", outcome)
}
