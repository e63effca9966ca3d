use crate::consts;
use ntex::web;

/// Configures webhook routes for external integrations.
///
/// The route accepts every method; the handler rejects anything but POST
/// after checking the access key. The body limit is raised so that large
/// orders are read whole instead of failing with a 413.
///
/// # Routes
/// - `* /webhooks/orders-paid?key=...` - Shopify paid order receiver
pub fn shopify(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource(consts::ORDERS_PAID_WEBHOOK_PATH)
            .state(web::types::PayloadConfig::new(
                consts::ORDERS_PAID_MAX_BODY_BYTES,
            ))
            .to(super::shopify::receive),
    );
}
