pub const ORDERS_PAID_WEBHOOK_PATH: &str = "/webhooks/orders-paid";
// Orders with many line items and notes go well past ntex's 256 KiB default
pub const ORDERS_PAID_MAX_BODY_BYTES: usize = 8 * 1024 * 1024;
pub const SHOPIFY_HMAC_HEADER: &str = "x-shopify-hmac-sha256";
pub const SHOPIFY_ACCESS_TOKEN_HEADER: &str = "x-shopify-access-token";
pub const SHOPIFY_ORDER_GID_PREFIX: &str = "gid://shopify/Order/";
pub const SHOPIFY_TOKEN_SCOPE: &str = "read_orders,write_orders,read_products,write_products";

pub const RAFFLE_METAFIELD_NAMESPACE: &str = "rifa";
pub const COUNTED_METAFIELD_KEY: &str = "counted";
pub const SOLD_DIAMONDS_METAFIELD_KEY: &str = "sold_diamonds";

// "NÃºmero" is how "Número" arrives when the storefront double encodes it
pub const DEFAULT_MARKER_KEYS: [&str; 3] = ["Diamante", "NÃºmero", "Numero"];
