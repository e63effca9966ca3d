//! Shopify `orders/paid` webhook payload structures
//!
//! Only the fields the raffle counter needs are modeled; everything else in
//! the payload is ignored. Shopify is loose with a few of them (properties and
//! quantities come in more than one shape), so those are normalized here.

use crate::consts;
use serde::{Deserialize, Deserializer, de::DeserializeOwned};
use serde_json::{Map, Number, Value};
use std::collections::HashMap;

/// Root payload of the `orders/paid` webhook
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderPaidPayload {
    /// Numeric order id (REST style)
    #[serde(default)]
    pub id: Option<OrderNumber>,
    /// Globally qualified order id, e.g. `gid://shopify/Order/555`; ignored
    /// unless it is a string
    #[serde(default, deserialize_with = "string_or_none")]
    pub admin_graphql_api_id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub line_items: Vec<LineItem>,
}

impl OrderPaidPayload {
    /// Resolves the global id used to attach metafields to the order
    pub fn order_gid(&self) -> Option<String> {
        if let Some(gid) = self
            .admin_graphql_api_id
            .as_deref()
            .filter(|gid| !gid.is_empty())
        {
            return Some(gid.to_string());
        }

        let id = match self.id.as_ref()? {
            OrderNumber::Number(id) if id.as_f64() == Some(0.0) => return None,
            OrderNumber::Number(id) => id.to_string(),
            OrderNumber::Text(id) if id.is_empty() => return None,
            OrderNumber::Text(id) => id.clone(),
            OrderNumber::Other(_) => return None,
        };

        Some(format!("{}{id}", consts::SHOPIFY_ORDER_GID_PREFIX))
    }
}

/// Order id as sent by the webhook, a number in practice but tolerated as text.
///
/// Any other shape is kept so that it never fails the whole payload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum OrderNumber {
    Number(Number),
    Text(String),
    Other(Value),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LineItem {
    #[serde(default, deserialize_with = "deserialize_quantity")]
    pub quantity: u64,
    #[serde(default)]
    pub properties: LineItemProperties,
}

/// A single `{name, value}` entry of the array form of line item properties
#[derive(Debug, Clone, Deserialize)]
pub struct PropertyPair {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub value: Value,
}

/// Line item properties in any of the shapes Shopify sends them
#[derive(Debug, Clone, Default)]
pub enum LineItemProperties {
    /// `[{"name": "Diamante", "value": "1"}, ...]`
    Pairs(Vec<PropertyPair>),
    /// `{"Diamante": "1", ...}`
    Map(Map<String, Value>),
    /// Missing, `null` or a shape that carries no properties
    #[default]
    Empty,
}

impl LineItemProperties {
    /// Normalizes every shape into a single name to value mapping
    pub fn to_map(&self) -> HashMap<String, Value> {
        match self {
            Self::Pairs(pairs) => pairs_to_map(pairs),
            Self::Map(map) => object_to_map(map),
            Self::Empty => HashMap::new(),
        }
    }
}

/// Later pairs win over earlier ones with the same name; nameless pairs are skipped
fn pairs_to_map(pairs: &[PropertyPair]) -> HashMap<String, Value> {
    pairs
        .iter()
        .filter_map(|pair| {
            pair.name
                .as_ref()
                .filter(|name| !name.is_empty())
                .map(|name| (name.clone(), pair.value.clone()))
        })
        .collect()
}

fn object_to_map(map: &Map<String, Value>) -> HashMap<String, Value> {
    map.iter()
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

impl<'de> Deserialize<'de> for LineItemProperties {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let properties = match Value::deserialize(deserializer)? {
            Value::Array(items) => Self::Pairs(
                items
                    .into_iter()
                    .filter_map(|item| serde_json::from_value(item).ok())
                    .collect(),
            ),
            Value::Object(map) => Self::Map(map),
            _ => Self::Empty,
        };

        Ok(properties)
    }
}

/// Coerces a quantity into a non-negative integer; anything unusable is zero
fn deserialize_quantity<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(coerce_quantity(&Value::deserialize(deserializer)?))
}

fn coerce_quantity(value: &Value) -> u64 {
    match value {
        Value::Number(number) => number
            .as_u64()
            .or_else(|| number.as_i64().map(|_| 0))
            .or_else(|| number.as_f64().map(float_quantity))
            .unwrap_or_default(),
        Value::String(text) => text
            .trim()
            .parse::<f64>()
            .map(float_quantity)
            .unwrap_or_default(),
        _ => 0,
    }
}

fn float_quantity(quantity: f64) -> u64 {
    if quantity.is_finite() && quantity > 0.0 {
        quantity.trunc() as u64
    } else {
        0
    }
}

fn string_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(text) => Ok(Some(text)),
        _ => Ok(None),
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + DeserializeOwned,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(body: Value) -> OrderPaidPayload {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_properties_pairs_and_map_normalize_equally() {
        let order = parse(json!({
            "id": 1,
            "line_items": [
                {"quantity": 1, "properties": [{"name": "Diamante", "value": "1"}, {"name": "other", "value": "x"}]},
                {"quantity": 1, "properties": {"Diamante": "1", "other": "x"}}
            ]
        }));

        assert_eq!(
            order.line_items[0].properties.to_map(),
            order.line_items[1].properties.to_map()
        );
    }

    #[test]
    fn test_properties_pairs_last_write_wins_and_skip_nameless() {
        let order = parse(json!({
            "line_items": [{"properties": [
                {"name": "Numero", "value": "1"},
                {"value": "orphan"},
                {"name": "Numero", "value": "2"},
                "not a pair"
            ]}]
        }));

        let props = order.line_items[0].properties.to_map();
        assert_eq!(props.len(), 1);
        assert_eq!(props["Numero"], json!("2"));
    }

    #[test]
    fn test_properties_missing_or_odd_shapes_are_empty() {
        let order = parse(json!({
            "line_items": [
                {"quantity": 2},
                {"quantity": 2, "properties": null},
                {"quantity": 2, "properties": "Diamante"}
            ]
        }));

        assert!(order.line_items.iter().all(|item| item.properties.to_map().is_empty()));
    }

    #[test]
    fn test_quantity_coercion() {
        let order = parse(json!({
            "line_items": [
                {"quantity": 3},
                {"quantity": "4"},
                {"quantity": 2.7},
                {"quantity": -5},
                {"quantity": "abc"},
                {"quantity": null},
                {"quantity": true},
                {}
            ]
        }));

        let quantities: Vec<u64> = order.line_items.iter().map(|item| item.quantity).collect();
        assert_eq!(quantities, vec![3, 4, 2, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_line_items_null_or_missing() {
        assert!(parse(json!({"id": 1, "line_items": null})).line_items.is_empty());
        assert!(parse(json!({"id": 1})).line_items.is_empty());
    }

    #[test]
    fn test_order_gid_resolution() {
        let order = parse(json!({"id": 555, "admin_graphql_api_id": "gid://shopify/Order/777"}));
        assert_eq!(order.order_gid().as_deref(), Some("gid://shopify/Order/777"));

        let order = parse(json!({"id": 555, "admin_graphql_api_id": ""}));
        assert_eq!(order.order_gid().as_deref(), Some("gid://shopify/Order/555"));

        let order = parse(json!({"id": "555"}));
        assert_eq!(order.order_gid().as_deref(), Some("gid://shopify/Order/555"));

        assert!(parse(json!({"id": 0})).order_gid().is_none());
        assert!(parse(json!({"id": ""})).order_gid().is_none());
        assert!(parse(json!({"line_items": []})).order_gid().is_none());
    }

    #[test]
    fn test_order_gid_odd_id_shapes() {
        let order = parse(json!({"id": -5, "admin_graphql_api_id": 12}));
        assert_eq!(order.order_gid().as_deref(), Some("gid://shopify/Order/-5"));

        let order = parse(json!({"id": 555.5, "admin_graphql_api_id": null}));
        assert_eq!(order.order_gid().as_deref(), Some("gid://shopify/Order/555.5"));

        let order = parse(json!({"id": 555, "admin_graphql_api_id": {"gid": "x"}}));
        assert_eq!(order.order_gid().as_deref(), Some("gid://shopify/Order/555"));

        assert!(parse(json!({"id": 0.0})).order_gid().is_none());
        assert!(parse(json!({"id": true})).order_gid().is_none());
        assert!(parse(json!({"id": [555]})).order_gid().is_none());
        assert!(parse(json!({"id": null})).order_gid().is_none());
    }

    #[test]
    fn test_malformed_body_is_error() {
        assert!(serde_json::from_str::<OrderPaidPayload>("{not json").is_err());
        assert!(serde_json::from_str::<OrderPaidPayload>("42").is_err());
    }
}
