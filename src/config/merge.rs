//! Deep merge of configuration tiers.
//!
//! Objects merge key by key; every other value (arrays included) is replaced
//! by the higher tier. A null in the overlay means "not specified".

use serde_json::Value;

/// Merge `overlay` onto `base`, with `overlay` taking precedence.
///
/// ```
/// use serde_json::json;
/// use pro_irp::config::deep_merge;
///
/// let base = json!({ "server": { "port": 4000, "bind": "127.0.0.1" } });
/// let overlay = json!({ "server": { "port": 8080 } });
/// assert_eq!(
///     deep_merge(base, overlay),
///     json!({ "server": { "port": 8080, "bind": "127.0.0.1" } })
/// );
/// ```
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => overlay_value,
                };
                base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (base, Value::Null) => base,
        (_, overlay) => overlay,
    }
}

/// Fold [`deep_merge`] over tiers ordered lowest priority first.
pub fn deep_merge_all(values: impl IntoIterator<Item = Value>) -> Value {
    values.into_iter().fold(Value::Null, deep_merge)
}
