//! Item hydration
//!
//! Sparse items returned by the engine carry only the values that differ
//! from their collection's base item. Hydration merges the base item back
//! underneath the sparse one.

use serde_json::{Map, Value};

/// Emitted by the engine in place of a value the base item has but the
/// item deliberately does not.
pub const DO_NOT_MERGE_MARKER: &str = "𒍟※";

fn is_marker(value: &Value) -> bool {
    value.as_str() == Some(DO_NOT_MERGE_MARKER)
}

/// Merge `base` beneath `item`; values already present on the item win.
///
/// Objects are merged recursively and arrays of equal length are merged
/// element-wise where both elements are objects. A marker on the item
/// removes the key when the base has it. With `strip_unmatched_markers`
/// any marker left over afterwards is removed as well.
pub fn hydrate(base: &Value, mut item: Value, strip_unmatched_markers: bool) -> Value {
    if let (Value::Object(base), Value::Object(target)) = (base, &mut item) {
        merge_objects(base, target);
    }
    if strip_unmatched_markers {
        strip_markers(&mut item);
    }
    item
}

fn merge_objects(base: &Map<String, Value>, item: &mut Map<String, Value>) {
    for (key, base_value) in base {
        let Some(item_value) = item.get_mut(key) else {
            item.insert(key.clone(), base_value.clone());
            continue;
        };

        let unset = match (base_value, item_value) {
            (Value::Object(b), Value::Object(i)) => {
                merge_objects(b, i);
                false
            }
            (Value::Array(b), Value::Array(i)) if b.len() == i.len() => {
                for (bb, ii) in b.iter().zip(i.iter_mut()) {
                    if let (Value::Object(bb), Value::Object(ii)) = (bb, ii) {
                        merge_objects(bb, ii);
                    }
                }
                false
            }
            (_, item_value) => is_marker(item_value),
        };

        if unset {
            item.remove(key);
        }
    }
}

/// Remove every marker value, in objects and arrays alike
pub fn strip_markers(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|_, v| !is_marker(v));
            for v in map.values_mut() {
                strip_markers(v);
            }
        }
        Value::Array(items) => {
            items.retain(|v| !is_marker(v));
            for v in items.iter_mut() {
                strip_markers(v);
            }
        }
        _ => {}
    }
}

/// Top-level null values of a base item are not defaults
pub fn without_nulls(base: &Value) -> Value {
    match base {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        ),
        other => other.clone(),
    }
}
