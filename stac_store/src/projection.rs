//! Field projection of hydrated items
//!
//! Paths are dotted (`properties.datetime`). Includes are applied first,
//! then excludes.

use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Apply include / exclude paths to an item.
///
/// When nothing survives the include step only `id` and `collection`
/// are kept.
pub fn filter_fields(item: Value, include: &BTreeSet<String>, exclude: &BTreeSet<String>) -> Value {
    if include.is_empty() && exclude.is_empty() {
        return item;
    }

    let source = match item {
        Value::Object(map) => map,
        other => return other,
    };

    let mut clean = if include.is_empty() {
        source.clone()
    } else {
        let mut clean = Map::new();
        for path in include {
            include_path(&source, path, &mut clean);
        }
        clean
    };

    if clean.is_empty() {
        let mut minimal = Map::new();
        for key in ["id", "collection"] {
            if let Some(value) = source.get(key) {
                minimal.insert(key.to_string(), value.clone());
            }
        }
        return Value::Object(minimal);
    }

    for path in exclude {
        exclude_path(&mut clean, path);
    }

    Value::Object(clean)
}

fn include_path(source: &Map<String, Value>, path: &str, target: &mut Map<String, Value>) {
    let (root, rest) = match path.split_once('.') {
        Some((root, rest)) => (root, Some(rest)),
        None => (path, None),
    };

    let Some(value) = source.get(root) else {
        return;
    };

    match (value, rest) {
        (Value::Object(nested), Some(rest)) => {
            let mut sub = match target.remove(root) {
                Some(Value::Object(existing)) => existing,
                _ => Map::new(),
            };
            include_path(nested, rest, &mut sub);
            target.insert(root.to_string(), Value::Object(sub));
        }
        _ => {
            target.insert(root.to_string(), value.clone());
        }
    }
}

fn exclude_path(target: &mut Map<String, Value>, path: &str) {
    match path.split_once('.') {
        Some((root, rest)) => {
            let now_empty = match target.get_mut(root) {
                Some(Value::Object(nested)) => {
                    exclude_path(nested, rest);
                    nested.is_empty()
                }
                _ => false,
            };
            if now_empty {
                target.remove(root);
            }
        }
        None => {
            target.remove(path);
        }
    }
}
