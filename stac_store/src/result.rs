//! Engine result envelopes

use crate::errors::StacError;
use crate::query_builder::pagination::{token_from_href, PageDirection};
use serde_json::{Map, Value};

/// Envelope returned by the engine's `search` function
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSearchResult {
    /// Possibly sparse items
    pub features: Vec<Value>,
    /// Links the engine attached to the envelope
    pub links: Vec<Value>,
    pub number_matched: Option<u64>,
    pub number_returned: Option<u64>,
    /// Continuation keys, without the `next:` / `prev:` prefix
    pub next: Option<String>,
    pub prev: Option<String>,
    /// Members not listed above, passed through
    pub extra: Map<String, Value>,
}

impl RawSearchResult {
    /// Parse the engine envelope.
    ///
    /// Tokens come from the dedicated `next` / `prev` members when present,
    /// otherwise from the `next` / `prev` link hrefs.
    pub fn from_value(value: Value) -> Result<Self, StacError> {
        let mut envelope = match value {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(StacError::DatabaseError(format!(
                    "Unexpected search result: {}",
                    type_name(&other)
                )))
            }
        };

        let features = take_array(&mut envelope, "features");
        let links = take_array(&mut envelope, "links");
        let number_matched = envelope.remove("numberMatched").and_then(|v| v.as_u64());
        let number_returned = envelope.remove("numberReturned").and_then(|v| v.as_u64());

        let next = take_string(&mut envelope, "next")
            .or_else(|| token_from_links(&links, PageDirection::Next));
        let prev = take_string(&mut envelope, "prev")
            .or_else(|| token_from_links(&links, PageDirection::Prev));

        Ok(Self {
            features,
            links,
            number_matched,
            number_returned,
            next,
            prev,
            extra: envelope,
        })
    }
}

/// Envelope returned by `collection_search` / `all_collections`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawCollectionsResult {
    pub collections: Vec<Value>,
    pub links: Vec<Value>,
    pub number_matched: Option<u64>,
    pub number_returned: Option<u64>,
}

impl RawCollectionsResult {
    pub fn from_value(value: Value) -> Result<Self, StacError> {
        match value {
            Value::Object(mut envelope) => Ok(Self {
                collections: take_array(&mut envelope, "collections"),
                links: take_array(&mut envelope, "links"),
                number_matched: envelope.get("numberMatched").and_then(Value::as_u64),
                number_returned: envelope.get("numberReturned").and_then(Value::as_u64),
            }),
            // all_collections() returns a bare array
            Value::Array(collections) => Ok(Self {
                collections,
                ..Self::default()
            }),
            Value::Null => Ok(Self::default()),
            other => Err(StacError::DatabaseError(format!(
                "Unexpected collections result: {}",
                type_name(&other)
            ))),
        }
    }

    /// The engine's own `next` / `prev` link, if any
    pub fn link(&self, direction: PageDirection) -> Option<&Value> {
        self.links
            .iter()
            .find(|link| link.get("rel").and_then(Value::as_str) == Some(direction.rel()))
    }
}

fn take_array(map: &mut Map<String, Value>, key: &str) -> Vec<Value> {
    match map.remove(key) {
        Some(Value::Array(values)) => values,
        _ => Vec::new(),
    }
}

fn take_string(map: &mut Map<String, Value>, key: &str) -> Option<String> {
    match map.remove(key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        _ => None,
    }
}

fn token_from_links(links: &[Value], direction: PageDirection) -> Option<String> {
    links
        .iter()
        .filter(|link| link.get("rel").and_then(Value::as_str) == Some(direction.rel()))
        .filter_map(|link| link.get("href").and_then(Value::as_str))
        .find_map(|href| token_from_href(href, direction))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
