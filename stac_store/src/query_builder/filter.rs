//! Structured filter expressions
//!
//! The engine only understands CQL2-JSON. Text filters are translated
//! before dispatch and the language tag rewritten.

use crate::errors::StacError;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterLang {
    Cql2Json,
    Cql2Text,
}

impl FilterLang {
    pub fn parse(lang: &str) -> Result<Self, StacError> {
        match lang.trim().to_ascii_lowercase().as_str() {
            "cql2-json" => Ok(FilterLang::Cql2Json),
            "cql2-text" => Ok(FilterLang::Cql2Text),
            other => Err(StacError::InvalidQueryParameter(format!(
                "Unsupported filter-lang: {}",
                other
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterLang::Cql2Json => "cql2-json",
            FilterLang::Cql2Text => "cql2-text",
        }
    }
}

/// Bring a filter into CQL2-JSON.
///
/// A JSON filter may arrive as a string (GET) or as a structure (POST).
pub fn normalize_filter(filter: Value, lang: FilterLang) -> Result<Value, StacError> {
    match (lang, filter) {
        (FilterLang::Cql2Text, Value::String(text)) => Ok(cql2_text::to_json(&text)?),
        (FilterLang::Cql2Text, _) => Err(StacError::InvalidQueryParameter(
            "A cql2-text filter must be a string".to_string(),
        )),
        (FilterLang::Cql2Json, Value::String(text)) => serde_json::from_str(&text).map_err(|e| {
            StacError::InvalidQueryParameter(format!("Invalid cql2-json filter: {}", e))
        }),
        (FilterLang::Cql2Json, filter @ Value::Object(_)) => Ok(filter),
        (FilterLang::Cql2Json, _) => Err(StacError::InvalidQueryParameter(
            "A cql2-json filter must be an object".to_string(),
        )),
    }
}
