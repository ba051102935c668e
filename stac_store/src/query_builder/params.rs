//! Inbound search shapes
//!
//! [`SearchParams`] is the flattened GET form, where structured values
//! (`intersects`, `query`, `filter`) arrive as URL-escaped JSON or text.
//! [`SearchRequest`] is the POST body.

use crate::errors::StacError;
use crate::query_builder::fields::FieldProjection;
use crate::query_builder::ordering::SortSpec;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// GET `/search` and `/collections/{id}/items` parameters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchParams {
    pub collections: Vec<String>,
    pub ids: Vec<String>,
    pub bbox: Vec<f64>,
    /// URL-escaped GeoJSON
    pub intersects: Option<String>,
    pub datetime: Option<String>,
    pub limit: Option<i64>,
    /// URL-escaped query extension JSON
    pub query: Option<String>,
    pub fields: Vec<String>,
    pub sortby: Vec<String>,
    pub filter: Option<String>,
    pub filter_lang: Option<String>,
    pub token: Option<String>,
    pub q: Vec<String>,
}

impl SearchParams {
    /// Build from decoded `key=value` query pairs; list values are
    /// comma separated.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, StacError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut params = Self::default();

        for (key, value) in pairs {
            let value = value.as_ref();
            match key.as_ref() {
                "collections" => params.collections.extend(split_list(value)),
                "ids" => params.ids.extend(split_list(value)),
                "bbox" => params.bbox = parse_bbox(value)?,
                "intersects" => params.intersects = Some(value.to_string()),
                "datetime" => params.datetime = Some(value.to_string()),
                "limit" => {
                    params.limit = Some(value.trim().parse().map_err(|_| {
                        StacError::InvalidQueryParameter(format!("Invalid limit: {}", value))
                    })?)
                }
                "query" => params.query = Some(value.to_string()),
                "fields" => params.fields.extend(split_list(value)),
                "sortby" => params.sortby.extend(split_list(value)),
                "filter" => params.filter = Some(value.to_string()),
                "filter-lang" | "filter_lang" => params.filter_lang = Some(value.to_string()),
                "token" => params.token = Some(value.to_string()),
                "q" => params.q.extend(split_list(value)),
                _ => {}
            }
        }

        Ok(params)
    }

    /// Decode a raw `a=b&c=d` query string
    pub fn from_query(query: &str) -> Result<Self, StacError> {
        Self::from_pairs(url::form_urlencoded::parse(query.as_bytes()))
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_bbox(value: &str) -> Result<Vec<f64>, StacError> {
    let bbox = split_list(value)
        .iter()
        .map(|v| v.parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| StacError::InvalidQueryParameter(format!("Invalid bbox: {}", value)))?;

    if bbox.len() != 4 && bbox.len() != 6 {
        return Err(StacError::InvalidQueryParameter(format!(
            "bbox must have 4 or 6 values, got {}",
            bbox.len()
        )));
    }
    Ok(bbox)
}

/// Free-text terms, a single string or a list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FreeText {
    One(String),
    Many(Vec<String>),
}

impl FreeText {
    pub fn terms(&self) -> Vec<String> {
        match self {
            FreeText::One(term) => vec![term.clone()],
            FreeText::Many(terms) => terms.clone(),
        }
    }
}

/// POST `/search` body
///
/// Unknown members are ignored, including any attempt to pass engine
/// configuration directly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collections: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intersects: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datetime: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<FieldProjection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sortby: Option<Vec<SortSpec>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
    #[serde(
        rename = "filter-lang",
        alias = "filter_lang",
        skip_serializing_if = "Option::is_none"
    )]
    pub filter_lang: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q: Option<FreeText>,
}

/// GET `/collections` parameters (collection search)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionSearchParams {
    pub bbox: Vec<f64>,
    pub datetime: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub query: Option<String>,
    pub fields: Vec<String>,
    pub sortby: Vec<String>,
    pub filter: Option<String>,
    pub filter_lang: Option<String>,
    pub q: Vec<String>,
}
