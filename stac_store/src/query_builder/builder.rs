//! Canonical search arguments
//!
//! GET parameters and POST bodies are normalized into one
//! [`CanonicalSearchArgs`], the single JSON argument of the engine's
//! `search` function. Empty values are never serialized.

use crate::errors::StacError;
use crate::query_builder::fields::FieldProjection;
use crate::query_builder::filter::{normalize_filter, FilterLang};
use crate::query_builder::ordering::{parse_sortby, SortSpec};
use crate::query_builder::pagination::Limits;
use crate::query_builder::params::{CollectionSearchParams, SearchParams, SearchRequest};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Engine-side switches, set by the caller layer only
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchConf {
    /// Skip hydration in the engine; items are hydrated here instead
    pub nohydrate: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanonicalSearchArgs {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub collections: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ids: Vec<String>,
    /// 2D or 3D; 3D boxes are passed through untouched
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bbox: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intersects: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datetime: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sortby: Vec<SortSpec>,
    #[serde(default, skip_serializing_if = "FieldProjection::is_empty")]
    pub fields: FieldProjection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
    #[serde(
        default,
        rename = "filter-lang",
        skip_serializing_if = "Option::is_none"
    )]
    pub filter_lang: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conf: Option<SearchConf>,
}

/// Builder for [`CanonicalSearchArgs`]
///
/// Every setter ignores empty input, so `None`, `""` and `[]` never reach
/// the engine.
#[derive(Debug, Clone, Default)]
pub struct SearchArgsBuilder {
    args: CanonicalSearchArgs,
    limit: Option<i64>,
    filter: Option<(Value, FilterLang)>,
}

impl SearchArgsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collections(mut self, collections: Vec<String>) -> Self {
        self.args.collections = non_empty_strings(collections);
        self
    }

    pub fn ids(mut self, ids: Vec<String>) -> Self {
        self.args.ids = non_empty_strings(ids);
        self
    }

    pub fn bbox(mut self, bbox: Vec<f64>) -> Self {
        self.args.bbox = bbox;
        self
    }

    pub fn intersects(mut self, geometry: Option<Value>) -> Self {
        self.args.intersects = geometry.filter(|g| !g.is_null());
        self
    }

    pub fn datetime(mut self, datetime: Option<String>) -> Self {
        self.args.datetime = non_empty(datetime);
        self
    }

    /// Terms are OR-ed into one engine query string
    pub fn free_text(mut self, terms: Vec<String>) -> Self {
        let terms = non_empty_strings(terms);
        self.args.q = if terms.is_empty() {
            None
        } else {
            Some(terms.join(" OR "))
        };
        self
    }

    pub fn sortby(mut self, sortby: Vec<SortSpec>) -> Self {
        self.args.sortby = sortby;
        self
    }

    pub fn fields(mut self, fields: FieldProjection) -> Self {
        self.args.fields = fields.normalized();
        self
    }

    /// A blank text filter counts as no filter
    pub fn filter(mut self, filter: Option<Value>, lang: FilterLang) -> Self {
        self.filter = filter
            .filter(|f| match f {
                Value::Null => false,
                Value::String(text) => !text.trim().is_empty(),
                _ => true,
            })
            .map(|f| (f, lang));
        self
    }

    pub fn query(mut self, query: Option<Value>) -> Self {
        self.args.query = query.filter(|q| !q.is_null());
        self
    }

    pub fn token(mut self, token: Option<String>) -> Self {
        self.args.token = non_empty(token);
        self
    }

    pub fn limit(mut self, limit: Option<i64>) -> Self {
        self.limit = limit;
        self
    }

    pub fn offset(mut self, offset: Option<i64>) -> Self {
        self.args.offset = offset;
        self
    }

    /// Validate the limit and translate the filter
    pub fn build(self, limits: &Limits) -> Result<CanonicalSearchArgs, StacError> {
        let mut args = self.args;

        args.limit = Some(limits.normalize(self.limit)?);

        if let Some((filter, lang)) = self.filter {
            args.filter = Some(normalize_filter(filter, lang)?);
            args.filter_lang = Some(FilterLang::Cql2Json.as_str().to_string());
        }

        Ok(args)
    }
}

impl CanonicalSearchArgs {
    /// Normalize GET parameters
    pub fn from_get(params: SearchParams, limits: &Limits) -> Result<Self, StacError> {
        let intersects = params
            .intersects
            .as_deref()
            .map(|raw| parse_escaped_json("intersects", raw))
            .transpose()?;
        let query = params
            .query
            .as_deref()
            .map(|raw| parse_escaped_json("query", raw))
            .transpose()?;
        // GET filters default to the text language
        let lang = lang_or(params.filter_lang.as_deref(), FilterLang::Cql2Text)?;

        SearchArgsBuilder::new()
            .collections(params.collections)
            .ids(params.ids)
            .bbox(params.bbox)
            .intersects(intersects)
            .datetime(params.datetime)
            .free_text(params.q)
            .sortby(parse_sortby(&params.sortby))
            .fields(FieldProjection::from_tokens(&params.fields))
            .filter(params.filter.map(Value::String), lang)
            .query(query)
            .token(params.token)
            .limit(params.limit)
            .build(limits)
    }

    /// Normalize a POST body
    pub fn from_post(request: SearchRequest, limits: &Limits) -> Result<Self, StacError> {
        let lang = lang_or(request.filter_lang.as_deref(), FilterLang::Cql2Json)?;

        SearchArgsBuilder::new()
            .collections(request.collections.unwrap_or_default())
            .ids(request.ids.unwrap_or_default())
            .bbox(request.bbox.unwrap_or_default())
            .intersects(request.intersects)
            .datetime(request.datetime)
            .free_text(request.q.map(|q| q.terms()).unwrap_or_default())
            .sortby(request.sortby.unwrap_or_default())
            .fields(request.fields.unwrap_or_default())
            .filter(request.filter, lang)
            .query(request.query)
            .token(request.token)
            .limit(request.limit)
            .build(limits)
    }

    /// Normalize collection search parameters
    pub fn from_collection_search(
        params: CollectionSearchParams,
        limits: &Limits,
    ) -> Result<Self, StacError> {
        let query = params
            .query
            .as_deref()
            .map(|raw| parse_escaped_json("query", raw))
            .transpose()?;
        let lang = lang_or(params.filter_lang.as_deref(), FilterLang::Cql2Text)?;

        SearchArgsBuilder::new()
            .bbox(params.bbox)
            .datetime(params.datetime)
            .free_text(params.q)
            .sortby(parse_sortby(&params.sortby))
            .fields(FieldProjection::from_tokens(&params.fields))
            .filter(params.filter.map(Value::String), lang)
            .query(query)
            .limit(params.limit)
            .offset(params.offset)
            .build(limits)
    }

    /// Tell the engine whether to skip its own hydration
    pub fn with_nohydrate(mut self, nohydrate: bool) -> Self {
        self.conf = Some(SearchConf { nohydrate });
        self
    }

    pub fn to_json(&self) -> Result<Value, StacError> {
        Ok(serde_json::to_value(self)?)
    }
}

fn lang_or(lang: Option<&str>, default: FilterLang) -> Result<FilterLang, StacError> {
    match lang {
        Some(lang) if !lang.trim().is_empty() => FilterLang::parse(lang),
        _ => Ok(default),
    }
}

/// `unquote_plus` then JSON parse
pub(crate) fn parse_escaped_json(name: &str, raw: &str) -> Result<Value, StacError> {
    let unescaped = urlencoding::decode(&raw.replace('+', " "))
        .map_err(|e| StacError::InvalidQueryParameter(format!("Invalid {}: {}", name, e)))?
        .into_owned();
    serde_json::from_str(&unescaped)
        .map_err(|e| StacError::InvalidQueryParameter(format!("Invalid {} JSON: {}", name, e)))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn non_empty_strings(values: Vec<String>) -> Vec<String> {
    values.into_iter().filter(|v| !v.trim().is_empty()).collect()
}
