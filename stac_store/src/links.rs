//! Link builders
//!
//! Links are derived from the inbound request URL. No state is kept
//! between calls.

use crate::errors::StacError;
use crate::query_builder::pagination::PageDirection;
use serde_json::{json, Map, Value};
use url::Url;

pub const MIME_JSON: &str = "application/json";
pub const MIME_GEOJSON: &str = "application/geo+json";
pub const MIME_SCHEMA: &str = "application/schema+json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMethod {
    Get,
    Post,
}

impl RequestMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestMethod::Get => "GET",
            RequestMethod::Post => "POST",
        }
    }
}

/// What a link builder needs to know about the inbound request
#[derive(Debug, Clone, PartialEq)]
pub struct RequestContext {
    base_url: Url,
    url: Url,
    method: RequestMethod,
    body: Option<Value>,
}

impl RequestContext {
    /// `base_url` is the API root, `url` the full request URL
    pub fn get(base_url: &str, url: &str) -> Result<Self, StacError> {
        Ok(Self {
            base_url: parse_base(base_url)?,
            url: parse_url(url)?,
            method: RequestMethod::Get,
            body: None,
        })
    }

    pub fn post(base_url: &str, url: &str, body: Value) -> Result<Self, StacError> {
        Ok(Self {
            base_url: parse_base(base_url)?,
            url: parse_url(url)?,
            method: RequestMethod::Post,
            body: Some(body),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn method(&self) -> RequestMethod {
        self.method
    }

    /// Absolute URL of a path below the API root
    pub fn resolve(&self, segments: &[&str]) -> String {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url.to_string()
    }
}

fn parse_url(url: &str) -> Result<Url, StacError> {
    Url::parse(url)
        .map_err(|e| StacError::InvalidQueryParameter(format!("Invalid request URL {}: {}", url, e)))
}

fn parse_base(base_url: &str) -> Result<Url, StacError> {
    let mut url = parse_url(base_url)?;
    if url.cannot_be_a_base() {
        return Err(StacError::InvalidQueryParameter(format!(
            "Invalid base URL: {}",
            base_url
        )));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url.set_query(None);
    Ok(url)
}

fn link(rel: &str, media_type: &str, href: String) -> Value {
    json!({ "rel": rel, "type": media_type, "href": href })
}

/// Keep engine links whose relation is not rebuilt here
fn merge_extra(mut links: Vec<Value>, extra: &[Value]) -> Vec<Value> {
    let rebuilt: Vec<String> = links
        .iter()
        .filter_map(|l| l.get("rel").and_then(Value::as_str).map(str::to_string))
        .collect();

    links.extend(
        extra
            .iter()
            .filter(|l| {
                l.get("rel")
                    .and_then(Value::as_str)
                    .is_some_and(|rel| !rebuilt.iter().any(|r| r == rel))
            })
            .cloned(),
    );
    links
}

/// Copy of `url` with `key` set to `value`, replacing earlier values
fn with_query_param(url: &Url, key: &str, value: &str) -> String {
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != key)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut url = url.clone();
    url.query_pairs_mut()
        .clear()
        .extend_pairs(pairs)
        .append_pair(key, value);
    url.to_string()
}

/// `next` / `prev` links for an item search.
///
/// GET searches get the request URL with a `token` parameter. POST
/// searches get a replayable body: the original body plus the token.
pub fn paging_links(ctx: &RequestContext, next: Option<&str>, prev: Option<&str>) -> Vec<Value> {
    [(PageDirection::Next, next), (PageDirection::Prev, prev)]
        .into_iter()
        .filter_map(|(direction, key)| key.map(|key| paging_link(ctx, direction, key)))
        .collect()
}

fn paging_link(ctx: &RequestContext, direction: PageDirection, key: &str) -> Value {
    let token = direction.token(key);

    match ctx.method {
        RequestMethod::Get => json!({
            "rel": direction.rel(),
            "type": MIME_GEOJSON,
            "method": "GET",
            "href": with_query_param(&ctx.url, "token", &token),
        }),
        RequestMethod::Post => {
            let mut body = match &ctx.body {
                Some(Value::Object(body)) => body.clone(),
                _ => Map::new(),
            };
            body.insert("token".to_string(), Value::String(token));
            json!({
                "rel": direction.rel(),
                "type": MIME_GEOJSON,
                "method": "POST",
                "href": ctx.url.to_string(),
                "body": body,
            })
        }
    }
}

/// `next` / `prev` links for collection search, from the engine's links.
///
/// The query parameters of the engine href (`offset`, `limit`) are carried
/// over onto the request URL, or into the body for POST.
pub fn collection_paging_links(
    ctx: &RequestContext,
    next: Option<&Value>,
    prev: Option<&Value>,
) -> Vec<Value> {
    [(PageDirection::Next, next), (PageDirection::Prev, prev)]
        .into_iter()
        .filter_map(|(direction, engine_link)| {
            let href = engine_link?.get("href").and_then(Value::as_str)?;
            let engine_url = Url::parse(href).ok()?;

            let link = match ctx.method {
                RequestMethod::Get => {
                    let mut url = ctx.url.clone();
                    for (key, value) in engine_url.query_pairs() {
                        url = Url::parse(&with_query_param(&url, &key, &value)).ok()?;
                    }
                    json!({
                        "rel": direction.rel(),
                        "type": MIME_JSON,
                        "method": "GET",
                        "href": url.to_string(),
                    })
                }
                RequestMethod::Post => {
                    let mut body = match &ctx.body {
                        Some(Value::Object(body)) => body.clone(),
                        _ => Map::new(),
                    };
                    for (key, value) in engine_url.query_pairs() {
                        let value = value
                            .parse::<i64>()
                            .map(Value::from)
                            .unwrap_or_else(|_| Value::String(value.into_owned()));
                        body.insert(key.into_owned(), value);
                    }
                    json!({
                        "rel": direction.rel(),
                        "type": MIME_JSON,
                        "method": "POST",
                        "href": ctx.url.to_string(),
                        "body": body,
                    })
                }
            };
            Some(link)
        })
        .collect()
}

/// `self`, `parent`, `collection` and `root` links of an item
pub fn item_links(
    ctx: &RequestContext,
    collection_id: &str,
    item_id: &str,
    extra: &[Value],
) -> Vec<Value> {
    let collection = ctx.resolve(&["collections", collection_id]);
    let links = vec![
        link(
            "self",
            MIME_GEOJSON,
            ctx.resolve(&["collections", collection_id, "items", item_id]),
        ),
        link("parent", MIME_JSON, collection.clone()),
        link("collection", MIME_JSON, collection),
        link("root", MIME_JSON, ctx.base_url.to_string()),
    ];
    merge_extra(links, extra)
}

/// `self`, `parent`, `items` and `root` links of a collection
pub fn collection_links(ctx: &RequestContext, collection_id: &str, extra: &[Value]) -> Vec<Value> {
    let links = vec![
        link(
            "self",
            MIME_JSON,
            ctx.resolve(&["collections", collection_id]),
        ),
        link("parent", MIME_JSON, ctx.base_url.to_string()),
        link(
            "items",
            MIME_GEOJSON,
            ctx.resolve(&["collections", collection_id, "items"]),
        ),
        link("root", MIME_JSON, ctx.base_url.to_string()),
    ];
    merge_extra(links, extra)
}

/// `queryables` link of a collection, advertised when filtering is enabled
pub fn queryables_link(ctx: &RequestContext, collection_id: &str) -> Value {
    json!({
        "rel": "queryables",
        "type": MIME_SCHEMA,
        "title": "Queryables",
        "href": ctx.resolve(&["collections", collection_id, "queryables"]),
    })
}

/// `root` and `self` links of a search response, after the paging links
pub fn search_links(ctx: &RequestContext, paging: Vec<Value>) -> Vec<Value> {
    let mut links = paging;
    links.push(link("root", MIME_JSON, ctx.base_url.to_string()));
    links.push(link("self", MIME_GEOJSON, ctx.url.to_string()));
    links
}

/// Links of a collection's item listing, after the paging links
pub fn item_collection_links(
    ctx: &RequestContext,
    collection_id: &str,
    paging: Vec<Value>,
) -> Vec<Value> {
    let collection = ctx.resolve(&["collections", collection_id]);
    let mut links = paging;
    links.push(link(
        "self",
        MIME_GEOJSON,
        ctx.resolve(&["collections", collection_id, "items"]),
    ));
    links.push(link("parent", MIME_JSON, collection.clone()));
    links.push(link("collection", MIME_JSON, collection));
    links.push(link("root", MIME_JSON, ctx.base_url.to_string()));
    links
}

/// Links of a collection listing, after the paging links
pub fn collections_links(ctx: &RequestContext, paging: Vec<Value>) -> Vec<Value> {
    let mut links = vec![
        link("root", MIME_JSON, ctx.base_url.to_string()),
        link("parent", MIME_JSON, ctx.base_url.to_string()),
        link("self", MIME_JSON, ctx.url.to_string()),
    ];
    links.extend(paging);
    links
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rel<'a>(links: &'a [Value], rel: &str) -> &'a Value {
        links
            .iter()
            .find(|l| l["rel"] == rel)
            .unwrap_or_else(|| panic!("missing {} link", rel))
    }

    #[test]
    fn test_get_paging_links_replace_token() {
        let ctx = RequestContext::get(
            "http://localhost:8080/api",
            "http://localhost:8080/api/search?limit=2&token=next:old",
        )
        .unwrap();

        let links = paging_links(&ctx, Some("c1:i2"), None);
        assert_eq!(links.len(), 1);

        let next = rel(&links, "next");
        assert_eq!(next["method"], "GET");
        assert_eq!(next["type"], MIME_GEOJSON);

        let href = Url::parse(next["href"].as_str().unwrap()).unwrap();
        let tokens: Vec<String> = href
            .query_pairs()
            .filter(|(k, _)| k == "token")
            .map(|(_, v)| v.into_owned())
            .collect();
        assert_eq!(tokens, vec!["next:c1:i2"]);
        assert!(href.query_pairs().any(|(k, v)| k == "limit" && v == "2"));
    }

    #[test]
    fn test_post_paging_links_echo_body() {
        let body = json!({"collections": ["c1"], "limit": 2});
        let ctx = RequestContext::post(
            "http://localhost/",
            "http://localhost/search",
            body,
        )
        .unwrap();

        let links = paging_links(&ctx, Some("a"), Some("b"));

        let next = rel(&links, "next");
        assert_eq!(next["method"], "POST");
        assert_eq!(next["href"], "http://localhost/search");
        assert_eq!(
            next["body"],
            json!({"collections": ["c1"], "limit": 2, "token": "next:a"})
        );
        assert_eq!(rel(&links, "prev")["body"]["token"], "prev:b");
    }

    #[test]
    fn test_item_links() {
        let ctx = RequestContext::get("http://localhost/api/", "http://localhost/api/search").unwrap();
        let extra = vec![
            json!({"rel": "license", "href": "https://example.com/license"}),
            json!({"rel": "self", "href": "stale"}),
        ];

        let links = item_links(&ctx, "c1", "i1", &extra);

        assert_eq!(
            rel(&links, "self")["href"],
            "http://localhost/api/collections/c1/items/i1"
        );
        assert_eq!(
            rel(&links, "collection")["href"],
            "http://localhost/api/collections/c1"
        );
        assert_eq!(rel(&links, "root")["href"], "http://localhost/api/");
        assert_eq!(rel(&links, "license")["href"], "https://example.com/license");
        assert_eq!(links.iter().filter(|l| l["rel"] == "self").count(), 1);
    }

    #[test]
    fn test_ids_are_path_encoded() {
        let ctx = RequestContext::get("http://localhost/", "http://localhost/").unwrap();
        let links = collection_links(&ctx, "my collection", &[]);
        assert_eq!(
            rel(&links, "items")["href"],
            "http://localhost/collections/my%20collection/items"
        );
    }

    #[test]
    fn test_collection_paging_links_get() {
        let ctx = RequestContext::get("http://localhost/", "http://localhost/collections?limit=1").unwrap();
        let engine_next = json!({"rel": "next", "href": "http://engine/collections?offset=1"});

        let links = collection_paging_links(&ctx, Some(&engine_next), None);

        let href = Url::parse(rel(&links, "next")["href"].as_str().unwrap()).unwrap();
        assert!(href.query_pairs().any(|(k, v)| k == "offset" && v == "1"));
        assert!(href.query_pairs().any(|(k, v)| k == "limit" && v == "1"));
    }

    #[test]
    fn test_queryables_link() {
        let ctx = RequestContext::get("http://localhost/api", "http://localhost/api/").unwrap();
        let link = queryables_link(&ctx, "c1");

        assert_eq!(link["rel"], "queryables");
        assert_eq!(link["type"], MIME_SCHEMA);
        assert_eq!(link["href"], "http://localhost/api/collections/c1/queryables");
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(RequestContext::get("not a url", "http://localhost/").is_err());
    }
}
