//! Read path
//!
//! [`CoreClient`] runs searches and lookups through the reader pool and
//! shapes engine output into response documents: hydration, field
//! projection and links.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::core::{Intent, PgStac};
use crate::debug_log;
use cache_system::{
    hydrate, without_nulls, BaseItemCache, BaseItemFetcher, DefaultBaseItemCache,
};
use config::ApiSettings;
use stac_store::functions;
use stac_store::links::{self, RequestContext};
use stac_store::{
    filter_fields, CanonicalSearchArgs, CollectionSearchParams, ItemCollectionParams, Limits,
    PageDirection, RawSearchResult, SearchArgsBuilder, SearchParams, SearchRequest, StacError,
};

/// Fetches base items through the reader pool, one connection per fetch
struct ReaderBaseItems {
    db: Arc<PgStac>,
}

#[async_trait]
impl BaseItemFetcher for ReaderBaseItems {
    type Error = StacError;

    async fn fetch_base_item(&self, collection_id: &str) -> Result<Option<Value>, StacError> {
        let mut conn = self.db.acquire(Intent::Read).await?;
        functions::collection_base_item(&mut conn, collection_id).await
    }
}

/// Search and lookup operations
#[derive(Debug, Clone)]
pub struct CoreClient {
    db: Arc<PgStac>,
    settings: ApiSettings,
}

impl CoreClient {
    pub fn new(db: Arc<PgStac>, settings: ApiSettings) -> Self {
        Self { db, settings }
    }

    pub fn settings(&self) -> &ApiSettings {
        &self.settings
    }

    fn limits(&self) -> Limits {
        Limits {
            default_limit: self.settings.default_limit,
            max_limit: self.settings.max_limit,
        }
    }

    /// `GET /search`
    pub async fn get_search(
        &self,
        ctx: &RequestContext,
        params: SearchParams,
    ) -> Result<Value, StacError> {
        let args = CanonicalSearchArgs::from_get(params, &self.limits())?;
        self.search_base(ctx, args, None).await
    }

    /// `POST /search`
    pub async fn post_search(
        &self,
        ctx: &RequestContext,
        request: SearchRequest,
    ) -> Result<Value, StacError> {
        let args = CanonicalSearchArgs::from_post(request, &self.limits())?;
        self.search_base(ctx, args, None).await
    }

    /// `GET /collections/{collection_id}/items`
    pub async fn item_collection(
        &self,
        ctx: &RequestContext,
        collection_id: &str,
        params: ItemCollectionParams,
    ) -> Result<Value, StacError> {
        // NotFound for an unknown collection instead of an empty page
        self.get_collection(ctx, collection_id).await?;

        let mut args = CanonicalSearchArgs::from_get(params, &self.limits())?;
        args.collections = vec![collection_id.to_string()];
        self.search_base(ctx, args, Some(collection_id)).await
    }

    /// `GET /collections/{collection_id}/items/{item_id}`
    pub async fn get_item(
        &self,
        ctx: &RequestContext,
        collection_id: &str,
        item_id: &str,
    ) -> Result<Value, StacError> {
        // An unknown collection is reported before the item
        self.get_collection(ctx, collection_id).await?;

        let args = SearchArgsBuilder::new()
            .ids(vec![item_id.to_string()])
            .collections(vec![collection_id.to_string()])
            .limit(Some(1))
            .build(&self.limits())?;

        let mut collection = self.search_base(ctx, args, Some(collection_id)).await?;

        match collection
            .get_mut("features")
            .and_then(Value::as_array_mut)
            .and_then(|features| features.pop())
        {
            Some(item) => Ok(item),
            None => Err(StacError::NotFound(format!(
                "Item {} in Collection {} does not exist.",
                item_id, collection_id
            ))),
        }
    }

    /// `GET /collections/{collection_id}`
    pub async fn get_collection(
        &self,
        ctx: &RequestContext,
        collection_id: &str,
    ) -> Result<Value, StacError> {
        let collection = {
            let mut conn = self.db.acquire(Intent::Read).await?;
            functions::get_collection(&mut conn, collection_id).await?
        };

        match collection {
            Some(collection) => Ok(with_collection_links(
                ctx,
                collection,
                self.settings.enable_filter,
            )),
            None => Err(StacError::NotFound(format!(
                "Collection {} does not exist.",
                collection_id
            ))),
        }
    }

    /// `GET /collections`, through collection search when enabled
    pub async fn all_collections(
        &self,
        ctx: &RequestContext,
        params: CollectionSearchParams,
    ) -> Result<Value, StacError> {
        let raw = if self.settings.enable_collection_search {
            let args = CanonicalSearchArgs::from_collection_search(params, &self.limits())?;
            let mut conn = self.db.acquire(Intent::Read).await?;
            functions::collection_search(&mut conn, &args).await?
        } else {
            let mut conn = self.db.acquire(Intent::Read).await?;
            functions::all_collections(&mut conn).await?
        };

        let paging = links::collection_paging_links(
            ctx,
            raw.link(PageDirection::Next),
            raw.link(PageDirection::Prev),
        );

        let count = raw.collections.len() as u64;
        let collections: Vec<Value> = raw
            .collections
            .into_iter()
            .map(|collection| with_collection_links(ctx, collection, self.settings.enable_filter))
            .collect();

        let mut response = Map::new();
        response.insert("collections".to_string(), Value::Array(collections));
        response.insert(
            "links".to_string(),
            Value::Array(links::collections_links(ctx, paging)),
        );
        response.insert(
            "numberMatched".to_string(),
            Value::from(raw.number_matched.unwrap_or(count)),
        );
        response.insert(
            "numberReturned".to_string(),
            Value::from(raw.number_returned.unwrap_or(count)),
        );
        Ok(Value::Object(response))
    }

    /// Run a search and shape the result into a FeatureCollection.
    ///
    /// `collection_id` is set for a collection's item listing and selects
    /// its link set.
    async fn search_base(
        &self,
        ctx: &RequestContext,
        args: CanonicalSearchArgs,
        collection_id: Option<&str>,
    ) -> Result<Value, StacError> {
        let args = args.with_nohydrate(self.settings.use_api_hydrate);

        // The search connection is released before hydration acquires its own
        let raw = {
            let mut conn = self.db.acquire(Intent::Read).await?;
            functions::search(&mut conn, &args).await?
        };
        debug_log!(
            "search returned {} features, next={:?} prev={:?}",
            raw.features.len(),
            raw.next,
            raw.prev
        );

        let cache = DefaultBaseItemCache::new(ReaderBaseItems {
            db: Arc::clone(&self.db),
        });
        feature_collection(ctx, &self.settings, &args, raw, collection_id, &cache).await
    }
}

/// Shape one page of engine output into a FeatureCollection.
///
/// With API-side hydration every item is merged onto its collection's
/// base item from `cache`, then projected. Items always get their links
/// unless `links` was excluded.
async fn feature_collection<C>(
    ctx: &RequestContext,
    settings: &ApiSettings,
    args: &CanonicalSearchArgs,
    raw: RawSearchResult,
    collection_id: Option<&str>,
    cache: &C,
) -> Result<Value, StacError>
where
    C: BaseItemCache<Error = StacError>,
{
    let with_links = !args.fields.excludes("links");
    let mut features = Vec::with_capacity(raw.features.len());

    if settings.use_api_hydrate {
        for feature in raw.features {
            let feature = hydrate_feature(cache, feature, settings.exclude_hydrate_markers).await?;
            let feature = filter_fields(feature, &args.fields.include, &args.fields.exclude);
            features.push(finish_item(ctx, feature, with_links));
        }
    } else {
        features.extend(
            raw.features
                .into_iter()
                .map(|feature| finish_item(ctx, feature, with_links)),
        );
    }

    let paging = links::paging_links(ctx, raw.next.as_deref(), raw.prev.as_deref());
    let response_links = match collection_id {
        Some(collection_id) => links::item_collection_links(ctx, collection_id, paging),
        None => links::search_links(ctx, paging),
    };

    let returned = features.len() as u64;
    let mut response = raw.extra;
    response.insert(
        "type".to_string(),
        Value::String("FeatureCollection".to_string()),
    );
    response.insert("features".to_string(), Value::Array(features));
    response.insert("links".to_string(), Value::Array(response_links));
    if let Some(matched) = raw.number_matched {
        response.insert("numberMatched".to_string(), Value::from(matched));
    }
    response.insert(
        "numberReturned".to_string(),
        Value::from(raw.number_returned.unwrap_or(returned)),
    );

    Ok(Value::Object(response))
}

async fn hydrate_feature<C>(
    cache: &C,
    feature: Value,
    exclude_markers: bool,
) -> Result<Value, StacError>
where
    C: BaseItemCache<Error = StacError>,
{
    let collection_id = match feature.get("collection").and_then(Value::as_str) {
        Some(collection_id) => collection_id.to_string(),
        None => return Ok(feature),
    };

    let base_item = cache.get(&collection_id).await?;
    Ok(hydrate(&without_nulls(&base_item), feature, exclude_markers))
}

/// Rebuild an item's links unless they were projected away
fn finish_item(ctx: &RequestContext, mut item: Value, with_links: bool) -> Value {
    if !with_links {
        return item;
    }

    let ids = match (
        item.get("collection").and_then(Value::as_str),
        item.get("id").and_then(Value::as_str),
    ) {
        (Some(collection_id), Some(item_id)) => (collection_id.to_string(), item_id.to_string()),
        _ => return item,
    };

    let extra = match item.get("links") {
        Some(Value::Array(existing)) => existing.clone(),
        _ => Vec::new(),
    };

    if let Value::Object(map) = &mut item {
        map.insert(
            "links".to_string(),
            Value::Array(links::item_links(ctx, &ids.0, &ids.1, &extra)),
        );
    }
    item
}

fn with_collection_links(ctx: &RequestContext, mut collection: Value, queryables: bool) -> Value {
    let Some(collection_id) = collection
        .get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
    else {
        return collection;
    };

    let extra = match collection.get("links") {
        Some(Value::Array(existing)) => existing.clone(),
        _ => Vec::new(),
    };

    let mut collection_links = links::collection_links(ctx, &collection_id, &extra);
    if queryables {
        collection_links.push(links::queryables_link(ctx, &collection_id));
    }

    if let Value::Object(map) = &mut collection {
        map.insert("links".to_string(), Value::Array(collection_links));
    }
    collection
}

#[cfg(test)]
mod tests {
    use super::*;
    use cache_system::CacheError;
    use serde_json::json;
    use stac_store::FieldProjection;
    use url::Url;

    struct StaticBaseItems;

    #[async_trait]
    impl BaseItemFetcher for StaticBaseItems {
        type Error = StacError;

        async fn fetch_base_item(&self, collection_id: &str) -> Result<Option<Value>, StacError> {
            Ok(match collection_id {
                "c1" => Some(json!({
                    "properties": {"license": "CC-BY"},
                    "assets": {"thumbnail": {"type": "image/png"}},
                    "stac_extensions": null
                })),
                _ => None,
            })
        }
    }

    fn ctx() -> RequestContext {
        RequestContext::get("http://localhost/", "http://localhost/search").unwrap()
    }

    fn hydrating() -> ApiSettings {
        ApiSettings {
            use_api_hydrate: true,
            ..ApiSettings::default()
        }
    }

    fn page(features: Value) -> RawSearchResult {
        RawSearchResult::from_value(json!({
            "type": "FeatureCollection",
            "features": features,
            "next": "c1:i2",
            "prev": "c1:i1",
            "numberMatched": 5,
            "context": {"limit": 2}
        }))
        .unwrap()
    }

    fn link<'a>(response: &'a Value, rel: &str) -> &'a Value {
        response["links"]
            .as_array()
            .and_then(|links| links.iter().find(|l| l["rel"] == rel))
            .unwrap_or_else(|| panic!("missing {} link", rel))
    }

    fn token(link: &Value) -> String {
        let href = Url::parse(link["href"].as_str().unwrap()).unwrap();
        href.query_pairs()
            .find(|(k, _)| k == "token")
            .map(|(_, v)| v.into_owned())
            .unwrap()
    }

    #[test]
    fn test_item_links_added() {
        let item = finish_item(&ctx(), json!({"id": "i1", "collection": "c1"}), true);
        let links = item["links"].as_array().unwrap();

        assert!(links.iter().any(|l| {
            l["rel"] == "self" && l["href"] == "http://localhost/collections/c1/items/i1"
        }));
    }

    #[test]
    fn test_item_links_skipped_when_excluded() {
        let item = finish_item(&ctx(), json!({"id": "i1", "collection": "c1"}), false);
        assert!(item.get("links").is_none());
    }

    #[test]
    fn test_collection_links() {
        let collection = with_collection_links(&ctx(), json!({"id": "c1", "links": []}), false);
        let links = collection["links"].as_array().unwrap();
        assert!(links.iter().any(|l| {
            l["rel"] == "items" && l["href"] == "http://localhost/collections/c1/items"
        }));
        assert!(!links.iter().any(|l| l["rel"] == "queryables"));
    }

    #[test]
    fn test_collection_queryables_link() {
        let collection = with_collection_links(&ctx(), json!({"id": "c1"}), true);
        assert_eq!(
            link(&collection, "queryables")["href"],
            "http://localhost/collections/c1/queryables"
        );
    }

    #[tokio::test]
    async fn test_sparse_item_is_hydrated_from_base_item() {
        let cache = DefaultBaseItemCache::new(StaticBaseItems);
        let sparse = json!({"id": "i1", "collection": "c1", "properties": {}});

        let item = hydrate_feature(&cache, sparse, true).await.unwrap();

        assert_eq!(item["properties"]["license"], "CC-BY");
        assert!(item.get("stac_extensions").is_none());
        assert_eq!(item["assets"]["thumbnail"]["type"], "image/png");
    }

    #[tokio::test]
    async fn test_unknown_collection_base_item() {
        let cache = DefaultBaseItemCache::new(StaticBaseItems);
        let error = cache.get("missing").await.unwrap_err();
        assert_eq!(
            error,
            StacError::from(CacheError::BaseItemNotFound("missing".to_string()))
        );
    }

    // ========================================
    // Response shaping
    // ========================================

    #[tokio::test]
    async fn test_tokens_become_paging_links() {
        let cache = DefaultBaseItemCache::new(StaticBaseItems);
        let ctx = RequestContext::get(
            "http://localhost/",
            "http://localhost/search?limit=2&token=next:old",
        )
        .unwrap();
        let features = json!([{"id": "i1", "collection": "c1", "properties": {}}]);

        let response = feature_collection(
            &ctx,
            &ApiSettings::default(),
            &CanonicalSearchArgs::default(),
            page(features),
            None,
            &cache,
        )
        .await
        .unwrap();

        assert_eq!(response["type"], "FeatureCollection");
        assert_eq!(token(link(&response, "next")), "next:c1:i2");
        assert_eq!(token(link(&response, "prev")), "prev:c1:i1");
        assert_eq!(link(&response, "self")["href"], ctx.url().to_string());
        assert_eq!(response["numberMatched"], 5);
        assert_eq!(response["numberReturned"], 1);
        assert_eq!(response["context"], json!({"limit": 2}));
    }

    #[tokio::test]
    async fn test_item_listing_links() {
        let cache = DefaultBaseItemCache::new(StaticBaseItems);

        let response = feature_collection(
            &ctx(),
            &ApiSettings::default(),
            &CanonicalSearchArgs::default(),
            page(json!([])),
            Some("c1"),
            &cache,
        )
        .await
        .unwrap();

        assert_eq!(
            link(&response, "collection")["href"],
            "http://localhost/collections/c1"
        );
        assert_eq!(response["numberReturned"], 0);
    }

    #[tokio::test]
    async fn test_engine_hydrated_items_skip_cache() {
        let cache = DefaultBaseItemCache::new(StaticBaseItems);
        let features = json!([{"id": "i1", "collection": "c1", "properties": {"license": "MIT"}}]);

        let response = feature_collection(
            &ctx(),
            &ApiSettings::default(),
            &CanonicalSearchArgs::default(),
            page(features),
            None,
            &cache,
        )
        .await
        .unwrap();

        let item = &response["features"][0];
        assert_eq!(item["properties"]["license"], "MIT");
        assert!(item.get("assets").is_none());
        assert!(item["links"].is_array());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_projection_runs_after_hydration() {
        let cache = DefaultBaseItemCache::new(StaticBaseItems);
        let args = SearchArgsBuilder::new()
            .fields(FieldProjection::from_tokens(&[
                "id",
                "collection",
                "properties.license",
                "-links",
            ]))
            .build(&Limits::default())
            .unwrap();
        let features = json!([
            {"id": "i1", "collection": "c1", "properties": {"datetime": "2020-01-01T00:00:00Z"}},
            {"id": "i2", "collection": "c1", "properties": {}}
        ]);

        let response = feature_collection(
            &ctx(),
            &hydrating(),
            &args,
            page(features),
            None,
            &cache,
        )
        .await
        .unwrap();

        for item in response["features"].as_array().unwrap() {
            assert_eq!(item["properties"], json!({"license": "CC-BY"}));
            assert!(item.get("assets").is_none());
            assert!(item.get("links").is_none());
        }
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_missing_base_item_fails_the_page() {
        let cache = DefaultBaseItemCache::new(StaticBaseItems);
        let features = json!([{"id": "i1", "collection": "gone", "properties": {}}]);

        let error = feature_collection(
            &ctx(),
            &hydrating(),
            &CanonicalSearchArgs::default(),
            page(features),
            None,
            &cache,
        )
        .await
        .unwrap_err();

        assert_eq!(
            error,
            StacError::from(CacheError::BaseItemNotFound("gone".to_string()))
        );
    }
}
