//! Write path
//!
//! [`TransactionsClient`] validates items and collections and hands them to
//! the engine's write functions through the writer pool.

use serde_json::{Map, Value};
use std::sync::Arc;

use crate::core::{Intent, PgStac, PooledConnection};
use config::ApiSettings;
use stac_store::links::{self, RequestContext};
use stac_store::{dbfunc_execute, validate_id, FunctionArg, StacError};

/// How a batch of items is written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkMethod {
    /// Fail on existing ids
    Insert,
    /// Replace existing items
    Upsert,
}

impl BulkMethod {
    fn function(&self) -> &'static str {
        match self {
            BulkMethod::Insert => "create_items",
            BulkMethod::Upsert => "upsert_items",
        }
    }
}

/// Item and collection mutations
#[derive(Debug, Clone)]
pub struct TransactionsClient {
    db: Arc<PgStac>,
    settings: ApiSettings,
}

impl TransactionsClient {
    pub fn new(db: Arc<PgStac>, settings: ApiSettings) -> Self {
        Self { db, settings }
    }

    async fn writer(&self) -> Result<PooledConnection, StacError> {
        if self.settings.read_only {
            return Err(StacError::DatabaseError(
                "no write pool configured".to_string(),
            ));
        }
        self.db.acquire(Intent::Write).await
    }

    fn invalid_chars(&self) -> &[char] {
        &self.settings.invalid_id_chars
    }

    /// Check ids and bind the item to `collection_id`
    fn prepare_item(&self, collection_id: &str, item: Value) -> Result<Value, StacError> {
        let mut item = into_object(item, "Item")?;

        let item_id = item
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| StacError::InvalidQueryParameter("Item must have an id".to_string()))?;
        validate_id("Item", item_id, self.invalid_chars())?;
        validate_id("Collection", collection_id, self.invalid_chars())?;

        match item.get("collection").and_then(Value::as_str) {
            Some(body_collection_id) if body_collection_id != collection_id => {
                return Err(StacError::InvalidQueryParameter(format!(
                    "Collection ID from path parameter ({}) does not match Collection ID from Item ({})",
                    collection_id, body_collection_id
                )));
            }
            Some(_) => {}
            None => {
                item.insert(
                    "collection".to_string(),
                    Value::String(collection_id.to_string()),
                );
            }
        }

        Ok(Value::Object(item))
    }

    fn prepare_collection(&self, collection: Value) -> Result<(String, Value), StacError> {
        let collection = into_object(collection, "Collection")?;
        let collection_id = collection
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                StacError::InvalidQueryParameter("Collection must have an id".to_string())
            })?
            .to_string();
        validate_id("Collection", &collection_id, self.invalid_chars())?;
        Ok((collection_id, Value::Object(collection)))
    }

    /// Insert one item, or every feature of a FeatureCollection
    pub async fn create_item(
        &self,
        ctx: &RequestContext,
        collection_id: &str,
        item: Value,
    ) -> Result<Value, StacError> {
        if item.get("type").and_then(Value::as_str) == Some("FeatureCollection") {
            return self.create_item_collection(collection_id, item).await;
        }

        let item = self.prepare_item(collection_id, item)?;
        let mut conn = self.writer().await?;
        dbfunc_execute(&mut conn, "create_item", vec![FunctionArg::Json(item.clone())]).await?;
        tracing::info!(collection_id, "created item");

        Ok(with_item_links(ctx, collection_id, item))
    }

    /// Replace an existing item
    pub async fn update_item(
        &self,
        ctx: &RequestContext,
        collection_id: &str,
        item_id: &str,
        item: Value,
    ) -> Result<Value, StacError> {
        if let Some(body_item_id) = item.get("id").and_then(Value::as_str) {
            if body_item_id != item_id {
                return Err(StacError::InvalidQueryParameter(format!(
                    "Item ID from path parameter ({}) does not match Item ID from Item ({})",
                    item_id, body_item_id
                )));
            }
        }

        let item = self.prepare_item(collection_id, item)?;
        let mut conn = self.writer().await?;
        dbfunc_execute(&mut conn, "update_item", vec![FunctionArg::Json(item.clone())]).await?;
        tracing::info!(collection_id, item_id, "updated item");

        Ok(with_item_links(ctx, collection_id, item))
    }

    pub async fn delete_item(&self, collection_id: &str, item_id: &str) -> Result<(), StacError> {
        let mut conn = self.writer().await?;
        dbfunc_execute(
            &mut conn,
            "delete_item",
            vec![FunctionArg::from(item_id), FunctionArg::from(collection_id)],
        )
        .await?;
        tracing::info!(collection_id, item_id, "deleted item");
        Ok(())
    }

    pub async fn create_collection(
        &self,
        ctx: &RequestContext,
        collection: Value,
    ) -> Result<Value, StacError> {
        let (collection_id, collection) = self.prepare_collection(collection)?;
        let mut conn = self.writer().await?;
        dbfunc_execute(
            &mut conn,
            "create_collection",
            vec![FunctionArg::Json(collection.clone())],
        )
        .await?;
        tracing::info!(%collection_id, "created collection");

        Ok(with_collection_links(ctx, &collection_id, collection))
    }

    pub async fn update_collection(
        &self,
        ctx: &RequestContext,
        collection: Value,
    ) -> Result<Value, StacError> {
        let (collection_id, collection) = self.prepare_collection(collection)?;
        let mut conn = self.writer().await?;
        dbfunc_execute(
            &mut conn,
            "update_collection",
            vec![FunctionArg::Json(collection.clone())],
        )
        .await?;
        tracing::info!(%collection_id, "updated collection");

        Ok(with_collection_links(ctx, &collection_id, collection))
    }

    pub async fn delete_collection(&self, collection_id: &str) -> Result<(), StacError> {
        let mut conn = self.writer().await?;
        dbfunc_execute(
            &mut conn,
            "delete_collection",
            vec![FunctionArg::from(collection_id)],
        )
        .await?;
        tracing::info!(collection_id, "deleted collection");
        Ok(())
    }

    /// Write a batch of items into one collection; returns the count
    pub async fn bulk_items(
        &self,
        collection_id: &str,
        items: Vec<Value>,
        method: BulkMethod,
    ) -> Result<usize, StacError> {
        let items = items
            .into_iter()
            .map(|item| self.prepare_item(collection_id, item))
            .collect::<Result<Vec<_>, _>>()?;
        let count = items.len();

        let mut conn = self.writer().await?;
        dbfunc_execute(
            &mut conn,
            method.function(),
            vec![FunctionArg::Json(Value::Array(items))],
        )
        .await?;
        tracing::info!(collection_id, count, ?method, "wrote items");
        Ok(count)
    }

    /// Insert the features of a FeatureCollection
    pub async fn create_item_collection(
        &self,
        collection_id: &str,
        feature_collection: Value,
    ) -> Result<Value, StacError> {
        let features = match feature_collection.get("features") {
            Some(Value::Array(features)) => features.clone(),
            _ => {
                return Err(StacError::InvalidQueryParameter(
                    "FeatureCollection must have a features array".to_string(),
                ))
            }
        };

        let features = features
            .into_iter()
            .map(|item| self.prepare_item(collection_id, item))
            .collect::<Result<Vec<_>, _>>()?;

        let mut conn = self.writer().await?;
        dbfunc_execute(
            &mut conn,
            BulkMethod::Insert.function(),
            vec![FunctionArg::Json(Value::Array(features.clone()))],
        )
        .await?;
        tracing::info!(collection_id, count = features.len(), "created items");

        Ok(serde_json::json!({
            "type": "FeatureCollection",
            "features": features,
        }))
    }
}

fn into_object(value: Value, kind: &str) -> Result<Map<String, Value>, StacError> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(StacError::InvalidQueryParameter(format!(
            "{} must be a JSON object",
            kind
        ))),
    }
}

fn with_item_links(ctx: &RequestContext, collection_id: &str, mut item: Value) -> Value {
    let item_id = item
        .get("id")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let extra = match item.get("links") {
        Some(Value::Array(existing)) => existing.clone(),
        _ => Vec::new(),
    };
    if let Value::Object(map) = &mut item {
        map.insert(
            "links".to_string(),
            Value::Array(links::item_links(ctx, collection_id, &item_id, &extra)),
        );
    }
    item
}

fn with_collection_links(ctx: &RequestContext, collection_id: &str, mut collection: Value) -> Value {
    let extra = match collection.get("links") {
        Some(Value::Array(existing)) => existing.clone(),
        _ => Vec::new(),
    };
    if let Value::Object(map) = &mut collection {
        map.insert(
            "links".to_string(),
            Value::Array(links::collection_links(ctx, collection_id, &extra)),
        );
    }
    collection
}
