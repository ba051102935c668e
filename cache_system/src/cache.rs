//! Per-request base item cache
//!
//! A base item is fetched at most once per collection for the lifetime of a
//! cache. Caches are created per request and never shared between requests.

use crate::errors::CacheError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt::Debug;
use tokio::sync::RwLock;

/// Source of base items, usually a reader-pool call to the engine
#[async_trait]
pub trait BaseItemFetcher: Send + Sync {
    type Error: From<CacheError> + Send;

    /// `Ok(None)` when the collection has no base item
    async fn fetch_base_item(&self, collection_id: &str) -> Result<Option<Value>, Self::Error>;
}

#[async_trait]
pub trait BaseItemCache: Send + Sync {
    type Error;

    /// Base item of a collection, fetched on first use
    async fn get(&self, collection_id: &str) -> Result<Value, Self::Error>;
}

/// In-memory cache over a [`BaseItemFetcher`]
pub struct DefaultBaseItemCache<F: BaseItemFetcher> {
    fetcher: F,
    base_items: RwLock<HashMap<String, Value>>,
}

impl<F: BaseItemFetcher> Debug for DefaultBaseItemCache<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cached = match self.base_items.try_read() {
            Ok(items) => items.len().to_string(),
            Err(_) => "locked".to_string(),
        };

        f.debug_struct("DefaultBaseItemCache")
            .field("cached", &cached)
            .finish()
    }
}

impl<F: BaseItemFetcher> DefaultBaseItemCache<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            base_items: RwLock::new(HashMap::new()),
        }
    }

    /// Number of collections fetched so far
    pub async fn len(&self) -> usize {
        self.base_items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.base_items.read().await.is_empty()
    }
}

#[async_trait]
impl<F: BaseItemFetcher> BaseItemCache for DefaultBaseItemCache<F> {
    type Error = F::Error;

    async fn get(&self, collection_id: &str) -> Result<Value, F::Error> {
        if let Some(base_item) = self.base_items.read().await.get(collection_id) {
            return Ok(base_item.clone());
        }

        tracing::debug!(collection_id, "fetching base item");
        let base_item = self
            .fetcher
            .fetch_base_item(collection_id)
            .await?
            .ok_or_else(|| CacheError::BaseItemNotFound(collection_id.to_string()))?;

        if !base_item.is_object() {
            return Err(CacheError::InvalidBaseItem(collection_id.to_string()).into());
        }

        self.base_items
            .write()
            .await
            .insert(collection_id.to_string(), base_item.clone());

        Ok(base_item)
    }
}
