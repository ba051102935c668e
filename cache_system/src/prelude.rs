//! Convenience re-exports for common cache-system usage

// Cache components
pub use crate::cache::{BaseItemCache, BaseItemFetcher, DefaultBaseItemCache};
pub use crate::errors::CacheError;

// Hydration
pub use crate::hydrate::{DO_NOT_MERGE_MARKER, hydrate, strip_markers, without_nulls};

// Common external dependencies
pub use async_trait::async_trait;
pub use serde_json;
