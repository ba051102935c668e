//! Base item cache and hydration
//!
//! This crate provides the per-request cache of collection base items
//! and the merge that rebuilds full items from sparse ones.

pub mod cache;
pub mod errors;
pub mod hydrate;
pub mod prelude;

pub use cache::{BaseItemCache, BaseItemFetcher, DefaultBaseItemCache};
pub use errors::CacheError;
pub use hydrate::{DO_NOT_MERGE_MARKER, hydrate, strip_markers, without_nulls};
