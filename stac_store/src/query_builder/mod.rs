//! Search argument normalization
//!
//! This module turns inbound GET parameters and POST bodies into the
//! canonical argument structure consumed by the engine.

pub mod builder;
pub mod fields;
pub mod filter;
pub mod ordering;
pub mod pagination;
pub mod params;


pub use builder::{CanonicalSearchArgs, SearchArgsBuilder, SearchConf};
pub use fields::FieldProjection;
pub use filter::{normalize_filter, FilterLang};
pub use ordering::{parse_sortby, SortDirection, SortSpec};
pub use pagination::{token_from_href, Limits, PageDirection};
pub use params::{CollectionSearchParams, FreeText, SearchParams, SearchRequest};

/// Item collection GET parameters share the search shape
pub type ItemCollectionParams = SearchParams;
