//! Convenience re-exports for common stac-store usage

// Errors
pub use crate::errors::{ErrorKind, StacError};

// Search arguments
pub use crate::query_builder::{
    CanonicalSearchArgs, CollectionSearchParams, FieldProjection, FilterLang,
    ItemCollectionParams, Limits, SearchArgsBuilder, SearchParams, SearchRequest, SortDirection,
    SortSpec,
};

// Engine calls and their results
pub use crate::functions::{dbfunc, dbfunc_execute, dbfunc_with, FunctionArg};
pub use crate::result::{RawCollectionsResult, RawSearchResult};

// Links
pub use crate::links::{RequestContext, RequestMethod};

// Validation
pub use crate::validation::{validate_id, ENGINE_FUNCTIONS};

pub use serde_json::{json, Value};
