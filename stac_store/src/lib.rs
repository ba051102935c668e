//! STAC Store - engine-facing layer of pgstac-access
//!
//! This crate owns everything between an inbound search request and the
//! engine's JSON functions: argument normalization, engine calls, error
//! translation, field projection and link building.

/// Conditional debug logging macros
/// These macros only compile in code when the `debug-logging` feature is enabled
#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        tracing::trace!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {};
}

pub mod errors;
pub mod functions;
pub mod links;
pub mod prelude;
pub mod projection;
pub mod query_builder;
pub mod result;
pub mod validation;

pub use errors::{translate_errors, translate_sqlstate, ErrorKind, StacError};
pub use functions::{dbfunc, dbfunc_execute, dbfunc_with, FunctionArg};
pub use links::{RequestContext, RequestMethod};
pub use projection::filter_fields;
pub use query_builder::{
    CanonicalSearchArgs, CollectionSearchParams, FieldProjection, FilterLang,
    ItemCollectionParams, Limits, PageDirection, SearchArgsBuilder, SearchParams, SearchRequest,
    SortDirection, SortSpec,
};
pub use result::{RawCollectionsResult, RawSearchResult};
pub use validation::{engine_function, validate_id, ENGINE_FUNCTIONS};
