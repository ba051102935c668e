//! Engine function calls
//!
//! Every engine call has the shape `SELECT * FROM <function>(<args>)` where
//! each argument is text or JSON. Function names must be on the engine
//! allowlist before they are spliced into the statement; arguments are
//! always bound.

use crate::errors::{translate_errors, StacError};
use crate::query_builder::CanonicalSearchArgs;
use crate::result::{RawCollectionsResult, RawSearchResult};
use crate::validation::engine_function;
use crate::{debug_log, trace_log};
use serde_json::Value;
use sqlx::PgConnection;

/// Single argument of an engine function
#[derive(Debug, Clone, PartialEq)]
pub enum FunctionArg {
    /// Bound as `text`
    Text(String),
    /// Serialized and bound as `text::jsonb`
    Json(Value),
}

impl FunctionArg {
    fn placeholder(&self, position: usize) -> String {
        match self {
            FunctionArg::Text(_) => format!("${}::text", position),
            FunctionArg::Json(_) => format!("${}::text::jsonb", position),
        }
    }

    fn into_bind(self) -> Result<String, StacError> {
        match self {
            FunctionArg::Text(text) => Ok(text),
            FunctionArg::Json(value) => Ok(serde_json::to_string(&value)?),
        }
    }
}

impl From<&str> for FunctionArg {
    fn from(text: &str) -> Self {
        FunctionArg::Text(text.to_string())
    }
}

impl From<String> for FunctionArg {
    fn from(text: String) -> Self {
        FunctionArg::Text(text)
    }
}

impl From<Value> for FunctionArg {
    fn from(value: Value) -> Self {
        FunctionArg::Json(value)
    }
}

fn call_sql(function: &str, args: &[FunctionArg]) -> String {
    let placeholders: Vec<String> = args
        .iter()
        .enumerate()
        .map(|(i, arg)| arg.placeholder(i + 1))
        .collect();

    let mut sql = String::with_capacity(32 + function.len());
    sql.push_str("SELECT * FROM ");
    sql.push_str(function);
    sql.push('(');
    sql.push_str(&placeholders.join(", "));
    sql.push(')');
    sql
}

async fn fetch_value(
    conn: &mut PgConnection,
    name: &str,
    args: Vec<FunctionArg>,
) -> Result<Option<Value>, StacError> {
    let sql = call_sql(engine_function(name)?, &args);
    trace_log!("engine call: {}", sql);

    let mut query = sqlx::query_scalar::<_, Option<Value>>(&sql);
    for arg in args {
        query = query.bind(arg.into_bind()?);
    }

    let row = translate_errors(query.fetch_optional(&mut *conn)).await?;
    Ok(row.flatten())
}

/// Call an engine function and return the first column of its first row
pub async fn dbfunc(
    conn: &mut PgConnection,
    name: &str,
    arg: impl Into<FunctionArg>,
) -> Result<Option<Value>, StacError> {
    fetch_value(conn, name, vec![arg.into()]).await
}

/// [`dbfunc`] for functions taking several arguments
pub async fn dbfunc_with(
    conn: &mut PgConnection,
    name: &str,
    args: Vec<FunctionArg>,
) -> Result<Option<Value>, StacError> {
    fetch_value(conn, name, args).await
}

/// Call an engine function for its side effect only
pub async fn dbfunc_execute(
    conn: &mut PgConnection,
    name: &str,
    args: Vec<FunctionArg>,
) -> Result<(), StacError> {
    let sql = call_sql(engine_function(name)?, &args);
    trace_log!("engine call: {}", sql);

    let mut query = sqlx::query(&sql);
    for arg in args {
        query = query.bind(arg.into_bind()?);
    }

    translate_errors(query.execute(&mut *conn)).await?;
    Ok(())
}

/// Run `search(jsonb)` with canonical arguments
pub async fn search(
    conn: &mut PgConnection,
    args: &CanonicalSearchArgs,
) -> Result<RawSearchResult, StacError> {
    let payload = args.to_json()?;
    debug_log!("search: {}", payload);

    let value = dbfunc(conn, "search", payload)
        .await
        .map_err(|error| search_error(args, error))?;

    RawSearchResult::from_value(value.unwrap_or(Value::Null))
}

/// Engine rejections of a request that carried a datetime blame the datetime
fn search_error(args: &CanonicalSearchArgs, error: StacError) -> StacError {
    match (error, &args.datetime) {
        (StacError::InvalidQueryParameter(_), Some(datetime)) => StacError::InvalidQueryParameter(
            format!("Datetime parameter {} is invalid.", datetime),
        ),
        (error, _) => error,
    }
}

/// Stored collection document, `None` when it does not exist
pub async fn get_collection(
    conn: &mut PgConnection,
    collection_id: &str,
) -> Result<Option<Value>, StacError> {
    let value = dbfunc(conn, "get_collection", collection_id).await?;
    Ok(value.filter(|v| !v.is_null()))
}

/// Base item of a collection, `None` when the collection does not exist
pub async fn collection_base_item(
    conn: &mut PgConnection,
    collection_id: &str,
) -> Result<Option<Value>, StacError> {
    let value = dbfunc(conn, "collection_base_item", collection_id).await?;
    Ok(value.filter(|v| !v.is_null()))
}

/// Every collection, unpaged
pub async fn all_collections(conn: &mut PgConnection) -> Result<RawCollectionsResult, StacError> {
    let value = fetch_value(conn, "all_collections", Vec::new()).await?;
    RawCollectionsResult::from_value(value.unwrap_or(Value::Null))
}

/// Run `collection_search(jsonb)`
pub async fn collection_search(
    conn: &mut PgConnection,
    args: &CanonicalSearchArgs,
) -> Result<RawCollectionsResult, StacError> {
    let payload = args.to_json()?;
    debug_log!("collection_search: {}", payload);

    let value = dbfunc(conn, "collection_search", payload).await?;
    RawCollectionsResult::from_value(value.unwrap_or(Value::Null))
}
