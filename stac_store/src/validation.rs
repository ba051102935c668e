//! Validation module
//!
//! Engine function names are spliced into SQL text, so only the functions
//! this crate calls are accepted. Item and collection ids end up in URLs
//! and must not carry reserved URL characters.

use crate::errors::StacError;

/// Engine functions this crate calls
pub const ENGINE_FUNCTIONS: &[&str] = &[
    "search",
    "get_collection",
    "collection_base_item",
    "all_collections",
    "collection_search",
    "create_item",
    "update_item",
    "upsert_item",
    "delete_item",
    "create_items",
    "upsert_items",
    "create_collection",
    "update_collection",
    "delete_collection",
];

/// Resolve `name` against [`ENGINE_FUNCTIONS`]
pub fn engine_function(name: &str) -> Result<&'static str, StacError> {
    ENGINE_FUNCTIONS
        .iter()
        .copied()
        .find(|function| *function == name)
        .ok_or_else(|| StacError::DatabaseError(format!("Unknown engine function: {}", name)))
}

/// Reject ids containing any of `invalid_chars`
pub fn validate_id(kind: &str, id: &str, invalid_chars: &[char]) -> Result<(), StacError> {
    if id.is_empty() {
        return Err(StacError::InvalidQueryParameter(format!(
            "{} ID cannot be empty",
            kind
        )));
    }

    let found: Vec<String> = invalid_chars
        .iter()
        .filter(|c| id.contains(**c))
        .map(|c| c.to_string())
        .collect();

    if found.is_empty() {
        Ok(())
    } else {
        Err(StacError::InvalidQueryParameter(format!(
            "{} ID ({}) cannot contain the following characters: {}",
            kind,
            id,
            found.join(" ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_function_allowlist() {
        for name in ["search", "collection_base_item", "create_item", "upsert_items"] {
            assert_eq!(engine_function(name).unwrap(), name);
        }

        for name in ["", "Search", "pgstac.search", "search(); DROP TABLE items; --"] {
            assert_eq!(
                engine_function(name).unwrap_err(),
                StacError::DatabaseError(format!("Unknown engine function: {}", name)),
                "name: {}",
                name
            );
        }
    }

    #[test]
    fn test_validate_id() {
        let invalid = [':', '/', '?', '#'];

        assert!(validate_id("Item", "S2A_20200101_T31", &invalid).is_ok());

        let err = validate_id("Item", "a/b?c", &invalid).unwrap_err();
        assert_eq!(
            err,
            StacError::InvalidQueryParameter(
                "Item ID (a/b?c) cannot contain the following characters: / ?".to_string()
            )
        );

        assert!(validate_id("Collection", "", &invalid).is_err());
    }
}
