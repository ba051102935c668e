//! Sort specification
//!
//! Tokens carry an optional direction sigil: `-field` sorts descending,
//! `+field` and `field` ascending.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// One `(field, direction)` pair of a sort specification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(field: &str, direction: SortDirection) -> Self {
        Self {
            field: field.to_string(),
            direction,
        }
    }

    /// Parse a single token; tokens without a field name are dropped
    pub fn parse(token: &str) -> Option<Self> {
        let token = token.trim();
        let (direction, field) = match token.strip_prefix('-') {
            Some(rest) => (SortDirection::Desc, rest),
            None => (SortDirection::Asc, token.strip_prefix('+').unwrap_or(token)),
        };

        let field = field.trim();
        if field.is_empty() {
            return None;
        }
        Some(Self::new(field, direction))
    }
}

/// Parse sort tokens, splitting comma-joined ones (`-datetime,+id`)
pub fn parse_sortby<S: AsRef<str>>(tokens: &[S]) -> Vec<SortSpec> {
    tokens
        .iter()
        .flat_map(|token| token.as_ref().split(','))
        .filter_map(SortSpec::parse)
        .collect()
}
