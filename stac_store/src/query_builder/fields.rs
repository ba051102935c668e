//! Field projection (include / exclude)

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Two disjoint sets of dotted field paths
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldProjection {
    #[serde(default)]
    pub include: BTreeSet<String>,
    #[serde(default)]
    pub exclude: BTreeSet<String>,
}

impl FieldProjection {
    /// Partition `+field` / `field` into includes and `-field` into excludes
    pub fn from_tokens<S: AsRef<str>>(tokens: &[S]) -> Self {
        let mut projection = Self::default();

        for token in tokens.iter().flat_map(|t| t.as_ref().split(',')) {
            let token = token.trim();
            if let Some(field) = token.strip_prefix('-') {
                projection.exclude.insert(field.to_string());
            } else if let Some(field) = token.strip_prefix('+') {
                projection.include.insert(field.to_string());
            } else {
                projection.include.insert(token.to_string());
            }
        }

        projection.normalized()
    }

    /// Drop empty paths; a path both included and excluded is excluded
    pub fn normalized(mut self) -> Self {
        self.include.retain(|f| !f.is_empty());
        self.exclude.retain(|f| !f.is_empty());
        let exclude = &self.exclude;
        self.include.retain(|f| !exclude.contains(f));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    pub fn excludes(&self, field: &str) -> bool {
        self.exclude.contains(field)
    }
}
