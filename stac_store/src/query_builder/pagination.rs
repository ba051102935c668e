//! Limits and continuation tokens

use crate::errors::StacError;

/// Page size bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub default_limit: u32,
    pub max_limit: u32,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            default_limit: 10,
            max_limit: 10000,
        }
    }
}

impl Limits {
    /// Reject non-positive limits and clamp large ones to `max_limit`
    pub fn normalize(&self, limit: Option<i64>) -> Result<i64, StacError> {
        match limit {
            None => Ok(i64::from(self.default_limit.min(self.max_limit))),
            Some(limit) if limit < 1 => Err(StacError::InvalidQueryParameter(format!(
                "Limit must be greater than 0, got {}",
                limit
            ))),
            Some(limit) => Ok(limit.min(i64::from(self.max_limit))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageDirection {
    Next,
    Prev,
}

impl PageDirection {
    /// Link relation and token prefix
    pub fn rel(&self) -> &'static str {
        match self {
            PageDirection::Next => "next",
            PageDirection::Prev => "prev",
        }
    }

    /// Token as passed back to the engine: `next:<key>`
    pub fn token(&self, key: &str) -> String {
        format!("{}:{}", self.rel(), key)
    }
}

/// Extract the continuation key from an engine link href
/// (`...?token=next:abc&limit=10` gives `abc`)
pub fn token_from_href(href: &str, direction: PageDirection) -> Option<String> {
    let marker = format!("token={}:", direction.rel());
    let (_, rest) = href.split_once(marker.as_str())?;
    let key = rest.split('&').next().unwrap_or(rest);
    if key.is_empty() {
        None
    } else {
        Some(key.to_string())
    }
}
