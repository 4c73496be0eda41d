//! Shared request/response types used by API-facing crates.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheckResponse {
    pub status: String,
    pub version: String,
}

impl HealthCheckResponse {
    #[must_use]
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

/// Query string carrying a single drive address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlQuery {
    pub url: String,
}

/// Directory listing query. Missing fields fall back to the server defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListQuery {
    pub url: String,
    #[serde(default)]
    pub sort: Option<String>,
    #[serde(default)]
    pub ascending: Option<bool>,
    #[serde(default)]
    pub directories_first: Option<bool>,
    #[serde(default)]
    pub show_hidden: Option<bool>,
}

/// Body of a directory search: the predicate uses platform metadata keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub url: String,
    pub predicate: Value,
    #[serde(default)]
    pub show_hidden: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharesResponse {
    pub url: String,
    pub shares: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationResponse {
    pub url: String,
    pub status: String,
}

impl MutationResponse {
    #[must_use]
    pub fn done(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status: "ok".to_string(),
        }
    }
}
