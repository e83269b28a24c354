//! Request DTOs for the cache server API
//!
//! Defines the structure of incoming HTTP request bodies and query strings.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::cache::{EntryOptions, Metadata, MAX_KEY_LENGTH};

/// Request body for the SET operation (PUT /set)
///
/// # Fields
/// - `key`: The cache key to store the value under
/// - `value`: Any JSON value
/// - `ttl_ms`: Optional TTL in milliseconds, 0 stores without expiry
/// - `metadata`: Optional JSON object returned by `/get/:key/meta`
/// - `tags`: Labels for `/invalidate/:tag`
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    pub key: String,
    pub value: Value,
    #[serde(default)]
    pub ttl_ms: Option<u64>,
    #[serde(default)]
    pub metadata: Option<Metadata>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl SetRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.key.is_empty() {
            return Some("Key cannot be empty".to_string());
        }
        if self.key.len() > MAX_KEY_LENGTH {
            return Some(format!(
                "Key exceeds maximum length of {} characters",
                MAX_KEY_LENGTH
            ));
        }
        if self.tags.iter().any(|t| t.is_empty()) {
            return Some("Tags cannot be empty".to_string());
        }
        None
    }

    /// Splits the request into key, value and write options.
    pub fn into_parts(self) -> (String, Value, EntryOptions) {
        let options = EntryOptions {
            ttl_ms: self.ttl_ms,
            metadata: self.metadata,
            tags: self.tags,
        };
        (self.key, self.value, options)
    }
}

/// Query string of GET /metrics
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetricsQuery {
    pub name: Option<String>,
}

/// Query string of GET /alerts
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlertsQuery {
    pub resolved: Option<bool>,
}

/// Query string of GET /report, RFC 3339 timestamps
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl ReportQuery {
    /// Resolves the report period, defaulting to the hour before `now`.
    pub fn period(&self, now: DateTime<Utc>) -> Result<(DateTime<Utc>, DateTime<Utc>), String> {
        let to = self.to.unwrap_or(now);
        let from = self.from.unwrap_or(to - Duration::hours(1));
        if from > to {
            return Err("'from' must not be after 'to'".to_string());
        }
        Ok((from, to))
    }
}
