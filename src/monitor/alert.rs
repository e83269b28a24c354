//! Alerts and metric thresholds.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// == Alert Level ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Info,
    Warning,
    Error,
    Critical,
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AlertLevel::Info => "info",
            AlertLevel::Warning => "warning",
            AlertLevel::Error => "error",
            AlertLevel::Critical => "critical",
        };
        f.write_str(name)
    }
}

// == Alert ==
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub level: AlertLevel,
    pub title: String,
    pub description: String,
    pub category: String,
    pub timestamp: DateTime<Utc>,
    pub resolved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Alert {
    pub fn age_at(&self, now: DateTime<Utc>) -> chrono::Duration {
        now.signed_duration_since(self.timestamp)
    }

    pub(crate) fn resolve(&mut self, at: DateTime<Utc>) {
        self.resolved = true;
        self.resolved_at = Some(at);
    }
}

// == Threshold ==
/// Warning and critical bounds for a metric, inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    pub warning: f64,
    pub critical: f64,
}

impl Threshold {
    pub const fn new(warning: f64, critical: f64) -> Self {
        Self { warning, critical }
    }

    /// Alert level a value triggers, if any.
    pub fn level_for(&self, value: f64) -> Option<AlertLevel> {
        if value >= self.critical {
            Some(AlertLevel::Critical)
        } else if value >= self.warning {
            Some(AlertLevel::Warning)
        } else {
            None
        }
    }
}

/// Thresholds keyed by metric name.
pub fn default_thresholds() -> HashMap<String, Threshold> {
    [
        ("api_response_time", Threshold::new(1000.0, 3000.0)),
        ("cache_response_time", Threshold::new(50.0, 200.0)),
        ("database_query_time", Threshold::new(500.0, 2000.0)),
        ("error_rate", Threshold::new(5.0, 10.0)),
        ("memory_usage", Threshold::new(80.0, 95.0)),
    ]
    .into_iter()
    .map(|(name, threshold)| (name.to_string(), threshold))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_levels() {
        let threshold = Threshold::new(50.0, 200.0);
        assert_eq!(threshold.level_for(10.0), None);
        assert_eq!(threshold.level_for(50.0), Some(AlertLevel::Warning));
        assert_eq!(threshold.level_for(199.9), Some(AlertLevel::Warning));
        assert_eq!(threshold.level_for(200.0), Some(AlertLevel::Critical));
    }

    #[test]
    fn test_default_thresholds() {
        let thresholds = default_thresholds();
        assert_eq!(thresholds.len(), 5);
        assert_eq!(thresholds["api_response_time"], Threshold::new(1000.0, 3000.0));
        assert_eq!(thresholds["memory_usage"].critical, 95.0);
    }

    #[test]
    fn test_alert_level_ordering() {
        assert!(AlertLevel::Critical > AlertLevel::Warning);
        assert_eq!(serde_json::to_value(AlertLevel::Error).unwrap(), "error");
    }
}
