//! Performance metric samples.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Free-form labels attached to a metric.
pub type Tags = BTreeMap<String, String>;

// == Metric Category ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricCategory {
    ResponseTime,
    Throughput,
    ErrorRate,
    ResourceUsage,
    BusinessMetric,
}

impl fmt::Display for MetricCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MetricCategory::ResponseTime => "response_time",
            MetricCategory::Throughput => "throughput",
            MetricCategory::ErrorRate => "error_rate",
            MetricCategory::ResourceUsage => "resource_usage",
            MetricCategory::BusinessMetric => "business_metric",
        };
        f.write_str(name)
    }
}

// == Performance Metric ==
/// A single measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetric {
    pub name: String,
    pub value: f64,
    /// Unit label such as `ms`, `count` or `%`
    pub unit: String,
    pub timestamp: DateTime<Utc>,
    pub category: MetricCategory,
    #[serde(default)]
    pub tags: Tags,
}

impl PerformanceMetric {
    pub fn new(
        name: impl Into<String>,
        value: f64,
        unit: impl Into<String>,
        category: MetricCategory,
    ) -> Self {
        Self {
            name: name.into(),
            value,
            unit: unit.into(),
            timestamp: Utc::now(),
            category,
            tags: Tags::new(),
        }
    }

    pub fn with_tags(mut self, tags: Tags) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// Error metrics bypass sampling.
    pub fn is_error(&self) -> bool {
        self.category == MetricCategory::ErrorRate
    }
}
