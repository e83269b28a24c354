//! Performance report aggregation.
//!
//! Pure functions over a slice of metrics; [`PerformanceMonitor`] selects the
//! metrics and alerts for a period and hands them here.
//!
//! [`PerformanceMonitor`]: crate::monitor::PerformanceMonitor

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, DurationRound, Utc};
use serde::Serialize;

use crate::monitor::{Alert, MetricCategory, PerformanceMetric};

/// Number of endpoints listed in a report.
const TOP_ENDPOINTS: usize = 10;

// == Report Types ==
#[derive(Debug, Clone, Serialize)]
pub struct ReportPeriod {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    /// Mean of all response-time metrics, ms
    pub average_response_time: f64,
    pub total_requests: usize,
    /// Failed requests as a percentage of all requests
    pub error_rate: f64,
    pub peak_concurrent_users: f64,
    pub uptime_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportTrends {
    pub response_time: Vec<TrendPoint>,
    pub throughput: Vec<TrendPoint>,
    pub error_rate: Vec<TrendPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndpointSummary {
    pub endpoint: String,
    pub requests: usize,
    pub average_time: f64,
    pub error_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PerformanceReport {
    pub period: ReportPeriod,
    pub summary: ReportSummary,
    pub trends: ReportTrends,
    pub top_endpoints: Vec<EndpointSummary>,
    pub alerts: Vec<Alert>,
}

// == Aggregation ==
pub(crate) fn summarize(metrics: &[&PerformanceMetric], uptime_seconds: u64) -> ReportSummary {
    let response_times: Vec<f64> = metrics
        .iter()
        .filter(|m| m.category == MetricCategory::ResponseTime)
        .map(|m| m.value)
        .collect();
    let requests = count_named(metrics, "api_response_time", None);
    let errors = count_named(metrics, "api_error", None);

    ReportSummary {
        average_response_time: average(&response_times),
        total_requests: requests,
        error_rate: percentage(errors, requests),
        peak_concurrent_users: metrics
            .iter()
            .filter(|m| m.name == "concurrent_users")
            .map(|m| m.value)
            .fold(0.0, f64::max),
        uptime_seconds,
    }
}

pub(crate) fn trends(metrics: &[&PerformanceMetric]) -> ReportTrends {
    ReportTrends {
        response_time: hourly(metrics, MetricCategory::ResponseTime),
        throughput: hourly(metrics, MetricCategory::Throughput),
        error_rate: hourly(metrics, MetricCategory::ErrorRate),
    }
}

/// Endpoints with the most requests, busiest first.
pub(crate) fn top_endpoints(metrics: &[&PerformanceMetric]) -> Vec<EndpointSummary> {
    let mut groups: HashMap<&str, Vec<f64>> = HashMap::new();
    for metric in metrics.iter().filter(|m| m.name == "api_response_time") {
        groups
            .entry(metric.tag("endpoint").unwrap_or("unknown"))
            .or_default()
            .push(metric.value);
    }

    let mut endpoints: Vec<EndpointSummary> = groups
        .into_iter()
        .map(|(endpoint, times)| {
            let errors = count_named(metrics, "api_error", Some(endpoint));
            EndpointSummary {
                endpoint: endpoint.to_string(),
                requests: times.len(),
                average_time: average(&times),
                error_rate: percentage(errors, times.len()),
            }
        })
        .collect();

    endpoints.sort_by(|a, b| {
        b.requests
            .cmp(&a.requests)
            .then_with(|| a.endpoint.cmp(&b.endpoint))
    });
    endpoints.truncate(TOP_ENDPOINTS);
    endpoints
}

/// Hourly averages of one category, oldest hour first.
fn hourly(metrics: &[&PerformanceMetric], category: MetricCategory) -> Vec<TrendPoint> {
    let mut buckets: BTreeMap<DateTime<Utc>, Vec<f64>> = BTreeMap::new();
    for metric in metrics.iter().filter(|m| m.category == category) {
        let hour = metric
            .timestamp
            .duration_trunc(chrono::Duration::hours(1))
            .unwrap_or(metric.timestamp);
        buckets.entry(hour).or_default().push(metric.value);
    }

    buckets
        .into_iter()
        .map(|(timestamp, values)| TrendPoint {
            timestamp,
            value: average(&values),
        })
        .collect()
}

fn count_named(metrics: &[&PerformanceMetric], name: &str, endpoint: Option<&str>) -> usize {
    metrics
        .iter()
        .filter(|m| m.name == name)
        .filter(|m| endpoint.map_or(true, |e| m.tag("endpoint") == Some(e)))
        .count()
}

fn average(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}
