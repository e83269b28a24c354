//! API performance tracking.
//!
//! Times every routed request and records it against the route template,
//! so `/get/a` and `/get/b` aggregate under `/get/:key`.

use std::sync::atomic::Ordering;

use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};

use crate::api::AppState;
use crate::monitor::{MetricCategory, OperationTimer, Tags};

/// Records `api_response_time` (and `api_error` for 4xx/5xx) plus the
/// number of requests in flight when this one started.
pub async fn track_performance(
    State(state): State<AppState>,
    matched: Option<MatchedPath>,
    req: Request,
    next: Next,
) -> Response {
    let endpoint = matched
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());
    let method = req.method().to_string();

    let concurrent = state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    let timer = OperationTimer::start();

    let response = next.run(req).await;

    let elapsed = timer.elapsed_ms();
    state.in_flight.fetch_sub(1, Ordering::SeqCst);

    let mut monitor = state.monitor.write().await;
    monitor.record_api_response_time(&endpoint, &method, response.status().as_u16(), elapsed);
    monitor.record_metric(
        "concurrent_users",
        concurrent as f64,
        "count",
        MetricCategory::ResourceUsage,
        Tags::new(),
    );

    response
}
