//! API Routes
//!
//! Configures the Axum router with all cache server endpoints.

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    alerts_handler, cleanup_handler, clear_handler, delete_handler, entries_handler, get_handler,
    get_with_metadata_handler, health_handler, invalidate_handler, keys_handler, metrics_handler,
    report_handler, resolve_alert_handler, set_handler, stats_handler, AppState,
};
use super::middleware::track_performance;

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `PUT /set` - Store a JSON value with optional TTL, metadata and tags
/// - `GET /get/:key` - Retrieve a value by key
/// - `GET /get/:key/meta` - Retrieve a value with its metadata
/// - `DELETE /del/:key` - Delete a key
/// - `DELETE /clear` - Remove every entry
/// - `GET /keys`, `GET /entries` - List live entries
/// - `POST /invalidate/:tag` - Delete entries carrying a tag
/// - `POST /cleanup` - Sweep expired entries now
/// - `GET /stats` - Cache statistics
/// - `GET /health` - Component health
/// - `GET /metrics`, `GET /alerts`, `POST /alerts/:id/resolve`, `GET /report` - Monitoring
///
/// # Middleware
/// - Performance tracking: Records response time per route
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/set", put(set_handler))
        .route("/get/:key", get(get_handler))
        .route("/get/:key/meta", get(get_with_metadata_handler))
        .route("/del/:key", delete(delete_handler))
        .route("/clear", delete(clear_handler))
        .route("/keys", get(keys_handler))
        .route("/entries", get(entries_handler))
        .route("/invalidate/:tag", post(invalidate_handler))
        .route("/cleanup", post(cleanup_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/alerts", get(alerts_handler))
        .route("/alerts/:id/resolve", post(resolve_alert_handler))
        .route("/report", get(report_handler))
        // Route layer so the matched path template is available
        .route_layer(middleware::from_fn_with_state(state.clone(), track_performance))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
