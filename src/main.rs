//! datacache - A tiered TTL cache server with performance monitoring

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use datacache::monitor::{HttpSink, LogSink, MetricsReporter, ReportSink};
use datacache::{
    create_router, spawn_cleanup_task, spawn_monitoring_task, spawn_reporting_task, AppState,
    Config,
};

const REPORT_TIMEOUT: Duration = Duration::from_secs(10);

/// Main entry point for the datacache server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create the cache (restoring from storage) and the monitor
/// 4. Start background cleanup, reporting and monitoring tasks
/// 5. Create Axum router with all endpoints
/// 6. Start HTTP server on configured port
/// 7. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "datacache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting datacache server");

    let config = Config::from_env();
    info!(
        "Configuration loaded: max_entries={}, default_ttl_ms={}, policy={}, persistence={}, port={}",
        config.max_entries,
        config.default_ttl_ms,
        config.eviction_policy,
        config.persistence,
        config.server_port
    );

    let state = AppState::from_config(&config).context("failed to initialize cache")?;
    info!("Cache initialized");

    let mut tasks = Vec::new();

    if let Some(period) = config.cleanup_period() {
        tasks.push(spawn_cleanup_task(state.cache.clone(), period));
    }

    let sink: Arc<dyn ReportSink> = match &config.metrics_endpoint {
        Some(endpoint) => Arc::new(
            HttpSink::new(endpoint.clone(), REPORT_TIMEOUT)
                .context("failed to build metrics HTTP client")?,
        ),
        None => Arc::new(LogSink),
    };
    let reporter = MetricsReporter::new(sink, config.metrics_batch_size);
    tasks.push(spawn_reporting_task(
        state.monitor.clone(),
        reporter.clone(),
        config.flush_period(),
        state.flush_notify.clone(),
    ));

    if let Some(period) = config.monitor_period() {
        tasks.push(spawn_monitoring_task(
            state.monitor.clone(),
            state.probes.as_ref().clone(),
            period,
        ));
    }
    info!(count = tasks.len(), "Background tasks started");

    let monitor = state.monitor.clone();
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(tasks))
        .await
        .context("server error")?;

    // Last chance to deliver queued metrics
    let summary = reporter.flush(&monitor).await;
    info!(sent = summary.sent, "Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown signal, aborts the background tasks and allows graceful shutdown.
async fn shutdown_signal(tasks: Vec<JoinHandle<()>>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    for task in &tasks {
        task.abort();
    }
    warn!("Background tasks aborted");
}
