//! Serve command: runs the aggregation server in the foreground.
//!
//! This module wires the server components together:
//! - Feed fetcher and refresher built from config
//! - Initial refresh, so the first request never sees an empty cache
//! - Signal handler (SIGTERM/SIGINT for shutdown, SIGHUP for refresh)
//! - Scheduler (periodic refresh)
//! - HTTP server

use std::sync::Arc;
use std::time::Duration;

use calmerge_providers::HttpFeedFetcher;
use calmerge_server::{
    AppConfig, AppState, Refresher, Scheduler, SchedulerConfig, ServerError, SignalHandler,
    SnapshotStore, router, serve,
};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::error::ClientResult;

/// Starts the server and blocks until a shutdown signal is received.
pub async fn run(config: AppConfig, port: Option<u16>) -> ClientResult<()> {
    let config = Arc::new(config);

    // 1. Fetcher and refresher
    let fetcher = HttpFeedFetcher::new(config.fetcher_config())?;
    let refresher = Arc::new(Refresher::new(
        config.sources.clone(),
        Arc::new(fetcher),
        Arc::new(SnapshotStore::new()),
    ));

    info!(
        sources = config.sources.len(),
        enabled = config.enabled_sources().count(),
        "Starting server"
    );

    // 2. Initial refresh
    let snapshot = refresher.refresh_all().await;
    info!(events = snapshot.event_count(), "Initial refresh complete");

    // 3. Signal handler
    let signal_handler = SignalHandler::new();
    signal_handler.spawn_listener()?;

    // 4. Scheduler
    let scheduler = Scheduler::new(SchedulerConfig::new(config.refresh_period()));
    let scheduler_handle = scheduler.handle();

    let sync_refresher = refresher.clone();
    let scheduler_task = tokio::spawn(async move {
        scheduler
            .run(move || {
                let refresher = sync_refresher.clone();
                async move {
                    refresher.refresh_all().await;
                }
            })
            .await;
    });

    // 5. SIGHUP forwards to the scheduler so the interval restarts
    let mut refresh_requests = signal_handler.refresh_requests();
    let sighup_handle = scheduler_handle.clone();
    let sighup_task = tokio::spawn(async move {
        while refresh_requests.next().await.is_some() {
            if let Err(e) = sighup_handle.refresh_now().await {
                warn!(error = %e, "Failed to forward refresh request to scheduler");
                break;
            }
        }
    });

    // 6. HTTP server
    let port = config.resolve_port(port);
    let addr = config.listen_addr(port)?;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::bind(addr.to_string(), e))?;

    let app = router(AppState::new(config.clone(), refresher, port));
    let result = serve(listener, app, signal_handler.shutdown().wait()).await;

    // Clean shutdown: stop the scheduler
    info!("Shutting down...");
    sighup_task.abort();
    scheduler_handle.shutdown().await;

    // Give an in-flight refresh a moment to finish
    if tokio::time::timeout(Duration::from_secs(5), scheduler_task)
        .await
        .is_err()
    {
        warn!("Scheduler did not stop within 5s");
    }

    result?;
    info!("Server stopped");
    Ok(())
}
