//! Aggregation server: cache, refresh cycle, combined calendar and HTTP API.
//!
//! This crate provides the calmerge server components:
//! - [`SnapshotStore`] holding the latest [`CacheSnapshot`]
//! - [`Refresher`] running refresh cycles over the configured sources
//! - [`build_combined_document`] merging cached feeds into one calendar
//! - [`Scheduler`] for periodic refreshes, [`SignalHandler`] for SIGHUP/SIGTERM
//! - [`router`] exposing everything over HTTP
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use calmerge_providers::{FetcherConfig, HttpFeedFetcher};
//! use calmerge_server::{AppConfig, AppState, Refresher, SnapshotStore, router};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Arc::new(AppConfig::load_from("config.toml".as_ref())?);
//!     let fetcher = HttpFeedFetcher::new(FetcherConfig::new())?;
//!     let refresher = Arc::new(Refresher::new(
//!         config.sources.clone(),
//!         Arc::new(fetcher),
//!         Arc::new(SnapshotStore::new()),
//!     ));
//!     refresher.refresh_all().await;
//!
//!     let app = router(AppState::new(config, refresher, 3000));
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

mod cache;
mod combine;
mod config;
mod error;
mod http;
mod refresh;
mod scheduler;
mod signals;

pub use cache::{CacheSnapshot, SnapshotStore, SourceEntry};
pub use combine::{PRODID, build_combined_document, event_lines};
pub use config::{AppConfig, DEFAULT_PORT, RESERVED_SOURCE_ID};
pub use error::{ServerError, ServerResult};
pub use http::{AppState, ApiError, CALENDAR_NOT_FOUND, router, serve};
pub use refresh::Refresher;
pub use scheduler::{Scheduler, SchedulerCommand, SchedulerConfig, SchedulerHandle};
pub use signals::{RefreshRequests, Signal, SignalHandler, ShutdownSignal};
