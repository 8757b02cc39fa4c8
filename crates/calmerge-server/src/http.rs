//! HTTP API.
//!
//! Every handler reads the published snapshot only; the sole exception is
//! `POST /api/refresh`, which runs a full refresh cycle before answering.

use std::future::Future;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE, HOST};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use calmerge_protocol::{
    CALENDAR_CONTENT_TYPE, COMBINED_FILENAME, ConfigResponse, ErrorResponse, EventsQuery,
    EventsResponse, RefreshResponse, SourcesResponse,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

use crate::combine::build_combined_document;
use crate::config::AppConfig;
use crate::error::ServerResult;
use crate::refresh::Refresher;

/// Body of the 404 served for unknown calendars.
pub const CALENDAR_NOT_FOUND: &str = "Calendar not found";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    config: Arc<AppConfig>,
    refresher: Arc<Refresher>,
    port: u16,
}

impl AppState {
    /// Creates the state served by [`router`].
    ///
    /// `port` is only used to build absolute URLs for requests without a
    /// `Host` header.
    pub fn new(config: Arc<AppConfig>, refresher: Arc<Refresher>, port: u16) -> Self {
        Self {
            config,
            refresher,
            port,
        }
    }

    /// Returns the refresher.
    pub fn refresher(&self) -> &Arc<Refresher> {
        &self.refresher
    }
}

/// Errors returned by API handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No calendar is cached under the requested name.
    #[error("Calendar not found")]
    NotFound,

    /// Anything else.
    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::NotFound => (StatusCode::NOT_FOUND, CALENDAR_NOT_FOUND).into_response(),
            Self::Internal(message) => {
                error!(error = %message, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse::new(message)),
                )
                    .into_response()
            }
        }
    }
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut router = Router::new()
        .route("/api/sources", get(list_sources))
        .route("/api/events", get(list_events))
        .route("/api/refresh", post(refresh))
        .route("/api/config", get(get_config))
        .route("/ics/{file}", get(calendar_file));

    if let Some(ref dir) = state.config.static_dir {
        debug!(dir = %dir.display(), "Serving static files");
        router = router.fallback_service(ServeDir::new(dir));
    }

    router
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Serves `app` on `listener` until `shutdown` completes.
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> ServerResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!(addr = %addr, "Server listening");
    }
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

/// GET /api/sources - List configured sources
async fn list_sources(State(state): State<AppState>, headers: HeaderMap) -> Json<SourcesResponse> {
    let base_url = base_url(&headers, state.port);
    Json(SourcesResponse::new(&state.config.sources, &base_url))
}

/// GET /api/events - List cached events, sorted by start
async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Json<EventsResponse> {
    let snapshot = state.refresher.store().snapshot().await;
    let filter = query.source_ids();
    let events = snapshot.events(filter.as_deref());

    Json(EventsResponse::sorted(events, snapshot.last_refresh()))
}

/// POST /api/refresh - Run a refresh cycle now
async fn refresh(State(state): State<AppState>) -> Json<RefreshResponse> {
    info!("Refresh requested over HTTP");
    let snapshot = state.refresher.refresh_all().await;
    Json(RefreshResponse::completed(snapshot.last_refresh()))
}

/// GET /api/config - Front end settings
async fn get_config(State(state): State<AppState>) -> Json<ConfigResponse> {
    let last_refresh = state.refresher.store().get_last_refresh().await;
    Json(ConfigResponse {
        title: state.config.title.clone(),
        refresh_interval: state.config.refresh_interval,
        last_refresh,
    })
}

/// GET /ics/{file} - One source's calendar, or `all.ics` for the combined one
async fn calendar_file(
    State(state): State<AppState>,
    Path(file): Path<String>,
) -> Result<Response, ApiError> {
    let snapshot = state.refresher.store().snapshot().await;

    if file == COMBINED_FILENAME {
        let body = build_combined_document(&snapshot, &state.config.combined_name);
        return calendar_response(body, COMBINED_FILENAME);
    }

    let source_id = file.strip_suffix(".ics").ok_or(ApiError::NotFound)?;
    let payload = snapshot.raw_payload(source_id).ok_or(ApiError::NotFound)?;

    let filename = match state.config.source(source_id) {
        Some(source) => source.download_filename(),
        None => format!("{}.ics", source_id),
    };

    calendar_response(payload.to_string(), &filename)
}

fn calendar_response(body: String, filename: &str) -> Result<Response, ApiError> {
    let disposition = HeaderValue::from_str(&format!("inline; filename=\"{}\"", filename))
        .map_err(|e| ApiError::Internal(format!("invalid file name '{}': {}", filename, e)))?;

    let mut response = body.into_response();
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(CALENDAR_CONTENT_TYPE));
    headers.insert(CONTENT_DISPOSITION, disposition);
    Ok(response)
}

/// Builds `scheme://host` for absolute URLs in responses.
///
/// The scheme comes from `X-Forwarded-Proto` (first value), the host from
/// `Host`; defaults are `http` and `localhost:<port>`.
fn base_url(headers: &HeaderMap, port: u16) -> String {
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or("http");

    let host = headers
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("localhost:{}", port));

    format!("{}://{}", scheme, host)
}
