//! FeedFetcher trait and the per-source fetch pipeline.
//!
//! A [`FeedFetcher`] only knows how to retrieve the raw body of a source.
//! [`fetch_source`] wraps it with payload validation, parsing, and the
//! failure policy: whatever goes wrong, the caller gets a [`SourceFeed`] and
//! never an error.

use std::future::Future;
use std::pin::Pin;

use calmerge_core::{NormalizedEvent, Source};
use tracing::{debug, info, warn};

use crate::error::{ProviderError, ProviderResult};
use crate::ics::parse_ics_content;

/// A boxed future for async trait methods.
///
/// Boxed futures keep [`FeedFetcher`] object-safe, so the orchestrator can
/// hold an `Arc<dyn FeedFetcher>`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Message used when a feed answers with an HTML page.
pub const HTML_PAYLOAD_MESSAGE: &str =
    "Received HTML instead of ICS - calendar may be private. Use the secret iCal URL.";

/// Retrieves the raw calendar document of a source.
///
/// Implementations must bound every request with a timeout and report a
/// non-success status as an error.
pub trait FeedFetcher: Send + Sync {
    /// Returns the name of this fetcher (e.g. "http").
    fn name(&self) -> &str;

    /// Fetches the body of `source.url`.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError` on network errors, timeouts and non-success
    /// statuses.
    fn fetch_raw<'a>(&'a self, source: &'a Source) -> BoxFuture<'a, ProviderResult<String>>;
}

/// The outcome of fetching one source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceFeed {
    /// Normalized events, in document order.
    pub events: Vec<NormalizedEvent>,
    /// The unmodified body, present only when fetch and validation succeeded.
    pub raw_payload: Option<String>,
}

impl SourceFeed {
    /// A feed for a source whose fetch failed.
    pub fn failed() -> Self {
        Self::default()
    }

    /// Returns true if the raw payload was retained.
    pub fn is_success(&self) -> bool {
        self.raw_payload.is_some()
    }
}

/// Rejects bodies that are an HTML page rather than calendar data.
///
/// Private feeds commonly answer with a login page and a 200 status; that must
/// count as a failure, not as an empty calendar.
pub fn validate_payload(body: &str) -> ProviderResult<()> {
    let trimmed = body.trim_start();
    let looks_like_html = trimmed.starts_with("<!")
        || trimmed
            .get(..5)
            .is_some_and(|head| head.eq_ignore_ascii_case("<html"));

    if looks_like_html {
        return Err(ProviderError::not_calendar_data(HTML_PAYLOAD_MESSAGE));
    }
    Ok(())
}

/// Fetches, validates and parses one source.
///
/// Failures are logged with the source name and reason and produce an empty
/// feed without a raw payload. A body that passes validation but fails to
/// parse keeps its raw payload and contributes no events.
pub async fn fetch_source(fetcher: &dyn FeedFetcher, source: &Source) -> SourceFeed {
    info!(source = %source.name, fetcher = fetcher.name(), "Fetching source");

    let body = match fetcher.fetch_raw(source).await.and_then(|body| {
        validate_payload(&body)?;
        Ok(body)
    }) {
        Ok(body) => body,
        Err(e) => {
            let e = e.with_source_id(&source.id);
            warn!(
                source = %source.name,
                code = %e.code(),
                error = %e.message(),
                "Error fetching source"
            );
            return SourceFeed::failed();
        }
    };

    debug!(source = %source.name, bytes = body.len(), "Received calendar payload");

    let events = parse_ics_content(&body, source);
    info!(source = %source.name, count = events.len(), "Fetched events");

    SourceFeed {
        events,
        raw_payload: Some(body),
    }
}
