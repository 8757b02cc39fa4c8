//! Calendar feed fetching and parsing.
//!
//! This crate turns a configured [`Source`](calmerge_core::Source) into events:
//!
//! - [`FeedFetcher`] - The trait that retrieves a feed body
//! - [`HttpFeedFetcher`] - The HTTP(S)/webcal implementation
//! - [`parse_ics_content`] - ICS document to normalized events
//! - [`fetch_source`] - Fetch, validate and parse one source, never failing
//! - [`ProviderError`] - Error types for fetch and parse operations
//!
//! # Architecture
//!
//! ```text
//!   ┌──────────────────┐
//!   │   Remote feed    │
//!   └────────┬─────────┘
//!            │ GET (webcal → https)
//!            ▼
//!   ┌──────────────────┐
//!   │ HttpFeedFetcher  │  FeedFetcher
//!   └────────┬─────────┘
//!            │ raw body
//!            ▼ validate_payload()
//!   ┌──────────────────┐
//!   │ parse_calendar() │──▶ RawEvent
//!   └────────┬─────────┘
//!            ▼ normalize_event()
//!   ┌──────────────────┐
//!   │ NormalizedEvent  │
//!   └──────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use calmerge_providers::{FetcherConfig, HttpFeedFetcher, fetch_source};
//!
//! let fetcher = HttpFeedFetcher::new(FetcherConfig::new())?;
//! let feed = fetch_source(&fetcher, &source).await;
//! println!("{} events", feed.events.len());
//! ```

pub mod error;
pub mod http;
pub mod ics;
pub mod normalize;
pub mod provider;
pub mod raw_event;

// Re-export main types at crate root
pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
pub use http::{FetcherConfig, HttpFeedFetcher, resolve_feed_url};
pub use ics::{parse_calendar, parse_ics_content};
pub use normalize::{normalize_event, normalize_events};
pub use provider::{
    BoxFuture, FeedFetcher, HTML_PAYLOAD_MESSAGE, SourceFeed, fetch_source, validate_payload,
};
pub use raw_event::{RawEvent, RawEventTime};
