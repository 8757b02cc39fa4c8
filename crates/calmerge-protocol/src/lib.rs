//! Request and response types for the calmerge HTTP API.
//!
//! Every body exchanged with the server is JSON with camelCase keys:
//!
//! | Route | Body |
//! |-------|------|
//! | `GET /api/sources` | [`SourcesResponse`] |
//! | `GET /api/events` | [`EventsResponse`], filtered by [`EventsQuery`] |
//! | `POST /api/refresh` | [`RefreshResponse`] |
//! | `GET /api/config` | [`ConfigResponse`] |
//! | any failure | [`ErrorResponse`] |
//!
//! # Example
//!
//! ```rust
//! use calmerge_protocol::EventsQuery;
//!
//! let query = EventsQuery { sources: Some("work,,perso".to_string()) };
//! assert_eq!(query.source_ids(), Some(vec!["work".to_string(), "perso".to_string()]));
//! ```

mod types;

pub use types::{
    ConfigResponse, ErrorResponse, EventsQuery, EventsResponse, RefreshResponse, SourceInfo,
    SourcesResponse,
};

/// Content type of every calendar document served.
pub const CALENDAR_CONTENT_TYPE: &str = "text/calendar; charset=utf-8";

/// File name of the combined calendar document.
pub const COMBINED_FILENAME: &str = "all.ics";
