//! Request and response bodies of the calmerge HTTP API.

use calmerge_core::{NormalizedEvent, Source};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::COMBINED_FILENAME;

/// One configured source as listed by `GET /api/sources`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceInfo {
    /// Source id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Display color.
    pub color: String,
    /// Whether the source is refreshed.
    pub enabled: bool,
    /// Absolute URL of this source's calendar document.
    pub ics_url: String,
}

impl SourceInfo {
    /// Describes `source`, with its calendar URL rooted at `base_url`.
    ///
    /// `base_url` is the scheme and authority without a trailing slash, e.g.
    /// `https://cal.example.com`.
    pub fn from_source(source: &Source, base_url: &str) -> Self {
        Self {
            id: source.id.clone(),
            name: source.name.clone(),
            color: source.color.clone(),
            enabled: source.enabled,
            ics_url: format!("{}/ics/{}.ics", base_url, source.id),
        }
    }
}

/// Body of `GET /api/sources`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourcesResponse {
    /// Every configured source, in configuration order.
    pub sources: Vec<SourceInfo>,
    /// Absolute URL of the combined calendar document.
    pub combined_ics_url: String,
}

impl SourcesResponse {
    /// Lists `sources` with URLs rooted at `base_url`.
    pub fn new<'a>(sources: impl IntoIterator<Item = &'a Source>, base_url: &str) -> Self {
        Self {
            sources: sources
                .into_iter()
                .map(|s| SourceInfo::from_source(s, base_url))
                .collect(),
            combined_ics_url: format!("{}/ics/{}", base_url, COMBINED_FILENAME),
        }
    }
}

/// Query string of `GET /api/events`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventsQuery {
    /// Comma-separated source ids.
    #[serde(default)]
    pub sources: Option<String>,
}

impl EventsQuery {
    /// Returns the requested source ids, or `None` for all sources.
    ///
    /// Empty segments are ignored. A parameter without any id is the same as
    /// no parameter.
    pub fn source_ids(&self) -> Option<Vec<String>> {
        let ids: Vec<String> = self
            .sources
            .as_deref()?
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect();

        if ids.is_empty() { None } else { Some(ids) }
    }
}

/// Body of `GET /api/events`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsResponse {
    /// Events sorted by start, ascending.
    pub events: Vec<NormalizedEvent>,
    /// When the served snapshot was published; `null` before the first refresh.
    pub last_refresh: Option<DateTime<Utc>>,
}

impl EventsResponse {
    /// Builds a response, sorting `events` by start.
    ///
    /// The sort is stable, so events with the same start keep their cache
    /// order.
    pub fn sorted(mut events: Vec<NormalizedEvent>, last_refresh: Option<DateTime<Utc>>) -> Self {
        events.sort_by_key(|e| e.start);
        Self {
            events,
            last_refresh,
        }
    }
}

/// Body of `POST /api/refresh`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    /// Always true; a refresh cycle cannot fail as a whole.
    pub success: bool,
    /// Timestamp of the snapshot this cycle published.
    pub last_refresh: Option<DateTime<Utc>>,
}

impl RefreshResponse {
    /// A completed refresh.
    pub fn completed(last_refresh: Option<DateTime<Utc>>) -> Self {
        Self {
            success: true,
            last_refresh,
        }
    }
}

/// Body of `GET /api/config`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigResponse {
    /// Title shown by the web front end.
    pub title: String,
    /// Minutes between scheduled refreshes.
    pub refresh_interval: u64,
    /// When the current snapshot was published.
    pub last_refresh: Option<DateTime<Utc>>,
}

/// Body of any JSON error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable message.
    pub error: String,
}

impl ErrorResponse {
    /// Creates an error body.
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
