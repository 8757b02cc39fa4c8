//! Normalized calendar events.
//!
//! [`NormalizedEvent`] is the record served by the event listing. Times are
//! absolute UTC instants; whether the event is all-day is decided once, from
//! the [`EventTime`] variant of its start.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::source::Source;
use crate::time::EventTime;

/// Title used when a feed event has no summary.
pub const UNTITLED_EVENT: &str = "Sans titre";

/// A calendar event after parsing and normalization.
///
/// The owning source's name and color are copied onto every event so a
/// client can render the listing without a second lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedEvent {
    /// Feed UID, or a synthesized identifier when the feed has none.
    pub id: String,
    /// The event title.
    pub title: String,
    /// The event description, empty when absent.
    pub description: String,
    /// The event location, empty when absent.
    pub location: String,
    /// When the event starts.
    pub start: DateTime<Utc>,
    /// When the event ends, if the feed says.
    pub end: Option<DateTime<Utc>>,
    /// True when the start value carried no time of day.
    pub all_day: bool,
    /// Id of the source this event was fetched from.
    pub source_id: String,
    /// Display name of that source.
    pub source_name: String,
    /// Display color of that source.
    pub color: String,
}

impl NormalizedEvent {
    /// Creates an event owned by `source`, with empty text fields.
    pub fn new(
        id: impl Into<String>,
        start: EventTime,
        end: Option<EventTime>,
        source: &Source,
    ) -> Self {
        Self {
            id: id.into(),
            title: UNTITLED_EVENT.to_string(),
            description: String::new(),
            location: String::new(),
            start: start.to_utc_datetime(),
            end: end.map(|t| t.to_utc_datetime()),
            all_day: start.is_all_day(),
            source_id: source.id.clone(),
            source_name: source.name.clone(),
            color: source.color.clone(),
        }
    }

    /// Builder: set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Builder: set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Builder: set the location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }
}
