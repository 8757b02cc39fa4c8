//! Event data as read from a calendar document, before normalization.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// The time specification for a raw event.
///
/// The variant records the precision of the parsed value: a `DTSTART` with
/// `VALUE=DATE` becomes `Date`, anything carrying a time of day becomes
/// `DateTime` (already converted to UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum RawEventTime {
    /// A specific datetime in UTC.
    DateTime(DateTime<Utc>),
    /// A date with no time of day.
    Date(NaiveDate),
}

impl RawEventTime {
    /// Creates a RawEventTime from a UTC datetime.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self::DateTime(dt)
    }

    /// Creates a RawEventTime from a date.
    pub fn from_date(date: NaiveDate) -> Self {
        Self::Date(date)
    }

    /// Returns true if this is a date-only value.
    pub fn is_all_day(&self) -> bool {
        matches!(self, Self::Date(_))
    }
}

/// One `VEVENT` as found in a feed.
///
/// Only events with a start value become a `RawEvent`; everything else the
/// parser leaves behind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvent {
    /// The feed's `UID`, if present.
    pub uid: Option<String>,

    /// When the event starts.
    pub start: RawEventTime,

    /// When the event ends, if the feed says.
    pub end: Option<RawEventTime>,

    /// The event title (`SUMMARY`).
    pub summary: Option<String>,

    /// The event description.
    pub description: Option<String>,

    /// The event location.
    pub location: Option<String>,

    /// The `TZID` the start was expressed in, if any.
    pub timezone: Option<String>,
}

impl RawEvent {
    /// Creates a raw event with only a start time.
    pub fn new(start: RawEventTime) -> Self {
        Self {
            uid: None,
            start,
            end: None,
            summary: None,
            description: None,
            location: None,
            timezone: None,
        }
    }

    /// Returns the summary unless it is missing or blank.
    pub fn effective_title(&self) -> Option<&str> {
        self.summary.as_deref().filter(|s| !s.trim().is_empty())
    }

    /// Returns true if this is an all-day event.
    pub fn is_all_day(&self) -> bool {
        self.start.is_all_day()
    }

    /// Builder method to set the UID.
    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = Some(uid.into());
        self
    }

    /// Builder method to set the end time.
    pub fn with_end(mut self, end: RawEventTime) -> Self {
        self.end = Some(end);
        self
    }

    /// Builder method to set the summary.
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Builder method to set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Builder method to set the location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Builder method to set the timezone.
    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = Some(timezone.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_datetime() -> DateTime<Utc> {
        "2025-02-05T10:00:00Z".parse().unwrap()
    }

    #[test]
    fn raw_event_time_variants() {
        assert!(!RawEventTime::from_datetime(sample_datetime()).is_all_day());
        let date = NaiveDate::from_ymd_opt(2025, 2, 5).unwrap();
        assert!(RawEventTime::from_date(date).is_all_day());
    }

    #[test]
    fn raw_event_builder() {
        let event = RawEvent::new(RawEventTime::from_datetime(sample_datetime()))
            .with_uid("evt-123")
            .with_end(RawEventTime::from_datetime(sample_datetime()))
            .with_summary("Team Meeting")
            .with_description("Weekly sync")
            .with_location("Room 101")
            .with_timezone("Europe/Paris");

        assert_eq!(event.uid.as_deref(), Some("evt-123"));
        assert_eq!(event.effective_title(), Some("Team Meeting"));
        assert_eq!(event.location.as_deref(), Some("Room 101"));
        assert_eq!(event.timezone.as_deref(), Some("Europe/Paris"));
        assert!(event.end.is_some());
        assert!(!event.is_all_day());
    }

    #[test]
    fn blank_summary_has_no_title() {
        let event =
            RawEvent::new(RawEventTime::from_datetime(sample_datetime())).with_summary("   ");
        assert_eq!(event.effective_title(), None);
    }
}
