//! RawEvent to NormalizedEvent conversion.
//!
//! The normalization process:
//! 1. Converts raw event times to [`EventTime`]
//! 2. Picks the feed UID or synthesizes an id
//! 3. Fills absent text fields with their placeholders
//! 4. Stamps the owning source onto the event

use calmerge_core::{EventTime, NormalizedEvent, Source};
use chrono::Utc;

use crate::raw_event::{RawEvent, RawEventTime};

/// Converts a [`RawEvent`] to a [`NormalizedEvent`] owned by `source`.
pub fn normalize_event(raw: &RawEvent, source: &Source) -> NormalizedEvent {
    let id = match raw.uid.as_deref().filter(|uid| !uid.is_empty()) {
        Some(uid) => uid.to_string(),
        None => synthesize_id(&source.id),
    };

    let mut event = NormalizedEvent::new(
        id,
        convert_time(&raw.start),
        raw.end.as_ref().map(convert_time),
        source,
    );

    if let Some(title) = raw.effective_title() {
        event = event.with_title(title);
    }

    if let Some(ref description) = raw.description {
        event = event.with_description(description);
    }

    if let Some(ref location) = raw.location {
        event = event.with_location(location);
    }

    event
}

/// Normalizes a batch of raw events, keeping their order.
pub fn normalize_events(raw_events: &[RawEvent], source: &Source) -> Vec<NormalizedEvent> {
    raw_events
        .iter()
        .map(|raw| normalize_event(raw, source))
        .collect()
}

/// Converts a [`RawEventTime`] to an [`EventTime`].
fn convert_time(raw: &RawEventTime) -> EventTime {
    match raw {
        RawEventTime::DateTime(dt) => EventTime::from_utc(*dt),
        RawEventTime::Date(date) => EventTime::from_date(*date),
    }
}

/// Builds an id for an event whose feed gave none.
///
/// Unique within this process only; a later run may assign a different id to
/// the same event.
fn synthesize_id(source_id: &str) -> String {
    format!(
        "{}-{}-{}",
        source_id,
        Utc::now().timestamp_millis(),
        rand::random::<u64>()
    )
}
