//! ICS/iCalendar parsing.
//!
//! This module parses iCalendar (RFC 5545) documents into [`RawEvent`]s and,
//! through [`parse_ics_content`], into normalized events for one source.

use calmerge_core::{NormalizedEvent, Source};
use chrono::{NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use icalendar::{
    Calendar, CalendarComponent, CalendarDateTime, Component, DatePerhapsTime, Event, EventLike,
};
use tracing::{debug, warn};

use crate::error::{ProviderError, ProviderResult};
use crate::normalize::normalize_events;
use crate::raw_event::{RawEvent, RawEventTime};

/// Parses a calendar document and normalizes its events for `source`.
///
/// A document that cannot be parsed yields no events; the failure is logged
/// and never reaches the caller.
pub fn parse_ics_content(ics: &str, source: &Source) -> Vec<NormalizedEvent> {
    match parse_calendar(ics) {
        Ok(raw) => normalize_events(&raw, source),
        Err(e) => {
            warn!(source = %source.name, error = %e, "Failed to parse ICS content");
            Vec::new()
        }
    }
}

/// Parses a calendar document into raw events, in document order.
///
/// Only `VEVENT` components are considered, and of those only the ones with a
/// `DTSTART`.
pub fn parse_calendar(ics: &str) -> ProviderResult<Vec<RawEvent>> {
    let calendar = ics
        .parse::<Calendar>()
        .map_err(|e| ProviderError::parse(format!("invalid calendar document: {}", e)))?;

    Ok(calendar
        .iter()
        .filter_map(|component| match component {
            CalendarComponent::Event(event) => parse_event(event),
            _ => None,
        })
        .collect())
}

/// Parses a single VEVENT component into a RawEvent.
fn parse_event(event: &Event) -> Option<RawEvent> {
    let Some(start_dt) = event.get_start().or_else(|| bare_date_time(event, "DTSTART")) else {
        debug!(uid = ?event.get_uid(), "Skipping event without DTSTART");
        return None;
    };

    let timezone = match &start_dt {
        DatePerhapsTime::DateTime(CalendarDateTime::WithTimezone { tzid, .. }) => {
            Some(tzid.clone())
        }
        _ => None,
    };

    let mut raw = RawEvent::new(convert_date_time(start_dt));

    if let Some(end_dt) = event.get_end().or_else(|| bare_date_time(event, "DTEND")) {
        raw = raw.with_end(convert_date_time(end_dt));
    }

    if let Some(uid) = event.get_uid() {
        raw = raw.with_uid(uid);
    }

    if let Some(summary) = event.get_summary() {
        raw = raw.with_summary(summary);
    }

    if let Some(description) = event.get_description() {
        raw = raw.with_description(description);
    }

    if let Some(location) = event.get_location() {
        raw = raw.with_location(location);
    }

    if let Some(tz) = timezone {
        raw = raw.with_timezone(tz);
    }

    debug!(
        uid = ?raw.uid,
        summary = ?raw.summary,
        start = ?raw.start,
        "Parsed event from ICS"
    );

    Some(raw)
}

/// Reads a date or date-time property written without a `VALUE` parameter.
///
/// `icalendar` only recognizes a date when `VALUE=DATE` is present, so a bare
/// `DTSTART:20250210` would otherwise look like a missing start.
fn bare_date_time(event: &Event, property: &str) -> Option<DatePerhapsTime> {
    let value = event.property_value(property)?.trim();

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y%m%d") {
        return Some(DatePerhapsTime::Date(date));
    }
    if let Some(utc) = value.strip_suffix('Z') {
        let naive = NaiveDateTime::parse_from_str(utc, "%Y%m%dT%H%M%S").ok()?;
        return Some(DatePerhapsTime::DateTime(CalendarDateTime::Utc(
            Utc.from_utc_datetime(&naive),
        )));
    }
    NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S")
        .ok()
        .map(|naive| DatePerhapsTime::DateTime(CalendarDateTime::Floating(naive)))
}

/// Converts icalendar DatePerhapsTime to RawEventTime.
///
/// Floating times and unknown TZIDs are read as UTC.
fn convert_date_time(dt: DatePerhapsTime) -> RawEventTime {
    match dt {
        DatePerhapsTime::Date(date) => RawEventTime::from_date(date),
        DatePerhapsTime::DateTime(cdt) => {
            let utc_dt = match cdt {
                CalendarDateTime::Utc(dt) => dt,
                CalendarDateTime::Floating(naive) => Utc.from_utc_datetime(&naive),
                CalendarDateTime::WithTimezone { date_time, tzid } => {
                    match tzid.parse::<Tz>() {
                        Ok(tz) => match tz.from_local_datetime(&date_time).earliest() {
                            Some(local) => local.with_timezone(&Utc),
                            None => Utc.from_utc_datetime(&date_time),
                        },
                        Err(_) => {
                            debug!(tzid = %tzid, "Unknown TZID, reading time as UTC");
                            Utc.from_utc_datetime(&date_time)
                        }
                    }
                }
            };
            RawEventTime::from_datetime(utc_dt)
        }
    }
}
