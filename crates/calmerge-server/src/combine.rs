//! Combined calendar document.
//!
//! The combined document is rebuilt textually from the cached raw payloads:
//! every `BEGIN:VEVENT` .. `END:VEVENT` block is copied verbatim, everything
//! else (timezones, calendar properties, stray components) is dropped. Events
//! are never re-parsed, so quirky feeds come out the way they went in.

use crate::cache::CacheSnapshot;

/// Product identifier of the combined document.
pub const PRODID: &str = "-//Calendrier ICS Aggregator//FR";

const EVENT_BEGIN: &str = "BEGIN:VEVENT";
const EVENT_END: &str = "END:VEVENT";
const CRLF: &str = "\r\n";

/// Builds the combined document from every raw payload in `snapshot`.
///
/// Sources without a payload contribute nothing. The output only depends on
/// the snapshot, so repeated calls on the same snapshot are byte-identical.
pub fn build_combined_document(snapshot: &CacheSnapshot, calendar_name: &str) -> String {
    let mut out = String::new();
    push_line(&mut out, "BEGIN:VCALENDAR");
    push_line(&mut out, "VERSION:2.0");
    push_line(&mut out, &format!("PRODID:{}", PRODID));
    push_line(&mut out, &format!("X-WR-CALNAME:{}", calendar_name));

    for (_, payload) in snapshot.raw_payloads() {
        for line in event_lines(payload) {
            push_line(&mut out, line);
        }
    }

    push_line(&mut out, "END:VCALENDAR");
    out
}

/// Returns the lines of every event block in `payload`, markers included.
///
/// Lines may end in `\n` or `\r\n`; terminators are stripped. Only complete
/// blocks are returned: a block cut off by the end of the payload, or by a
/// new `BEGIN:VEVENT` before its `END:VEVENT`, is dropped.
pub fn event_lines(payload: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut block: Option<Vec<&str>> = None;

    for line in payload.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line == EVENT_BEGIN {
            block = Some(Vec::new());
        }
        if let Some(current) = block.as_mut() {
            current.push(line);
            if line == EVENT_END {
                lines.append(current);
                block = None;
            }
        }
    }

    lines
}

fn push_line(out: &mut String, line: &str) {
    out.push_str(line);
    out.push_str(CRLF);
}
