use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone};
use tracing::{debug, instrument, trace};

use crate::log_source::entities::LogEntry;

use super::entities::{Event, EventKind};

pub const UNLOCK_MARKER: &str = "screenIsUnlocked";
pub const LOCK_MARKER: &str = "screenIsLocked";

/// Offset-aware layouts besides RFC 3339. The system log uses a space separator and `+hhmm`.
const OFFSET_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%:z",
];

/// Layouts without an offset. These are already wall-clock time of the reporting timezone.
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parses a log timestamp into wall-clock time of `tz`.
pub fn parse_timestamp<Tz: TimeZone>(value: &str, tz: &Tz) -> Option<NaiveDateTime> {
    let value = value.trim();
    let aware = DateTime::parse_from_rfc3339(value).ok().or_else(|| {
        OFFSET_FORMATS
            .iter()
            .find_map(|format| DateTime::parse_from_str(value, format).ok())
    });
    if let Some(aware) = aware {
        return Some(aware.with_timezone(tz).naive_local());
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
}

pub fn classify(message: &str) -> Option<EventKind> {
    if message.contains(UNLOCK_MARKER) {
        Some(EventKind::Unlock)
    } else if message.contains(LOCK_MARKER) {
        Some(EventKind::Lock)
    } else {
        None
    }
}

/// Turns raw entries into a chronologically sorted list of events that happened on `day`.
/// Entries with broken timestamps, from other days, or with unrelated messages are dropped.
/// Events with equal timestamps keep their input order.
#[instrument(skip(entries, tz))]
pub fn extract_events<Tz: TimeZone>(entries: &[LogEntry], day: NaiveDate, tz: &Tz) -> Vec<Event> {
    let mut events = entries
        .iter()
        .filter_map(|entry| {
            let Some(time) = parse_timestamp(&entry.timestamp, tz) else {
                debug!("Dropping entry with unparsable timestamp {:?}", entry.timestamp);
                return None;
            };
            if time.date() != day {
                trace!("Dropping entry outside of {day}: {time}");
                return None;
            }
            classify(&entry.event_message).map(|kind| Event { time, kind })
        })
        .collect::<Vec<_>>();

    events.sort_by_key(|event| event.time);
    events
}
