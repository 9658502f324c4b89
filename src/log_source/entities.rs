use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single raw record returned by the system log. Only `timestamp` and `eventMessage` are
/// interpreted, every other field is kept so that the cache reproduces the record as it was
/// fetched.
#[derive(PartialEq, Debug, Serialize, Deserialize, Clone)]
pub struct LogEntry {
    pub timestamp: String,
    #[serde(rename = "eventMessage", default)]
    pub event_message: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LogEntry {
    pub fn new(timestamp: impl Into<String>, event_message: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp.into(),
            event_message: event_message.into(),
            extra: Map::new(),
        }
    }

    /// Unlock marker placed at the start of a day when the previous day ended unlocked.
    /// `timestamp` should be an offset-aware ISO-8601 string if the offset is known.
    pub fn carry_over_unlock(timestamp: impl Into<String>) -> Self {
        Self::new(timestamp, "screenIsUnlocked (synthetic carryover)")
    }

    /// Same as [LogEntry::carry_over_unlock] for a wall-clock moment without an offset.
    pub fn carry_over_unlock_naive(moment: NaiveDateTime) -> Self {
        Self::carry_over_unlock(moment.format("%Y-%m-%d %H:%M:%S%.6f").to_string())
    }
}
