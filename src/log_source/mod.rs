//! Retrieval of screen lock/unlock records from the operating system. [LogSource] is the
//! contract, [system::SystemLogSource] runs the macOS `log` command.

pub mod entities;
pub mod system;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};

use entities::LogEntry;

/// What a single fetch produced.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// The source answered with a (possibly empty) list of entries.
    Entries(Vec<LogEntry>),
    /// The source had nothing to show and gave no answer at all. Such a window may still get
    /// events later, so it must not be treated as complete.
    NoEvents,
}

/// Intended to serve as a contract for anything able to produce raw log entries.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LogSource: Send + Sync {
    /// Returns entries between `start` and `end` (inclusive). Having nothing to show is not an
    /// error.
    async fn fetch(
        &self,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Result<FetchOutcome>;
}
