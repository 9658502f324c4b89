//!  Cache is organized through [day_cache::DayCacheImpl].
//!  The basic idea is:
//!   - There is a directory with one JSON-lines file of raw log entries per local day.
//!   - Entries are only ever appended, an entry already present in the file is skipped.
//!   - A separate `fetched_days` file lists days that were fetched completely and don't need to
//!     be fetched again.

pub mod day_cache;
