//! Turns raw lock/unlock records into screen time.
//!  - [extract] parses and filters raw entries of a single day into sorted events.
//!  - [sessions] pairs events into sessions and spreads them over hours and blocks.
//!  - [range] drives both over a window of days, handling the cache and midnight carry-over.

pub mod entities;
pub mod extract;
pub mod range;
pub mod sessions;
