//! Simple to use cli for estimating how long you have been at the computer each day.
//! Screen lock and unlock records from the system log are turned into sessions, spread over the
//! hours of the day and compared against an expected working day.
//!

pub mod analysis;
pub mod cache;
pub mod cli;
pub mod log_source;
pub mod utils;
