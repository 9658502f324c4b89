use chrono::{Duration, NaiveDateTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Unlock,
    Lock,
}

/// Screen transition at a wall-clock moment of the reporting timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub time: NaiveDateTime,
    pub kind: EventKind,
}

impl Event {
    pub fn unlock(time: NaiveDateTime) -> Self {
        Self {
            time,
            kind: EventKind::Unlock,
        }
    }

    pub fn lock(time: NaiveDateTime) -> Self {
        Self {
            time,
            kind: EventKind::Lock,
        }
    }
}

/// Interval between an unlock and the lock that closed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub unlock: NaiveDateTime,
    pub lock: NaiveDateTime,
}

impl Session {
    pub fn duration(&self) -> Duration {
        self.lock - self.unlock
    }
}

/// Continuous stretch of engagement. Its length is measured end to end, so it may be longer than
/// the time the screen was actually unlocked inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveBlock {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl ActiveBlock {
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// An unlock left open at the end of a day. Passed by value from one day to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CarryOver {
    pub unlock_time: Option<NaiveDateTime>,
}

impl CarryOver {
    pub fn none() -> Self {
        Self { unlock_time: None }
    }

    pub fn from_dangling(unlock_time: Option<NaiveDateTime>) -> Self {
        Self { unlock_time }
    }

    pub fn pending(&self) -> bool {
        self.unlock_time.is_some()
    }
}
