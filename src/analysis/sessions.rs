use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};
use tracing::{instrument, trace};

use crate::utils::time::{day_start, format_duration, hour_start};

use super::entities::{ActiveBlock, Event, EventKind, Session};

/// Active time of a single day split by hour of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HourBuckets([Duration; 24]);

impl Default for HourBuckets {
    fn default() -> Self {
        Self([Duration::zero(); 24])
    }
}

impl HourBuckets {
    pub fn get(&self, hour: u32) -> Duration {
        self.0[hour as usize % 24]
    }

    /// Distributes `[from, to)` over the hours it touches. Both ends are expected to be on the same
    /// day, an empty or reversed interval credits nothing.
    pub fn credit(&mut self, from: NaiveDateTime, to: NaiveDateTime) {
        let mut current = from;
        while current < to {
            let next_hour = hour_start(current) + Duration::hours(1);
            let segment_end = to.min(next_hour);
            self.0[current.hour() as usize % 24] += segment_end - current;
            current = next_hour;
        }
    }

    pub fn total(&self) -> Duration {
        self.0.iter().fold(Duration::zero(), |ac, next| ac + *next)
    }

    /// Hours with non-zero activity in ascending order.
    pub fn active_hours(&self) -> impl Iterator<Item = u32> + '_ {
        self.0
            .iter()
            .enumerate()
            .filter(|(_, duration)| **duration > Duration::zero())
            .map(|(hour, _)| hour as u32)
    }

    pub fn is_active(&self) -> bool {
        self.active_hours().next().is_some()
    }
}

/// Result of reconstructing a single day.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DayActivity {
    pub hours: HourBuckets,
    pub blocks: Vec<ActiveBlock>,
    /// Unlock without a matching lock. Not credited to `hours`, the caller decides where it ends.
    pub dangling_unlock: Option<NaiveDateTime>,
}

impl DayActivity {
    pub fn block_duration(&self) -> Duration {
        self.blocks
            .iter()
            .fold(Duration::zero(), |ac, block| ac + block.duration())
    }
}

/// Advances the open-session state by one event. Returns the new open unlock and a session if
/// the event closed one. A repeated unlock keeps the first one, a lock with nothing open is a
/// no-op.
fn step(open: Option<NaiveDateTime>, event: &Event) -> (Option<NaiveDateTime>, Option<Session>) {
    match (open, event.kind) {
        (None, EventKind::Unlock) => (Some(event.time), None),
        (Some(unlock), EventKind::Unlock) => (Some(unlock), None),
        (Some(unlock), EventKind::Lock) => (
            None,
            Some(Session {
                unlock,
                lock: event.time,
            }),
        ),
        (None, EventKind::Lock) => (None, None),
    }
}

/// Pairs unlocks with locks. Returns closed sessions and the unlock left open at the end.
pub fn match_sessions(events: &[Event]) -> (Vec<Session>, Option<NaiveDateTime>) {
    let mut sessions = vec![];
    let mut open = None;
    for event in events {
        let (next_open, closed) = step(open, event);
        open = next_open;
        sessions.extend(closed);
    }
    (sessions, open)
}

/// Groups active hours into runs separated by at least one fully inactive hour. Each run spans
/// from the earliest event inside its first hour to the latest event inside its last hour.
pub fn build_blocks(day: NaiveDate, hours: &HourBuckets, events: &[Event]) -> Vec<ActiveBlock> {
    let mut runs: Vec<(u32, u32)> = vec![];
    for hour in hours.active_hours() {
        match runs.last_mut() {
            Some((_, last)) if hour <= *last + 1 => *last = hour,
            Some(_) | None => runs.push((hour, hour)),
        }
    }

    let hour_of = |hour: u32| day_start(day) + Duration::hours(hour as i64);

    runs.into_iter()
        .map(|(first, last)| {
            let start = events
                .iter()
                .filter(|e| e.time.hour() == first)
                .map(|e| e.time)
                .min()
                .unwrap_or_else(|| hour_of(first));
            // A lock exactly on the hour leaves its hour without credit, so the run may end in an
            // hour that has no events.
            let end = events
                .iter()
                .filter(|e| e.time.hour() == last)
                .map(|e| e.time)
                .max()
                .unwrap_or_else(|| hour_of(last + 1));
            ActiveBlock { start, end }
        })
        .collect()
}

/// Rebuilds per-hour activity and active blocks of `day` from its sorted events.
#[instrument(skip(events))]
pub fn reconstruct_day(day: NaiveDate, events: &[Event], verbose: bool) -> DayActivity {
    if verbose {
        println!("Processing sessions for {day}:");
    }

    let (sessions, dangling_unlock) = match_sessions(events);

    let mut hours = HourBuckets::default();
    for session in &sessions {
        trace!("Session {} - {}", session.unlock, session.lock);
        if verbose {
            println!(
                "  - Session from {} to {} (Duration: {})",
                session.unlock.format("%Y-%m-%d %H:%M:%S"),
                session.lock.format("%Y-%m-%d %H:%M:%S"),
                format_duration(session.duration())
            );
        }
        hours.credit(session.unlock, session.lock);
    }

    let blocks = build_blocks(day, &hours, events);

    DayActivity {
        hours,
        blocks,
        dangling_unlock,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

    use crate::analysis::entities::{ActiveBlock, Event};

    use super::{match_sessions, reconstruct_day, HourBuckets};

    const TEST_DATE: NaiveDate = NaiveDate::from_ymd_opt(2024, 4, 5).unwrap();

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDateTime::new(TEST_DATE, NaiveTime::from_hms_opt(hour, minute, 0).unwrap())
    }

    #[test]
    fn empty_day() {
        let activity = reconstruct_day(TEST_DATE, &[], false);
        assert_eq!(activity.hours, HourBuckets::default());
        assert!(activity.blocks.is_empty());
        assert_eq!(activity.dangling_unlock, None);
    }

    #[test]
    fn single_unlock_is_dangling() {
        let activity = reconstruct_day(TEST_DATE, &[Event::unlock(at(12, 0))], false);
        assert!(!activity.hours.is_active());
        assert!(activity.blocks.is_empty());
        assert_eq!(activity.dangling_unlock, Some(at(12, 0)));
    }

    #[test]
    fn buckets_sum_to_session_durations() {
        let events = [
            Event::unlock(at(8, 10)),
            Event::lock(at(8, 50)),
            Event::unlock(at(9, 30)),
            Event::lock(at(11, 5)),
            Event::unlock(at(17, 59)),
            Event::lock(at(18, 1)),
        ];
        let (sessions, _) = match_sessions(&events);
        let expected = sessions
            .iter()
            .fold(Duration::zero(), |ac, s| ac + s.duration());

        let activity = reconstruct_day(TEST_DATE, &events, false);

        assert_eq!(activity.hours.total(), expected);
        assert_eq!(expected, Duration::minutes(40 + 95 + 2));
    }

    #[test]
    fn session_split_across_hours() {
        let activity = reconstruct_day(
            TEST_DATE,
            &[Event::unlock(at(13, 45)), Event::lock(at(14, 20))],
            false,
        );
        assert_eq!(activity.hours.get(13), Duration::minutes(15));
        assert_eq!(activity.hours.get(14), Duration::minutes(20));
        assert_eq!(activity.hours.total(), Duration::minutes(35));
    }

    #[test]
    fn duplicate_unlock_keeps_first() {
        let activity = reconstruct_day(
            TEST_DATE,
            &[
                Event::unlock(at(9, 0)),
                Event::unlock(at(9, 20)),
                Event::lock(at(9, 30)),
            ],
            false,
        );
        assert_eq!(activity.hours.get(9), Duration::minutes(30));
    }

    #[test]
    fn lock_without_unlock_is_ignored() {
        let activity = reconstruct_day(
            TEST_DATE,
            &[
                Event::lock(at(8, 0)),
                Event::unlock(at(9, 0)),
                Event::lock(at(9, 10)),
                Event::lock(at(9, 40)),
            ],
            false,
        );
        assert_eq!(activity.hours.total(), Duration::minutes(10));
        assert_eq!(activity.dangling_unlock, None);
    }

    #[test]
    fn gap_of_two_hours_splits_blocks() {
        let events = [
            Event::unlock(at(9, 5)),
            Event::lock(at(10, 40)),
            Event::unlock(at(13, 10)),
            Event::lock(at(15, 30)),
        ];
        let activity = reconstruct_day(TEST_DATE, &events, false);

        assert_eq!(
            activity.hours.active_hours().collect::<Vec<_>>(),
            vec![9, 10, 13, 14, 15]
        );
        assert_eq!(
            activity.blocks,
            vec![
                ActiveBlock {
                    start: at(9, 5),
                    end: at(10, 40)
                },
                ActiveBlock {
                    start: at(13, 10),
                    end: at(15, 30)
                },
            ]
        );
        assert_eq!(activity.block_duration(), Duration::minutes(95 + 140));
    }

    #[test]
    fn adjacent_hours_merge_into_one_block() {
        let events = [
            Event::unlock(at(9, 0)),
            Event::lock(at(9, 10)),
            Event::unlock(at(10, 50)),
            Event::lock(at(10, 55)),
        ];
        let activity = reconstruct_day(TEST_DATE, &events, false);

        assert_eq!(activity.hours.total(), Duration::minutes(15));
        assert_eq!(
            activity.blocks,
            vec![ActiveBlock {
                start: at(9, 0),
                end: at(10, 55)
            }]
        );
    }

    #[test]
    fn lock_on_the_hour_ends_block_at_that_hour() {
        let activity = reconstruct_day(
            TEST_DATE,
            &[Event::unlock(at(9, 30)), Event::lock(at(11, 0))],
            false,
        );
        assert_eq!(
            activity.hours.active_hours().collect::<Vec<_>>(),
            vec![9, 10]
        );
        assert_eq!(activity.block_duration(), Duration::minutes(90));
    }

    #[test]
    fn spurious_lock_moves_block_start() {
        let activity = reconstruct_day(
            TEST_DATE,
            &[
                Event::lock(at(9, 1)),
                Event::unlock(at(9, 20)),
                Event::lock(at(9, 50)),
            ],
            false,
        );
        assert_eq!(activity.hours.total(), Duration::minutes(30));
        assert_eq!(activity.block_duration(), Duration::minutes(49));
    }

    #[test]
    fn open_session_after_closed_one() {
        let activity = reconstruct_day(
            TEST_DATE,
            &[
                Event::unlock(at(9, 0)),
                Event::lock(at(9, 30)),
                Event::unlock(at(12, 0)),
            ],
            false,
        );
        assert_eq!(activity.hours.get(9), Duration::minutes(30));
        assert_eq!(activity.hours.total(), Duration::minutes(30));
        assert_eq!(activity.dangling_unlock, Some(at(12, 0)));
        assert_eq!(activity.block_duration(), Duration::minutes(30));
    }
}
