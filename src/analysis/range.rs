use std::fmt::Display;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Days, Duration, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};
use indicatif::ProgressBar;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::{
    cache::day_cache::DayCache,
    log_source::{entities::LogEntry, FetchOutcome, LogSource},
    utils::{
        clock::Clock,
        time::{as_hours, day_end, day_start, format_duration},
    },
};

use super::{
    entities::{ActiveBlock, CarryOver},
    extract::extract_events,
    sessions::{reconstruct_day, DayActivity, HourBuckets},
};

#[derive(Debug, Clone, Copy)]
pub struct WalkOptions {
    /// Number of days ending today.
    pub days: u32,
    pub use_cache: bool,
    pub verbose: bool,
}

/// Activity of a day that had any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaySummary {
    pub day: NaiveDate,
    pub hours: HourBuckets,
    pub block_duration: Duration,
}

impl DaySummary {
    pub fn raw_duration(&self) -> Duration {
        self.hours.total()
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct WalkReport {
    pub days: Vec<DaySummary>,
    /// Set when the walk was stopped before reaching today.
    pub interrupted: bool,
}

/// Walks a window of days from oldest to newest, loading each day from the cache or the log
/// source and carrying sessions that stay open over midnight into the following day.
pub struct DayRangeWalker<C, S, Tz> {
    cache: C,
    source: S,
    clock: Box<dyn Clock>,
    tz: Tz,
    options: WalkOptions,
    progress: ProgressBar,
}

impl<C: DayCache, S: LogSource, Tz: TimeZone> DayRangeWalker<C, S, Tz> {
    pub fn new(cache: C, source: S, clock: Box<dyn Clock>, tz: Tz, options: WalkOptions) -> Self {
        Self {
            cache,
            source,
            clock,
            tz,
            options,
            progress: ProgressBar::hidden(),
        }
    }

    pub fn with_progress(self, progress: ProgressBar) -> Self {
        Self { progress, ..self }
    }

    /// Days of the window in chronological order, ending with `today`. A window reaching past the
    /// earliest representable date is cut there.
    pub fn days_to_process(&self, today: NaiveDate) -> Vec<NaiveDate> {
        let back = Days::new(u64::from(self.options.days.max(1) - 1));
        let first = today.checked_sub_days(back).unwrap_or(NaiveDate::MIN);
        first.iter_days().take_while(|day| *day <= today).collect()
    }

    /// Processes the whole window. Cancelling `shutdown` stops the walk and returns what was
    /// collected up to that point.
    pub async fn run(&self, shutdown: &CancellationToken) -> WalkReport {
        let now = self.clock.time().with_timezone(&self.tz).naive_local();
        let today = now.date();

        let mut report = WalkReport::default();
        let mut carry = CarryOver::none();

        for day in self.days_to_process(today) {
            if shutdown.is_cancelled() {
                report.interrupted = true;
                break;
            }
            self.progress.set_message(format!("Processing {day}..."));

            let processed = tokio::select! {
                biased;
                _ = shutdown.cancelled() => None,
                processed = self.process_day(day, today, now, carry) => Some(processed),
            };

            let Some((summary, next_carry)) = processed else {
                info!("Walk interrupted while processing {day}");
                report.interrupted = true;
                break;
            };
            carry = next_carry;
            report.days.extend(summary);
        }

        report
    }

    #[instrument(skip(self, today, now))]
    async fn process_day(
        &self,
        day: NaiveDate,
        today: NaiveDate,
        now: NaiveDateTime,
        carry: CarryOver,
    ) -> (Option<DaySummary>, CarryOver) {
        let is_today = day == today;
        let mut entries = self.load_entries(day, is_today).await;

        if entries.is_empty() {
            debug!("No entries for {day}");
            return (None, CarryOver::none());
        }

        if carry.pending() {
            debug!("Carrying over unlock from {:?}", carry.unlock_time);
            entries.insert(0, self.carry_over_entry(day));
        }

        let events = extract_events(&entries, day, &self.tz);
        let DayActivity {
            mut hours,
            mut blocks,
            dangling_unlock,
        } = reconstruct_day(day, &events, self.options.verbose);

        if let Some(unlock) = dangling_unlock {
            let until = if is_today { now } else { day_end(day) };
            if until > unlock {
                if self.options.verbose {
                    let duration = format_duration(until - unlock);
                    if is_today {
                        self.print(format_args!(
                            "  - Active session: from {} to now (Duration: {duration})",
                            unlock.format("%H:%M:%S")
                        ));
                    } else {
                        self.print(format_args!(
                            "  - Session carried over to next day: from {} to 23:59:59 (Duration: {duration})",
                            unlock.format("%H:%M:%S")
                        ));
                    }
                }
                hours.credit(unlock, until);
                blocks.push(ActiveBlock {
                    start: unlock,
                    end: until,
                });
            }
        }

        let carry = CarryOver::from_dangling(dangling_unlock);

        if !hours.is_active() {
            return (None, carry);
        }

        let summary = DaySummary {
            day,
            hours,
            block_duration: blocks
                .iter()
                .fold(Duration::zero(), |ac, block| ac + block.duration()),
        };
        if self.options.verbose {
            self.print(format_args!(
                "Calculated {:.1} hours of screen time.",
                as_hours(summary.raw_duration())
            ));
        }
        (Some(summary), carry)
    }

    /// Past days that were fetched completely come from the cache, everything else is fetched.
    async fn load_entries(&self, day: NaiveDate, is_today: bool) -> Vec<LogEntry> {
        if self.options.use_cache && !is_today {
            match self.cache.is_day_cached(day).await {
                Ok(true) => {
                    self.progress
                        .set_message(format!("Loading logs from cache for {day}..."));
                    return match self.cache.get_entries_for(day).await {
                        Ok(entries) => {
                            if self.options.verbose {
                                self.print(format_args!(
                                    "\nLoaded {} log entries from cache for {day}.",
                                    entries.len()
                                ));
                            }
                            entries
                        }
                        Err(e) => {
                            self.report_error(format_args!("Error reading cache for {day}"), &e);
                            vec![]
                        }
                    };
                }
                Ok(false) => {}
                Err(e) => warn!("Couldn't check cache for {day}, fetching instead: {e:?}"),
            }
        }

        self.fetch_entries(day, is_today).await
    }

    async fn fetch_entries(&self, day: NaiveDate, is_today: bool) -> Vec<LogEntry> {
        self.progress
            .set_message(format!("Fetching logs for {day}..."));
        if self.options.verbose {
            self.print(format_args!("\nFetching logs for {day}..."));
        }

        let fetched = match self.day_window(day) {
            Ok((start, end)) => self.source.fetch(start, end).await,
            Err(e) => Err(e),
        };

        match fetched {
            Ok(FetchOutcome::NoEvents) => {
                // Nothing is written, so the day gets fetched again on the next run.
                debug!("Log source had no events for {day}");
                if self.options.verbose {
                    self.print(format_args!("Found 0 log entries."));
                }
                vec![]
            }
            Ok(FetchOutcome::Entries(entries)) => {
                if self.options.verbose {
                    self.print(format_args!("Found {} log entries.", entries.len()));
                }
                if let Err(e) = self.write_through(day, is_today, &entries).await {
                    error!("Failed to cache entries for {day}: {e:?}");
                }
                entries
            }
            Err(e) => {
                self.report_error(format_args!("Error fetching logs for {day}"), &e);
                vec![]
            }
        }
    }

    /// Today keeps changing, so it's never marked as fully cached.
    async fn write_through(&self, day: NaiveDate, is_today: bool, entries: &[LogEntry]) -> Result<()> {
        let added = self.cache.append_entries(day, entries).await?;
        debug!("Cached {added} new entries for {day}");
        if !is_today {
            self.cache.mark_day_cached(day).await?;
        }
        Ok(())
    }

    fn day_window(&self, day: NaiveDate) -> Result<(DateTime<FixedOffset>, DateTime<FixedOffset>)> {
        Ok((self.resolve(day_start(day))?, self.resolve(day_end(day))?))
    }

    fn resolve(&self, moment: NaiveDateTime) -> Result<DateTime<FixedOffset>> {
        self.tz
            .from_local_datetime(&moment)
            .earliest()
            .map(|v| v.fixed_offset())
            .ok_or_else(|| anyhow!("{moment} doesn't exist in the local timezone"))
    }

    fn carry_over_entry(&self, day: NaiveDate) -> LogEntry {
        match self.resolve(day_start(day)) {
            Ok(start) => LogEntry::carry_over_unlock(start.to_rfc3339()),
            Err(_) => LogEntry::carry_over_unlock_naive(day_start(day)),
        }
    }

    fn print(&self, line: impl Display) {
        self.progress.suspend(|| println!("{line}"));
    }

    fn report_error(&self, message: impl Display, e: &anyhow::Error) {
        error!("{message}: {e:?}");
        self.print(format_args!("{message}: {e:#}"));
    }
}
