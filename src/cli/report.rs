use std::{path::Path, time::Duration};

use anyhow::{Context, Result};
use chrono::Local;
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{
    analysis::range::{DayRangeWalker, WalkOptions},
    cache::day_cache::DayCacheImpl,
    log_source::system::SystemLogSource,
    utils::clock::DefaultClock,
};

use super::{output::summary::render_report, shutdown::InterruptListener};

/// A bit over a century.
const MAX_DAYS: i64 = 36_600;

#[derive(Debug, Clone, Copy, clap::Args)]
pub struct ReportCommand {
    #[arg(
        long,
        default_value_t = 7,
        value_parser = clap::value_parser!(u32).range(1..=MAX_DAYS),
        help = "Number of days back to calculate screen time for"
    )]
    days: u32,
    #[arg(short, long, help = "Print detailed session information for validation")]
    verbose: bool,
    #[arg(long = "no-cache", help = "Force refetching of all logs, ignoring the cache")]
    no_cache: bool,
}

/// Fetches or loads the requested days and prints the daily and monthly summary. An interrupt
/// stops fetching and prints whatever was collected.
pub async fn process_report_command(
    ReportCommand {
        days,
        verbose,
        no_cache,
    }: ReportCommand,
    cache_dir: &Path,
) -> Result<()> {
    let cache = DayCacheImpl::new(cache_dir.to_owned())
        .with_context(|| format!("Failed to open cache at {cache_dir:?}"))?;

    let progress = if verbose {
        ProgressBar::hidden()
    } else {
        spinner()?
    };

    let walker = DayRangeWalker::new(
        cache,
        SystemLogSource::default(),
        Box::new(DefaultClock),
        Local,
        WalkOptions {
            days,
            use_cache: !no_cache,
            verbose,
        },
    )
    .with_progress(progress.clone());

    let shutdown = CancellationToken::new();
    let interrupts = InterruptListener::install()?;
    let listener = tokio::spawn(interrupts.cancel_on_interrupt(shutdown.clone()));
    let report = walker.run(&shutdown).await;
    listener.abort();

    if report.interrupted {
        progress.abandon_with_message("Process interrupted by user.");
        println!("\n\nProcess interrupted by user. Displaying summary for data collected so far...");
    } else {
        progress.finish_with_message("Log processing complete.");
    }
    info!("Collected {} active day(s)", report.days.len());

    print!("{}", render_report(&report.days));
    Ok(())
}

fn spinner() -> Result<ProgressBar> {
    let progress = ProgressBar::new_spinner();
    progress.set_style(ProgressStyle::with_template("{spinner} {msg}")?);
    progress.set_message("Initializing...");
    progress.enable_steady_tick(Duration::from_millis(100));
    Ok(progress)
}
