pub mod output;
pub mod report;
pub mod shutdown;

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Parser;
use report::{process_report_command, ReportCommand};
use tracing::level_filters::LevelFilter;

use crate::{
    cache::day_cache::DayCacheImpl,
    utils::{
        dir::create_application_default_path,
        logging::{enable_logging, CLI_PREFIX},
    },
};

#[derive(Parser, Debug)]
#[command(name = "TimeBuddy", version, long_about = None)]
#[command(about = "Estimates daily screen time from screen lock and unlock events", long_about = None)]
struct Args {
    #[command(flatten)]
    report: ReportCommand,
    #[arg(long = "clear-cache", help = "Delete the cache and exit")]
    clear_cache: bool,
    #[arg(
        long,
        help = "Application directory. By default uses ~/Library/Application Support/TimeBuddy on macOS, $XDG_STATE_HOME or $HOME/.local/state elsewhere"
    )]
    dir: Option<PathBuf>,
    #[arg(long, help = "Enable logging")]
    log: bool,
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let app_dir = match args.dir {
        Some(dir) => {
            std::fs::create_dir_all(&dir)?;
            dir
        }
        None => create_application_default_path()?,
    };

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    enable_logging(CLI_PREFIX, &app_dir, logging_level, args.log)?;

    let cache_dir = app_dir.join("cache");
    if args.clear_cache {
        return clear_cache(&cache_dir);
    }

    process_report_command(args.report, &cache_dir).await
}

fn clear_cache(cache_dir: &Path) -> Result<()> {
    if DayCacheImpl::clear(cache_dir)? {
        println!("Cache '{}' has been deleted.", cache_dir.display());
    } else {
        println!("No cache to delete.");
    }
    Ok(())
}
