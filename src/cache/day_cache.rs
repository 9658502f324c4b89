use std::{
    collections::HashSet,
    future::Future,
    io::ErrorKind,
    ops::Deref,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use fs4::tokio::AsyncFileExt;
use serde::{de::DeserializeOwned, Serialize};
use tokio::{
    fs::File,
    io::{AsyncBufReadExt, AsyncReadExt, AsyncSeekExt, AsyncWriteExt, BufReader},
};
use tracing::{debug, warn};

use crate::{log_source::entities::LogEntry, utils::time::date_to_record_name};

const ENTRIES_DIR: &str = "entries";
const FETCHED_DAYS_FILE: &str = "fetched_days";

/// Interface for abstracting the cache of raw log entries.
pub trait DayCache {
    /// Whether the day was fetched completely and can be served from the cache.
    fn is_day_cached(&self, day: NaiveDate) -> impl Future<Output = Result<bool>>;

    /// Retrieves all cached entries for a certain day.
    fn get_entries_for(&self, day: NaiveDate) -> impl Future<Output = Result<Vec<LogEntry>>>;

    /// Stores entries that aren't cached yet. Returns how many were added.
    fn append_entries(
        &self,
        day: NaiveDate,
        entries: &[LogEntry],
    ) -> impl Future<Output = Result<usize>>;

    fn mark_day_cached(&self, day: NaiveDate) -> impl Future<Output = Result<()>>;
}

impl<T: Deref> DayCache for T
where
    T::Target: DayCache,
{
    fn is_day_cached(&self, day: NaiveDate) -> impl Future<Output = Result<bool>> {
        self.deref().is_day_cached(day)
    }

    fn get_entries_for(&self, day: NaiveDate) -> impl Future<Output = Result<Vec<LogEntry>>> {
        self.deref().get_entries_for(day)
    }

    fn append_entries(
        &self,
        day: NaiveDate,
        entries: &[LogEntry],
    ) -> impl Future<Output = Result<usize>> {
        self.deref().append_entries(day, entries)
    }

    fn mark_day_cached(&self, day: NaiveDate) -> impl Future<Output = Result<()>> {
        self.deref().mark_day_cached(day)
    }
}

/// The main realization of [DayCache].
pub struct DayCacheImpl {
    cache_dir: PathBuf,
}

impl DayCacheImpl {
    pub fn new(cache_dir: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(cache_dir.join(ENTRIES_DIR))?;

        Ok(Self { cache_dir })
    }

    /// Removes the whole cache. Returns false if there was nothing to remove.
    pub fn clear(cache_dir: &Path) -> Result<bool> {
        match std::fs::remove_dir_all(cache_dir) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {cache_dir:?}")),
        }
    }

    fn entries_path(&self, day: NaiveDate) -> PathBuf {
        self.cache_dir
            .join(ENTRIES_DIR)
            .join(date_to_record_name(day))
    }

    fn fetched_days_path(&self) -> PathBuf {
        self.cache_dir.join(FETCHED_DAYS_FILE)
    }
}

impl DayCache for DayCacheImpl {
    async fn is_day_cached(&self, day: NaiveDate) -> Result<bool> {
        let days = read_lines::<NaiveDate>(&self.fetched_days_path()).await?;
        Ok(days.contains(&day))
    }

    async fn get_entries_for(&self, day: NaiveDate) -> Result<Vec<LogEntry>> {
        read_lines(&self.entries_path(day)).await
    }

    async fn append_entries(&self, day: NaiveDate, entries: &[LogEntry]) -> Result<usize> {
        append_unique_lines(&self.entries_path(day), entries).await
    }

    async fn mark_day_cached(&self, day: NaiveDate) -> Result<()> {
        append_unique_lines(&self.fetched_days_path(), &[day]).await?;
        Ok(())
    }
}

/// Reads a JSON-lines file under a shared lock. A missing file is empty.
async fn read_lines<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    async fn extract<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, std::io::Error> {
        debug!("Extracting {path:?}");
        let file = File::open(path).await?;
        file.lock_shared()?;
        let buffer = BufReader::new(file);
        let mut lines = buffer.lines();
        let mut values = vec![];
        while let Ok(Some(v)) = lines.next_line().await {
            if v.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<T>(&v) {
                Ok(v) => values.push(v),
                Err(e) => {
                    // ignore illegal values. Might happen after an interrupted write
                    warn!(
                        "During parsing in path {:?} found illegal json string {}:  {e}",
                        path, &v
                    )
                }
            }
        }

        lines.into_inner().into_inner().unlock_async().await?;

        Ok(values)
    }

    match extract(path).await {
        Ok(s) => Ok(s),
        Err(e) => {
            if e.kind() == ErrorKind::NotFound {
                Ok(vec![])
            } else {
                Err(e).with_context(|| format!("Failed to read {path:?}"))
            }
        }
    }
}

/// Appends values to a JSON-lines file under an exclusive lock, skipping lines that are already
/// present.
async fn append_unique_lines<T: Serialize>(path: &Path, values: &[T]) -> Result<usize> {
    let mut file = File::options()
        .write(true)
        .create(true)
        .read(true)
        .truncate(false)
        .open(path)
        .await
        .with_context(|| format!("Failed to open {path:?}"))?;

    // Semi-safe acquire-release for a file
    file.lock_exclusive()?;
    let result = append_with_file(&mut file, values).await;
    file.unlock_async().await?;
    result
}

async fn append_with_file<T: Serialize>(file: &mut File, values: &[T]) -> Result<usize> {
    let mut existing = String::new();
    file.read_to_string(&mut existing).await?;

    let mut known = existing
        .lines()
        .map(str::to_owned)
        .collect::<HashSet<_>>();

    let mut buffer = Vec::<u8>::new();
    // A previous write might have been cut off.
    if !existing.is_empty() && !existing.ends_with('\n') {
        buffer.push(b'\n');
    }

    let mut added = 0;
    for value in values {
        let line = serde_json::to_string(value)?;
        if known.insert(line.clone()) {
            buffer.extend_from_slice(line.as_bytes());
            buffer.push(b'\n');
            added += 1;
        }
    }

    if added > 0 {
        file.seek(std::io::SeekFrom::End(0)).await?;
        file.write_all(&buffer).await?;
        file.flush().await?;
    }
    Ok(added)
}
