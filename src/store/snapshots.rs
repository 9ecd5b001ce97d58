//! Flat-file snapshot store.
//!
//! One JSON file per calendar day holds the full pool table keyed by LP
//! token address (`pool_information-MM.DD.YYYY.json`), plus a single
//! always-overwritten `average.json` for the latest fully-derived table.
//! There is no database: trailing-window reads walk backwards from today
//! one file at a time.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Days, Local, NaiveDate};
use log::warn;

use crate::error::ScreenerError;
use crate::table::{MetricsTable, Rows};

const DAILY_PREFIX: &str = "pool_information";
const AVERAGE_FILE: &str = "average.json";

pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    /// Opens (and creates if needed) the snapshot directory.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, ScreenerError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn daily_path(&self, date: NaiveDate) -> PathBuf {
        self.dir
            .join(format!("{DAILY_PREFIX}-{}.json", date.format("%m.%d.%Y")))
    }

    /// Serializes the full table to the snapshot for `date`, overwriting any
    /// existing file for that day. Callers log the error and continue; a
    /// failed write only costs persistence, not the in-memory run.
    pub fn write(&self, table: &MetricsTable, date: NaiveDate) -> Result<(), ScreenerError> {
        let body = serde_json::to_vec(&table.to_rows())?;
        fs::write(self.daily_path(date), body)?;
        Ok(())
    }

    /// Persists the derived averages table to the single latest-run file.
    pub fn write_average(&self, table: &MetricsTable) -> Result<(), ScreenerError> {
        let body = serde_json::to_vec(&table.to_rows())?;
        fs::write(self.dir.join(AVERAGE_FILE), body)?;
        Ok(())
    }

    fn try_read(&self, date: NaiveDate) -> Result<Rows, ScreenerError> {
        let path = self.daily_path(date);
        if !path.exists() {
            return Err(ScreenerError::MissingHistory { date });
        }
        let body = fs::read(path)?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Snapshot for an exact date, or `None` when the file is absent or
    /// unreadable. Never fails: a corrupt day is logged and treated as
    /// missing history.
    pub fn read(&self, date: NaiveDate) -> Option<Rows> {
        match self.try_read(date) {
            Ok(rows) => Some(rows),
            Err(ScreenerError::MissingHistory { .. }) => None,
            Err(e) => {
                warn!("Discarding snapshot for {date}: {e:#}");
                None
            }
        }
    }

    /// Snapshots for `today, today-1, ...`, most-recent-first, stopping at
    /// the first missing day. A gap truncates the window; days beyond it are
    /// not read even if their files exist. Returns fewer than `max_days`
    /// entries when history is short.
    pub fn read_trailing_window(&self, max_days: usize) -> Vec<Rows> {
        let today = Local::now().date_naive();
        let mut window = Vec::new();
        for offset in 0..max_days {
            let Some(date) = today.checked_sub_days(Days::new(offset as u64)) else {
                break;
            };
            match self.read(date) {
                Some(rows) => window.push(rows),
                None => break,
            }
        }
        window
    }
}
