//! Trailing-window average over daily snapshots.
//!
//! The window semantics are deliberate and a little unusual: a pool missing
//! from day `k` of the window ends accumulation early and the mean is taken
//! over the `k` days actually processed, not the configured window length.
//! Callers must read a 0.0 result as "no data", not "zero yield".

use chrono::Local;
use log::warn;

use crate::store::SnapshotStore;
use crate::table::MetricsTable;

pub struct RollingAverager {
    window_days: usize,
}

impl RollingAverager {
    pub fn new(window_days: usize) -> Self {
        Self { window_days }
    }

    pub fn window_days(&self) -> usize {
        self.window_days
    }

    /// Mean of `metric` for `pool_id` over the trailing window.
    ///
    /// The current table is flushed to today's snapshot first so that today
    /// participates in its own average. Walking most-recent-first:
    /// - pool absent on the first day → 0.0;
    /// - pool absent on day i > 0 → running sum / i;
    /// - a cell that fails to parse degrades the whole call to 0.0 (logged);
    /// - otherwise sum / number of snapshots actually read, which is less
    ///   than the configured window when history is short.
    pub fn average(
        &self,
        store: &SnapshotStore,
        table: &MetricsTable,
        pool_id: &str,
        metric: &str,
    ) -> f64 {
        let today = Local::now().date_naive();
        if let Err(e) = store.write(table, today) {
            warn!("Snapshot refresh failed, averaging over stale history: {e:#}");
        }

        let window = store.read_trailing_window(self.window_days);
        let mut sum = 0.0;
        for (day, rows) in window.iter().enumerate() {
            let Some(row) = rows.get(pool_id) else {
                if day == 0 {
                    return 0.0;
                }
                return sum / day as f64;
            };
            let Some(value) = row.get(metric).and_then(|cell| cell.as_f64()) else {
                warn!("Unreadable {metric} for {pool_id} in day-{day} snapshot, degrading average to 0");
                return 0.0;
            };
            sum += value;
        }

        if window.is_empty() {
            0.0
        } else {
            sum / window.len() as f64
        }
    }
}
