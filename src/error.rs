//! Error taxonomy for the screener core.
//!
//! The policy throughout is "best-effort complete table": missing history or
//! market data degrades the affected cells to zero, row-scoped failures
//! default that row's outputs, and persistence failures leave the run
//! operating on in-memory state only. The one exception is
//! [`ScreenerError::MissingColumn`], a stage wiring bug, which aborts the
//! derivation pipeline.

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScreenerError {
    /// No snapshot exists for the requested day. Averages over a window
    /// containing this day truncate or degrade to zero.
    #[error("no snapshot history for {date}")]
    MissingHistory { date: NaiveDate },

    /// No hedge instrument or volatility history for an asset. The row's
    /// hedging and impermanent-loss columns stay at their defaults.
    #[error("no market data for asset {asset}")]
    MissingMarketData { asset: String },

    /// Arithmetic or lookup failure scoped to a single pool row.
    #[error("row {pool}: {reason}")]
    RowComputation { pool: String, reason: String },

    /// Snapshot file read/write failure. Logged by callers; the run
    /// continues and final persistence may be lost.
    #[error("snapshot persistence failed: {0}")]
    Persistence(#[from] std::io::Error),

    /// Snapshot file exists but does not parse as a pool table.
    #[error("snapshot decode failed: {0}")]
    Decode(#[from] serde_json::Error),

    /// A derivation stage declared an input column that no earlier stage
    /// produced. This is a pipeline wiring bug, not a data problem.
    #[error("stage {stage} requires column {column} missing from the {table} table")]
    MissingColumn {
        stage: &'static str,
        table: &'static str,
        column: String,
    },
}

impl ScreenerError {
    pub fn row(pool: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::RowComputation {
            pool: pool.into(),
            reason: reason.into(),
        }
    }
}
