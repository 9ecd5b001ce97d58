//! File-backed daily snapshot persistence and rolling-window averaging.

mod rolling;
mod snapshots;

pub use rolling::RollingAverager;
pub use snapshots::SnapshotStore;
