//! Metric derivation pipeline.
//!
//! Derived metrics are computed by an ordered list of stages over two
//! tables: the raw per-pool table (today's fetched values, what gets
//! snapshotted) and the averages table (the smoothed, per-tier report that
//! ends up in `average.json`). Each stage declares the columns it reads so
//! that ordering mistakes surface as an explicit wiring error instead of a
//! silently zeroed report. A stage that fails at runtime is logged and the
//! remaining stages still run.

pub mod columns;
mod stages;

#[cfg(test)]
pub(crate) use stages::testutil;

pub use stages::{FeeYieldStage, HedgingCostStage, ImpermanentLossStage, MiningRewardStage};

use async_trait::async_trait;
use log::{error, info};

use crate::config::Settings;
use crate::error::ScreenerError;
use crate::sources::{MarketSource, MasterChefGlobals};
use crate::store::{RollingAverager, SnapshotStore};
use crate::table::MetricsTable;

/// Which of the two run tables a column lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableRef {
    Pool,
    Averages,
}

impl TableRef {
    fn name(self) -> &'static str {
        match self {
            TableRef::Pool => "pool",
            TableRef::Averages => "averages",
        }
    }
}

/// A column a stage depends on, qualified by table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    pub table: TableRef,
    pub column: String,
}

impl ColumnRef {
    pub fn pool(column: impl Into<String>) -> Self {
        Self {
            table: TableRef::Pool,
            column: column.into(),
        }
    }

    pub fn averages(column: impl Into<String>) -> Self {
        Self {
            table: TableRef::Averages,
            column: column.into(),
        }
    }
}

/// Farm-wide reward state fetched once per run, shared by the mining stage.
#[derive(Debug, Clone, Copy)]
pub struct FarmGlobals {
    pub chef: MasterChefGlobals,
    /// USD price of the reward token.
    pub platform_token_price: f64,
}

/// Everything a stage gets to work with for one run.
pub struct StageContext<'a> {
    pub settings: &'a Settings,
    pub store: &'a SnapshotStore,
    pub averager: &'a RollingAverager,
    pub market: &'a dyn MarketSource,
    /// None when the farm contract could not be read this run; the mining
    /// stage then leaves its columns at zero.
    pub farm: Option<FarmGlobals>,
    pub pool: &'a mut MetricsTable,
    pub averages: &'a mut MetricsTable,
}

impl StageContext<'_> {
    fn table(&self, which: TableRef) -> &MetricsTable {
        match which {
            TableRef::Pool => self.pool,
            TableRef::Averages => self.averages,
        }
    }

    /// Balance tiers with their column-name labels.
    pub fn tiers(&self) -> Vec<(f64, String)> {
        self.settings
            .balances
            .tiers
            .iter()
            .map(|&tier| (tier, columns::tier_label(tier)))
            .collect()
    }
}

/// One derivation step over the run tables.
#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;

    /// Columns this stage reads. Checked against the tables right before
    /// the stage runs, so a reordering that breaks a data dependency fails
    /// the run instead of producing a zeroed report.
    fn requires(&self, settings: &Settings) -> Vec<ColumnRef>;

    async fn run(&self, ctx: &mut StageContext<'_>) -> anyhow::Result<()>;
}

pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    /// The production stage order. Hedging runs before impermanent loss
    /// because the loss commission reads the hedge fee-rate columns.
    pub fn standard() -> Self {
        Self {
            stages: vec![
                Box::new(FeeYieldStage),
                Box::new(MiningRewardStage),
                Box::new(HedgingCostStage),
                Box::new(ImpermanentLossStage),
            ],
        }
    }

    pub fn with_stages(stages: Vec<Box<dyn Stage>>) -> Self {
        Self { stages }
    }

    pub async fn run(&self, ctx: &mut StageContext<'_>) -> Result<(), ScreenerError> {
        for stage in &self.stages {
            self.check_inputs(stage.as_ref(), ctx)?;
            info!("Running {} stage", stage.name());
            if let Err(e) = stage.run(ctx).await {
                error!("Stage {} failed: {e:#}", stage.name());
            }
        }
        Ok(())
    }

    fn check_inputs(&self, stage: &dyn Stage, ctx: &StageContext<'_>) -> Result<(), ScreenerError> {
        for wanted in stage.requires(ctx.settings) {
            if !ctx.table(wanted.table).has_column(&wanted.column) {
                return Err(ScreenerError::MissingColumn {
                    stage: stage.name(),
                    table: wanted.table.name(),
                    column: wanted.column,
                });
            }
        }
        Ok(())
    }
}
