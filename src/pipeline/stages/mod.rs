mod fee_yield;
mod hedging_cost;
mod impermanent_loss;
mod mining_reward;

pub use fee_yield::FeeYieldStage;
pub use hedging_cost::HedgingCostStage;
pub use impermanent_loss::ImpermanentLossStage;
pub use mining_reward::MiningRewardStage;

/// BSC block cadence, blocks per day.
pub(crate) const DAILY_BLOCKS: f64 = 28_800.0;
pub(crate) const DAYS_IN_YEAR: f64 = 365.0;

#[cfg(test)]
pub(crate) mod testutil {
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;

    use crate::config::{
        BalanceSettings, ChainSettings, DebugSettings, ExplorerSettings, FeeSettings,
        FormatterSettings, ImpermanentLossSettings, MarketSettings, Settings, SnapshotSettings,
    };
    use crate::hedges::HedgeQuote;
    use crate::pipeline::{columns, FarmGlobals, StageContext};
    use crate::sources::MarketSource;
    use crate::store::{RollingAverager, SnapshotStore};
    use crate::table::{Cell, ColumnType, MetricsTable};

    #[derive(Default)]
    pub(crate) struct FakeMarket {
        pub hedges: Vec<HedgeQuote>,
        pub fail_hedges: bool,
        /// Fractional move returned for every asset; None simulates an asset
        /// with no spot history.
        pub pct_move: Option<f64>,
    }

    #[async_trait]
    impl MarketSource for FakeMarket {
        async fn active_hedges(&self) -> Result<Vec<HedgeQuote>> {
            if self.fail_hedges {
                return Err(anyhow!("venue unreachable"));
            }
            Ok(self.hedges.clone())
        }

        async fn volatility_move(
            &self,
            asset: &str,
            _lookback_days: usize,
            _num_devs: f64,
        ) -> Result<f64> {
            self.pct_move
                .ok_or_else(|| anyhow!("no close history for {asset}"))
        }
    }

    pub(crate) fn test_settings(tiers: &[f64], data_dir: &str) -> Settings {
        Settings {
            snapshots: SnapshotSettings {
                data_dir: data_dir.to_string(),
                average_window_days: 6,
            },
            balances: BalanceSettings {
                tiers: tiers.to_vec(),
            },
            chain: ChainSettings {
                node_url: "http://localhost:8545".into(),
                masterchef: "0xa5f8c5dbd5f286960b9d90548680ae5ebff07652".into(),
                factory: "0xca143ce32fe78f1f7019d7d551a6402fc5350c73".into(),
                usdt: "0x55d398326f99059ff775485246999027b3197955".into(),
                platform_token: "0x0e09fabb73bd3ade0a17ecc321fd13a19e81ce82".into(),
            },
            explorer: ExplorerSettings {
                base_url: "http://localhost/info/pairs".into(),
            },
            market: MarketSettings::default(),
            debug: DebugSettings::default(),
            fees: FeeSettings::default(),
            impermanent_loss: ImpermanentLossSettings::default(),
            formatter: FormatterSettings::default(),
        }
    }

    pub(crate) struct Fixture {
        pub settings: Settings,
        pub store: SnapshotStore,
        pub averager: RollingAverager,
        pub market: FakeMarket,
        pub farm: Option<FarmGlobals>,
        pub pool: MetricsTable,
        pub averages: MetricsTable,
    }

    impl Fixture {
        pub fn new(tag: &str, tiers: &[f64]) -> Self {
            let dir = std::env::temp_dir()
                .join(format!("sickle-stage-{tag}-{}", std::process::id()));
            let _ = std::fs::remove_dir_all(&dir);
            let settings = test_settings(tiers, dir.to_str().unwrap());
            let averager = RollingAverager::new(settings.snapshots.average_window_days);
            Self {
                store: SnapshotStore::new(dir.clone()).unwrap(),
                averager,
                settings,
                market: FakeMarket::default(),
                farm: None,
                pool: MetricsTable::new(),
                averages: MetricsTable::new(),
            }
        }

        /// Seeds one pool row in both tables the way the fetch step would,
        /// with the farm liquidity defaulting to the TVL.
        pub fn add_pool(
            &mut self,
            key: &str,
            token0_name: &str,
            token1_name: &str,
            tvl: f64,
            volume: f64,
            fee: f64,
        ) {
            for table in [&mut self.pool, &mut self.averages] {
                table.add_column(columns::TVL, ColumnType::Float, Cell::Float(0.0));
                table.add_column(columns::VOLUME_24H, ColumnType::Float, Cell::Float(0.0));
                table.add_column(columns::LP_REWARD_FEE_24H, ColumnType::Float, Cell::Float(0.0));
                table.add_column(columns::FARM_LIQUIDITY, ColumnType::Float, Cell::Float(0.0));
                table.add_column(columns::ALLOC_POINT, ColumnType::Float, Cell::Float(0.0));
                table.add_column(columns::IS_REGULAR, ColumnType::Bool, Cell::Bool(true));
                table.add_column(columns::TOKEN0_NAME, ColumnType::Text, Cell::Text(String::new()));
                table.add_column(columns::TOKEN1_NAME, ColumnType::Text, Cell::Text(String::new()));
                table.add_row(key);
                table.set(key, columns::TVL, Cell::Float(tvl));
                table.set(key, columns::VOLUME_24H, Cell::Float(volume));
                table.set(key, columns::LP_REWARD_FEE_24H, Cell::Float(fee));
                table.set(key, columns::FARM_LIQUIDITY, Cell::Float(tvl));
                table.set(key, columns::TOKEN0_NAME, Cell::Text(token0_name.into()));
                table.set(key, columns::TOKEN1_NAME, Cell::Text(token1_name.into()));
            }
        }

        pub fn ctx(&mut self) -> StageContext<'_> {
            StageContext {
                settings: &self.settings,
                store: &self.store,
                averager: &self.averager,
                market: &self.market,
                farm: self.farm,
                pool: &mut self.pool,
                averages: &mut self.averages,
            }
        }
    }
}
