//! Daily screener batch.
//!
//! One run fetches today's raw state for every farm pool (on-chain reserves
//! and farm parameters, explorer trading figures), snapshots it, then derives
//! the smoothed per-tier report through the stage pipeline and persists it as
//! `average.json`. Failures are contained at the smallest useful scope: a
//! pool that cannot be priced keeps zeroed figures, a failed persistence
//! leaves the run operating in memory.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use chrono::Local;
use log::{error, info, warn};

use crate::config::Settings;
use crate::pipeline::{columns, FarmGlobals, Pipeline, StageContext};
use crate::sources::{ChainSource, MarketSource, PoolInfo, PoolVolume, VolumeSource};
use crate::store::{RollingAverager, SnapshotStore};
use crate::table::{Cell, ColumnType, MetricsTable};
use crate::utils::format_column;

pub struct Screener {
    settings: Arc<Settings>,
    chain: Arc<dyn ChainSource>,
    volume: Arc<dyn VolumeSource>,
    market: Arc<dyn MarketSource>,
    store: SnapshotStore,
    averager: RollingAverager,
}

impl Screener {
    pub fn new(
        settings: Arc<Settings>,
        chain: Arc<dyn ChainSource>,
        volume: Arc<dyn VolumeSource>,
        market: Arc<dyn MarketSource>,
    ) -> Result<Self> {
        let store = SnapshotStore::new(settings.snapshots.data_dir.clone())?;
        let averager = RollingAverager::new(settings.snapshots.average_window_days);
        Ok(Self {
            settings,
            chain,
            volume,
            market,
            store,
            averager,
        })
    }

    pub async fn run(&self) -> Result<()> {
        let started = Instant::now();

        let mut pool = self.fetch_current_values().await?;
        let mut averages = pool.clone();
        let order = self.settings.formatter.suffix_order();
        for column in [
            columns::FARM_LIQUIDITY,
            columns::TVL,
            columns::LP_REWARD_FEE_24H,
            columns::VOLUME_24H,
        ] {
            format_column(&mut averages, column, order);
        }

        let farm = self.farm_globals().await;
        let mut ctx = StageContext {
            settings: &self.settings,
            store: &self.store,
            averager: &self.averager,
            market: self.market.as_ref(),
            farm,
            pool: &mut pool,
            averages: &mut averages,
        };
        Pipeline::standard().run(&mut ctx).await?;

        if let Err(e) = self.store.write_average(&averages) {
            error!("Could not persist the averages report: {e:#}");
        }
        info!(
            "Screener run over {} pools completed in {:.2?}",
            pool.len(),
            started.elapsed()
        );
        Ok(())
    }

    /// Builds today's raw table and snapshots it.
    async fn fetch_current_values(&self) -> Result<MetricsTable> {
        let pools = self.chain.enumerate_pools(self.settings.pool_limit()).await?;

        let mut table = MetricsTable::new();
        table.add_column(columns::INDEX, ColumnType::Float, Cell::Float(0.0));
        table.add_column(columns::ALLOC_POINT, ColumnType::Float, Cell::Float(0.0));
        table.add_column(columns::IS_REGULAR, ColumnType::Bool, Cell::Bool(true));
        for column in [
            columns::TOKEN0,
            columns::TOKEN0_NAME,
            columns::TOKEN1,
            columns::TOKEN1_NAME,
        ] {
            table.add_column(column, ColumnType::Text, Cell::Text(String::new()));
        }
        for column in [
            columns::VOLUME_24H,
            columns::LP_REWARD_FEE_24H,
            columns::TVL,
            columns::FARM_LIQUIDITY,
        ] {
            table.add_column(column, ColumnType::Float, Cell::Float(0.0));
        }

        for info in pools {
            if !table.add_row(&info.lp_token) {
                warn!("Duplicate farm entry for {}, keeping the first", info.lp_token);
                continue;
            }
            let key = info.lp_token.clone();
            table.set(&key, columns::INDEX, Cell::Float(info.index as f64));
            table.set(&key, columns::ALLOC_POINT, Cell::Float(info.alloc_point));
            table.set(&key, columns::IS_REGULAR, Cell::Bool(info.is_regular));
            table.set(&key, columns::TOKEN0, Cell::Text(info.token0.clone()));
            table.set(
                &key,
                columns::TOKEN0_NAME,
                Cell::Text(info.token0_symbol.clone()),
            );
            table.set(&key, columns::TOKEN1, Cell::Text(info.token1.clone()));
            table.set(
                &key,
                columns::TOKEN1_NAME,
                Cell::Text(info.token1_symbol.clone()),
            );

            let volume = match self.volume.volume_and_fee(&key).await {
                Ok(volume) => volume,
                Err(e) => {
                    warn!("No explorer figures for {key}: {e:#}");
                    PoolVolume::default()
                }
            };
            table.set(&key, columns::VOLUME_24H, Cell::Float(volume.volume_24h));
            table.set(&key, columns::LP_REWARD_FEE_24H, Cell::Float(volume.fee_24h));

            let (tvl, farm_liquidity) = self.liquidity_for(&info).await;
            table.set(&key, columns::TVL, Cell::Float(tvl));
            table.set(&key, columns::FARM_LIQUIDITY, Cell::Float(farm_liquidity));
        }

        if let Err(e) = self.store.write(&table, Local::now().date_naive()) {
            warn!("Could not snapshot today's pool table: {e:#}");
        }
        Ok(table)
    }

    /// USD value of the pair's reserves and the staked share of it.
    /// Prices via whichever side has a USDT pair, doubling that side's
    /// reserve value. A pool with no priceable side stays at zero.
    async fn liquidity_for(&self, info: &PoolInfo) -> (f64, f64) {
        let (reserve0, reserve1) = match self.chain.reserves(&info.lp_token).await {
            Ok(reserves) => reserves,
            Err(e) => {
                warn!("Could not read reserves for {}: {e:#}", info.lp_token);
                return (0.0, 0.0);
            }
        };

        let mut tvl = 0.0;
        for (token, reserve) in [(&info.token0, reserve0), (&info.token1, reserve1)] {
            match self.chain.token_usd_price(token).await {
                Ok(price) if price > 0.0 => {
                    tvl = price * reserve * 2.0;
                    break;
                }
                Ok(_) => {}
                Err(e) => warn!("Could not price {token}: {e:#}"),
            }
        }
        if tvl == 0.0 {
            warn!("No priceable side for pool {}", info.lp_token);
            return (0.0, 0.0);
        }

        match self.chain.lp_supply_and_stake(&info.lp_token).await {
            Ok((supply, staked)) if supply > 0.0 => (tvl, tvl / supply * staked),
            Ok(_) => (tvl, 0.0),
            Err(e) => {
                warn!("Could not read LP supply for {}: {e:#}", info.lp_token);
                (tvl, 0.0)
            }
        }
    }

    async fn farm_globals(&self) -> Option<FarmGlobals> {
        let chef = match self.chain.masterchef_globals().await {
            Ok(chef) => chef,
            Err(e) => {
                warn!("Could not read farm globals: {e:#}");
                return None;
            }
        };
        let platform_token_price = match self
            .chain
            .token_usd_price(&self.settings.chain.platform_token)
            .await
        {
            Ok(price) => price,
            Err(e) => {
                warn!("Could not price the platform token: {e:#}");
                return None;
            }
        };
        Some(FarmGlobals {
            chef,
            platform_token_price,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::testutil::{test_settings, FakeMarket};
    use crate::sources::MasterChefGlobals;
    use anyhow::anyhow;
    use async_trait::async_trait;

    struct FakeChain;

    #[async_trait]
    impl ChainSource for FakeChain {
        async fn enumerate_pools(&self, limit: Option<usize>) -> Result<Vec<PoolInfo>> {
            let pools = vec![
                PoolInfo {
                    index: 0,
                    lp_token: "0xpool".into(),
                    alloc_point: 10.0,
                    is_regular: true,
                    token0: "0xusdt".into(),
                    token0_symbol: "USDT".into(),
                    token1: "0xweth".into(),
                    token1_symbol: "WETH".into(),
                },
                PoolInfo {
                    index: 1,
                    lp_token: "0xdead".into(),
                    alloc_point: 0.0,
                    is_regular: true,
                    token0: "0xobscure".into(),
                    token0_symbol: "OBS".into(),
                    token1: "0xother".into(),
                    token1_symbol: "OTH".into(),
                },
            ];
            Ok(match limit {
                Some(limit) => pools.into_iter().take(limit).collect(),
                None => pools,
            })
        }

        async fn reserves(&self, pair: &str) -> Result<(f64, f64)> {
            match pair {
                "0xpool" => Ok((1_000.0, 2.0)),
                _ => Ok((5.0, 5.0)),
            }
        }

        async fn masterchef_globals(&self) -> Result<MasterChefGlobals> {
            Ok(MasterChefGlobals {
                total_regular_alloc: 100.0,
                total_special_alloc: 50.0,
                regular_reward_per_block: 40.0,
                special_reward_per_block: 4.0,
            })
        }

        async fn token_usd_price(&self, token: &str) -> Result<f64> {
            Ok(match token {
                "0xweth" => 2_000.0,
                "0xcake" => 2.0,
                _ => 0.0,
            })
        }

        async fn lp_supply_and_stake(&self, _pair: &str) -> Result<(f64, f64)> {
            Ok((100.0, 50.0))
        }
    }

    struct FakeVolume;

    #[async_trait]
    impl VolumeSource for FakeVolume {
        async fn volume_and_fee(&self, pool: &str) -> Result<PoolVolume> {
            if pool == "0xdead" {
                return Err(anyhow!("explorer has no page for {pool}"));
            }
            Ok(PoolVolume {
                volume_24h: 123.0,
                fee_24h: 4.5,
            })
        }
    }

    fn screener(tag: &str) -> Screener {
        let dir = std::env::temp_dir()
            .join(format!("sickle-screener-{tag}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let mut settings = test_settings(&[1000.0], dir.to_str().unwrap());
        settings.chain.platform_token = "0xcake".into();
        Screener::new(
            Arc::new(settings),
            Arc::new(FakeChain),
            Arc::new(FakeVolume),
            Arc::new(FakeMarket::default()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_prices_via_the_priceable_side() {
        let s = screener("fetch");
        let table = s.fetch_current_values().await.unwrap();

        // USDT has no USDT pair, so the WETH side prices the pool:
        // 2000 * 2.0 * 2 = 8000, with half the supply staked.
        assert_eq!(table.get_f64("0xpool", columns::TVL), Some(8_000.0));
        assert_eq!(table.get_f64("0xpool", columns::FARM_LIQUIDITY), Some(4_000.0));
        assert_eq!(table.get_f64("0xpool", columns::VOLUME_24H), Some(123.0));
        assert_eq!(table.get_f64("0xpool", columns::LP_REWARD_FEE_24H), Some(4.5));
    }

    #[tokio::test]
    async fn test_unpriceable_pool_keeps_zeroed_figures() {
        let s = screener("unpriceable");
        let table = s.fetch_current_values().await.unwrap();

        assert_eq!(table.get_f64("0xdead", columns::TVL), Some(0.0));
        assert_eq!(table.get_f64("0xdead", columns::FARM_LIQUIDITY), Some(0.0));
        assert_eq!(table.get_f64("0xdead", columns::VOLUME_24H), Some(0.0));
    }

    #[tokio::test]
    async fn test_debug_limit_caps_the_batch() {
        let dir = std::env::temp_dir()
            .join(format!("sickle-screener-limit-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let mut settings = test_settings(&[1000.0], dir.to_str().unwrap());
        settings.debug.enabled = true;
        settings.debug.pool_limit = 1;
        let s = Screener::new(
            Arc::new(settings),
            Arc::new(FakeChain),
            Arc::new(FakeVolume),
            Arc::new(FakeMarket::default()),
        )
        .unwrap();

        let table = s.fetch_current_values().await.unwrap();
        assert_eq!(table.len(), 1);
    }

    #[tokio::test]
    async fn test_run_persists_snapshot_and_report() {
        let s = screener("run");
        s.run().await.unwrap();

        let today = Local::now().date_naive();
        assert!(s.store.read(today).is_some());
        assert!(s.store.dir().join("average.json").exists());
    }
}
