//! Farm emission rewards.
//!
//! Computes each pool's share of the reward-token emission at today's farm
//! state, then smooths it over the snapshot window. Regular and special
//! pools draw from separate emission buckets. All reward figures are diluted
//! by the hypothetical deposit.

use anyhow::Result;
use async_trait::async_trait;
use log::warn;

use crate::config::Settings;
use crate::pipeline::{columns, ColumnRef, FarmGlobals, Stage, StageContext};
use crate::table::{Cell, ColumnType};
use crate::utils::format_column;

use super::{DAILY_BLOCKS, DAYS_IN_YEAR};

pub struct MiningRewardStage;

/// Annualized emission yield in percent for one pool at one deposit size.
fn pool_apr(
    token_price: f64,
    reward_per_block: f64,
    liquidity: f64,
    alloc_point: f64,
    total_alloc: f64,
) -> f64 {
    if liquidity == 0.0 || total_alloc <= 0.0 {
        return 0.0;
    }
    let blocks_per_year = DAILY_BLOCKS * DAYS_IN_YEAR;
    token_price * (alloc_point / total_alloc) * reward_per_block * blocks_per_year / liquidity
        * 100.0
}

impl MiningRewardStage {
    fn current_rewards(&self, ctx: &mut StageContext<'_>, farm: FarmGlobals) {
        for (tier, label) in ctx.tiers() {
            let daily_col = columns::mining_reward(&label);
            let annual_col = columns::mining_reward_annual(&label);

            for key in ctx.pool.row_keys() {
                let is_regular = ctx
                    .pool
                    .get(&key, columns::IS_REGULAR)
                    .and_then(|c| c.as_bool())
                    .unwrap_or(true);
                let (reward, total_alloc) = if is_regular {
                    (
                        farm.chef.regular_reward_per_block,
                        farm.chef.total_regular_alloc,
                    )
                } else {
                    (
                        farm.chef.special_reward_per_block,
                        farm.chef.total_special_alloc,
                    )
                };
                let liquidity =
                    ctx.pool.get_f64(&key, columns::FARM_LIQUIDITY).unwrap_or(0.0) + tier;
                let alloc = ctx.pool.get_f64(&key, columns::ALLOC_POINT).unwrap_or(0.0);

                let apr = pool_apr(
                    farm.platform_token_price,
                    reward,
                    liquidity,
                    alloc,
                    total_alloc,
                );
                ctx.pool.set(&key, &annual_col, Cell::Float(apr));
                ctx.pool
                    .set(&key, &daily_col, Cell::Float(apr / DAYS_IN_YEAR));
            }
        }
    }
}

#[async_trait]
impl Stage for MiningRewardStage {
    fn name(&self) -> &'static str {
        "mining_reward"
    }

    fn requires(&self, _settings: &Settings) -> Vec<ColumnRef> {
        vec![
            ColumnRef::pool(columns::FARM_LIQUIDITY),
            ColumnRef::pool(columns::ALLOC_POINT),
            ColumnRef::pool(columns::IS_REGULAR),
        ]
    }

    async fn run(&self, ctx: &mut StageContext<'_>) -> Result<()> {
        let order = ctx.settings.formatter.suffix_order();

        ctx.averages
            .add_column(columns::TOTAL_POOL_SIZE, ColumnType::Float, Cell::Float(0.0));
        for key in ctx.averages.row_keys() {
            let value = ctx
                .averager
                .average(ctx.store, ctx.pool, &key, columns::FARM_LIQUIDITY);
            ctx.averages
                .set(&key, columns::TOTAL_POOL_SIZE, Cell::Float(value));
        }
        format_column(ctx.averages, columns::TOTAL_POOL_SIZE, order);

        for (_, label) in ctx.tiers() {
            ctx.pool.add_column(
                columns::mining_reward(&label),
                ColumnType::Float,
                Cell::Float(0.0),
            );
            ctx.pool.add_column(
                columns::mining_reward_annual(&label),
                ColumnType::Float,
                Cell::Float(0.0),
            );
        }

        match ctx.farm {
            Some(farm) => self.current_rewards(ctx, farm),
            None => warn!("Farm globals unavailable, mining rewards stay at zero"),
        }

        for (tier, label) in ctx.tiers() {
            let bps_col = columns::mining_reward_bps(&label);
            let usd_col = columns::mining_reward_usd(&label);
            ctx.averages
                .add_column(&bps_col, ColumnType::Float, Cell::Float(0.0));
            ctx.averages
                .add_column(&usd_col, ColumnType::Float, Cell::Float(0.0));

            let daily_col = columns::mining_reward(&label);
            for key in ctx.averages.row_keys() {
                let smoothed = ctx.averager.average(ctx.store, ctx.pool, &key, &daily_col);
                ctx.averages
                    .set(&key, &bps_col, Cell::Float(smoothed * 100.0));
                ctx.averages
                    .set(&key, &usd_col, Cell::Float(tier * smoothed / 100.0));
            }
            format_column(ctx.averages, &bps_col, order);
            format_column(ctx.averages, &usd_col, order);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::Fixture;
    use super::*;
    use crate::pipeline::FarmGlobals;
    use crate::sources::MasterChefGlobals;
    use crate::table::Cell;

    fn farm() -> FarmGlobals {
        FarmGlobals {
            chef: MasterChefGlobals {
                total_regular_alloc: 100.0,
                total_special_alloc: 50.0,
                regular_reward_per_block: 40.0,
                special_reward_per_block: 4.0,
            },
            platform_token_price: 2.0,
        }
    }

    #[tokio::test]
    async fn test_emission_yield_formula() {
        let mut f = Fixture::new("mine-apr", &[1000.0]);
        f.add_pool("0xaaa", "USDT", "WETH", 9_000.0, 0.0, 0.0);
        f.pool.set("0xaaa", columns::ALLOC_POINT, Cell::Float(10.0));
        f.farm = Some(farm());
        MiningRewardStage.run(&mut f.ctx()).await.unwrap();

        // 2 * (10/100) * 40 * 28800 * 365 / (9000 + 1000) * 100 = 840960 APR
        assert_eq!(
            f.pool.get_f64("0xaaa", "1000_Mining_Reward_Annually"),
            Some(840_960.0)
        );
        assert_eq!(f.pool.get_f64("0xaaa", "1000_Mining_Reward"), Some(2_304.0));
        // Only today's snapshot exists, so the smoothed figures equal today's.
        assert_eq!(
            f.averages.get("0xaaa", "1000_daily_mining_reward_in_BPS"),
            Some(&Cell::Text("230.4K".into()))
        );
        assert_eq!(
            f.averages.get("0xaaa", "1000_daily_mining_reward_in_$"),
            Some(&Cell::Text("23.04K".into()))
        );
    }

    #[tokio::test]
    async fn test_special_pools_use_special_emission() {
        let mut f = Fixture::new("mine-special", &[1000.0]);
        f.add_pool("0xaaa", "USDT", "WETH", 9_000.0, 0.0, 0.0);
        f.pool.set("0xaaa", columns::ALLOC_POINT, Cell::Float(10.0));
        f.pool.set("0xaaa", columns::IS_REGULAR, Cell::Bool(false));
        f.farm = Some(farm());
        MiningRewardStage.run(&mut f.ctx()).await.unwrap();

        // 2 * (10/50) * 4 * 28800 * 365 / 10000 * 100 = 168192 APR
        assert_eq!(
            f.pool.get_f64("0xaaa", "1000_Mining_Reward_Annually"),
            Some(168_192.0)
        );
    }

    #[tokio::test]
    async fn test_missing_farm_globals_leaves_zero() {
        let mut f = Fixture::new("mine-nofarm", &[1000.0]);
        f.add_pool("0xaaa", "USDT", "WETH", 9_000.0, 0.0, 0.0);
        MiningRewardStage.run(&mut f.ctx()).await.unwrap();

        assert_eq!(f.pool.get_f64("0xaaa", "1000_Mining_Reward"), Some(0.0));
        assert_eq!(
            f.averages.get("0xaaa", "1000_daily_mining_reward_in_$"),
            Some(&Cell::Text("0".into()))
        );
    }

    #[tokio::test]
    async fn test_zero_total_alloc_degrades_to_zero() {
        let mut f = Fixture::new("mine-noalloc", &[1000.0]);
        f.add_pool("0xaaa", "USDT", "WETH", 9_000.0, 0.0, 0.0);
        f.pool.set("0xaaa", columns::ALLOC_POINT, Cell::Float(10.0));
        let mut globals = farm();
        globals.chef.total_regular_alloc = 0.0;
        f.farm = Some(globals);
        MiningRewardStage.run(&mut f.ctx()).await.unwrap();

        assert_eq!(f.pool.get_f64("0xaaa", "1000_Mining_Reward"), Some(0.0));
    }
}
