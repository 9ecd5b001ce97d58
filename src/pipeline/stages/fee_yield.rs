//! LP trading-fee yield.
//!
//! Smooths TVL and 24h volume over the trailing window, pins the exchange
//! fee assumption, then computes the per-tier daily yield from today's raw
//! figures: `fee / (TVL + deposit) × 100`, zeroed whenever the fee or the
//! diluted TVL is non-positive.

use anyhow::Result;
use async_trait::async_trait;
use log::debug;

use crate::config::Settings;
use crate::pipeline::{columns, ColumnRef, Stage, StageContext};
use crate::table::{Cell, ColumnType};
use crate::utils::format_column;

use super::DAYS_IN_YEAR;

pub struct FeeYieldStage;

#[async_trait]
impl Stage for FeeYieldStage {
    fn name(&self) -> &'static str {
        "fee_yield"
    }

    fn requires(&self, _settings: &Settings) -> Vec<ColumnRef> {
        vec![
            ColumnRef::pool(columns::TVL),
            ColumnRef::pool(columns::VOLUME_24H),
            ColumnRef::pool(columns::LP_REWARD_FEE_24H),
        ]
    }

    async fn run(&self, ctx: &mut StageContext<'_>) -> Result<()> {
        let order = ctx.settings.formatter.suffix_order();

        for (avg_col, raw_col) in [
            (columns::AVERAGE_LIQUIDITY, columns::TVL),
            (columns::AVERAGE_VOLUME, columns::VOLUME_24H),
        ] {
            ctx.averages
                .add_column(avg_col, ColumnType::Float, Cell::Float(0.0));
            for key in ctx.averages.row_keys() {
                let value = ctx.averager.average(ctx.store, ctx.pool, &key, raw_col);
                ctx.averages.set(&key, avg_col, Cell::Float(value));
            }
            format_column(ctx.averages, avg_col, order);
        }

        ctx.averages
            .add_column(columns::EXCHANGE_FEE, ColumnType::Float, Cell::Float(0.0));
        let exchange_fee = ctx.settings.fees.exchange_fee_pct;
        for key in ctx.averages.row_keys() {
            ctx.averages
                .set(&key, columns::EXCHANGE_FEE, Cell::Float(exchange_fee));
        }

        for (tier, label) in ctx.tiers() {
            let pct_col = columns::basic_earning_pct(&label);
            let usd_col = columns::basic_earning_usd(&label);
            let bps_col = columns::basic_earning_bps(&label);
            ctx.pool
                .add_column(&pct_col, ColumnType::Float, Cell::Float(0.0));
            ctx.averages
                .add_column(&usd_col, ColumnType::Float, Cell::Float(0.0));
            ctx.averages
                .add_column(&bps_col, ColumnType::Float, Cell::Float(0.0));

            for key in ctx.pool.row_keys() {
                let fee = ctx
                    .pool
                    .get_f64(&key, columns::LP_REWARD_FEE_24H)
                    .unwrap_or(0.0);
                let tvl = ctx.pool.get_f64(&key, columns::TVL).unwrap_or(0.0) + tier;
                let pct = if fee <= 0.0 || tvl <= 0.0 {
                    0.0
                } else {
                    fee / tvl * 100.0
                };
                let annual = pct * DAYS_IN_YEAR;
                debug!("{key}: tier {label} daily fee yield {pct:.4}% ({annual:.2}% annualized)");
                ctx.pool.set(&key, &pct_col, Cell::Float(pct));
                ctx.averages
                    .set(&key, &usd_col, Cell::Float(tier * pct / 100.0));
                ctx.averages.set(&key, &bps_col, Cell::Float(pct * 100.0));
            }
            format_column(ctx.averages, &usd_col, order);
            format_column(ctx.averages, &bps_col, order);
        }
        Ok(())
    }
}
