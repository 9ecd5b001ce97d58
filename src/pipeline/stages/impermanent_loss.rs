//! Impermanent-loss hedge sizing.
//!
//! For every stable/vol pair, prices an adverse move of the volatile token
//! (a configurable number of standard deviations off its rolling mean) and
//! sizes the short that offsets the resulting impermanent loss over a fixed
//! horizon. Vol/vol pairs are left alone; how to treat their joint move is
//! still an open modelling question.

use anyhow::Result;
use async_trait::async_trait;
use log::warn;

use crate::config::Settings;
use crate::error::ScreenerError;
use crate::hedges::{hedge_notional, unwrap_token_symbol, vol_token};
use crate::pipeline::columns::{self, Side};
use crate::pipeline::{ColumnRef, Stage, StageContext};
use crate::table::{Cell, ColumnType};

/// Days the hedge is assumed to stay on while fees accrue.
const HEDGE_HORIZON_DAYS: f64 = 50.0;

pub struct ImpermanentLossStage;

#[async_trait]
impl Stage for ImpermanentLossStage {
    fn name(&self) -> &'static str {
        "impermanent_loss"
    }

    fn requires(&self, settings: &Settings) -> Vec<ColumnRef> {
        let mut wanted = vec![
            ColumnRef::averages(columns::TOKEN0_NAME),
            ColumnRef::averages(columns::TOKEN1_NAME),
            ColumnRef::averages(columns::token_delta(Side::Zero, "fee_rate")),
            ColumnRef::averages(columns::token_delta(Side::One, "fee_rate")),
        ];
        for tier in &settings.balances.tiers {
            let label = columns::tier_label(*tier);
            wanted.push(ColumnRef::averages(columns::basic_earning_bps(&label)));
        }
        wanted
    }

    async fn run(&self, ctx: &mut StageContext<'_>) -> Result<()> {
        let lookback = ctx.settings.impermanent_loss.lookback_days;
        let devs = ctx.settings.impermanent_loss.std_devs;
        let tiers = ctx.tiers();

        for (_, label) in &tiers {
            for column in [
                columns::loss_amount_to_short(label),
                columns::loss_downside_covered(label),
                columns::loss_commission(label),
            ] {
                ctx.averages
                    .add_column(column, ColumnType::Float, Cell::Float(0.0));
            }
        }

        for key in ctx.averages.row_keys() {
            let name = |col: &str| {
                ctx.averages
                    .get(&key, col)
                    .and_then(|c| c.as_text())
                    .map(|s| unwrap_token_symbol(s).to_uppercase())
            };
            let (Some(zero), Some(one)) =
                (name(columns::TOKEN0_NAME), name(columns::TOKEN1_NAME))
            else {
                continue;
            };
            let Some(vol) = vol_token(&zero, &one) else {
                continue;
            };

            let pct_move = match ctx.market.volatility_move(vol, lookback, devs).await {
                Ok(pct_move) => pct_move,
                Err(e) => {
                    let err = ScreenerError::MissingMarketData {
                        asset: vol.to_string(),
                    };
                    warn!("{err}, skipping {key}: {e:#}");
                    continue;
                }
            };
            let vol_side = if vol == zero { Side::Zero } else { Side::One };
            let fee_rate = ctx
                .averages
                .get_f64(&key, &columns::token_delta(vol_side, "fee_rate"))
                .unwrap_or(0.0);

            for (tier, label) in &tiers {
                let bps_col = columns::basic_earning_bps(label);
                let Some(alpha_bps) = ctx.averages.get_f64(&key, &bps_col) else {
                    let err = ScreenerError::row(
                        &key,
                        format!("tier {label} fee yield is a display string"),
                    );
                    warn!("{err}, skipping loss sizing");
                    continue;
                };
                let alpha = alpha_bps / 100.0;
                let hedge = hedge_notional(-pct_move, *tier, alpha, HEDGE_HORIZON_DAYS);

                ctx.averages.set(
                    &key,
                    &columns::loss_amount_to_short(label),
                    Cell::Float(hedge),
                );
                ctx.averages.set(
                    &key,
                    &columns::loss_downside_covered(label),
                    Cell::Float(-pct_move),
                );
                ctx.averages.set(
                    &key,
                    &columns::loss_commission(label),
                    Cell::Float(hedge * fee_rate * 2.0),
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::Fixture;
    use super::*;

    fn seeded(tag: &str, tier: f64, bps_cell: Cell, fee_rate: f64) -> Fixture {
        let mut f = Fixture::new(tag, &[tier]);
        f.add_pool("0xaaa", "USDT", "WETH", 5_000.0, 0.0, 0.0);
        let label = columns::tier_label(tier);
        f.averages.add_column(
            columns::basic_earning_bps(&label),
            ColumnType::Float,
            Cell::Float(0.0),
        );
        f.averages
            .set("0xaaa", &columns::basic_earning_bps(&label), bps_cell);
        for side in [Side::Zero, Side::One] {
            f.averages.add_column(
                columns::token_delta(side, "fee_rate"),
                ColumnType::Float,
                Cell::Float(0.0),
            );
        }
        f.averages.set(
            "0xaaa",
            &columns::token_delta(Side::One, "fee_rate"),
            Cell::Float(fee_rate),
        );
        f
    }

    #[tokio::test]
    async fn test_small_move_needs_no_hedge() {
        let mut f = seeded("il-small", 1000.0, Cell::Float(10.0), 0.08);
        f.market.pct_move = Some(0.03);
        ImpermanentLossStage.run(&mut f.ctx()).await.unwrap();

        assert_eq!(
            f.averages
                .get_f64("0xaaa", "1000_impermanent_loss_in_amount_to_short"),
            Some(0.0)
        );
        assert_eq!(
            f.averages
                .get_f64("0xaaa", "1000_impermanent_loss_downside_covered"),
            Some(-0.03)
        );
        assert_eq!(
            f.averages
                .get_f64("0xaaa", "1000_impermanent_loss_commission_charge"),
            Some(0.0)
        );
    }

    #[tokio::test]
    async fn test_reference_hedge_sizing() {
        // alpha = 10 BPS / 100 = 0.1; hedge = -(P * m^2 / 4) * e^(alpha * t)
        let mut f = seeded("il-ref", 1_000_000.0, Cell::Float(10.0), 0.08);
        f.market.pct_move = Some(0.10);
        ImpermanentLossStage.run(&mut f.ctx()).await.unwrap();

        let expected = -(1_000_000.0 * 0.01 / 4.0) * (0.1_f64 * 50.0).exp();
        let hedge = f
            .averages
            .get_f64("0xaaa", "1000000_impermanent_loss_in_amount_to_short")
            .unwrap();
        assert!((hedge - expected).abs() < 1e-6);
        let commission = f
            .averages
            .get_f64("0xaaa", "1000000_impermanent_loss_commission_charge")
            .unwrap();
        assert!((commission - hedge * 0.08 * 2.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_vol_vol_pair_is_skipped() {
        let mut f = Fixture::new("il-volvol", &[1000.0]);
        f.add_pool("0xaaa", "WETH", "WBNB", 5_000.0, 0.0, 0.0);
        f.averages.add_column(
            columns::basic_earning_bps("1000"),
            ColumnType::Float,
            Cell::Float(10.0),
        );
        f.market.pct_move = Some(0.10);
        ImpermanentLossStage.run(&mut f.ctx()).await.unwrap();

        assert_eq!(
            f.averages
                .get_f64("0xaaa", "1000_impermanent_loss_in_amount_to_short"),
            Some(0.0)
        );
    }

    #[tokio::test]
    async fn test_missing_volatility_history_skips_row() {
        let mut f = seeded("il-nohist", 1000.0, Cell::Float(10.0), 0.08);
        f.market.pct_move = None;
        ImpermanentLossStage.run(&mut f.ctx()).await.unwrap();

        assert_eq!(
            f.averages
                .get_f64("0xaaa", "1000_impermanent_loss_downside_covered"),
            Some(0.0)
        );
    }

    #[tokio::test]
    async fn test_suffixed_yield_string_skips_tier() {
        // A fee yield formatted as "1.5K" BPS cannot be read back numerically.
        let mut f = seeded("il-suffix", 1000.0, Cell::Text("1.5K".into()), 0.08);
        f.market.pct_move = Some(0.10);
        ImpermanentLossStage.run(&mut f.ctx()).await.unwrap();

        assert_eq!(
            f.averages
                .get_f64("0xaaa", "1000_impermanent_loss_in_amount_to_short"),
            Some(0.0)
        );
    }
}
