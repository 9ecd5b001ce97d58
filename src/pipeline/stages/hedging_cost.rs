//! Delta-hedge instrument selection and fee cost.
//!
//! Fetches the live hedge catalog once, dumps it next to the snapshots, and
//! annotates each pool row with the chosen perpetual for every non-stable
//! side. The per-tier minimum fee assumes hedging half the deposit with a
//! round trip: `fee_rate/100 × 2 × tier/2`.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::warn;

use crate::config::Settings;
use crate::hedges::{is_stablecoin, unwrap_token_symbol, HedgeCatalog, HedgeQuote};
use crate::pipeline::columns::{self, Side};
use crate::pipeline::{ColumnRef, Stage, StageContext};
use crate::table::{Cell, ColumnType, MetricsTable};

pub struct HedgingCostStage;

const TEXT_FIELDS: [&str; 6] = [
    "exchange",
    "hedge_type",
    "base_currency",
    "symbol",
    "timestamp",
    "next_funding_rate_time",
];
const FLOAT_FIELDS: [&str; 3] = ["bid_price", "funding_rate", "fee_rate"];

fn declare_delta_columns(table: &mut MetricsTable, side: Side) {
    for field in TEXT_FIELDS {
        table.add_column(
            columns::token_delta(side, field),
            ColumnType::Text,
            Cell::Text(String::new()),
        );
    }
    for field in FLOAT_FIELDS {
        table.add_column(
            columns::token_delta(side, field),
            ColumnType::Float,
            Cell::Float(0.0),
        );
    }
}

fn format_time(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn write_quote(table: &mut MetricsTable, key: &str, side: Side, quote: &HedgeQuote, maker: bool) {
    let text = |field: &str, value: String| (columns::token_delta(side, field), Cell::Text(value));
    let cells = [
        text("exchange", quote.venue.to_string()),
        text("hedge_type", quote.kind.to_string()),
        text("base_currency", quote.base_currency.clone()),
        text("symbol", quote.symbol.clone()),
        text("timestamp", format_time(quote.timestamp)),
        text(
            "next_funding_rate_time",
            quote.next_funding_time.map(format_time).unwrap_or_default(),
        ),
        (
            columns::token_delta(side, "bid_price"),
            Cell::Float(quote.bid),
        ),
        (
            columns::token_delta(side, "funding_rate"),
            Cell::Float(quote.funding_rate.unwrap_or(0.0)),
        ),
        (
            columns::token_delta(side, "fee_rate"),
            Cell::Float(quote.fee_rate(maker)),
        ),
    ];
    for (column, cell) in cells {
        table.set(key, &column, cell);
    }
}

#[async_trait]
impl Stage for HedgingCostStage {
    fn name(&self) -> &'static str {
        "hedging_cost"
    }

    fn requires(&self, _settings: &Settings) -> Vec<ColumnRef> {
        vec![
            ColumnRef::averages(columns::TOKEN0_NAME),
            ColumnRef::averages(columns::TOKEN1_NAME),
        ]
    }

    async fn run(&self, ctx: &mut StageContext<'_>) -> Result<()> {
        let catalog = match HedgeCatalog::fetch(ctx.market).await {
            Ok(catalog) => catalog,
            Err(e) => {
                warn!("Hedge catalog unavailable, hedging costs stay at zero: {e:#}");
                return Ok(());
            }
        };
        if let Err(e) = catalog.dump(ctx.store.dir()) {
            warn!("Could not dump hedge catalog: {e:#}");
        }
        let maker = ctx.settings.fees.maker;

        for side in [Side::Zero, Side::One] {
            declare_delta_columns(ctx.averages, side);
        }
        for (_, label) in ctx.tiers() {
            for side in [Side::Zero, Side::One] {
                ctx.averages.add_column(
                    columns::delta_min_fees(&label, side),
                    ColumnType::Float,
                    Cell::Float(0.0),
                );
            }
            ctx.averages.add_column(
                columns::hedging_costs_usd(&label),
                ColumnType::Float,
                Cell::Float(0.0),
            );
        }

        let sides = [
            (Side::Zero, columns::TOKEN0_NAME),
            (Side::One, columns::TOKEN1_NAME),
        ];
        for (tier, label) in ctx.tiers() {
            for key in ctx.averages.row_keys() {
                for (side, name_col) in sides {
                    let Some(symbol) = ctx
                        .averages
                        .get(&key, name_col)
                        .and_then(|c| c.as_text())
                        .map(str::to_string)
                    else {
                        continue;
                    };
                    let base = unwrap_token_symbol(&symbol).to_uppercase();
                    if is_stablecoin(&base) {
                        continue;
                    }
                    let Some(quote) = catalog.best_hedge_for(&base) else {
                        continue;
                    };
                    write_quote(ctx.averages, &key, side, quote, maker);
                    let min_fees = quote.fee_rate(maker) / 100.0 * 2.0 * tier / 2.0;
                    ctx.averages.set(
                        &key,
                        &columns::delta_min_fees(&label, side),
                        Cell::Float(min_fees),
                    );
                }

                let total = ctx
                    .averages
                    .get_f64(&key, &columns::delta_min_fees(&label, Side::Zero))
                    .unwrap_or(0.0)
                    + ctx
                        .averages
                        .get_f64(&key, &columns::delta_min_fees(&label, Side::One))
                        .unwrap_or(0.0);
                ctx.averages.set(
                    &key,
                    &columns::hedging_costs_usd(&label),
                    Cell::Float(total),
                );
            }
        }
        Ok(())
    }
}
