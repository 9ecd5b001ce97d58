//! Delta-hedge instruments and pair classification.
//!
//! A [`HedgeQuote`] is a live derivatives quote (perpetual or fixed-delivery)
//! usable to offset a pool token's spot exposure. The [`HedgeCatalog`] is the
//! per-run set of active quotes, fetched once from the market-data
//! collaborator at the start of the hedging stage; quotes are never persisted
//! across days.

mod offset;

pub use offset::{hedge_notional, impermanent_loss, MOVE_THRESHOLD};

use anyhow::Result;
use chrono::{DateTime, Utc};
use log::info;
use serde::Serialize;

use crate::sources::MarketSource;

/// Instrument style of a hedge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HedgeKind {
    Perpetual,
    Delivery,
}

impl std::fmt::Display for HedgeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HedgeKind::Perpetual => write!(f, "Perpetual"),
            HedgeKind::Delivery => write!(f, "Delivery"),
        }
    }
}

/// Supported derivatives venues with their fee schedules (percent per side).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Venue {
    Okx,
}

impl Venue {
    pub fn maker_fee_pct(&self) -> f64 {
        match self {
            Venue::Okx => 0.08,
        }
    }

    pub fn taker_fee_pct(&self) -> f64 {
        match self {
            Venue::Okx => 0.10,
        }
    }
}

impl std::fmt::Display for Venue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Venue::Okx => write!(f, "Okx"),
        }
    }
}

/// A live quote for one hedging instrument.
#[derive(Debug, Clone, Serialize)]
pub struct HedgeQuote {
    pub venue: Venue,
    pub kind: HedgeKind,
    /// Underlying asset symbol, e.g. `ETH` for `ETH-USDT-SWAP`.
    pub base_currency: String,
    pub symbol: String,
    pub bid: f64,
    pub ask: f64,
    pub timestamp: DateTime<Utc>,
    pub funding_rate: Option<f64>,
    pub next_funding_time: Option<DateTime<Utc>>,
    /// None for perpetuals.
    pub days_to_expiration: Option<i64>,
    pub expiration: Option<DateTime<Utc>>,
}

impl HedgeQuote {
    pub fn is_perp(&self) -> bool {
        self.kind == HedgeKind::Perpetual
    }

    /// Fee rate in percent for the configured fee-accounting mode.
    pub fn fee_rate(&self, maker: bool) -> f64 {
        if maker {
            self.venue.maker_fee_pct()
        } else {
            self.venue.taker_fee_pct()
        }
    }
}

/// The set of currently active hedge instruments across supported venues.
pub struct HedgeCatalog {
    quotes: Vec<HedgeQuote>,
}

impl HedgeCatalog {
    /// Fetches every active instrument from the market-data collaborator.
    pub async fn fetch(market: &dyn MarketSource) -> Result<Self> {
        let quotes = market.active_hedges().await?;
        info!("Hedge catalog loaded with {} instruments", quotes.len());
        Ok(Self { quotes })
    }

    pub fn from_quotes(quotes: Vec<HedgeQuote>) -> Self {
        Self { quotes }
    }

    pub fn quotes(&self) -> &[HedgeQuote] {
        &self.quotes
    }

    /// First active perpetual matching the base asset symbol, if any.
    /// Quote freshness and multi-venue ranking are the collaborator's
    /// responsibility; the first match wins here.
    pub fn best_hedge_for(&self, base_asset: &str) -> Option<&HedgeQuote> {
        self.quotes
            .iter()
            .find(|q| q.is_perp() && q.base_currency == base_asset)
    }

    /// Dumps the full catalog next to the snapshots for later inspection.
    pub fn dump(&self, dir: &std::path::Path) -> Result<()> {
        let body = serde_json::to_vec(&self.quotes)?;
        std::fs::write(dir.join("delta_hedges.json"), body)?;
        Ok(())
    }
}

const STABLECOINS: [&str; 5] = ["USDC", "TUSD", "BUSD", "DAI", "USDT"];

pub fn is_stablecoin(symbol: &str) -> bool {
    STABLECOINS.contains(&symbol)
}

/// True when exactly one side of the pair is a stablecoin.
pub fn is_stable_and_vol_pair(name_zero: &str, name_one: &str) -> bool {
    is_stablecoin(name_zero) != is_stablecoin(name_one)
}

/// The volatile side of a stable/vol pair, `None` for any other pairing.
pub fn vol_token<'a>(name_zero: &'a str, name_one: &'a str) -> Option<&'a str> {
    if is_stablecoin(name_zero) && !is_stablecoin(name_one) {
        Some(name_one)
    } else if !is_stablecoin(name_zero) && is_stablecoin(name_one) {
        Some(name_zero)
    } else {
        None
    }
}

/// Strips the wrapper prefix from wrapped tokens such as WETH or WBNB.
pub fn unwrap_token_symbol(symbol: &str) -> &str {
    if symbol.len() >= 4 && symbol.starts_with('W') {
        &symbol[1..]
    } else {
        symbol
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn perp(base: &str) -> HedgeQuote {
        HedgeQuote {
            venue: Venue::Okx,
            kind: HedgeKind::Perpetual,
            base_currency: base.to_string(),
            symbol: format!("{base}-USDT-SWAP"),
            bid: 100.0,
            ask: 100.1,
            timestamp: Utc::now(),
            funding_rate: Some(0.0001),
            next_funding_time: None,
            days_to_expiration: None,
            expiration: None,
        }
    }

    #[test]
    fn test_stable_vol_pair_detection() {
        assert!(is_stable_and_vol_pair("USDC", "ETH"));
        assert_eq!(vol_token("USDC", "ETH"), Some("ETH"));
        assert!(!is_stable_and_vol_pair("USDC", "USDT"));
        assert!(!is_stable_and_vol_pair("ETH", "BTC"));
        assert_eq!(vol_token("USDC", "USDT"), None);
        assert_eq!(vol_token("ETH", "BTC"), None);
    }

    #[test]
    fn test_unwrap_token_symbol() {
        assert_eq!(unwrap_token_symbol("WBNB"), "BNB");
        assert_eq!(unwrap_token_symbol("WETH"), "ETH");
        // Short names keep their W: "WOO" is not wrapped "OO".
        assert_eq!(unwrap_token_symbol("WOO"), "WOO");
        assert_eq!(unwrap_token_symbol("CAKE"), "CAKE");
    }

    #[test]
    fn test_best_hedge_prefers_first_matching_perp() {
        let mut delivery = perp("ETH");
        delivery.kind = HedgeKind::Delivery;
        delivery.symbol = "ETH-USDT-220930".into();
        let catalog =
            HedgeCatalog::from_quotes(vec![delivery, perp("ETH"), perp("ETH"), perp("BNB")]);
        let best = catalog.best_hedge_for("ETH").unwrap();
        assert!(best.is_perp());
        assert_eq!(best.symbol, "ETH-USDT-SWAP");
        assert!(catalog.best_hedge_for("CAKE").is_none());
    }

    #[test]
    fn test_fee_rate_follows_accounting_mode() {
        let quote = perp("ETH");
        assert_eq!(quote.fee_rate(true), 0.08);
        assert_eq!(quote.fee_rate(false), 0.10);
    }
}
