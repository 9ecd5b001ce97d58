//! External data collaborators.
//!
//! The screener core only depends on the three traits here; the live
//! implementations talk to a BSC JSON-RPC node ([`chain`]), the pool
//! explorer's info endpoint ([`explorer`]) and the OKX/Binance public REST
//! APIs ([`market`]). All of them are best-effort: a failed call degrades
//! the affected rows to zero instead of aborting the batch.

mod chain;
mod explorer;
mod market;

pub use chain::BscChain;
pub use explorer::ExplorerScraper;
pub use market::LiveMarketData;

use anyhow::Result;
use async_trait::async_trait;

use crate::hedges::HedgeQuote;

/// One staked pool as enumerated from the farming contract.
#[derive(Debug, Clone)]
pub struct PoolInfo {
    pub index: u64,
    /// LP token (pair) address; the stable join key across snapshots.
    pub lp_token: String,
    pub alloc_point: f64,
    pub is_regular: bool,
    pub token0: String,
    pub token0_symbol: String,
    pub token1: String,
    pub token1_symbol: String,
}

/// Farm-wide reward parameters read from the MasterChef contract.
#[derive(Debug, Clone, Copy)]
pub struct MasterChefGlobals {
    pub total_regular_alloc: f64,
    pub total_special_alloc: f64,
    /// Reward-token emission per block, already adjusted from wei.
    pub regular_reward_per_block: f64,
    pub special_reward_per_block: f64,
}

/// 24h trading figures for one pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct PoolVolume {
    pub volume_24h: f64,
    pub fee_24h: f64,
}

/// On-chain reads: pool enumeration, reserves, farm globals, USD pricing.
#[async_trait]
pub trait ChainSource: Send + Sync {
    /// Enumerates staked pools, optionally capped (debug pool limit).
    /// Pools whose pair or token metadata cannot be read are skipped.
    async fn enumerate_pools(&self, limit: Option<usize>) -> Result<Vec<PoolInfo>>;

    /// Pair reserves adjusted to whole tokens (18 decimals).
    async fn reserves(&self, pair: &str) -> Result<(f64, f64)>;

    async fn masterchef_globals(&self) -> Result<MasterChefGlobals>;

    /// Token price in USD terms derived from its USDT pair, 0.0 when no
    /// such pair exists.
    async fn token_usd_price(&self, token: &str) -> Result<f64>;

    /// LP token total supply and the amount staked in the farming contract,
    /// in raw units (only their ratio is used).
    async fn lp_supply_and_stake(&self, pair: &str) -> Result<(f64, f64)>;
}

/// Explorer-scraped 24h trading volume and LP fee per pool.
#[async_trait]
pub trait VolumeSource: Send + Sync {
    async fn volume_and_fee(&self, pool: &str) -> Result<PoolVolume>;
}

/// Derivatives market data: hedge instruments and volatility history.
#[async_trait]
pub trait MarketSource: Send + Sync {
    /// Every currently tradable hedge instrument across supported venues.
    async fn active_hedges(&self) -> Result<Vec<HedgeQuote>>;

    /// The fractional price move corresponding to `num_devs` standard
    /// deviations from the asset's `lookback_days` rolling mean.
    async fn volatility_move(&self, asset: &str, lookback_days: usize, num_devs: f64)
        -> Result<f64>;
}
