//! Column names shared between the fetch step and the derivation stages.
//!
//! The raw table columns keep their snapshot-file names so that every
//! historical snapshot stays readable by the rolling averager. Per-tier
//! columns embed the tier label, because each hypothetical deposit size
//! dilutes the pool differently.

// Raw per-pool columns written by the fetch step.
pub const INDEX: &str = "index";
pub const TVL: &str = "TVL";
pub const FARM_LIQUIDITY: &str = "Farm_Liquidity";
pub const VOLUME_24H: &str = "volume_24h";
pub const LP_REWARD_FEE_24H: &str = "lp_reward_fee_24h";
pub const ALLOC_POINT: &str = "allocPoint";
pub const IS_REGULAR: &str = "isRegular";
pub const TOKEN0: &str = "token0";
pub const TOKEN0_NAME: &str = "token0_name";
pub const TOKEN1: &str = "token1";
pub const TOKEN1_NAME: &str = "token1_name";

// Smoothed columns in the averages table.
pub const AVERAGE_LIQUIDITY: &str = "average_daily_liquidity_of_pool_in_$";
pub const AVERAGE_VOLUME: &str = "average_daily_trading_volume_of_pool_in_$";
pub const EXCHANGE_FEE: &str = "exchange_fee%";
pub const TOTAL_POOL_SIZE: &str = "total_liquidity_pool_size_in_$";

/// Label a balance tier contributes to its column names.
pub fn tier_label(tier: f64) -> String {
    format!("{tier}")
}

pub fn basic_earning_pct(tier: &str) -> String {
    format!("{tier}_daily_basic_earning_in_%")
}

pub fn basic_earning_usd(tier: &str) -> String {
    format!("{tier}_daily_basic_earning_in_$")
}

pub fn basic_earning_bps(tier: &str) -> String {
    format!("{tier}_daily_basic_earning_in_BPS")
}

pub fn mining_reward(tier: &str) -> String {
    format!("{tier}_Mining_Reward")
}

pub fn mining_reward_annual(tier: &str) -> String {
    format!("{tier}_Mining_Reward_Annually")
}

pub fn mining_reward_bps(tier: &str) -> String {
    format!("{tier}_daily_mining_reward_in_BPS")
}

pub fn mining_reward_usd(tier: &str) -> String {
    format!("{tier}_daily_mining_reward_in_$")
}

/// Pair side for the hedge columns, named after the pair contract's token
/// ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Zero,
    One,
}

impl Side {
    pub fn label(self) -> &'static str {
        match self {
            Side::Zero => "zero",
            Side::One => "one",
        }
    }
}

pub fn token_delta(side: Side, field: &str) -> String {
    format!("token_{}_delta_{field}", side.label())
}

pub fn delta_min_fees(tier: &str, side: Side) -> String {
    format!("{tier}_token_{}_delta_hedge_min_fees", side.label())
}

pub fn hedging_costs_usd(tier: &str) -> String {
    format!("{tier}_base_hedging_costs_in_$")
}

pub fn loss_amount_to_short(tier: &str) -> String {
    format!("{tier}_impermanent_loss_in_amount_to_short")
}

pub fn loss_downside_covered(tier: &str) -> String {
    format!("{tier}_impermanent_loss_downside_covered")
}

pub fn loss_commission(tier: &str) -> String {
    format!("{tier}_impermanent_loss_commission_charge")
}
