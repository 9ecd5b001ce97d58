//! Numeric conversions for on-chain quantities.
//!
//! Reserve and reward amounts arrive as U256 wei values. Converting through
//! BigDecimal avoids the precision loss of a direct f64 cast for large
//! balances before the decimal adjustment is applied.

use alloy::primitives::U256;
use bigdecimal::BigDecimal;
use num_traits::ToPrimitive;
use once_cell::sync::Lazy;
use std::str::FromStr;

/// Decimal places used by the farm's LP and reward tokens.
pub const TOKEN_DECIMALS: u8 = 18;

static WEI_FACTOR: Lazy<BigDecimal> = Lazy::new(|| big_pow10(TOKEN_DECIMALS as u32));

fn big_pow10(exp: u32) -> BigDecimal {
    BigDecimal::from_str(&format!("1e{exp}")).expect("valid power of ten")
}

fn u256_to_f64_checked(value: U256, decimals: u8) -> Option<f64> {
    if decimals > 24 {
        return None;
    }
    let big = BigDecimal::from_str(&value.to_string()).ok()?;
    let adjusted = big / big_pow10(decimals as u32);
    adjusted.to_f64()
}

/// Convert a U256 to f64, shifting `decimals` places. Returns 0.0 when the
/// conversion fails rather than propagating: a zero reserve degrades the
/// affected row the same way missing data does.
pub fn u256_to_f64(value: U256, decimals: u8) -> f64 {
    u256_to_f64_checked(value, decimals).unwrap_or(0.0)
}

/// Convert an 18-decimal wei amount to f64.
pub fn wei_to_f64(value: U256) -> f64 {
    let big = match BigDecimal::from_str(&value.to_string()) {
        Ok(b) => b,
        Err(_) => return 0.0,
    };
    (big / &*WEI_FACTOR).to_f64().unwrap_or(0.0)
}
