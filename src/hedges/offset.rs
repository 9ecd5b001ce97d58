//! Impermanent-loss hedge sizing.
//!
//! Closed-form sizing of a perpetual short that offsets impermanent loss for
//! a stable/vol pair, with the pool's earning rate as the carry term.

/// Price moves at or below this fraction are left unhedged.
pub const MOVE_THRESHOLD: f64 = 0.05;

/// Impermanent loss for a fractional price change `pct_price_change` over a
/// holding period `t` with per-period reserve growth rate `alpha`.
pub fn impermanent_loss(pct_price_change: f64, t: f64, alpha: f64) -> f64 {
    2.0 * (pct_price_change + 1.0).sqrt() * (alpha * t).exp() / (2.0 + pct_price_change) - 1.0
}

/// Notional of perpetual futures that hedges the impermanent loss from a
/// fractional price move `pct_price_change` on `principal` invested, with
/// carry rate `alpha` over horizon `t`. Negative means open a short.
/// Moves within [`MOVE_THRESHOLD`] return 0: no hedge is worth its fees.
pub fn hedge_notional(pct_price_change: f64, principal: f64, alpha: f64, t: f64) -> f64 {
    if pct_price_change.abs() > MOVE_THRESHOLD {
        -principal * pct_price_change.powi(2) / 4.0 * (alpha * t).exp()
    } else {
        0.0
    }
}
