//! Utility functions for the screener.
//!
//! - [`conversion`] - wei/U256 to f64 conversions with decimal handling
//! - [`format`] - human-scaled display formatting (K/M/B) and its inverse

mod conversion;
mod format;

pub use conversion::{u256_to_f64, wei_to_f64, TOKEN_DECIMALS};
pub use format::{format_column, parse_scaled, scale_value, SuffixOrder};
