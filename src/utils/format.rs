//! Human-scaled display formatting.
//!
//! Large dollar figures are rendered with a K/M/B suffix before export. The
//! historical implementation checked `> 1000` before the million/billion
//! branches, which makes the M and B suffixes unreachable; whether that was
//! intent or accident is unknowable from the source, so both orderings exist
//! and the active one is a configuration choice
//! (`formatter.legacy_suffix_order`).

use crate::table::{Cell, ColumnType, MetricsTable};

/// Branch ordering for the size suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuffixOrder {
    /// `>1000` wins first: everything above a thousand renders in K.
    Legacy,
    /// Largest magnitude wins first: B, then M, then K.
    Magnitude,
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Renders a numeric value as a display string under the chosen ordering.
/// Values at or below 1000 render as a plain 2-decimal-rounded number.
pub fn scale_value(v: f64, order: SuffixOrder) -> String {
    match order {
        SuffixOrder::Legacy => {
            if v > 1_000.0 {
                format!("{}K", round2(v / 1_000.0))
            } else if v > 1_000_000.0 {
                format!("{}M", round2(v / 1_000_000.0))
            } else if v > 1_000_000_000.0 {
                format!("{}B", round2(v / 1_000_000_000.0))
            } else {
                format!("{}", round2(v))
            }
        }
        SuffixOrder::Magnitude => {
            if v > 1_000_000_000.0 {
                format!("{}B", round2(v / 1_000_000_000.0))
            } else if v > 1_000_000.0 {
                format!("{}M", round2(v / 1_000_000.0))
            } else if v > 1_000.0 {
                format!("{}K", round2(v / 1_000.0))
            } else {
                format!("{}", round2(v))
            }
        }
    }
}

/// Rewrites every numeric cell of `column` as its display string and
/// re-declares the column as Text. Cells that are not numeric (already
/// formatted, or never populated) are left as they are. No numeric stage may
/// read the column afterwards.
pub fn format_column(table: &mut MetricsTable, column: &str, order: SuffixOrder) {
    for key in table.row_keys() {
        if let Some(v) = table.get(&key, column).and_then(|cell| cell.as_f64()) {
            table.set(&key, column, Cell::Text(scale_value(v, order)));
        }
    }
    table.retype_column(column, ColumnType::Text);
}

/// Inverse of the display scaling: parses explorer figures such as
/// `"$1.5K"`, `"12.3M"` or `"1,234.56"` back into raw numbers.
pub fn parse_scaled(value: &str) -> Option<f64> {
    let cleaned = value.trim().trim_start_matches('$').replace(',', "");
    let (number, multiplier) = match cleaned.chars().last()? {
        'K' | 'k' => (&cleaned[..cleaned.len() - 1], 1_000.0),
        'M' | 'm' => (&cleaned[..cleaned.len() - 1], 1_000_000.0),
        'B' | 'b' => (&cleaned[..cleaned.len() - 1], 1_000_000_000.0),
        _ => (cleaned.as_str(), 1.0),
    };
    number.trim().parse::<f64>().ok().map(|v| v * multiplier)
}
