//! In-memory per-pool metrics table.
//!
//! Rows are pools keyed by LP token address, columns are named metric series
//! added on demand by the derivation stages. Storage is struct-of-arrays:
//! each column owns one `Vec<Cell>` aligned to the row order, so adding a
//! column back-fills every existing row with the column's declared default
//! and adding a row extends every column with its default.
//!
//! Row order is insertion order. Pool keys are unique; inserting an existing
//! key is a no-op.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Declared type of a metric column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Float,
    Text,
    Bool,
}

/// A single table cell.
///
/// Serializes untagged so snapshot files read as plain JSON scalars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Bool(bool),
    Float(f64),
    Text(String),
}

impl Cell {
    /// Numeric view of a cell. Text cells are parsed after stripping a
    /// trailing percent sign (explorer figures arrive as e.g. `"0.17%"`).
    /// Display strings carrying a K/M/B suffix do not parse here; callers
    /// treat that as a degraded row.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Float(v) => Some(*v),
            Cell::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Cell::Text(s) => {
                let trimmed = s.trim();
                let trimmed = trimmed.strip_suffix('%').unwrap_or(trimmed);
                trimmed.trim().parse::<f64>().ok()
            }
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Cell::Bool(b) => Some(*b),
            Cell::Float(v) => Some(*v != 0.0),
            Cell::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
struct Column {
    ty: ColumnType,
    default: Cell,
    cells: Vec<Cell>,
}

/// Snapshot-shaped view of a table: `pool id -> { column -> cell }`.
pub type Rows = FxHashMap<String, FxHashMap<String, Cell>>;

#[derive(Debug, Clone, Default)]
pub struct MetricsTable {
    keys: Vec<String>,
    key_index: FxHashMap<String, usize>,
    /// Column insertion order, used when materializing rows.
    names: Vec<String>,
    columns: FxHashMap<String, Column>,
}

impl MetricsTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Appends a row for `key`, filling every existing column with its
    /// default. Returns false (and leaves the table untouched) if the key
    /// already exists.
    pub fn add_row(&mut self, key: impl Into<String>) -> bool {
        let key = key.into();
        if self.key_index.contains_key(&key) {
            return false;
        }
        self.key_index.insert(key.clone(), self.keys.len());
        self.keys.push(key);
        for name in &self.names {
            let column = self.columns.get_mut(name).expect("column registered");
            let default = column.default.clone();
            column.cells.push(default);
        }
        true
    }

    /// Declares a column, back-filling `default` for all current rows.
    /// Idempotent by name: an existing column is left untouched.
    pub fn add_column(&mut self, name: impl Into<String>, ty: ColumnType, default: Cell) {
        let name = name.into();
        if self.columns.contains_key(&name) {
            return;
        }
        let cells = vec![default.clone(); self.keys.len()];
        self.columns.insert(name.clone(), Column { ty, default, cells });
        self.names.push(name);
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn column_type(&self, name: &str) -> Option<ColumnType> {
        self.columns.get(name).map(|c| c.ty)
    }

    /// Re-declares a column's type, e.g. after display formatting turns a
    /// Float series into Text.
    pub fn retype_column(&mut self, name: &str, ty: ColumnType) {
        if let Some(column) = self.columns.get_mut(name) {
            column.ty = ty;
        }
    }

    pub fn set(&mut self, key: &str, column: &str, value: Cell) -> bool {
        let Some(&row) = self.key_index.get(key) else {
            return false;
        };
        let Some(col) = self.columns.get_mut(column) else {
            return false;
        };
        col.cells[row] = value;
        true
    }

    pub fn get(&self, key: &str, column: &str) -> Option<&Cell> {
        let row = *self.key_index.get(key)?;
        self.columns.get(column)?.cells.get(row)
    }

    /// Numeric cell lookup; missing rows/columns and unparsable text all
    /// surface as `None`.
    pub fn get_f64(&self, key: &str, column: &str) -> Option<f64> {
        self.get(key, column)?.as_f64()
    }

    /// Row keys in insertion order, cloned so stages can mutate the table
    /// while iterating.
    pub fn row_keys(&self) -> Vec<String> {
        self.keys.clone()
    }

    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    /// Materializes the table into the snapshot row shape.
    pub fn to_rows(&self) -> Rows {
        let mut rows = Rows::default();
        for (idx, key) in self.keys.iter().enumerate() {
            let mut row = FxHashMap::default();
            for name in &self.names {
                row.insert(name.clone(), self.columns[name].cells[idx].clone());
            }
            rows.insert(key.clone(), row);
        }
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_with_rows() -> MetricsTable {
        let mut t = MetricsTable::new();
        t.add_row("0xaaa");
        t.add_row("0xbbb");
        t
    }

    #[test]
    fn test_add_column_backfills_default() {
        let mut t = table_with_rows();
        t.add_column("tvl", ColumnType::Float, Cell::Float(0.0));
        assert_eq!(t.get_f64("0xaaa", "tvl"), Some(0.0));
        assert_eq!(t.get_f64("0xbbb", "tvl"), Some(0.0));
    }

    #[test]
    fn test_add_column_is_idempotent() {
        let mut t = table_with_rows();
        t.add_column("tvl", ColumnType::Float, Cell::Float(0.0));
        t.set("0xaaa", "tvl", Cell::Float(42.0));
        // Re-declaring must not clobber existing values.
        t.add_column("tvl", ColumnType::Float, Cell::Float(0.0));
        assert_eq!(t.get_f64("0xaaa", "tvl"), Some(42.0));
    }

    #[test]
    fn test_new_row_gets_defaults_for_existing_columns() {
        let mut t = table_with_rows();
        t.add_column("symbol", ColumnType::Text, Cell::Text(String::new()));
        t.add_row("0xccc");
        assert_eq!(t.get("0xccc", "symbol"), Some(&Cell::Text(String::new())));
    }

    #[test]
    fn test_duplicate_row_key_rejected() {
        let mut t = table_with_rows();
        assert!(!t.add_row("0xaaa"));
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn test_row_order_is_insertion_order() {
        let t = table_with_rows();
        assert_eq!(t.row_keys(), vec!["0xaaa".to_string(), "0xbbb".to_string()]);
    }

    #[test]
    fn test_set_unknown_row_or_column_is_rejected() {
        let mut t = table_with_rows();
        t.add_column("tvl", ColumnType::Float, Cell::Float(0.0));
        assert!(!t.set("0xzzz", "tvl", Cell::Float(1.0)));
        assert!(!t.set("0xaaa", "missing", Cell::Float(1.0)));
    }

    #[test]
    fn test_cell_parses_percent_strings() {
        assert_eq!(Cell::Text("0.17%".into()).as_f64(), Some(0.17));
        assert_eq!(Cell::Text(" 12.5 ".into()).as_f64(), Some(12.5));
        assert_eq!(Cell::Text("1.5K".into()).as_f64(), None);
    }

    #[test]
    fn test_cell_json_roundtrip_is_untagged() {
        let json = serde_json::to_string(&Cell::Float(1.25)).unwrap();
        assert_eq!(json, "1.25");
        let back: Cell = serde_json::from_str("\"CAKE\"").unwrap();
        assert_eq!(back, Cell::Text("CAKE".into()));
        let flag: Cell = serde_json::from_str("true").unwrap();
        assert_eq!(flag, Cell::Bool(true));
    }

    #[test]
    fn test_to_rows_carries_every_column() {
        let mut t = table_with_rows();
        t.add_column("tvl", ColumnType::Float, Cell::Float(0.0));
        t.add_column("token0_name", ColumnType::Text, Cell::Text(String::new()));
        t.set("0xaaa", "tvl", Cell::Float(5.0));
        let rows = t.to_rows();
        assert_eq!(rows["0xaaa"]["tvl"], Cell::Float(5.0));
        assert_eq!(rows["0xbbb"]["token0_name"], Cell::Text(String::new()));
    }
}
