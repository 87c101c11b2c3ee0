//! Query result models and their post-processing.

use std::collections::HashSet;

use serde_json::Value;

/// Rows fetched from one table, with the column names they are laid out by.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSet {
    /// Column names, one per cell of every row.
    pub columns: Vec<String>,
    /// Row data.
    pub rows: Vec<Vec<Value>>,
}

impl RowSet {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    /// Drops every column that holds `null` or `""` in at least one row.
    ///
    /// Completeness is judged over the whole result, so a column populated in
    /// most rows still disappears from all of them. An empty result keeps
    /// every column.
    pub fn retain_complete_columns(self) -> RowSet {
        let keep: Vec<usize> = (0..self.columns.len())
            .filter(|&i| {
                self.rows
                    .iter()
                    .all(|row| row.get(i).is_some_and(|v| !is_blank(v)))
            })
            .collect();

        let columns = keep.iter().map(|&i| self.columns[i].clone()).collect();
        let rows = self
            .rows
            .into_iter()
            .map(|row| keep.iter().map(|&i| row[i].clone()).collect())
            .collect();

        RowSet { columns, rows }
    }

    /// Header followed by the data rows, the layout of the `dados` field.
    pub fn into_table(self) -> Vec<Vec<Value>> {
        let header = self.columns.into_iter().map(Value::String).collect();
        std::iter::once(header).chain(self.rows).collect()
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Removes duplicate values, keeping the first occurrence of each.
///
/// Numbers compare by value, so `1` and `1.0` count as one.
pub fn distinct_values(values: impl IntoIterator<Item = Value>) -> Vec<Value> {
    let mut seen = HashSet::new();
    values
        .into_iter()
        .filter(|v| seen.insert(distinct_key(v)))
        .collect()
}

// Integral floats within the exact f64 range share the integer's key.
const EXACT_F64_INT: f64 = 9_007_199_254_740_992.0;

fn distinct_key(value: &Value) -> String {
    if let Value::Number(n) = value {
        if n.as_i64().is_none() && n.as_u64().is_none() {
            if let Some(f) = n.as_f64() {
                if f.is_finite() && f.fract() == 0.0 && f.abs() <= EXACT_F64_INT {
                    return (f as i64).to_string();
                }
            }
        }
    }
    value.to_string()
}
