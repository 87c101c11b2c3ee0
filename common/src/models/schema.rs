//! Reflected schema snapshot.

use std::collections::BTreeMap;

use serde::Serialize;
use utoipa::ToSchema;

/// One reflected column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ColumnMeta {
    /// Column name as stored in the catalog.
    pub name: String,
    /// Catalog type name, usable in a `CAST(... AS <data_type>)`.
    pub data_type: String,
}

impl ColumnMeta {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }
}

/// Point-in-time mapping of table name to its columns in ordinal order.
///
/// Tables iterate in name order, so listings are stable across calls.
#[derive(Debug, Clone, Default)]
pub struct SchemaSnapshot {
    tables: BTreeMap<String, Vec<ColumnMeta>>,
}

impl SchemaSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a table.
    pub fn insert_table(&mut self, table: impl Into<String>, columns: Vec<ColumnMeta>) {
        self.tables.insert(table.into(), columns);
    }

    /// Table names in sorted order.
    pub fn table_names(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }

    pub fn contains_table(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    }

    /// Columns of `table`, if reflected.
    pub fn columns(&self, table: &str) -> Option<&[ColumnMeta]> {
        self.tables.get(table).map(Vec::as_slice)
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }
}

impl FromIterator<(String, ColumnMeta)> for SchemaSnapshot {
    /// Groups `(table, column)` pairs, keeping column order per table.
    fn from_iter<I: IntoIterator<Item = (String, ColumnMeta)>>(iter: I) -> Self {
        let mut snapshot = SchemaSnapshot::new();
        for (table, column) in iter {
            snapshot.tables.entry(table).or_default().push(column);
        }
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SchemaSnapshot {
        vec![
            ("orders".to_string(), ColumnMeta::new("id", "integer")),
            ("customers".to_string(), ColumnMeta::new("id", "integer")),
            ("orders".to_string(), ColumnMeta::new("status", "text")),
            ("orders".to_string(), ColumnMeta::new("total", "numeric(10,2)")),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_tables_are_sorted_and_unique() {
        let snapshot = sample();
        assert_eq!(snapshot.table_names(), vec!["customers", "orders"]);
        assert_eq!(snapshot.table_count(), 2);
    }

    #[test]
    fn test_column_order_is_preserved() {
        let snapshot = sample();
        assert_eq!(
            snapshot.columns("orders").unwrap(),
            &[
                ColumnMeta::new("id", "integer"),
                ColumnMeta::new("status", "text"),
                ColumnMeta::new("total", "numeric(10,2)"),
            ]
        );
        assert!(snapshot.columns("ghost").is_none());
    }

    #[test]
    fn test_empty_table_can_be_registered() {
        let mut snapshot = sample();
        snapshot.insert_table("audit", vec![]);
        assert!(snapshot.contains_table("audit"));
        assert!(snapshot.columns("audit").unwrap().is_empty());
    }
}
