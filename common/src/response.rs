//! Success bodies of the `/connect` endpoints.
//!
//! Field names are part of the public contract with existing clients and are
//! kept as they are (`usuario`, `banco`, `tabelas`, ...).

use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

use crate::models::RowSet;

/// Body of `GET /connect/{user}/{password}/{database}`.
#[derive(Debug, Serialize, ToSchema)]
pub struct TablesResponse {
    pub message: String,
    /// Connected user.
    pub usuario: String,
    /// Connected database.
    pub banco: String,
    /// Table names.
    pub tabelas: Vec<String>,
}

impl TablesResponse {
    pub fn new(user: impl Into<String>, database: impl Into<String>, tables: Vec<String>) -> Self {
        Self {
            message: "Dados recebidos com sucesso!".to_string(),
            usuario: user.into(),
            banco: database.into(),
            tabelas: tables,
        }
    }
}

/// Body of `GET /connect/columns/...`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ColumnsResponse {
    pub message: String,
    pub tabela: String,
    /// Column names in ordinal order.
    pub colunas: Vec<String>,
}

impl ColumnsResponse {
    pub fn new(table: impl Into<String>, columns: Vec<String>) -> Self {
        let table = table.into();
        Self {
            message: format!("Colunas da tabela {table} recebidas com sucesso!"),
            tabela: table,
            colunas: columns,
        }
    }
}

/// Body of `GET /connect/data/...`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ColumnValuesResponse {
    pub message: String,
    pub tabela: String,
    pub coluna: String,
    /// Distinct values of the column.
    #[schema(value_type = Vec<Object>)]
    pub dados: Vec<Value>,
}

impl ColumnValuesResponse {
    pub fn new(table: impl Into<String>, column: impl Into<String>, values: Vec<Value>) -> Self {
        let (table, column) = (table.into(), column.into());
        Self {
            message: format!("Dados da coluna '{column}' da tabela {table} recebidos com sucesso!"),
            tabela: table,
            coluna: column,
            dados: values,
        }
    }
}

/// Body of `GET /connect/value/...`.
#[derive(Debug, Serialize, ToSchema)]
pub struct FilteredRowsResponse {
    pub message: String,
    pub tabela: String,
    pub coluna: String,
    /// Columns with no null or empty value in any matching row.
    pub colunas_validas: Vec<String>,
    /// Header row followed by the matching rows.
    #[schema(value_type = Vec<Vec<Object>>)]
    pub dados: Vec<Vec<Value>>,
}

impl FilteredRowsResponse {
    /// Builds the body from an already pruned row set.
    pub fn new(table: impl Into<String>, column: impl Into<String>, rows: RowSet) -> Self {
        let (table, column) = (table.into(), column.into());
        Self {
            message: format!(
                "Dados filtrados pela coluna '{column}' na tabela {table} recebidos com sucesso!"
            ),
            tabela: table,
            coluna: column,
            colunas_validas: rows.columns.clone(),
            dados: rows.into_table(),
        }
    }
}
