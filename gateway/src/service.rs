//! Gateway service: one method per `/connect` endpoint.

use std::sync::Arc;

use async_trait::async_trait;

use common::errors::AppResult;
use common::models::{distinct_values, ColumnPath, ConnectPath, TablePath, ValuePath};
use common::response::{ColumnValuesResponse, ColumnsResponse, FilteredRowsResponse, TablesResponse};

use crate::pool_manager::PoolManager;

/// Schema gateway operations.
#[async_trait]
pub trait GatewayServiceTrait: Send + Sync {
    /// Lists the tables of the target database.
    async fn list_tables(&self, path: &ConnectPath) -> AppResult<TablesResponse>;

    /// Lists the columns of one table.
    async fn list_columns(&self, path: &TablePath) -> AppResult<ColumnsResponse>;

    /// Lists the distinct values of one column.
    async fn column_values(&self, path: &ColumnPath) -> AppResult<ColumnValuesResponse>;

    /// Lists the rows whose column equals a value, minus incomplete columns.
    async fn filtered_rows(&self, path: &ValuePath) -> AppResult<FilteredRowsResponse>;
}

/// Schema gateway backed by the connection registry.
pub struct GatewayService {
    pool_manager: Arc<PoolManager>,
}

impl GatewayService {
    /// Creates a new gateway service instance.
    pub fn new(pool_manager: Arc<PoolManager>) -> Self {
        Self { pool_manager }
    }
}

#[async_trait]
impl GatewayServiceTrait for GatewayService {
    async fn list_tables(&self, path: &ConnectPath) -> AppResult<TablesResponse> {
        let conn = self.pool_manager.acquire(&path.identity()).await?;
        let tables = conn.table_names().await;
        Ok(TablesResponse::new(&path.user, &path.database, tables))
    }

    async fn list_columns(&self, path: &TablePath) -> AppResult<ColumnsResponse> {
        let conn = self.pool_manager.acquire(&path.identity()).await?;
        let columns = conn
            .table_columns(&path.table)
            .await?
            .into_iter()
            .map(|c| c.name)
            .collect();
        Ok(ColumnsResponse::new(&path.table, columns))
    }

    async fn column_values(&self, path: &ColumnPath) -> AppResult<ColumnValuesResponse> {
        let conn = self.pool_manager.acquire(&path.identity()).await?;
        let (_, column) = conn.require_column(&path.table, &path.column).await?;

        let values = conn.pool().select_column(&path.table, &column.name).await?;
        tracing::debug!(table = %path.table, column = %column.name, rows = values.len(), "column fetched");
        Ok(ColumnValuesResponse::new(
            &path.table,
            &path.column,
            distinct_values(values),
        ))
    }

    async fn filtered_rows(&self, path: &ValuePath) -> AppResult<FilteredRowsResponse> {
        let conn = self.pool_manager.acquire(&path.identity()).await?;
        let (columns, filter) = conn.require_column(&path.table, &path.column).await?;

        let rows = conn
            .pool()
            .select_rows_where(&path.table, &columns, &filter, &path.value)
            .await?;
        tracing::debug!(table = %path.table, column = %filter.name, rows = rows.rows.len(), "rows fetched");
        Ok(FilteredRowsResponse::new(
            &path.table,
            &path.column,
            rows.retain_complete_columns(),
        ))
    }
}
