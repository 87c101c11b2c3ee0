//! HTTP handlers for the connect endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use validator::Validate;

use common::errors::{AppError, ApiFailure, ColumnNotFoundBody, ErrorBody};
use common::models::{ColumnPath, ConnectPath, TablePath, ValuePath};
use common::response::{ColumnValuesResponse, ColumnsResponse, FilteredRowsResponse, TablesResponse};
use crate::service::{GatewayService, GatewayServiceTrait};
use crate::state::AppState;

const CONNECT_FAILED: &str = "Erro ao conectar ao banco de dados";
const COLUMNS_FAILED: &str = "Erro ao buscar as colunas";
const COLUMN_DATA_FAILED: &str = "Erro ao buscar os dados da coluna";
const TABLE_DATA_FAILED: &str = "Erro ao buscar os dados da tabela";

/// Connects to the database and lists its tables.
#[utoipa::path(
    get,
    path = "/connect/{user}/{password}/{database}",
    tag = "connect",
    params(ConnectPath),
    responses(
        (status = 200, description = "Table names", body = TablesResponse),
        (status = 500, description = "Connection or reflection failed", body = ErrorBody)
    )
)]
pub async fn list_tables(
    State(state): State<AppState>,
    Path(path): Path<ConnectPath>,
) -> Result<Json<TablesResponse>, ApiFailure> {
    path.validate()
        .map_err(|e| AppError::from(e).into_failure(CONNECT_FAILED))?;
    let service = GatewayService::new(state.pool_manager);
    let data = service
        .list_tables(&path)
        .await
        .map_err(|e| e.into_failure(CONNECT_FAILED))?;
    Ok(Json(data))
}

/// Lists the columns of a table.
#[utoipa::path(
    get,
    path = "/connect/columns/{user}/{password}/{database}/{table}",
    tag = "connect",
    params(TablePath),
    responses(
        (status = 200, description = "Column names in ordinal order", body = ColumnsResponse),
        (status = 500, description = "Connection failed or unknown table", body = ErrorBody)
    )
)]
pub async fn list_columns(
    State(state): State<AppState>,
    Path(path): Path<TablePath>,
) -> Result<Json<ColumnsResponse>, ApiFailure> {
    path.validate()
        .map_err(|e| AppError::from(e).into_failure(COLUMNS_FAILED))?;
    let service = GatewayService::new(state.pool_manager);
    let data = service
        .list_columns(&path)
        .await
        .map_err(|e| e.into_failure(COLUMNS_FAILED))?;
    Ok(Json(data))
}

/// Distinct values of a column.
#[utoipa::path(
    get,
    path = "/connect/data/{user}/{password}/{database}/{table}/{column}",
    tag = "connect",
    params(ColumnPath),
    responses(
        (status = 200, description = "Distinct column values", body = ColumnValuesResponse),
        (status = 400, description = "Unknown column", body = ColumnNotFoundBody),
        (status = 500, description = "Connection or query failed", body = ErrorBody)
    )
)]
pub async fn column_values(
    State(state): State<AppState>,
    Path(path): Path<ColumnPath>,
) -> Result<Json<ColumnValuesResponse>, ApiFailure> {
    path.validate()
        .map_err(|e| AppError::from(e).into_failure(COLUMN_DATA_FAILED))?;
    let service = GatewayService::new(state.pool_manager);
    let data = service
        .column_values(&path)
        .await
        .map_err(|e| e.into_failure(COLUMN_DATA_FAILED))?;
    Ok(Json(data))
}

/// Rows matching a column value, without incomplete columns.
#[utoipa::path(
    get,
    path = "/connect/value/{user}/{password}/{database}/{table}/{column}/{value}",
    tag = "connect",
    params(ValuePath),
    responses(
        (status = 200, description = "Matching rows, header row first", body = FilteredRowsResponse),
        (status = 400, description = "Unknown column", body = ColumnNotFoundBody),
        (status = 500, description = "Connection or query failed", body = ErrorBody)
    )
)]
pub async fn filtered_rows(
    State(state): State<AppState>,
    Path(path): Path<ValuePath>,
) -> Result<Json<FilteredRowsResponse>, ApiFailure> {
    path.validate()
        .map_err(|e| AppError::from(e).into_failure(TABLE_DATA_FAILED))?;
    let service = GatewayService::new(state.pool_manager);
    let data = service
        .filtered_rows(&path)
        .await
        .map_err(|e| e.into_failure(TABLE_DATA_FAILED))?;
    Ok(Json(data))
}

/// Health check.
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: state.config.service_name.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
        connections: state.pool_manager.connection_count().await,
    })
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    /// Cached connections.
    pub connections: usize,
}
