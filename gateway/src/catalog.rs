//! Schema reflection and ad-hoc queries against a target database.
//!
//! Identifiers reaching this module have already been checked against the
//! reflected schema; they are quoted here and values are always bound.

use common::errors::{AppError, AppResult};
use common::models::{ColumnMeta, RowSet, SchemaSnapshot};
use common::utils::SqlValidator;
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, PgPool, Row, SqlitePool, TypeInfo, ValueRef};

/// Connection pool for one target database.
#[derive(Clone, Debug)]
pub enum DatabasePool {
    /// PostgreSQL connection pool.
    Postgres(PgPool),
    /// SQLite connection pool.
    Sqlite(SqlitePool),
}

impl DatabasePool {
    /// Reflects every base table of the target and its columns.
    pub async fn reflect_schema(&self) -> AppResult<SchemaSnapshot> {
        match self {
            DatabasePool::Postgres(pool) => pg_reflect_schema(pool).await,
            DatabasePool::Sqlite(pool) => sqlite_reflect(pool, None).await,
        }
    }

    /// Reflects one table, view or foreign table by name. `None` when nothing
    /// by that name exists.
    pub async fn reflect_table(&self, table: &str) -> AppResult<Option<Vec<ColumnMeta>>> {
        let mut snapshot = match self {
            DatabasePool::Postgres(pool) => pg_reflect_columns(pool, Some(table)).await?,
            DatabasePool::Sqlite(pool) => sqlite_reflect(pool, Some(table)).await?,
        };
        if let DatabasePool::Postgres(pool) = self {
            // A Postgres table without columns only shows up in pg_class.
            if !snapshot.contains_table(table) && pg_table_exists(pool, table).await? {
                snapshot.insert_table(table, vec![]);
            }
        }
        Ok(snapshot.columns(table).map(<[ColumnMeta]>::to_vec))
    }

    /// `SELECT <column> FROM <table>`, every row, in fetch order.
    pub async fn select_column(&self, table: &str, column: &str) -> AppResult<Vec<Value>> {
        let table = SqlValidator::quote_identifier(table)?;
        let column = SqlValidator::quote_identifier(column)?;

        match self {
            DatabasePool::Postgres(pool) => {
                let sql = format!("SELECT to_json({column})::text AS value FROM {table}");
                let rows = sqlx::query(&sql)
                    .fetch_all(pool)
                    .await
                    .map_err(|e| AppError::DatabaseQuery(e.to_string()))?;
                rows.iter()
                    .map(|row| pg_json_cell(row, "value"))
                    .collect()
            }
            DatabasePool::Sqlite(pool) => {
                let sql = format!("SELECT {column} FROM {table}");
                let rows = sqlx::query(&sql)
                    .fetch_all(pool)
                    .await
                    .map_err(|e| AppError::DatabaseQuery(e.to_string()))?;
                rows.iter().map(|row| sqlite_cell(row, 0)).collect()
            }
        }
    }

    /// `SELECT * FROM <table> WHERE <column> = <value>`.
    ///
    /// `columns` is the reflected column list of `table`; `filter` must be
    /// one of them. The value is bound as text and converted by the database:
    /// an explicit cast to the reflected type on Postgres, column affinity on
    /// SQLite.
    pub async fn select_rows_where(
        &self,
        table: &str,
        columns: &[ColumnMeta],
        filter: &ColumnMeta,
        value: &str,
    ) -> AppResult<RowSet> {
        let quoted_table = SqlValidator::quote_identifier(table)?;
        let quoted_filter = SqlValidator::quote_identifier(&filter.name)?;

        match self {
            DatabasePool::Postgres(pool) => {
                let sql = format!(
                    "SELECT row_to_json(t)::text AS row_json FROM \
                     (SELECT * FROM {quoted_table} WHERE {quoted_filter} = CAST($1 AS {})) AS t",
                    filter.data_type
                );
                let rows = sqlx::query(&sql)
                    .bind(value)
                    .fetch_all(pool)
                    .await
                    .map_err(|e| AppError::DatabaseQuery(e.to_string()))?;

                let header: Vec<String> = columns.iter().map(|c| c.name.clone()).collect();
                let data = rows
                    .iter()
                    .map(|row| pg_json_record(row, &header))
                    .collect::<AppResult<Vec<_>>>()?;
                Ok(RowSet::new(header, data))
            }
            DatabasePool::Sqlite(pool) => {
                let sql = format!("SELECT * FROM {quoted_table} WHERE {quoted_filter} = ?");
                let rows = sqlx::query(&sql)
                    .bind(value)
                    .fetch_all(pool)
                    .await
                    .map_err(|e| AppError::DatabaseQuery(e.to_string()))?;

                let header: Vec<String> = match rows.first() {
                    Some(first) => first.columns().iter().map(|c| c.name().to_string()).collect(),
                    None => columns.iter().map(|c| c.name.clone()).collect(),
                };
                let data = rows
                    .iter()
                    .map(|row| {
                        (0..row.len())
                            .map(|i| sqlite_cell(row, i))
                            .collect::<AppResult<Vec<Value>>>()
                    })
                    .collect::<AppResult<Vec<_>>>()?;
                Ok(RowSet::new(header, data))
            }
        }
    }

    /// Closes every connection of the pool.
    pub async fn close(&self) {
        match self {
            DatabasePool::Postgres(pool) => pool.close().await,
            DatabasePool::Sqlite(pool) => pool.close().await,
        }
    }
}

// ---- PostgreSQL helpers ----

const PG_TABLES_SQL: &str = "SELECT c.relname::text AS table_name
     FROM pg_catalog.pg_class c
     JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
     WHERE n.nspname = current_schema() AND c.relkind IN ('r', 'p')";

const PG_COLUMNS_SQL: &str = "SELECT c.relname::text AS table_name,
            a.attname::text AS column_name,
            pg_catalog.format_type(a.atttypid, a.atttypmod) AS data_type
     FROM pg_catalog.pg_attribute a
     JOIN pg_catalog.pg_class c ON c.oid = a.attrelid
     JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
     WHERE n.nspname = current_schema()
       AND (c.relkind IN ('r', 'p') OR ($1::text IS NOT NULL AND c.relkind IN ('v', 'm', 'f')))
       AND a.attnum > 0
       AND NOT a.attisdropped
       AND ($1::text IS NULL OR c.relname::text = $1)
     ORDER BY c.relname, a.attnum";

async fn pg_reflect_schema(pool: &PgPool) -> AppResult<SchemaSnapshot> {
    let mut snapshot = pg_reflect_columns(pool, None).await?;

    let tables = sqlx::query(PG_TABLES_SQL)
        .fetch_all(pool)
        .await
        .map_err(|e| AppError::DatabaseQuery(e.to_string()))?;
    for row in &tables {
        let name: String = row
            .try_get("table_name")
            .map_err(|e| AppError::DatabaseQuery(e.to_string()))?;
        if !snapshot.contains_table(&name) {
            snapshot.insert_table(name, vec![]);
        }
    }

    Ok(snapshot)
}

async fn pg_reflect_columns(pool: &PgPool, table: Option<&str>) -> AppResult<SchemaSnapshot> {
    let rows = sqlx::query(PG_COLUMNS_SQL)
        .bind(table)
        .fetch_all(pool)
        .await
        .map_err(|e| AppError::DatabaseQuery(e.to_string()))?;

    rows.iter()
        .map(|row| {
            let table: String = row.try_get("table_name")?;
            let name: String = row.try_get("column_name")?;
            let data_type: String = row.try_get("data_type")?;
            Ok((table, ColumnMeta::new(name, data_type)))
        })
        .collect::<Result<SchemaSnapshot, sqlx::Error>>()
        .map_err(|e| AppError::DatabaseQuery(e.to_string()))
}

const PG_RELATION_EXISTS_SQL: &str = "SELECT EXISTS (
         SELECT 1 FROM pg_catalog.pg_class c
         JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
         WHERE n.nspname = current_schema()
           AND c.relkind IN ('r', 'p', 'v', 'm', 'f')
           AND c.relname::text = $1)";

async fn pg_table_exists(pool: &PgPool, table: &str) -> AppResult<bool> {
    sqlx::query_scalar::<_, bool>(PG_RELATION_EXISTS_SQL)
        .bind(table)
        .fetch_one(pool)
        .await
        .map_err(|e| AppError::DatabaseQuery(e.to_string()))
}

/// Parses a `to_json(...)::text` cell.
fn pg_json_cell(row: &PgRow, name: &str) -> AppResult<Value> {
    let text: Option<String> = row
        .try_get(name)
        .map_err(|e| AppError::DatabaseQuery(e.to_string()))?;
    match text {
        Some(text) => parse_json_text(&text),
        None => Ok(Value::Null),
    }
}

/// Numbers keep their decimal text, so `numeric` values outside the f64
/// range survive.
fn parse_json_text(text: &str) -> AppResult<Value> {
    serde_json::from_str(text).map_err(|e| AppError::DatabaseQuery(e.to_string()))
}

/// Lays a `row_to_json(...)::text` record out in `header` order.
fn pg_json_record(row: &PgRow, header: &[String]) -> AppResult<Vec<Value>> {
    let mut record = match pg_json_cell(row, "row_json")? {
        Value::Object(map) => map,
        other => {
            return Err(AppError::DatabaseQuery(format!(
                "expected a JSON object per row, got {other}"
            )))
        }
    };
    Ok(header
        .iter()
        .map(|name| record.remove(name).unwrap_or(Value::Null))
        .collect())
}

// ---- SQLite helpers ----

const SQLITE_COLUMNS_SQL: &str = "SELECT m.name AS table_name, p.name AS column_name, p.type AS data_type
     FROM sqlite_master m
     JOIN pragma_table_info(m.name) p
     WHERE (m.type = 'table' OR (?1 IS NOT NULL AND m.type = 'view'))
       AND m.name NOT LIKE 'sqlite_%'
       AND (?1 IS NULL OR m.name = ?1)
     ORDER BY m.name, p.cid";

async fn sqlite_reflect(pool: &SqlitePool, table: Option<&str>) -> AppResult<SchemaSnapshot> {
    let rows = sqlx::query(SQLITE_COLUMNS_SQL)
        .bind(table)
        .fetch_all(pool)
        .await
        .map_err(|e| AppError::DatabaseQuery(e.to_string()))?;

    rows.iter()
        .map(|row| {
            let table: String = row.try_get("table_name")?;
            let name: String = row.try_get("column_name")?;
            let data_type: String = row.try_get("data_type")?;
            Ok((table, ColumnMeta::new(name, data_type)))
        })
        .collect::<Result<SchemaSnapshot, sqlx::Error>>()
        .map_err(|e| AppError::DatabaseQuery(e.to_string()))
}

/// Decodes one SQLite cell by the storage class of its value.
fn sqlite_cell(row: &SqliteRow, index: usize) -> AppResult<Value> {
    let storage = {
        let raw = row
            .try_get_raw(index)
            .map_err(|e| AppError::DatabaseQuery(e.to_string()))?;
        if raw.is_null() {
            return Ok(Value::Null);
        }
        raw.type_info().name().to_uppercase()
    };

    let decoded = match storage.as_str() {
        "INTEGER" | "BOOLEAN" => row.try_get_unchecked::<i64, _>(index).map(Value::from),
        "REAL" | "NUMERIC" => row.try_get_unchecked::<f64, _>(index).map(|f| {
            serde_json::Number::from_f64(f).map_or(Value::Null, Value::Number)
        }),
        "BLOB" => row
            .try_get_unchecked::<Vec<u8>, _>(index)
            .map(|bytes| Value::String(String::from_utf8_lossy(&bytes).into_owned())),
        _ => row.try_get_unchecked::<String, _>(index).map(Value::String),
    };
    decoded.map_err(|e| AppError::DatabaseQuery(e.to_string()))
}
