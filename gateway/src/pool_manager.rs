//! Connection registry.
//!
//! Keeps one pool and one reflected schema per connection identity, bounded
//! by `max_cached_connections` with least-recently-used eviction.

use std::sync::Arc;
use std::time::Duration;

use common::config::AppConfig;
use common::errors::{AppError, AppResult};
use common::models::{ColumnMeta, ConnectionIdentity, DbDriver, SchemaSnapshot};
use common::utils::SqlValidator;
use moka::future::Cache;
use moka::notification::{ListenerFuture, RemovalCause};
use moka::policy::EvictionPolicy;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tokio::sync::RwLock;

use crate::catalog::DatabasePool;

/// A live pool plus the schema reflected when it was opened.
pub struct GatewayConnection {
    identity: ConnectionIdentity,
    pool: DatabasePool,
    schema: RwLock<SchemaSnapshot>,
}

impl GatewayConnection {
    fn new(identity: ConnectionIdentity, pool: DatabasePool, schema: SchemaSnapshot) -> Self {
        Self {
            identity,
            pool,
            schema: RwLock::new(schema),
        }
    }

    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }

    /// Table names of the connect-time snapshot, sorted.
    pub async fn table_names(&self) -> Vec<String> {
        self.schema.read().await.table_names()
    }

    /// Columns of `table`, reflecting it on demand when the snapshot misses it.
    ///
    /// # Errors
    /// `AppError::TableNotFound` when the database has no such table either.
    pub async fn table_columns(&self, table: &str) -> AppResult<Vec<ColumnMeta>> {
        if let Some(columns) = self.schema.read().await.columns(table) {
            return Ok(columns.to_vec());
        }

        SqlValidator::validate_identifier(table)?;
        tracing::debug!(identity = %self.identity, table, "table not in snapshot, reflecting");
        match self.pool.reflect_table(table).await? {
            Some(columns) => {
                self.schema
                    .write()
                    .await
                    .insert_table(table, columns.clone());
                Ok(columns)
            }
            None => Err(AppError::TableNotFound(table.to_string())),
        }
    }

    /// Resolves `column` of `table` against the reflected schema.
    ///
    /// # Errors
    /// `AppError::ColumnNotFound`, carrying the real column list, when the
    /// table has no such column.
    pub async fn require_column(&self, table: &str, column: &str) -> AppResult<(Vec<ColumnMeta>, ColumnMeta)> {
        let columns = self.table_columns(table).await?;
        match columns.iter().find(|c| c.name == column).cloned() {
            Some(meta) => Ok((columns, meta)),
            None => Err(AppError::ColumnNotFound {
                table: table.to_string(),
                column: column.to_string(),
                columns: columns.into_iter().map(|c| c.name).collect(),
            }),
        }
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

/// Manages database connection pools keyed by connection identity.
pub struct PoolManager {
    config: AppConfig,
    /// Runtime connection pools indexed by identity, least recently used
    /// evicted first.
    pools: Cache<ConnectionIdentity, Arc<GatewayConnection>>,
}

impl PoolManager {
    /// Creates an empty registry bounded by `max_cached_connections`.
    pub fn new(config: AppConfig) -> Self {
        let pools = Cache::builder()
            .max_capacity(config.max_cached_connections as u64)
            .eviction_policy(EvictionPolicy::lru())
            .async_eviction_listener(on_removal)
            .build();
        Self { config, pools }
    }

    /// Returns the connection for `identity`, connecting and reflecting on a miss.
    ///
    /// Concurrent misses for one identity share a single attempt. A failed
    /// attempt stores nothing, so connections already cached for other
    /// identities stay usable.
    pub async fn acquire(&self, identity: &ConnectionIdentity) -> AppResult<Arc<GatewayConnection>> {
        let conn = self
            .pools
            .try_get_with(identity.clone(), self.connect(identity))
            .await
            .map_err(Arc::unwrap_or_clone)?;
        // Apply pending evictions so the capacity bound holds on return.
        self.pools.run_pending_tasks().await;
        Ok(conn)
    }

    async fn connect(&self, identity: &ConnectionIdentity) -> AppResult<Arc<GatewayConnection>> {
        let pool = self.try_create_pool(identity).await?;
        let schema = match pool.reflect_schema().await {
            Ok(schema) => schema,
            Err(e) => {
                pool.close().await;
                return Err(e);
            }
        };
        tracing::info!(
            identity = %identity,
            driver = %self.config.db_driver,
            tables = schema.table_count(),
            "connected and reflected schema"
        );
        Ok(Arc::new(GatewayConnection::new(identity.clone(), pool, schema)))
    }

    /// Attempts to create a database connection pool.
    async fn try_create_pool(&self, identity: &ConnectionIdentity) -> AppResult<DatabasePool> {
        let timeout = Duration::from_secs(self.config.connect_timeout_secs);
        let max_connections = self.config.max_connections;

        match self.config.db_driver {
            DbDriver::Postgres => {
                let options = PgConnectOptions::new()
                    .host(&self.config.db_host)
                    .port(self.config.db_port)
                    .username(&identity.user)
                    .password(&identity.password)
                    .database(&identity.database);
                let pool = PgPoolOptions::new()
                    .max_connections(max_connections)
                    .acquire_timeout(timeout)
                    .connect_with(options)
                    .await
                    .map_err(|e| AppError::DatabaseConnection(e.to_string()))?;
                Ok(DatabasePool::Postgres(pool))
            }
            DbDriver::Sqlite => {
                SqlValidator::validate_file_stem(&identity.database)?;
                let path = self
                    .config
                    .sqlite_dir
                    .join(format!("{}.db", identity.database));
                let options = SqliteConnectOptions::new()
                    .filename(&path)
                    .create_if_missing(false)
                    .read_only(true);
                let pool = SqlitePoolOptions::new()
                    .max_connections(max_connections)
                    .acquire_timeout(timeout)
                    .connect_with(options)
                    .await
                    .map_err(|e| AppError::DatabaseConnection(e.to_string()))?;
                Ok(DatabasePool::Sqlite(pool))
            }
        }
    }

    /// Number of cached identities.
    pub async fn connection_count(&self) -> usize {
        self.pools.run_pending_tasks().await;
        self.pools.entry_count() as usize
    }

    /// Whether `identity` currently has a cached connection.
    pub async fn is_cached(&self, identity: &ConnectionIdentity) -> bool {
        self.pools.run_pending_tasks().await;
        self.pools.contains_key(identity)
    }

    /// Closes and forgets every cached connection.
    pub async fn shutdown(&self) {
        let cached: Vec<_> = self.pools.iter().map(|(_, conn)| conn).collect();
        self.pools.invalidate_all();
        self.pools.run_pending_tasks().await;
        for conn in cached {
            conn.close().await;
        }
        tracing::info!("all connection pools closed");
    }
}

/// Eviction hook. A pool still held by in-flight requests is left open and
/// closes when the last holder drops it.
fn on_removal(
    identity: Arc<ConnectionIdentity>,
    conn: Arc<GatewayConnection>,
    cause: RemovalCause,
) -> ListenerFuture {
    Box::pin(async move {
        tracing::info!(identity = %identity, cause = ?cause, "connection left the registry");
        if Arc::strong_count(&conn) == 1 {
            conn.close().await;
        }
    })
}
