//! Service configuration.
//!
//! Everything is read from environment variables, with an optional `.env`
//! file in the working directory filling in whatever the environment leaves
//! unset.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::errors::AppResult;
use crate::models::connection::DbDriver;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 5000;
const DEFAULT_DB_HOST: &str = "localhost";
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_MAX_CACHED_CONNECTIONS: usize = 16;
const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:8100";

/// Runtime configuration shared by the gateway and its connection registry.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Name reported by the health endpoint and in logs.
    pub service_name: String,
    /// Address the HTTP server binds to.
    pub host: String,
    /// Port the HTTP server binds to.
    pub port: u16,
    /// Driver used for every target database.
    pub db_driver: DbDriver,
    /// Database server host (network drivers only).
    pub db_host: String,
    /// Database server port (network drivers only).
    pub db_port: u16,
    /// Directory holding `<database>.db` files for the SQLite driver.
    pub sqlite_dir: PathBuf,
    /// Timeout for establishing and acquiring database connections.
    pub connect_timeout_secs: u64,
    /// Pool size per cached connection.
    pub max_connections: u32,
    /// Number of identities kept in the connection registry.
    pub max_cached_connections: usize,
    /// The single origin allowed to call `/connect/*` cross-origin.
    pub allowed_origin: String,
    /// Emit logs as JSON lines instead of the human format.
    pub json_logs: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        let db_driver = DbDriver::Postgres;
        Self {
            service_name: "schema-gateway".to_string(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            db_port: db_driver.default_port().unwrap_or_default(),
            db_driver,
            db_host: DEFAULT_DB_HOST.to_string(),
            sqlite_dir: PathBuf::from("."),
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            max_cached_connections: DEFAULT_MAX_CACHED_CONNECTIONS,
            allowed_origin: DEFAULT_ALLOWED_ORIGIN.to_string(),
            json_logs: false,
        }
    }
}

impl AppConfig {
    /// Loads the configuration for `service` from the process environment.
    ///
    /// # Errors
    /// Returns `AppError::Config` when `DB_DRIVER` names an unknown driver.
    pub fn load_with_service(service: impl Into<String>) -> AppResult<Self> {
        Self::from_lookup(service, |key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(service: impl Into<String>, lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let db_driver = match lookup("DB_DRIVER") {
            Some(raw) => raw.parse::<DbDriver>()?,
            None => defaults.db_driver,
        };
        let db_port = parse_or("DB_PORT", &lookup, db_driver.default_port().unwrap_or_default());

        Ok(Self {
            service_name: service.into(),
            host: lookup("SERVER_HOST").unwrap_or(defaults.host),
            port: parse_or("SERVER_PORT", &lookup, defaults.port),
            db_driver,
            db_host: lookup("DB_HOST").unwrap_or(defaults.db_host),
            db_port,
            sqlite_dir: lookup("SQLITE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.sqlite_dir),
            connect_timeout_secs: parse_or(
                "DB_CONNECT_TIMEOUT_SECS",
                &lookup,
                defaults.connect_timeout_secs,
            ),
            max_connections: parse_or("DB_MAX_CONNECTIONS", &lookup, defaults.max_connections)
                .max(1),
            max_cached_connections: parse_or(
                "MAX_CACHED_CONNECTIONS",
                &lookup,
                defaults.max_cached_connections,
            )
            .max(1),
            allowed_origin: lookup("ALLOWED_ORIGIN").unwrap_or(defaults.allowed_origin),
            json_logs: lookup("LOG_FORMAT").is_some_and(|v| v.eq_ignore_ascii_case("json")),
        })
    }

    /// Socket address string the server binds to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T, F>(key: &str, lookup: &F, default: T) -> T
where
    T: FromStr + Copy,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "invalid value, using default");
            default
        }),
        None => default,
    }
}

/// Loads `KEY=VALUE` lines from `path` into the environment.
///
/// Missing files are ignored and variables already set are never overwritten.
pub fn load_dotenv(path: impl AsRef<Path>) {
    let Ok(content) = std::fs::read_to_string(path.as_ref()) else {
        return;
    };
    for (key, value) in parse_dotenv(&content) {
        if std::env::var(&key).is_err() {
            std::env::set_var(key, value);
        }
    }
}

fn parse_dotenv(content: &str) -> Vec<(String, String)> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| {
            let value = value.trim().trim_matches('"');
            (key.trim().to_string(), value.to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AppError;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_target_local_postgres() {
        let config = AppConfig::from_lookup("svc", lookup_from(&[])).unwrap();
        assert_eq!(config.service_name, "svc");
        assert_eq!(config.db_driver, DbDriver::Postgres);
        assert_eq!(config.db_host, "localhost");
        assert_eq!(config.db_port, 5432);
        assert_eq!(config.allowed_origin, "http://localhost:8100");
        assert_eq!(config.bind_addr(), "127.0.0.1:5000");
    }

    #[test]
    fn test_env_overrides() {
        let config = AppConfig::from_lookup(
            "svc",
            lookup_from(&[
                ("DB_DRIVER", "sqlite"),
                ("SQLITE_DIR", "/tmp/dbs"),
                ("SERVER_PORT", "8080"),
                ("MAX_CACHED_CONNECTIONS", "2"),
                ("LOG_FORMAT", "JSON"),
            ]),
        )
        .unwrap();
        assert_eq!(config.db_driver, DbDriver::Sqlite);
        assert_eq!(config.sqlite_dir, PathBuf::from("/tmp/dbs"));
        assert_eq!(config.port, 8080);
        assert_eq!(config.max_cached_connections, 2);
        assert!(config.json_logs);
    }

    #[test]
    fn test_invalid_number_falls_back() {
        let config =
            AppConfig::from_lookup("svc", lookup_from(&[("SERVER_PORT", "not-a-port")])).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let config =
            AppConfig::from_lookup("svc", lookup_from(&[("MAX_CACHED_CONNECTIONS", "0")]))
                .unwrap();
        assert_eq!(config.max_cached_connections, 1);
    }

    #[test]
    fn test_unknown_driver_is_rejected() {
        let result = AppConfig::from_lookup("svc", lookup_from(&[("DB_DRIVER", "oracle")]));
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_parse_dotenv_skips_comments() {
        let parsed = parse_dotenv("# comment\n\nDB_HOST = db.local\nALLOWED_ORIGIN=\"http://x\"\nbroken\n");
        assert_eq!(
            parsed,
            vec![
                ("DB_HOST".to_string(), "db.local".to_string()),
                ("ALLOWED_ORIGIN".to_string(), "http://x".to_string()),
            ]
        );
    }
}
