//! Connection identity models.
//!
//! A target database is addressed entirely by path parameters; the driver,
//! host and port come from configuration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::errors::AppError;

/// Database driver used for every target.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DbDriver {
    /// PostgreSQL server.
    Postgres,
    /// SQLite files under a configured directory.
    Sqlite,
}

impl DbDriver {
    /// Returns the default port for this driver.
    pub fn default_port(&self) -> Option<u16> {
        match self {
            DbDriver::Postgres => Some(5432),
            DbDriver::Sqlite => None,
        }
    }
}

impl fmt::Display for DbDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbDriver::Postgres => write!(f, "postgres"),
            DbDriver::Sqlite => write!(f, "sqlite"),
        }
    }
}

impl FromStr for DbDriver {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(DbDriver::Postgres),
            "sqlite" => Ok(DbDriver::Sqlite),
            other => Err(AppError::Config(format!("unsupported DB_DRIVER '{other}'"))),
        }
    }
}

/// Key of the connection registry: who connects to which database.
///
/// Two requests reuse the same pool iff their identities are equal. The
/// password takes part in equality but is never printed.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ConnectionIdentity {
    pub user: String,
    pub password: String,
    pub database: String,
}

impl ConnectionIdentity {
    pub fn new(
        user: impl Into<String>,
        password: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
            database: database.into(),
        }
    }
}

impl fmt::Debug for ConnectionIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionIdentity")
            .field("user", &self.user)
            .field("password", &"***")
            .field("database", &self.database)
            .finish()
    }
}

impl fmt::Display for ConnectionIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.user, self.database)
    }
}
