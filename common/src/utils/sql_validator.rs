//! SQL identifier validation and quoting.
//!
//! Table and column names arrive from the URL and cannot be bound as query
//! parameters, so they are checked against the reflected schema first and
//! then quoted here before being interpolated.

use crate::errors::{AppError, AppResult};
use crate::models::request::MAX_IDENTIFIER_LEN;

/// Validates and quotes SQL identifiers.
pub struct SqlValidator;

impl SqlValidator {
    /// Rejects identifiers no catalog could contain.
    ///
    /// # Errors
    /// Returns `AppError::InvalidIdentifier` for empty names, names longer than
    /// 63 bytes, and names containing NUL.
    pub fn validate_identifier(name: &str) -> AppResult<()> {
        if name.is_empty() {
            return Err(AppError::InvalidIdentifier("empty identifier".into()));
        }
        if name.len() as u64 > MAX_IDENTIFIER_LEN {
            return Err(AppError::InvalidIdentifier(format!(
                "identifier longer than {MAX_IDENTIFIER_LEN} bytes"
            )));
        }
        if name.contains('\0') {
            return Err(AppError::InvalidIdentifier(
                "identifier contains NUL".into(),
            ));
        }
        Ok(())
    }

    /// Wraps `name` in double quotes, doubling embedded quotes.
    ///
    /// Works for both Postgres and SQLite.
    pub fn quote_identifier(name: &str) -> AppResult<String> {
        Self::validate_identifier(name)?;
        Ok(format!("\"{}\"", name.replace('"', "\"\"")))
    }

    /// Checks a database name that maps to a file on disk.
    ///
    /// # Errors
    /// Returns `AppError::InvalidIdentifier` when the name could escape the
    /// configured directory.
    pub fn validate_file_stem(name: &str) -> AppResult<()> {
        Self::validate_identifier(name)?;
        if name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(AppError::InvalidIdentifier(format!(
                "database name '{name}' is not a plain file name"
            )));
        }
        Ok(())
    }
}
