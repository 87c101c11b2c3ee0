//! Error taxonomy shared by every gateway operation.
//!
//! Library code returns [`AppError`]. At the HTTP edge each handler pairs the
//! error with its operation's failure message through
//! [`AppError::into_failure`], and the resulting [`ApiFailure`] renders the
//! JSON body and status code.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;
use validator::ValidationErrors;

/// Errors raised while connecting to, reflecting, or querying a target database.
#[derive(Debug, Clone, Error)]
pub enum AppError {
    /// Bad credentials, unreachable host or unknown database.
    #[error("{0}")]
    DatabaseConnection(String),

    /// The database rejected a reflection or data query.
    #[error("{0}")]
    DatabaseQuery(String),

    /// The table is not part of the reflected schema.
    #[error("table '{0}' not found")]
    TableNotFound(String),

    /// The filter column is not part of the table. Recoverable by the caller.
    #[error("Coluna '{column}' não encontrada na tabela {table}.")]
    ColumnNotFound {
        table: String,
        column: String,
        columns: Vec<String>,
    },

    /// An identifier or database name that can never be queried safely.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Startup configuration problem.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result alias used across the workspace.
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// HTTP status this error maps to.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ColumnNotFound { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Attaches the operation-level failure message shown to the caller.
    pub fn into_failure(self, message: impl Into<String>) -> ApiFailure {
        ApiFailure {
            message: message.into(),
            error: self,
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors.field_errors().keys().map(|k| k.to_string()).collect();
        fields.sort();
        AppError::InvalidIdentifier(format!("invalid path parameter(s): {}", fields.join(", ")))
    }
}

/// Generic failure body: `{ "message": ..., "error": ... }`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Operation-level description of what failed.
    pub message: String,
    /// Underlying error text.
    pub error: String,
}

/// Body returned when the requested filter column does not exist.
#[derive(Debug, Serialize, ToSchema)]
pub struct ColumnNotFoundBody {
    pub message: String,
    /// Columns the table actually has.
    pub colunas: Vec<String>,
}

/// An [`AppError`] bound to the failing operation's message.
#[derive(Debug)]
pub struct ApiFailure {
    pub message: String,
    pub error: AppError,
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let status = self.error.status_code();
        match self.error {
            AppError::ColumnNotFound {
                table,
                column,
                columns,
            } => {
                tracing::warn!(table = %table, column = %column, "filter column not found");
                let message = format!("Coluna '{column}' não encontrada na tabela {table}.");
                (
                    status,
                    Json(ColumnNotFoundBody {
                        message,
                        colunas: columns,
                    }),
                )
                    .into_response()
            }
            error => {
                tracing::error!(error = %error, "{}", self.message);
                (
                    status,
                    Json(ErrorBody {
                        message: self.message,
                        error: error.to_string(),
                    }),
                )
                    .into_response()
            }
        }
    }
}
