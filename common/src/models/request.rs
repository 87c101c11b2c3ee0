//! Path parameters of the `/connect` endpoints.

use serde::Deserialize;
use utoipa::IntoParams;
use validator::Validate;

use super::connection::ConnectionIdentity;

/// Longest identifier Postgres accepts without truncating it.
pub const MAX_IDENTIFIER_LEN: u64 = 63;

/// `/connect/{user}/{password}/{database}`
#[derive(Debug, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Path)]
pub struct ConnectPath {
    /// Database user.
    #[validate(length(min = 1, max = MAX_IDENTIFIER_LEN))]
    pub user: String,
    /// Database password.
    pub password: String,
    /// Database name.
    #[validate(length(min = 1, max = MAX_IDENTIFIER_LEN))]
    pub database: String,
}

/// `/connect/columns/{user}/{password}/{database}/{table}`
#[derive(Debug, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Path)]
pub struct TablePath {
    #[validate(length(min = 1, max = MAX_IDENTIFIER_LEN))]
    pub user: String,
    pub password: String,
    #[validate(length(min = 1, max = MAX_IDENTIFIER_LEN))]
    pub database: String,
    /// Table name.
    #[validate(length(min = 1, max = MAX_IDENTIFIER_LEN))]
    pub table: String,
}

/// `/connect/data/{user}/{password}/{database}/{table}/{column}`
#[derive(Debug, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Path)]
pub struct ColumnPath {
    #[validate(length(min = 1, max = MAX_IDENTIFIER_LEN))]
    pub user: String,
    pub password: String,
    #[validate(length(min = 1, max = MAX_IDENTIFIER_LEN))]
    pub database: String,
    #[validate(length(min = 1, max = MAX_IDENTIFIER_LEN))]
    pub table: String,
    /// Column name.
    #[validate(length(min = 1, max = MAX_IDENTIFIER_LEN))]
    pub column: String,
}

/// `/connect/value/{user}/{password}/{database}/{table}/{column}/{value}`
#[derive(Debug, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Path)]
pub struct ValuePath {
    #[validate(length(min = 1, max = MAX_IDENTIFIER_LEN))]
    pub user: String,
    pub password: String,
    #[validate(length(min = 1, max = MAX_IDENTIFIER_LEN))]
    pub database: String,
    #[validate(length(min = 1, max = MAX_IDENTIFIER_LEN))]
    pub table: String,
    #[validate(length(min = 1, max = MAX_IDENTIFIER_LEN))]
    pub column: String,
    /// Value the column must equal; the database coerces it to the column type.
    pub value: String,
}

macro_rules! impl_identity {
    ($($path:ty),*) => {
        $(impl $path {
            /// Registry key for this request.
            pub fn identity(&self) -> ConnectionIdentity {
                ConnectionIdentity::new(&self.user, &self.password, &self.database)
            }
        })*
    };
}

impl_identity!(ConnectPath, TablePath, ColumnPath, ValuePath);
