//! Shared building blocks for the schema gateway.
//!
//! - `config`: environment driven service configuration
//! - `errors`: error taxonomy and its HTTP mapping
//! - `middleware`: request-id tracing middleware
//! - `models`: connection identity, reflected schema, row sets
//! - `response`: success bodies returned by the `/connect` endpoints
//! - `utils`: identifier validation and quoting

pub mod config;
pub mod errors;
pub mod middleware;
pub mod models;
pub mod response;
pub mod utils;
