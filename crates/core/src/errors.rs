//! Core error types for protocap.
//!
//! Provider failures arrive as [`MarketDataError`] and are wrapped here.
//! Resolution failure is not an error: it is a [`ResolutionResult`] with the
//! `failed` match method.
//!
//! [`ResolutionResult`]: crate::resolver::ResolutionResult

use thiserror::Error;

use protocap_market_data::MarketDataError;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the core crate.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Market data operation failed: {0}")]
    MarketData(#[from] MarketDataError),

    #[error("Cache file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode or decode JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Token directory is empty")]
    EmptyDirectory,

    #[error("Invalid mapping snapshot: {0}")]
    Snapshot(String),

    #[error("Input validation failed: {0}")]
    Validation(String),
}
