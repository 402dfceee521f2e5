//! Error types and error classification for the market data crate.
//!
//! This module provides:
//! - [`MarketDataError`]: The main error enum for all provider operations
//! - [`ErrorKind`]: Coarse classification used by callers to decide how to react

mod kind;

pub use kind::ErrorKind;

use thiserror::Error;

use crate::provider::ApiPlan;

/// CoinGecko error codes returned with a 400 when a key is sent to the wrong root URL.
const ROOT_URL_MISMATCH_CODES: [&str; 2] = ["10010", "10011"];

/// Errors that can occur during market data operations.
#[derive(Error, Debug)]
pub enum MarketDataError {
    /// The request did not complete within the configured timeout.
    #[error("Timeout: {provider}")]
    Timeout {
        /// The provider that timed out
        provider: String,
    },

    /// The provider answered with a non-success HTTP status.
    #[error("HTTP {status} from {provider}: {body}")]
    Http {
        /// The provider that returned the status
        provider: String,
        /// HTTP status code
        status: u16,
        /// Raw response body, kept for diagnostics
        body: String,
    },

    /// The provider rate limited the request (HTTP 429).
    #[error("Rate limited: {provider}")]
    RateLimited {
        /// The provider that rate limited the request
        provider: String,
    },

    /// The operation needs a plan feature the current credential lacks.
    /// Raised before any network call is made.
    #[error("Feature '{feature}' is not available on the {plan} plan")]
    FeatureUnavailable {
        /// Name of the gated feature
        feature: &'static str,
        /// Plan in effect when the call was attempted
        plan: ApiPlan,
    },

    /// The requested resource does not exist.
    /// Collection endpoints convert this into an empty result.
    #[error("Not found: {resource}")]
    NotFound {
        /// The provider that returned 404
        provider: String,
        /// Path of the missing resource
        resource: String,
    },

    /// The response body could not be decoded.
    #[error("Failed to parse {provider} response: {message}")]
    Parse {
        /// The provider whose response failed to decode
        provider: String,
        /// Decoder message
        message: String,
    },

    /// Request parameters failed validation before being sent.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A plan name could not be recognised.
    #[error("Unknown API plan: {0}")]
    InvalidPlan(String),

    /// The HTTP client could not be constructed.
    #[error("Client error: {0}")]
    Client(String),

    /// A network error occurred while communicating with a provider.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl MarketDataError {
    /// Returns the classification for this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use protocap_market_data::errors::{ErrorKind, MarketDataError};
    ///
    /// let error = MarketDataError::Timeout { provider: "COINGECKO".to_string() };
    /// assert_eq!(error.kind(), ErrorKind::Timeout);
    /// ```
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Network(_) => ErrorKind::Network,
            Self::Http { .. } | Self::RateLimited { .. } => ErrorKind::Http,
            Self::FeatureUnavailable { .. } => ErrorKind::FeatureUnavailable,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Parse { .. } => ErrorKind::Decode,
            Self::InvalidRequest(_) | Self::InvalidPlan(_) | Self::Client(_) => {
                ErrorKind::Configuration
            }
        }
    }

    /// Whether this is the 400 CoinGecko sends when a key is used against the
    /// root URL of the other tier.
    pub fn is_endpoint_mismatch(&self) -> bool {
        match self {
            Self::Http { status: 400, body, .. } => {
                let lower = body.to_lowercase();
                lower.contains("change your root url")
                    || ROOT_URL_MISMATCH_CODES
                        .iter()
                        .any(|code| lower.contains(code))
            }
            _ => false,
        }
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::RateLimited { .. } => Some(429),
            Self::NotFound { .. } => Some(404),
            Self::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
