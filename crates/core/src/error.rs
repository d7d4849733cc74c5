//! Error types for the rentwise domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error type; the top-level [`Error`]
//! aggregates them so the turn pipeline can propagate with `?` and decide
//! at a single place how each failure is surfaced to the user.

use thiserror::Error;

use crate::action::ActionField;
use crate::schema::Dimension;

/// The top-level error type for all rentwise operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Validation ---
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    // --- Routing ---
    #[error("Routing error: {0}")]
    Routing(#[from] RoutingError),

    // --- Slot extraction ---
    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    // --- Rental backend ---
    #[error("Upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    // --- LLM provider ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Action gate ---
    #[error("Action request incomplete, missing: {}", format_fields(.missing))]
    ActionIncomplete { missing: Vec<ActionField> },

    #[error("No user identifier configured (X-User-ID is required for this call)")]
    MissingIdentity,

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

fn format_fields(fields: &[ActionField]) -> String {
    fields
        .iter()
        .map(|f| f.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// A raw value failed validation for its dimension.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("Unknown dimension: {0}")]
    UnknownDimension(String),

    #[error("{dimension}: value is empty")]
    Empty { dimension: Dimension },

    #[error("{dimension}: '{value}' is not a number")]
    NotNumeric { dimension: Dimension, value: String },

    #[error("{dimension}: {value} is outside {min}..={max}")]
    OutOfRange {
        dimension: Dimension,
        value: String,
        min: String,
        max: String,
    },

    #[error("{dimension}: '{value}' is not one of [{}]", .allowed.join(", "))]
    NotInSet {
        dimension: Dimension,
        value: String,
        allowed: Vec<&'static str>,
    },

    #[error("{dimension}: '{value}' is not a YYYY-MM-DD date")]
    InvalidDate { dimension: Dimension, value: String },

    #[error("{dimension}: value is longer than {max_chars} characters")]
    TooLong { dimension: Dimension, max_chars: usize },

    #[error("{dimension}: expected a scalar, found {found}")]
    WrongType {
        dimension: Dimension,
        found: &'static str,
    },
}

/// No search endpoint can be satisfied by the current slots.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RoutingError {
    #[error("No search conditions given")]
    NoConditions,

    #[error("Contradictory conditions: {0}")]
    Contradictory(String),

    #[error("Landmark '{0}' could not be resolved")]
    LandmarkUnresolved(String),

    #[error("Landmark lookup for '{name}' failed: {reason}")]
    LookupFailed { name: String, reason: String },
}

/// The delegated extractor could not produce a usable slot update.
#[derive(Debug, Clone, Error)]
pub enum ExtractionError {
    #[error("Extraction timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    #[error("Extraction provider failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("Extraction reply was not a JSON object: {0}")]
    MalformedReply(String),
}

/// The rental backend answered with a failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum UpstreamError {
    #[error("HTTP {status_code}: {body}")]
    Status { status_code: u16, body: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl UpstreamError {
    /// Transport failures are the only ones worth a second attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}
