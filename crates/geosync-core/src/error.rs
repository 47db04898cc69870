//! Error types for the GeoSync synchronization engine.
//!
//! Most failures in this system degrade to a safe default instead of being
//! raised (skipped features, literal formula passthrough, empty layers). The
//! types here cover what is left: network fetches, document decoding,
//! configuration, and layer lifecycle guards. All errors are serializable so a
//! UI shell can forward them to its notification surface.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using GeoSyncError as the error type.
pub type Result<T> = std::result::Result<T, GeoSyncError>;

/// Top-level error type for all GeoSync operations.
#[derive(Debug, Error, Serialize, Deserialize)]
#[serde(tag = "type", content = "details")]
pub enum GeoSyncError {
    /// Network fetch errors
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Decoding errors
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Layer lifecycle errors
    #[error("Layer error: {0}")]
    Layer(#[from] LayerError),

    /// Internal errors that shouldn't normally occur
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GeoSyncError {
    /// Returns true if retrying the failed operation may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            GeoSyncError::Fetch(e) => e.is_transient(),
            _ => false,
        }
    }
}

/// Errors raised while fetching feature collections or geocoding results.
#[derive(Debug, Error, Serialize, Deserialize)]
pub enum FetchError {
    /// The request could not be sent or the body could not be read
    #[error("Request to {url} failed: {reason}")]
    RequestFailed { url: String, reason: String },

    /// The server answered with a non-success status
    #[error("Request to {url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    /// The request did not finish in time
    #[error("Request to {url} timed out after {timeout_ms}ms")]
    Timeout { url: String, timeout_ms: u64 },

    /// The request was cancelled by teardown or a newer request
    #[error("Request to {url} was cancelled")]
    Cancelled { url: String },
}

impl FetchError {
    /// Creates a request failed error.
    pub fn failed(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::RequestFailed {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates a cancelled error.
    pub fn cancelled(url: impl Into<String>) -> Self {
        Self::Cancelled { url: url.into() }
    }

    /// Returns true if this error is transient and the request can be retried.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Timeout { .. } | FetchError::RequestFailed { .. } => true,
            FetchError::HttpStatus { status, .. } => *status >= 500 || *status == 429,
            FetchError::Cancelled { .. } => false,
        }
    }
}

/// Errors related to decoding documents.
#[derive(Debug, Error, Serialize, Deserialize)]
pub enum ParseError {
    /// Failed to parse JSON data
    #[error("JSON parse error at line {line}, column {column}: {message}")]
    Json {
        line: usize,
        column: usize,
        message: String,
    },

    /// The document is valid JSON but not a feature collection
    #[error("Not a feature collection: {reason}")]
    NotFeatureCollection { reason: String },
}

impl ParseError {
    /// Creates a not-a-collection error.
    pub fn not_feature_collection(reason: impl Into<String>) -> Self {
        Self::NotFeatureCollection {
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for ParseError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json {
            line: err.line(),
            column: err.column(),
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for GeoSyncError {
    fn from(err: serde_json::Error) -> Self {
        GeoSyncError::Parse(err.into())
    }
}

/// Errors related to configuration.
#[derive(Debug, Error, Serialize, Deserialize)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {reason}")]
    LoadFailed { path: String, reason: String },

    /// Invalid configuration format
    #[error("Invalid configuration format: {reason}")]
    InvalidFormat { reason: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

impl ConfigError {
    /// Creates an invalid value error.
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Errors related to the layer lifecycle.
#[derive(Debug, Error, Serialize, Deserialize)]
pub enum LayerError {
    /// No source is configured for the layer
    #[error("No data source configured for layer {key}")]
    NoSource { key: String },

    /// The layer build failed
    #[error("Failed to build layer {key}: {reason}")]
    BuildFailed { key: String, reason: String },

    /// The heat renderer failed to load or did not load in time
    #[error("Heat renderer unavailable for layer {key}")]
    PluginUnavailable { key: String },

    /// The registry was torn down
    #[error("Layer registry has been torn down")]
    TornDown,
}

impl LayerError {
    /// Creates a build failed error.
    pub fn build_failed(key: impl ToString, reason: impl Into<String>) -> Self {
        Self::BuildFailed {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}
