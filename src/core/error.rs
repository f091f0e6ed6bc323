//! Typed error handling for listview
//!
//! Most failures in this crate are recovered locally: a corrupt storage entry
//! falls back to the field default, a malformed filter degrades to "no match".
//! The types below exist for the places where a caller can still observe a
//! failure, namely storage backends, URL locations and record sources.
//!
//! # Error Categories
//!
//! - [`StorageError`]: durable storage reads and writes
//! - [`UrlError`]: query string parsing and location writes
//! - [`ViewError::Source`]: the record source behind a query failed
//! - [`ViewError::Config`]: configuration could not be loaded
//!
//! # Example
//!
//! ```rust,ignore
//! match engine.query(&request).await {
//!     Ok(result) => render(&result.records),
//!     Err(ViewError::Source { message }) => show_retry(message),
//!     Err(e) => tracing::error!(code = e.error_code(), "query failed: {}", e),
//! }
//! ```

use thiserror::Error;

/// Result alias used across the crate
pub type ViewResult<T> = Result<T, ViewError>;

/// The main error type for listview
///
/// Errors are `Clone` so a single failed fetch can be handed to every caller
/// that was coalesced onto it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ViewError {
    /// Durable storage errors
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// URL errors
    #[error(transparent)]
    Url(#[from] UrlError),

    /// The record source failed to produce a result
    #[error("Record source failed: {message}")]
    Source { message: String },

    /// Configuration errors
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Internal errors (poisoned locks and similar)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ViewError {
    /// Build a source error from anything displayable
    pub fn fetch_failed<E: std::fmt::Display>(err: E) -> Self {
        ViewError::Source {
            message: err.to_string(),
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            ViewError::Storage(e) => e.error_code(),
            ViewError::Url(e) => e.error_code(),
            ViewError::Source { .. } => "SOURCE_ERROR",
            ViewError::Config(_) => "CONFIG_ERROR",
            ViewError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

// =============================================================================
// Storage Errors
// =============================================================================

/// Errors raised by a [`DurableStorage`](crate::storage::DurableStorage) backend
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StorageError {
    /// Storage is disabled or not present in this environment
    #[error("Storage is unavailable")]
    Unavailable,

    /// Writing the value would exceed the storage quota
    #[error("Storage quota exceeded writing '{key}': {required} bytes needed, {available} available")]
    QuotaExceeded {
        key: String,
        required: usize,
        available: usize,
    },

    /// A stored value could not be decoded
    #[error("Corrupt storage entry '{key}': {message}")]
    Corrupt { key: String, message: String },

    /// IO error from a file-backed store
    #[error("Storage IO error on '{path}': {message}")]
    Io { path: String, message: String },
}

impl StorageError {
    pub fn error_code(&self) -> &'static str {
        match self {
            StorageError::Unavailable => "STORAGE_UNAVAILABLE",
            StorageError::QuotaExceeded { .. } => "STORAGE_QUOTA_EXCEEDED",
            StorageError::Corrupt { .. } => "STORAGE_CORRUPT",
            StorageError::Io { .. } => "STORAGE_IO_ERROR",
        }
    }
}

// =============================================================================
// URL Errors
// =============================================================================

/// Errors related to the URL query string
#[derive(Debug, Clone, PartialEq, Error)]
pub enum UrlError {
    /// A query parameter could not be parsed
    #[error("Invalid query parameter '{name}={value}': {message}")]
    InvalidParam {
        name: String,
        value: String,
        message: String,
    },

    /// The location refused the new query string
    #[error("Failed to update location: {message}")]
    WriteFailed { message: String },
}

impl UrlError {
    pub fn error_code(&self) -> &'static str {
        match self {
            UrlError::InvalidParam { .. } => "INVALID_QUERY_PARAM",
            UrlError::WriteFailed { .. } => "LOCATION_WRITE_FAILED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_converts_into_view_error() {
        let err: ViewError = StorageError::Unavailable.into();
        assert_eq!(err.error_code(), "STORAGE_UNAVAILABLE");
        assert_eq!(err.to_string(), "Storage is unavailable");
    }

    #[test]
    fn test_quota_error_message() {
        let err = StorageError::QuotaExceeded {
            key: "posts:visibility".to_string(),
            required: 120,
            available: 10,
        };
        assert!(err.to_string().contains("posts:visibility"));
        assert_eq!(err.error_code(), "STORAGE_QUOTA_EXCEEDED");
    }

    #[test]
    fn test_url_error_code() {
        let err: ViewError = UrlError::InvalidParam {
            name: "page".to_string(),
            value: "abc".to_string(),
            message: "not a number".to_string(),
        }
        .into();
        assert_eq!(err.error_code(), "INVALID_QUERY_PARAM");
    }

    #[test]
    fn test_source_error_from_display() {
        let err = ViewError::fetch_failed("connection reset");
        assert_eq!(err.to_string(), "Record source failed: connection reset");
        assert_eq!(err.error_code(), "SOURCE_ERROR");
    }
}
