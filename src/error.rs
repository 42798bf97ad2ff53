//! Error types for tab state tracking.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! Fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use tab_state::{BadgeUriPolicy, Result, UrlNormalizer};
//!
//! fn example() -> Result<()> {
//!     let uri = BadgeUriPolicy::default().normalize("https://example.com/#top")?;
//!     assert_eq!(uri, "https://example.com/");
//!     Ok(())
//! }
//! ```
//!
//! Refresh failures are never returned to callers of
//! `update_annotation_count`; they resolve the tab's count to zero instead.
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | URL policy | [`Error::InvalidUrl`], [`Error::BlockedProtocol`], [`Error::BlockedHost`] |
//! | Fetching | [`Error::Fetch`] |
//! | External | [`Error::Json`] |

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;
use url::ParseError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when refresh options or the store builder are invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // URL Policy Errors
    // ========================================================================
    /// URL could not be parsed.
    #[error("Invalid URL {url:?}: {source}")]
    InvalidUrl {
        /// The rejected input.
        url: String,
        /// Underlying parse failure.
        #[source]
        source: ParseError,
    },

    /// URL scheme is not eligible for badge requests.
    #[error("Blocked protocol: {scheme}")]
    BlockedProtocol {
        /// The rejected scheme, without the trailing colon.
        scheme: String,
    },

    /// URL host is on the block list.
    #[error("Blocked host: {host}")]
    BlockedHost {
        /// The rejected host name.
        host: String,
    },

    // ========================================================================
    // Fetch Errors
    // ========================================================================
    /// Annotation count fetch failed.
    ///
    /// Returned by [`AnnotationCountFetcher`](crate::AnnotationCountFetcher)
    /// implementations when the count service cannot answer.
    #[error("Fetch failed for {uri}: {message}")]
    Fetch {
        /// Normalized URI the count was requested for.
        uri: String,
        /// Description of the failure.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid URL error.
    #[inline]
    pub fn invalid_url(url: impl Into<String>, source: ParseError) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            source,
        }
    }

    /// Creates a blocked protocol error.
    #[inline]
    pub fn blocked_protocol(scheme: impl Into<String>) -> Self {
        Self::BlockedProtocol {
            scheme: scheme.into(),
        }
    }

    /// Creates a blocked host error.
    #[inline]
    pub fn blocked_host(host: impl Into<String>) -> Self {
        Self::BlockedHost { host: host.into() }
    }

    /// Creates a fetch error.
    #[inline]
    pub fn fetch(uri: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Fetch {
            uri: uri.into(),
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if the URL was rejected by the badge URL policy.
    #[inline]
    #[must_use]
    pub fn is_url_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidUrl { .. } | Self::BlockedProtocol { .. } | Self::BlockedHost { .. }
        )
    }

    /// Returns `true` if this is a fetch error.
    #[inline]
    #[must_use]
    pub fn is_fetch_error(&self) -> bool {
        matches!(self, Self::Fetch { .. } | Self::Json(_))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error() {
        let err = Error::config("max wait below initial wait");
        assert_eq!(
            err.to_string(),
            "Configuration error: max wait below initial wait"
        );
    }

    #[test]
    fn test_fetch_error_display() {
        let err = Error::fetch("https://example.com/", "503");
        assert_eq!(err.to_string(), "Fetch failed for https://example.com/: 503");
        assert!(err.is_fetch_error());
        assert!(!err.is_url_error());
    }

    #[test]
    fn test_is_url_error() {
        let invalid = Error::invalid_url("nope", ParseError::RelativeUrlWithoutBase);
        let protocol = Error::blocked_protocol("chrome");
        let host = Error::blocked_host("mail.google.com");
        let other = Error::config("test");

        assert!(invalid.is_url_error());
        assert!(protocol.is_url_error());
        assert!(host.is_url_error());
        assert!(!other.is_url_error());
    }

    #[test]
    fn test_invalid_url_keeps_source() {
        use std::error::Error as _;

        let err = Error::invalid_url("nope", ParseError::RelativeUrlWithoutBase);
        assert!(err.source().is_some());
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<u64>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
        assert!(err.is_fetch_error());
    }
}
