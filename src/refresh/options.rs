//! Refresh timing configuration.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use tab_state::RefreshOptions;
//!
//! let options = RefreshOptions::new()
//!     .with_initial_wait(Duration::from_millis(500))
//!     .with_max_wait(Duration::from_secs(2));
//! options.validate()?;
//!
//! let from_json = RefreshOptions::from_json(r#"{"maxWaitMs": 5000}"#)?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Debounce before the first fetch of a burst, in milliseconds.
pub const DEFAULT_INITIAL_WAIT_MS: u64 = 1000;

/// Ceiling on time-to-fetch from the first request of a burst, in milliseconds.
pub const DEFAULT_MAX_WAIT_MS: u64 = 3000;

/// Lifetime of a cached count, in milliseconds.
pub const DEFAULT_CACHE_EXPIRATION_MS: u64 = 3000;

/// Upper bound accepted for any timing, in milliseconds (one day).
pub const MAX_TIMING_MS: u64 = 24 * 60 * 60 * 1000;

// ============================================================================
// RefreshOptions
// ============================================================================

/// Tunables for the annotation count refresh protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RefreshOptions {
    /// Debounce before the first fetch of a burst.
    pub initial_wait_ms: u64,

    /// Hard ceiling on time-to-fetch from the first request of a burst.
    pub max_wait_ms: u64,

    /// Lifetime of a cached count.
    pub cache_expiration_ms: u64,
}

impl Default for RefreshOptions {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl RefreshOptions {
    /// Creates options with the default timings.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            initial_wait_ms: DEFAULT_INITIAL_WAIT_MS,
            max_wait_ms: DEFAULT_MAX_WAIT_MS,
            cache_expiration_ms: DEFAULT_CACHE_EXPIRATION_MS,
        }
    }

    /// Parses options from a JSON object.
    ///
    /// Missing fields keep their defaults. The result is validated.
    ///
    /// # Errors
    ///
    /// - [`Error::Json`] if the input is not a valid options object
    /// - [`Error::Config`] if the timings are inconsistent
    pub fn from_json(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl RefreshOptions {
    /// Sets the initial debounce wait.
    #[inline]
    #[must_use]
    pub fn with_initial_wait(mut self, wait: Duration) -> Self {
        self.initial_wait_ms = duration_ms(wait);
        self
    }

    /// Sets the maximum wait before a burst's fetch.
    #[inline]
    #[must_use]
    pub fn with_max_wait(mut self, wait: Duration) -> Self {
        self.max_wait_ms = duration_ms(wait);
        self
    }

    /// Sets the cache entry lifetime.
    #[inline]
    #[must_use]
    pub fn with_cache_expiration(mut self, expiration: Duration) -> Self {
        self.cache_expiration_ms = duration_ms(expiration);
        self
    }
}

// ============================================================================
// Accessors
// ============================================================================

impl RefreshOptions {
    /// Returns the initial debounce wait.
    #[inline]
    #[must_use]
    pub const fn initial_wait(&self) -> Duration {
        Duration::from_millis(self.initial_wait_ms)
    }

    /// Returns the maximum wait before a burst's fetch.
    #[inline]
    #[must_use]
    pub const fn max_wait(&self) -> Duration {
        Duration::from_millis(self.max_wait_ms)
    }

    /// Returns the cache entry lifetime.
    #[inline]
    #[must_use]
    pub const fn cache_expiration(&self) -> Duration {
        Duration::from_millis(self.cache_expiration_ms)
    }

    /// Returns the debounce wait for the `attempt`-th request of a burst.
    ///
    /// Doubles per attempt starting at the initial wait, saturating at the
    /// maximum wait.
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(31);
        let wait = self.initial_wait_ms.saturating_mul(1u64 << shift);
        Duration::from_millis(wait.min(self.max_wait_ms))
    }

    /// Validates the options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the maximum wait is below the initial
    /// wait, the cache expiration is zero, or any timing exceeds
    /// [`MAX_TIMING_MS`].
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("initial wait", self.initial_wait_ms),
            ("max wait", self.max_wait_ms),
            ("cache expiration", self.cache_expiration_ms),
        ] {
            if value > MAX_TIMING_MS {
                return Err(Error::config(format!(
                    "{name} ({value}ms) exceeds the {MAX_TIMING_MS}ms limit"
                )));
            }
        }
        if self.max_wait_ms < self.initial_wait_ms {
            return Err(Error::config(format!(
                "max wait ({}ms) must not be below initial wait ({}ms)",
                self.max_wait_ms, self.initial_wait_ms
            )));
        }
        if self.cache_expiration_ms == 0 {
            return Err(Error::config("cache expiration must be greater than zero"));
        }
        Ok(())
    }
}

/// Converts a duration to whole milliseconds, saturating.
#[inline]
fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

// ============================================================================
// Tests
// ============================================================================
