//! Builder pattern for store configuration.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use tab_state::{RefreshOptions, TabStateStore};
//!
//! let store = TabStateStore::builder()
//!     .fetcher(my_fetcher)
//!     .options(RefreshOptions::new().with_initial_wait(Duration::from_millis(250)))
//!     .on_change(|tab_id, entry| println!("{tab_id}: {entry:?}"))
//!     .build()?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::identifiers::TabId;
use crate::refresh::{
    AnnotationCountFetcher, BadgeUriPolicy, RefreshOptions, RefreshScheduler, UrlNormalizer,
};

use super::entry::TabEntry;
use super::store::{ChangeHandler, TabStateStore};

// ============================================================================
// TabStateStoreBuilder
// ============================================================================

/// Builder for configuring a [`TabStateStore`].
///
/// Use [`TabStateStore::builder()`] to create a new builder.
#[derive(Default)]
pub struct TabStateStoreBuilder {
    /// Count fetcher.
    fetcher: Option<Arc<dyn AnnotationCountFetcher>>,
    /// URL normalizer; defaults to [`BadgeUriPolicy`].
    normalizer: Option<Arc<dyn UrlNormalizer>>,
    /// Refresh timings.
    options: RefreshOptions,
    /// Mutation callback.
    on_change: Option<ChangeHandler>,
}

impl fmt::Debug for TabStateStoreBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TabStateStoreBuilder")
            .field("has_fetcher", &self.fetcher.is_some())
            .field("has_normalizer", &self.normalizer.is_some())
            .field("options", &self.options)
            .field("has_on_change", &self.on_change.is_some())
            .finish()
    }
}

// ============================================================================
// TabStateStoreBuilder Implementation
// ============================================================================

impl TabStateStoreBuilder {
    /// Creates a new builder with no configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the annotation count fetcher.
    #[inline]
    #[must_use]
    pub fn fetcher(self, fetcher: impl AnnotationCountFetcher + 'static) -> Self {
        self.fetcher_arc(Arc::new(fetcher))
    }

    /// Sets a shared annotation count fetcher.
    #[inline]
    #[must_use]
    pub fn fetcher_arc(mut self, fetcher: Arc<dyn AnnotationCountFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Sets the URL normalizer.
    #[inline]
    #[must_use]
    pub fn normalizer(mut self, normalizer: impl UrlNormalizer + 'static) -> Self {
        self.normalizer = Some(Arc::new(normalizer));
        self
    }

    /// Sets the refresh timings.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: RefreshOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the change handler.
    #[inline]
    #[must_use]
    pub fn on_change<F>(mut self, handler: F) -> Self
    where
        F: Fn(TabId, Option<&TabEntry>) + Send + Sync + 'static,
    {
        self.on_change = Some(Box::new(handler));
        self
    }

    /// Builds the store with validation.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if no fetcher was set
    /// - [`Error::Config`] if the refresh options are invalid
    pub fn build(self) -> Result<TabStateStore> {
        let fetcher = self.fetcher.ok_or_else(|| {
            Error::config(
                "An annotation count fetcher is required. Use .fetcher() to set it.",
            )
        })?;
        self.options.validate()?;

        let normalizer = self
            .normalizer
            .unwrap_or_else(|| Arc::new(BadgeUriPolicy::default()));
        let scheduler = RefreshScheduler::new(fetcher, normalizer, self.options);

        Ok(TabStateStore::from_parts(scheduler, self.on_change))
    }
}

// ============================================================================
// Tests
// ============================================================================
