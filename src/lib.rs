//! Tab State - Per-tab activation state for browser extensions.
//!
//! This library tracks whether an annotation client is loaded into each
//! browser tab and keeps a per-tab annotation count fresh for the toolbar
//! badge.
//!
//! # Architecture
//!
//! - **State**: [`TabStateStore`] holds one [`TabEntry`] per tab and reports
//!   every mutation to a change handler
//! - **Refresh**: [`RefreshScheduler`] debounces count requests per tab,
//!   shares fetched counts across tabs through a short-lived cache, and
//!   drops superseded work
//! - **Badge**: [`BadgeProjection`] maps an entry to icon, title and text
//!
//! Key design principles:
//!
//! - The host supplies the count fetcher ([`AnnotationCountFetcher`]) and
//!   may replace the URL policy ([`UrlNormalizer`])
//! - At most one refresh is live per tab; newer requests win
//! - Refresh failures resolve the count to zero and never error the tab
//!
//! # Quick Start
//!
//! ```no_run
//! use async_trait::async_trait;
//! use tab_state::{AnnotationCountFetcher, Result, TabId, TabStateStore};
//!
//! struct Service;
//!
//! #[async_trait]
//! impl AnnotationCountFetcher for Service {
//!     async fn fetch_count(&self, _uri: &str) -> Result<u64> {
//!         Ok(3)
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let store = TabStateStore::builder()
//!         .fetcher(Service)
//!         .on_change(|tab_id, entry| println!("{tab_id}: {entry:?}"))
//!         .build()?;
//!
//!     let tab = TabId::from_u32(1);
//!     store.activate_tab(tab);
//!     store.update_annotation_count(tab, "https://example.com/").await;
//!     assert_eq!(store.get_state(tab).map(|e| e.annotation_count), Some(3));
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`badge`] | Toolbar badge projection |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`refresh`] | Annotation count refresh protocol |
//! | [`state`] | Tab entries and the store |

// ============================================================================
// Modules
// ============================================================================

/// Toolbar badge projection.
pub mod badge;

/// Error types and result aliases.
///
/// Fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
pub mod identifiers;

/// Annotation count refresh.
///
/// - [`RefreshScheduler`] - Debounce, cache and cancellation protocol
/// - [`AnnotationCountCache`] - Shared count cache
/// - [`PendingRequestTracker`] - One live refresh per tab
pub mod refresh;

/// Tab entries and the store.
pub mod state;

// ============================================================================
// Re-exports
// ============================================================================

// Badge types
pub use badge::{Badge, BadgeProjection, BuildType, IconSet};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::TabId;

// Refresh types
pub use refresh::{
    AnnotationCountCache, AnnotationCountFetcher, BadgeApi, BadgeUriPolicy, CancellationToken,
    PendingRequestTracker, RefreshOptions, RefreshScheduler, UrlNormalizer,
};

// State types
pub use state::{
    ActivationState, ChangeHandler, TabEntry, TabError, TabStatePatch, TabStateStore,
    TabStateStoreBuilder,
};
