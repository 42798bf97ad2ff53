//! Annotation count refresh.
//!
//! Keeps each tab's badge count current without hammering the annotation
//! service while the user navigates.
//!
//! # Architecture
//!
//! ```text
//! update_annotation_count(tab, url)
//!          │
//!          ▼
//! ┌──────────────────┐  register/cancel  ┌───────────────────────┐
//! │ RefreshScheduler │──────────────────►│ PendingRequestTracker │
//! │                  │                   │  (one op per tab)     │
//! │                  │  get/set          ├───────────────────────┤
//! │                  │──────────────────►│ AnnotationCountCache  │
//! │                  │                   │  (shared, by URL)     │
//! │                  │  debounce, fetch  ├───────────────────────┤
//! │                  │──────────────────►│ AnnotationCountFetcher│
//! └────────┬─────────┘                   └───────────────────────┘
//!          │ annotation_count
//!          ▼
//!    TabStateStore ──► change handler
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `cache` | Time-expiring count cache |
//! | `fetcher` | Fetcher and normalizer contracts, default URL policy |
//! | `options` | Timing configuration |
//! | `pending` | Per-tab pending refresh tracking |
//! | `scheduler` | The refresh protocol |

// ============================================================================
// Submodules
// ============================================================================

/// Time-expiring count cache.
pub mod cache;

/// Fetcher and normalizer contracts.
pub mod fetcher;

/// Timing configuration.
pub mod options;

/// Per-tab pending refresh tracking.
pub mod pending;

/// The refresh protocol.
pub mod scheduler;

// ============================================================================
// Re-exports
// ============================================================================

pub use cache::AnnotationCountCache;
pub use fetcher::{AnnotationCountFetcher, BadgeApi, BadgeUriPolicy, UrlNormalizer};
pub use options::{
    DEFAULT_CACHE_EXPIRATION_MS, DEFAULT_INITIAL_WAIT_MS, DEFAULT_MAX_WAIT_MS, MAX_TIMING_MS,
    RefreshOptions,
};
pub use pending::{CancellationToken, PendingRequestTracker, Registration};
pub use scheduler::RefreshScheduler;
