//! Per-tab state.
//!
//! This module contains the tab records and the store that holds them:
//!
//! - [`TabEntry`] - Activation state, annotation count, load error
//! - [`TabStatePatch`] - Partial update merged into an entry
//! - [`TabStateStore`] - Tab id to entry mapping with change notification
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `entry` | Entry, patch and error types |
//! | `store` | The store and its change handler |
//! | `builder` | Store configuration |

// ============================================================================
// Submodules
// ============================================================================

/// Store configuration.
pub mod builder;

/// Entry, patch and error types.
pub mod entry;

/// The store and its change handler.
pub mod store;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::TabStateStoreBuilder;
pub use entry::{ActivationState, TabEntry, TabError, TabStatePatch};
pub use store::{ChangeHandler, TabStateStore};
