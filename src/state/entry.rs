//! Tab entry types.
//!
//! A [`TabEntry`] is the per-tab record held by the store. Updates are
//! expressed as a [`TabStatePatch`] and merged with [`TabEntry::apply`],
//! which is the single place the error invariant is enforced.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// ActivationState
// ============================================================================

/// Whether the annotation client is loaded into a tab.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivationState {
    /// The client is loaded.
    Active,
    /// The client is not loaded.
    #[default]
    Inactive,
    /// Loading the client failed.
    Errored,
}

// ============================================================================
// TabError
// ============================================================================

/// Why the extension failed to load into a tab.
///
/// Carried by errored tabs only. Count refresh failures never produce one.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TabError {
    /// Page is a local file.
    #[error("Local files cannot be annotated")]
    LocalFile,

    /// Page is a local file and file URL access is disabled.
    #[error("File access is not allowed for the extension")]
    NoFileAccess,

    /// Page uses a scheme the extension cannot inject into.
    #[error("Pages using the {protocol} protocol cannot be annotated")]
    RestrictedProtocol {
        /// Offending scheme.
        protocol: String,
    },

    /// Site has opted out of annotation.
    #[error("This site cannot be annotated")]
    BlockedSite,

    /// Any other failure.
    #[error("{message}")]
    Other {
        /// Failure description.
        message: String,
    },
}

impl TabError {
    /// Creates an unclassified error.
    #[inline]
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// Returns `true` for failures the extension expects and explains to
    /// the user, as opposed to unexpected ones.
    #[inline]
    #[must_use]
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other { .. })
    }
}

// ============================================================================
// TabEntry
// ============================================================================

/// State tracked for one tab.
///
/// `error` is `Some` exactly when `state` is [`ActivationState::Errored`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabEntry {
    /// Activation state.
    pub state: ActivationState,
    /// Annotations on the tab's current page.
    pub annotation_count: u64,
    /// Load failure, for errored tabs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<TabError>,
}

impl TabEntry {
    /// Returns `true` if the tab is active.
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == ActivationState::Active
    }

    /// Returns `true` if the tab is inactive.
    #[inline]
    #[must_use]
    pub fn is_inactive(&self) -> bool {
        self.state == ActivationState::Inactive
    }

    /// Returns `true` if the tab is errored.
    #[inline]
    #[must_use]
    pub fn is_errored(&self) -> bool {
        self.state == ActivationState::Errored
    }

    /// Merges `patch` into this entry.
    ///
    /// Unset patch fields keep their current value. `error` is dropped
    /// whenever the resulting state is not errored.
    pub fn apply(&mut self, patch: TabStatePatch) {
        if let Some(state) = patch.state {
            self.state = state;
        }
        if let Some(count) = patch.annotation_count {
            self.annotation_count = count;
        }
        if let Some(error) = patch.error {
            self.error = Some(error);
        }
        if self.state != ActivationState::Errored {
            self.error = None;
        }
    }
}

// ============================================================================
// TabStatePatch
// ============================================================================

/// Partial update for a [`TabEntry`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TabStatePatch {
    /// New activation state.
    pub state: Option<ActivationState>,
    /// New annotation count.
    pub annotation_count: Option<u64>,
    /// New error. Ignored unless the resulting state is errored.
    pub error: Option<TabError>,
}

impl TabStatePatch {
    /// Creates an empty patch.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the activation state.
    #[inline]
    #[must_use]
    pub fn with_state(mut self, state: ActivationState) -> Self {
        self.state = Some(state);
        self
    }

    /// Sets the annotation count.
    #[inline]
    #[must_use]
    pub fn with_annotation_count(mut self, count: u64) -> Self {
        self.annotation_count = Some(count);
        self
    }

    /// Sets the error.
    #[inline]
    #[must_use]
    pub fn with_error(mut self, error: TabError) -> Self {
        self.error = Some(error);
        self
    }
}

// ============================================================================
// Tests
// ============================================================================
