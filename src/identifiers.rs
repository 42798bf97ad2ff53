//! Type-safe identifiers.
//!
//! Browser hosts hand out tab ids as plain integers and use negative
//! sentinels (`tabs.TAB_ID_NONE == -1`) for "no tab". [`TabId`] only
//! admits real tab ids.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ============================================================================
// TabId
// ============================================================================

/// Browser tab identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(u32);

impl TabId {
    /// Creates a tab ID from a host-provided integer.
    ///
    /// Returns `None` for negative sentinels and values out of range.
    #[inline]
    #[must_use]
    pub fn new(id: i64) -> Option<Self> {
        u32::try_from(id).ok().map(Self)
    }

    /// Creates a tab ID from an unsigned value.
    #[inline]
    #[must_use]
    pub const fn from_u32(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TabId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

impl From<u32> for TabId {
    #[inline]
    fn from(id: u32) -> Self {
        Self(id)
    }
}

// ============================================================================
// Tests
// ============================================================================
