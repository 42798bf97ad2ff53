//! Toolbar badge projection.
//!
//! Turns a tab's entry into what the toolbar button should show. Pure and
//! synchronous, so it can run directly inside a store change handler.
//!
//! | Tab | Icon | Text | Title |
//! |-----|------|------|-------|
//! | errored | inactive | `!` | failed to load |
//! | N annotations | by state | `N` (`999+` above 999) | N annotations |
//! | otherwise | by state | build label | active / not active |

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::state::TabEntry;

// ============================================================================
// Constants
// ============================================================================

/// Largest count shown verbatim.
const MAX_DISPLAYED_COUNT: u64 = 999;

const TITLE_ACTIVE: &str = "Annotation is active";
const TITLE_INACTIVE: &str = "Annotation is not active";
const TITLE_ERRORED: &str = "Annotation failed to load";

// ============================================================================
// BuildType
// ============================================================================

/// Extension build flavor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildType {
    /// Store release.
    #[default]
    Production,
    /// QA build.
    Qa,
    /// Local development build.
    Dev,
}

impl BuildType {
    /// Badge text shown when there is nothing else to show.
    #[inline]
    #[must_use]
    pub const fn default_label(self) -> &'static str {
        match self {
            Self::Production => "",
            Self::Qa => "QA",
            Self::Dev => "DEV",
        }
    }
}

// ============================================================================
// Badge
// ============================================================================

/// Toolbar icon variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IconSet {
    /// Client loaded.
    Active,
    /// Client not loaded.
    Inactive,
}

/// What the toolbar button shows for a tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Badge {
    /// Icon variant.
    pub icon: IconSet,
    /// Tooltip.
    pub title: String,
    /// Badge text; empty hides the badge.
    pub text: String,
}

// ============================================================================
// BadgeProjection
// ============================================================================

/// Maps tab entries to badges for one build flavor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BadgeProjection {
    build: BuildType,
}

impl BadgeProjection {
    /// Creates a projection for `build`.
    #[inline]
    #[must_use]
    pub const fn new(build: BuildType) -> Self {
        Self { build }
    }

    /// Returns the badge for a tab, `None` meaning the tab has no entry.
    #[must_use]
    pub fn project(&self, entry: Option<&TabEntry>) -> Badge {
        let default = TabEntry::default();
        let entry = entry.unwrap_or(&default);

        let icon = if entry.is_active() {
            IconSet::Active
        } else {
            IconSet::Inactive
        };

        if entry.is_errored() {
            return Badge {
                icon,
                title: TITLE_ERRORED.to_owned(),
                text: "!".to_owned(),
            };
        }

        if entry.annotation_count > 0 {
            return Badge {
                icon,
                title: count_title(entry.annotation_count),
                text: count_text(entry.annotation_count),
            };
        }

        let title = if entry.is_active() {
            TITLE_ACTIVE
        } else {
            TITLE_INACTIVE
        };
        Badge {
            icon,
            title: title.to_owned(),
            text: self.build.default_label().to_owned(),
        }
    }
}

fn count_text(count: u64) -> String {
    if count > MAX_DISPLAYED_COUNT {
        format!("{MAX_DISPLAYED_COUNT}+")
    } else {
        count.to_string()
    }
}

fn count_title(count: u64) -> String {
    if count == 1 {
        "There is 1 annotation on this page".to_owned()
    } else {
        format!("There are {} annotations on this page", count_text(count))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::state::{ActivationState, TabError};

    fn entry(state: ActivationState, annotation_count: u64) -> TabEntry {
        TabEntry {
            state,
            annotation_count,
            error: None,
        }
    }

    #[test]
    fn test_missing_entry_is_inactive() {
        let badge = BadgeProjection::default().project(None);
        assert_eq!(badge.icon, IconSet::Inactive);
        assert_eq!(badge.title, TITLE_INACTIVE);
        assert_eq!(badge.text, "");
    }

    #[test]
    fn test_active_icon() {
        let active = entry(ActivationState::Active, 0);
        let badge = BadgeProjection::default().project(Some(&active));
        assert_eq!(badge.icon, IconSet::Active);
        assert_eq!(badge.title, TITLE_ACTIVE);
    }

    #[test]
    fn test_count_text_and_title() {
        let projection = BadgeProjection::default();

        let one = projection.project(Some(&entry(ActivationState::Inactive, 1)));
        assert_eq!(one.text, "1");
        assert_eq!(one.title, "There is 1 annotation on this page");

        let many = projection.project(Some(&entry(ActivationState::Active, 42)));
        assert_eq!(many.text, "42");
        assert_eq!(many.title, "There are 42 annotations on this page");
    }

    #[test]
    fn test_count_is_capped() {
        let projection = BadgeProjection::default();
        assert_eq!(
            projection.project(Some(&entry(ActivationState::Active, 999))).text,
            "999"
        );
        assert_eq!(
            projection.project(Some(&entry(ActivationState::Active, 1000))).text,
            "999+"
        );
    }

    #[test]
    fn test_errored_shows_bang() {
        let errored = TabEntry {
            state: ActivationState::Errored,
            annotation_count: 12,
            error: Some(TabError::BlockedSite),
        };
        let badge = BadgeProjection::new(BuildType::Dev).project(Some(&errored));
        assert_eq!(badge.text, "!");
        assert_eq!(badge.title, TITLE_ERRORED);
        assert_eq!(badge.icon, IconSet::Inactive);
    }

    #[test]
    fn test_build_label_when_idle() {
        let idle = entry(ActivationState::Inactive, 0);
        assert_eq!(BadgeProjection::new(BuildType::Dev).project(Some(&idle)).text, "DEV");
        assert_eq!(BadgeProjection::new(BuildType::Qa).project(Some(&idle)).text, "QA");

        let counted = entry(ActivationState::Inactive, 3);
        assert_eq!(BadgeProjection::new(BuildType::Dev).project(Some(&counted)).text, "3");
    }
}
