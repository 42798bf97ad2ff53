//! Per-tab state store.
//!
//! [`TabStateStore`] maps tab ids to [`TabEntry`] records and reports every
//! mutation to an optional change handler, typically the badge renderer.
//!
//! # Example
//!
//! ```ignore
//! use tab_state::{BadgeProjection, BuildType, TabStateStore};
//!
//! let badge = BadgeProjection::new(BuildType::Production);
//! let store = TabStateStore::builder()
//!     .fetcher(my_fetcher)
//!     .on_change(move |tab_id, entry| render(tab_id, badge.project(entry)))
//!     .build()?;
//!
//! store.activate_tab(tab_id);
//! store.update_annotation_count(tab_id, "https://example.com/").await;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::Value;
use tracing::{debug, warn};

use crate::identifiers::TabId;
use crate::refresh::{AnnotationCountFetcher, BadgeUriPolicy, RefreshOptions, RefreshScheduler};

use super::builder::TabStateStoreBuilder;
use super::entry::{ActivationState, TabEntry, TabError, TabStatePatch};

// ============================================================================
// Types
// ============================================================================

/// Change handler callback type.
///
/// Called once per mutation with the tab's new entry, or `None` when the
/// entry was removed. Runs synchronously with no store lock held.
pub type ChangeHandler = Box<dyn Fn(TabId, Option<&TabEntry>) + Send + Sync>;

/// Internal shared state for a store.
struct StoreInner {
    /// Entries by tab.
    tabs: Mutex<FxHashMap<TabId, TabEntry>>,
    /// Mutation callback.
    on_change: Option<ChangeHandler>,
    /// Annotation count refresh.
    scheduler: RefreshScheduler,
}

// ============================================================================
// TabStateStore
// ============================================================================

/// Activation state and annotation counts for all tabs.
///
/// Cheap to clone; clones share the same tabs.
#[derive(Clone)]
pub struct TabStateStore {
    inner: Arc<StoreInner>,
}

impl fmt::Debug for TabStateStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TabStateStore")
            .field("tabs", &self.len())
            .field("has_on_change", &self.inner.on_change.is_some())
            .field("scheduler", &self.inner.scheduler)
            .finish()
    }
}

// ============================================================================
// TabStateStore - Constructor
// ============================================================================

impl TabStateStore {
    /// Creates a store with default options and no change handler.
    #[must_use]
    pub fn new(fetcher: impl AnnotationCountFetcher + 'static) -> Self {
        let scheduler = RefreshScheduler::new(
            Arc::new(fetcher),
            Arc::new(BadgeUriPolicy::default()),
            RefreshOptions::default(),
        );
        Self::from_parts(scheduler, None)
    }

    /// Returns a builder for a configured store.
    #[inline]
    #[must_use]
    pub fn builder() -> TabStateStoreBuilder {
        TabStateStoreBuilder::new()
    }

    pub(crate) fn from_parts(
        scheduler: RefreshScheduler,
        on_change: Option<ChangeHandler>,
    ) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                tabs: Mutex::new(FxHashMap::default()),
                on_change,
                scheduler,
            }),
        }
    }
}

// ============================================================================
// TabStateStore - Loading
// ============================================================================

impl TabStateStore {
    /// Replaces every entry with default (inactive, count 0) entries for
    /// `tabs`. `None` empties the store.
    ///
    /// Reports each seeded tab with its entry and each dropped tab with
    /// `None`. Dropped tabs lose their pending count refresh. Callers
    /// activate tabs explicitly afterwards.
    pub fn load<I>(&self, tabs: Option<I>)
    where
        I: IntoIterator<Item = TabId>,
    {
        let seeded: FxHashMap<TabId, TabEntry> = tabs
            .into_iter()
            .flatten()
            .map(|id| (id, TabEntry::default()))
            .collect();

        let previous = std::mem::replace(&mut *self.inner.tabs.lock(), seeded.clone());
        let cancelled = self
            .inner
            .scheduler
            .tracker()
            .retain(|id| seeded.contains_key(&id));
        let dropped: Vec<TabId> = previous
            .into_keys()
            .filter(|id| !seeded.contains_key(id))
            .collect();
        debug!(
            tabs = seeded.len(),
            dropped = dropped.len(),
            cancelled,
            "Tab state loaded"
        );

        for id in dropped {
            self.notify(id, None);
        }
        for (id, entry) in &seeded {
            self.notify(*id, Some(entry));
        }
    }

    /// Loads from a saved JSON object keyed by tab id.
    ///
    /// Values are ignored; every listed tab gets a default entry. Absent
    /// or malformed input loads nothing. Keys that are not tab ids are
    /// skipped.
    pub fn load_json(&self, saved: Option<&str>) {
        let tabs = saved.and_then(|raw| match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => Some(
                map.keys()
                    .filter_map(|key| key.parse::<TabId>().ok())
                    .collect::<FxHashSet<_>>(),
            ),
            Ok(other) => {
                warn!(kind = json_kind(&other), "Saved tab state is not an object");
                None
            }
            Err(e) => {
                warn!(error = %e, "Saved tab state is not valid JSON");
                None
            }
        });

        self.load(tabs);
    }
}

/// Names a JSON value's type for logging.
fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ============================================================================
// TabStateStore - Mutation
// ============================================================================

impl TabStateStore {
    /// Merges `patch` into the tab's entry, creating it if needed.
    ///
    /// `error` is cleared unless the resulting state is errored.
    pub fn set_state(&self, tab_id: TabId, patch: TabStatePatch) {
        let entry = self.apply_quietly(tab_id, patch);
        self.notify(tab_id, Some(&entry));
    }

    /// Marks the tab active. The annotation count is kept.
    #[inline]
    pub fn activate_tab(&self, tab_id: TabId) {
        self.set_state(tab_id, TabStatePatch::new().with_state(ActivationState::Active));
    }

    /// Marks the tab inactive. The annotation count is kept.
    #[inline]
    pub fn deactivate_tab(&self, tab_id: TabId) {
        self.set_state(tab_id, TabStatePatch::new().with_state(ActivationState::Inactive));
    }

    /// Marks the tab errored with `error`.
    #[inline]
    pub fn error_tab(&self, tab_id: TabId, error: TabError) {
        self.set_state(
            tab_id,
            TabStatePatch::new()
                .with_state(ActivationState::Errored)
                .with_error(error),
        );
    }

    /// Forgets the tab and cancels its pending count refresh.
    pub fn clear_tab(&self, tab_id: TabId) {
        self.inner.scheduler.tracker().cancel(tab_id);
        self.inner.tabs.lock().remove(&tab_id);
        self.notify(tab_id, None);
    }

    /// Refreshes the tab's annotation count for `url`.
    ///
    /// Any earlier refresh for the tab is superseded as soon as this is
    /// called. The returned future never fails: rejected URLs and fetch
    /// errors resolve the count to zero.
    #[must_use = "the refresh only completes when the future is driven"]
    pub fn update_annotation_count(&self, tab_id: TabId, url: &str) -> BoxFuture<'static, ()> {
        self.inner.scheduler.refresh(self, tab_id, url)
    }

    /// Merges `patch` without notifying. Returns the new entry.
    pub(crate) fn apply_quietly(&self, tab_id: TabId, patch: TabStatePatch) -> TabEntry {
        let mut tabs = self.inner.tabs.lock();
        let entry = tabs.entry(tab_id).or_default();
        entry.apply(patch);
        entry.clone()
    }

    /// Invokes the change handler, if any.
    pub(crate) fn notify(&self, tab_id: TabId, entry: Option<&TabEntry>) {
        if let Some(handler) = &self.inner.on_change {
            handler(tab_id, entry);
        }
    }
}

// ============================================================================
// TabStateStore - Queries
// ============================================================================

impl TabStateStore {
    /// Returns the tab's entry, if it has one.
    #[must_use]
    pub fn get_state(&self, tab_id: TabId) -> Option<TabEntry> {
        self.inner.tabs.lock().get(&tab_id).cloned()
    }

    /// Returns `true` if the tab is active.
    #[must_use]
    pub fn is_tab_active(&self, tab_id: TabId) -> bool {
        self.state_of(tab_id) == ActivationState::Active
    }

    /// Returns `true` if the tab is inactive or unknown.
    #[must_use]
    pub fn is_tab_inactive(&self, tab_id: TabId) -> bool {
        self.state_of(tab_id) == ActivationState::Inactive
    }

    /// Returns `true` if the tab is errored.
    #[must_use]
    pub fn is_tab_errored(&self, tab_id: TabId) -> bool {
        self.state_of(tab_id) == ActivationState::Errored
    }

    /// Returns the ids of all tabs with an entry.
    #[must_use]
    pub fn tab_ids(&self) -> Vec<TabId> {
        self.inner.tabs.lock().keys().copied().collect()
    }

    /// Returns the number of tabs with an entry.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.tabs.lock().len()
    }

    /// Returns `true` if no tab has an entry.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.tabs.lock().is_empty()
    }

    /// Returns the refresh scheduler.
    #[inline]
    #[must_use]
    pub fn scheduler(&self) -> &RefreshScheduler {
        &self.inner.scheduler
    }

    fn state_of(&self, tab_id: TabId) -> ActivationState {
        self.inner
            .tabs
            .lock()
            .get(&tab_id)
            .map_or(ActivationState::Inactive, |entry| entry.state)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use proptest::prelude::*;

    use crate::error::Result;

    struct ZeroFetcher;

    #[async_trait]
    impl AnnotationCountFetcher for ZeroFetcher {
        async fn fetch_count(&self, _uri: &str) -> Result<u64> {
            Ok(0)
        }
    }

    type Seen = Arc<Mutex<Vec<(TabId, Option<TabEntry>)>>>;

    fn recording_store() -> (TabStateStore, Seen) {
        let seen: Seen = Arc::default();
        let sink = Arc::clone(&seen);
        let store = TabStateStore::builder()
            .fetcher(ZeroFetcher)
            .on_change(move |id, entry| sink.lock().push((id, entry.cloned())))
            .build()
            .expect("store");
        (store, seen)
    }

    fn tab(id: u32) -> TabId {
        TabId::from_u32(id)
    }

    #[test]
    fn test_store_is_clone_and_debug() {
        fn assert_clone<T: Clone>() {}
        fn assert_debug<T: fmt::Debug>() {}
        assert_clone::<TabStateStore>();
        assert_debug::<TabStateStore>();
    }

    #[test]
    fn test_unknown_tab_is_inactive() {
        let store = TabStateStore::new(ZeroFetcher);
        assert_eq!(store.get_state(tab(1)), None);
        assert!(store.is_tab_inactive(tab(1)));
        assert!(!store.is_tab_active(tab(1)));
        assert!(!store.is_tab_errored(tab(1)));
    }

    #[test]
    fn test_activate_and_deactivate_keep_count() {
        let store = TabStateStore::new(ZeroFetcher);
        store.set_state(tab(1), TabStatePatch::new().with_annotation_count(5));

        store.activate_tab(tab(1));
        assert!(store.is_tab_active(tab(1)));
        assert_eq!(store.get_state(tab(1)).unwrap().annotation_count, 5);

        store.deactivate_tab(tab(1));
        assert!(store.is_tab_inactive(tab(1)));
        assert_eq!(store.get_state(tab(1)).unwrap().annotation_count, 5);
    }

    #[test]
    fn test_error_tab_sets_error() {
        let store = TabStateStore::new(ZeroFetcher);
        store.error_tab(tab(1), TabError::BlockedSite);

        let entry = store.get_state(tab(1)).unwrap();
        assert!(store.is_tab_errored(tab(1)));
        assert_eq!(entry.error, Some(TabError::BlockedSite));

        store.activate_tab(tab(1));
        assert_eq!(store.get_state(tab(1)).unwrap().error, None);
    }

    #[test]
    fn test_set_state_ignores_error_for_non_errored_state() {
        let store = TabStateStore::new(ZeroFetcher);
        store.set_state(
            tab(1),
            TabStatePatch::new()
                .with_state(ActivationState::Active)
                .with_error(TabError::LocalFile),
        );
        assert_eq!(store.get_state(tab(1)).unwrap().error, None);
    }

    #[test]
    fn test_every_mutation_notifies_once() {
        let (store, seen) = recording_store();

        store.activate_tab(tab(1));
        store.set_state(tab(1), TabStatePatch::new().with_annotation_count(3));
        store.error_tab(tab(2), TabError::other("boom"));
        store.deactivate_tab(tab(2));

        let seen = seen.lock();
        assert_eq!(seen.len(), 4);
        assert_eq!(seen[1].1.as_ref().unwrap().annotation_count, 3);
        assert!(seen[1].1.as_ref().unwrap().is_active());
        assert_eq!(seen[2].1.as_ref().unwrap().error, Some(TabError::other("boom")));
        assert_eq!(seen[3].1.as_ref().unwrap().error, None);
    }

    #[test]
    fn test_clear_tab_removes_and_notifies_none() {
        let (store, seen) = recording_store();
        store.error_tab(tab(1), TabError::NoFileAccess);

        store.clear_tab(tab(1));

        assert_eq!(store.get_state(tab(1)), None);
        assert!(store.is_tab_inactive(tab(1)));
        assert!(!store.is_tab_errored(tab(1)));
        assert_eq!(seen.lock().last(), Some(&(tab(1), None)));
    }

    #[test]
    fn test_handler_may_read_store() {
        let store_slot: Arc<Mutex<Option<TabStateStore>>> = Arc::default();
        let reads = Arc::new(Mutex::new(Vec::new()));
        let (slot, sink) = (Arc::clone(&store_slot), Arc::clone(&reads));

        let store = TabStateStore::builder()
            .fetcher(ZeroFetcher)
            .on_change(move |id, _| {
                if let Some(store) = slot.lock().as_ref() {
                    sink.lock().push(store.is_tab_active(id));
                }
            })
            .build()
            .expect("store");
        *store_slot.lock() = Some(store.clone());

        store.activate_tab(tab(1));
        assert_eq!(*reads.lock(), vec![true]);
        store_slot.lock().take();
    }

    #[test]
    fn test_load_seeds_inactive_entries() {
        let (store, seen) = recording_store();
        store.activate_tab(tab(9));
        seen.lock().clear();

        store.load(Some([tab(1), tab(2)]));

        assert_eq!(store.len(), 2);
        assert_eq!(store.get_state(tab(1)), Some(TabEntry::default()));
        assert_eq!(store.get_state(tab(9)), None);

        let seen = seen.lock();
        assert_eq!(seen.len(), 3);
        assert!(seen.contains(&(tab(9), None)));
        assert!(seen.contains(&(tab(2), Some(TabEntry::default()))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_cancels_refresh_of_dropped_tab() {
        let (store, seen) = recording_store();
        store.activate_tab(tab(1));

        let refresh = store.update_annotation_count(tab(1), "https://example.com/");
        store.load(Some([tab(2)]));
        refresh.await;

        assert_eq!(store.get_state(tab(1)), None);
        assert!(store.scheduler().tracker().is_empty());
        assert_eq!(seen.lock().last(), Some(&(tab(2), Some(TabEntry::default()))));
    }

    #[test]
    fn test_load_none_empties() {
        let store = TabStateStore::new(ZeroFetcher);
        store.activate_tab(tab(1));
        store.load(None::<Vec<TabId>>);
        assert!(store.is_empty());
    }

    #[test]
    fn test_load_json() {
        let store = TabStateStore::new(ZeroFetcher);
        store.load_json(Some(r#"{"3": {"state": "active"}, "7": {}, "x": {}}"#));

        let mut ids = store.tab_ids();
        ids.sort();
        assert_eq!(ids, vec![tab(3), tab(7)]);
        assert!(store.is_tab_inactive(tab(3)));
    }

    #[test]
    fn test_load_json_rejects_garbage() {
        let store = TabStateStore::new(ZeroFetcher);
        for input in [None, Some("{"), Some("[1, 2]"), Some("null")] {
            store.activate_tab(tab(1));
            store.load_json(input);
            assert!(store.is_empty(), "{input:?}");
        }
    }

    #[derive(Debug, Clone)]
    enum Op {
        Activate(u32),
        Deactivate(u32),
        Error(u32),
        Count(u32, u64),
        Clear(u32),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u32..4).prop_map(Op::Activate),
            (0u32..4).prop_map(Op::Deactivate),
            (0u32..4).prop_map(Op::Error),
            ((0u32..4), any::<u64>()).prop_map(|(id, n)| Op::Count(id, n)),
            (0u32..4).prop_map(Op::Clear),
        ]
    }

    proptest! {
        #[test]
        fn prop_error_iff_errored(ops in proptest::collection::vec(op_strategy(), 0..64)) {
            let (store, seen) = recording_store();

            for op in &ops {
                match *op {
                    Op::Activate(id) => store.activate_tab(tab(id)),
                    Op::Deactivate(id) => store.deactivate_tab(tab(id)),
                    Op::Error(id) => store.error_tab(tab(id), TabError::BlockedSite),
                    Op::Count(id, n) => {
                        store.set_state(tab(id), TabStatePatch::new().with_annotation_count(n));
                    }
                    Op::Clear(id) => store.clear_tab(tab(id)),
                }
            }

            prop_assert_eq!(seen.lock().len(), ops.len());
            for id in store.tab_ids() {
                let entry = store.get_state(id).unwrap();
                prop_assert_eq!(entry.error.is_some(), entry.is_errored());
            }
        }
    }
}
