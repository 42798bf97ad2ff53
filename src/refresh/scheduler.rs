//! Debounced, cancellable, cached annotation count refresh.
//!
//! # Protocol
//!
//! For a refresh of `(tab_id, url)`:
//!
//! 1. Register with the [`PendingRequestTracker`], superseding the tab's
//!    previous refresh.
//! 2. Normalize the URL. Rejected pages resolve to a count of zero at once.
//! 3. A cache hit resolves at once.
//! 4. Otherwise debounce, then fetch. The n-th request of a burst fires at
//!    `min(now + initial_wait * 2^(n-1), burst_start + max_wait)`.
//! 5. Apply the fetched count (or zero on failure) unless superseded.
//!
//! Steps 1-3 run when the refresh is requested, not when its future is
//! first polled, so request order alone decides which refresh wins.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::{self, BoxFuture};
use tokio::time::{Instant, sleep_until};
use tracing::{debug, trace, warn};

use crate::identifiers::TabId;
use crate::state::{TabStatePatch, TabStateStore};

use super::cache::AnnotationCountCache;
use super::fetcher::{AnnotationCountFetcher, UrlNormalizer};
use super::options::RefreshOptions;
use super::pending::{CancellationToken, PendingRequestTracker, Registration};

// ============================================================================
// Types
// ============================================================================

/// Shared scheduler state.
struct SchedulerInner {
    options: RefreshOptions,
    cache: AnnotationCountCache,
    tracker: PendingRequestTracker,
    fetcher: Arc<dyn AnnotationCountFetcher>,
    normalizer: Arc<dyn UrlNormalizer>,
}

// ============================================================================
// RefreshScheduler
// ============================================================================

/// Orchestrates cache, tracker and fetcher to refresh tab counts.
///
/// Cheap to clone; clones share the cache and the pending refreshes.
#[derive(Clone)]
pub struct RefreshScheduler {
    inner: Arc<SchedulerInner>,
}

impl fmt::Debug for RefreshScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshScheduler")
            .field("options", &self.inner.options)
            .field("cached", &self.inner.cache.len())
            .field("pending", &self.inner.tracker.len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// RefreshScheduler - Constructor
// ============================================================================

impl RefreshScheduler {
    /// Creates a scheduler.
    ///
    /// `options` are used as given; validate them first.
    #[must_use]
    pub fn new(
        fetcher: Arc<dyn AnnotationCountFetcher>,
        normalizer: Arc<dyn UrlNormalizer>,
        options: RefreshOptions,
    ) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                options,
                cache: AnnotationCountCache::new(options.cache_expiration()),
                tracker: PendingRequestTracker::new(),
                fetcher,
                normalizer,
            }),
        }
    }
}

// ============================================================================
// RefreshScheduler - Accessors
// ============================================================================

impl RefreshScheduler {
    /// Returns the timing options.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &RefreshOptions {
        &self.inner.options
    }

    /// Returns the shared count cache.
    #[inline]
    #[must_use]
    pub fn cache(&self) -> &AnnotationCountCache {
        &self.inner.cache
    }

    /// Returns the pending refresh tracker.
    #[inline]
    #[must_use]
    pub fn tracker(&self) -> &PendingRequestTracker {
        &self.inner.tracker
    }
}

// ============================================================================
// RefreshScheduler - Refresh
// ============================================================================

impl RefreshScheduler {
    /// Refreshes the annotation count of `tab_id` for `url` into `store`.
    ///
    /// Registration, normalization and the cache lookup happen before this
    /// returns. The returned future performs the debounce and fetch; it
    /// always resolves, except while a fetch itself never completes.
    pub fn refresh(
        &self,
        store: &TabStateStore,
        tab_id: TabId,
        url: &str,
    ) -> BoxFuture<'static, ()> {
        let now = Instant::now();
        let registration = self.inner.tracker.register(tab_id, url, now);
        debug!(
            tab_id = %tab_id,
            url,
            attempt = registration.attempt,
            "Annotation count refresh requested"
        );

        let uri = match self.inner.normalizer.normalize(url) {
            Ok(uri) => uri,
            Err(e) => {
                debug!(tab_id = %tab_id, error = %e, "URL not eligible for badge request");
                self.finish(store, &registration.token, 0, None);
                return future::ready(()).boxed();
            }
        };

        if let Some(count) = self.inner.cache.get(&uri) {
            debug!(tab_id = %tab_id, uri = %uri, count, "Annotation count cache hit");
            self.finish(store, &registration.token, count, None);
            return future::ready(()).boxed();
        }

        let fire_at = self.fire_at(&registration, now);
        let guard = RefreshGuard {
            scheduler: self.clone(),
            token: registration.token,
        };
        let store = store.clone();

        async move {
            let guard = guard;
            guard
                .scheduler
                .debounce_and_fetch(&store, guard.token.clone(), uri, fire_at)
                .await;
        }
        .boxed()
    }

    /// Computes when a registered request should fetch.
    fn fire_at(&self, registration: &Registration, now: Instant) -> Instant {
        let options = &self.inner.options;
        let debounced = now + options.backoff(registration.attempt);
        let ceiling = registration.burst_started + options.max_wait();
        debounced.min(ceiling)
    }

    /// Waits until `fire_at`, fetches, and applies the result.
    async fn debounce_and_fetch(
        &self,
        store: &TabStateStore,
        token: CancellationToken,
        uri: String,
        fire_at: Instant,
    ) {
        let tab_id = token.tab_id();

        if token.is_cancelled() {
            trace!(tab_id = %tab_id, "Refresh superseded before debounce");
            return;
        }

        tokio::select! {
            biased;
            () = token.cancelled() => {
                trace!(tab_id = %tab_id, "Refresh superseded during debounce");
                return;
            }
            () = sleep_until(fire_at) => {}
        }

        if !self.inner.tracker.begin_fetch(&token) {
            trace!(tab_id = %tab_id, "Refresh superseded after debounce");
            return;
        }

        debug!(tab_id = %tab_id, uri = %uri, "Fetching annotation count");
        let result = self.inner.fetcher.fetch_count(&uri).await;

        if token.is_cancelled() {
            trace!(tab_id = %tab_id, uri = %uri, "Discarding superseded fetch result");
            return;
        }

        match result {
            Ok(count) => self.finish(store, &token, count, Some(&uri)),
            Err(e) => {
                warn!(tab_id = %tab_id, uri = %uri, error = %e, "Annotation count fetch failed");
                self.finish(store, &token, 0, None);
            }
        }
    }

    /// Writes `count` to the store (and the cache, if `cache_as` is set)
    /// when `token` is still current, then notifies.
    fn finish(
        &self,
        store: &TabStateStore,
        token: &CancellationToken,
        count: u64,
        cache_as: Option<&str>,
    ) {
        let tab_id = token.tab_id();

        let applied = self.inner.tracker.complete(token, || {
            if let Some(uri) = cache_as {
                self.inner.cache.set(uri, count);
            }
            store.apply_quietly(
                tab_id,
                TabStatePatch::new().with_annotation_count(count),
            )
        });

        match applied {
            Some(entry) => {
                debug!(tab_id = %tab_id, count, "Annotation count updated");
                store.notify(tab_id, Some(&entry));
            }
            None => trace!(tab_id = %tab_id, "Dropping superseded refresh result"),
        }
    }
}

// ============================================================================
// RefreshGuard
// ============================================================================

/// Owned by a refresh future; forgets the tab's operation if the future is
/// dropped before it finishes, so the next request starts a fresh burst.
struct RefreshGuard {
    scheduler: RefreshScheduler,
    token: CancellationToken,
}

impl Drop for RefreshGuard {
    fn drop(&mut self) {
        if self.scheduler.inner.tracker.complete(&self.token, || ()).is_some() {
            trace!(tab_id = %self.token.tab_id(), "Refresh dropped before completion");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
