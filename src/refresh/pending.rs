//! Per-tab pending refresh tracking.
//!
//! Each tab has at most one live refresh. Registering a new one cancels the
//! previous one in the same critical section, and the final "still
//! current? then write" step runs under the same lock, so a superseded
//! refresh can never overwrite the result of a newer one.
//!
//! # Lifecycle
//!
//! ```text
//! register ──► Waiting ──begin_fetch──► Fetching ──complete──► (removed)
//!    │            │                        │
//!    └── a newer register / cancel marks the token cancelled at any point
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::trace;

use crate::identifiers::TabId;

// ============================================================================
// CancellationToken
// ============================================================================

/// Shared state behind a token.
struct TokenInner {
    tab_id: TabId,
    cancelled: AtomicBool,
    notify: Notify,
}

/// Cancellation flag for one pending refresh.
///
/// Clones share the same flag.
#[derive(Clone)]
pub struct CancellationToken {
    inner: Arc<TokenInner>,
}

impl fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationToken")
            .field("tab_id", &self.inner.tab_id)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

impl CancellationToken {
    fn new(tab_id: TabId) -> Self {
        Self {
            inner: Arc::new(TokenInner {
                tab_id,
                cancelled: AtomicBool::new(false),
                notify: Notify::new(),
            }),
        }
    }

    /// Returns the tab this token belongs to.
    #[inline]
    #[must_use]
    pub fn tab_id(&self) -> TabId {
        self.inner.tab_id
    }

    /// Returns `true` once the refresh has been superseded or cancelled.
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Completes when the token is cancelled.
    pub async fn cancelled(&self) {
        let notified = self.inner.notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        if self.is_cancelled() {
            return;
        }
        notified.await;
    }

    fn cancel(&self) {
        if !self.inner.cancelled.swap(true, Ordering::AcqRel) {
            self.inner.notify.notify_waiters();
        }
    }

    #[inline]
    fn same(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

// ============================================================================
// PendingOperation
// ============================================================================

/// Phase of a pending refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Debouncing; a newer request joins this burst.
    Waiting,
    /// Fetch issued; a newer request starts a new burst.
    Fetching,
}

/// The live refresh for one tab.
#[derive(Debug)]
struct PendingOperation {
    token: CancellationToken,
    url: String,
    burst_started: Instant,
    attempt: u32,
    phase: Phase,
}

// ============================================================================
// Registration
// ============================================================================

/// Result of [`PendingRequestTracker::register`].
#[derive(Debug, Clone)]
pub struct Registration {
    /// Token for the new operation.
    pub token: CancellationToken,
    /// When the coalescing burst this request belongs to started.
    pub burst_started: Instant,
    /// 1-based position of this request within its burst.
    pub attempt: u32,
}

// ============================================================================
// PendingRequestTracker
// ============================================================================

/// Tracks the single in-flight refresh per tab.
#[derive(Debug, Default)]
pub struct PendingRequestTracker {
    ops: Mutex<FxHashMap<TabId, PendingOperation>>,
}

impl PendingRequestTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a new operation for `tab_id`, cancelling the previous one.
    ///
    /// If the previous operation was still debouncing, the new one joins
    /// its burst; otherwise a new burst starts at `now`.
    pub fn register(&self, tab_id: TabId, url: &str, now: Instant) -> Registration {
        let mut ops = self.ops.lock();

        let (burst_started, attempt) = match ops.get(&tab_id) {
            Some(prev) if prev.phase == Phase::Waiting && !prev.token.is_cancelled() => {
                (prev.burst_started, prev.attempt.saturating_add(1))
            }
            _ => (now, 1),
        };

        let token = CancellationToken::new(tab_id);
        let op = PendingOperation {
            token: token.clone(),
            url: url.to_owned(),
            burst_started,
            attempt,
            phase: Phase::Waiting,
        };

        if let Some(prev) = ops.insert(tab_id, op) {
            prev.token.cancel();
            trace!(tab_id = %tab_id, url = %prev.url, "Superseded pending refresh");
        }

        Registration {
            token,
            burst_started,
            attempt,
        }
    }

    /// Returns `true` if `token` has been superseded or cancelled.
    ///
    /// Equivalent to [`CancellationToken::is_cancelled`]; the token carries
    /// its own flag, so no tracker state is read.
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self, token: &CancellationToken) -> bool {
        token.is_cancelled()
    }

    /// Marks the operation as fetching.
    ///
    /// Returns `false` if `token` is no longer the tab's live operation.
    pub fn begin_fetch(&self, token: &CancellationToken) -> bool {
        let mut ops = self.ops.lock();
        match ops.get_mut(&token.tab_id()) {
            Some(op) if op.token.same(token) => {
                op.phase = Phase::Fetching;
                true
            }
            _ => false,
        }
    }

    /// Finishes the operation for `token` by running `apply`.
    ///
    /// `apply` runs under the tracker lock only if `token` is still the
    /// tab's live operation; the operation is then removed. Returns `None`
    /// without running `apply` for superseded tokens.
    pub fn complete<T>(&self, token: &CancellationToken, apply: impl FnOnce() -> T) -> Option<T> {
        let mut ops = self.ops.lock();
        let tab_id = token.tab_id();

        match ops.get(&tab_id) {
            Some(op) if op.token.same(token) => {
                let out = apply();
                ops.remove(&tab_id);
                Some(out)
            }
            _ => None,
        }
    }

    /// Cancels and forgets the live operation for `tab_id`.
    ///
    /// Returns `true` if there was one.
    pub fn cancel(&self, tab_id: TabId) -> bool {
        let removed = self.ops.lock().remove(&tab_id);
        match removed {
            Some(op) => {
                op.token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancels and forgets every live operation whose tab fails `keep`.
    ///
    /// Returns the number of operations cancelled.
    pub fn retain(&self, mut keep: impl FnMut(TabId) -> bool) -> usize {
        let mut ops = self.ops.lock();
        let before = ops.len();
        ops.retain(|tab_id, op| {
            let kept = keep(*tab_id);
            if !kept {
                op.token.cancel();
            }
            kept
        });
        before - ops.len()
    }

    /// Returns the URL of the live operation for `tab_id`.
    #[must_use]
    pub fn pending_url(&self, tab_id: TabId) -> Option<String> {
        self.ops.lock().get(&tab_id).map(|op| op.url.clone())
    }

    /// Returns the number of live operations.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.lock().len()
    }

    /// Returns `true` if no operation is live.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.lock().is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================
