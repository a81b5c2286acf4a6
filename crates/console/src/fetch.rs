//! Fetch lifecycle controller.
//!
//! Each logical query owns a [`FetchCell`]: a [`FetchState`] plus a request
//! generation counter. Starting a fetch bumps the generation and moves the
//! cell to `Loading` immediately, before the returned future is polled. A
//! completion only lands if its generation is still the latest for the cell;
//! anything older is dropped. Superseded requests also have their
//! cancellation token fired so pending retries stop early, but the in-flight
//! call itself is never aborted.
//!
//! [`FetchController`] layers the console's policies on top: gated queries
//! are skipped while the session is locked, the feedback bundle is fetched at
//! most once per unlocked session, and [`FetchController::clear`] drops every
//! cached result on logout.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt};
use tokio_util::sync::CancellationToken;
use x121_console_core::dashboard::DashboardStats;
use x121_console_core::feedback::FeedbackBundle;
use x121_console_core::fetch_state::{FetchState, FetchStatus, RequestTracker};
use x121_console_core::session::SessionGate;
use x121_console_core::types::Generation;

use crate::api::ConsoleApi;
use crate::retry::{retry_with_backoff, RetryPolicy};

// ---------------------------------------------------------------------------
// FetchKey
// ---------------------------------------------------------------------------

/// Identifies one logical query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchKey {
    DashboardStats,
    Feedback,
    OwnedItems,
}

impl FetchKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DashboardStats => "dashboard_stats",
            Self::Feedback => "feedback",
            Self::OwnedItems => "owned_items",
        }
    }
}

// ---------------------------------------------------------------------------
// FetchCell
// ---------------------------------------------------------------------------

/// Proof that a fetch was started. Handed back on completion.
#[derive(Debug)]
pub struct FetchTicket {
    generation: Generation,
    cancel: CancellationToken,
}

impl FetchTicket {
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Fired once a newer fetch or a reset supersedes this one.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

struct CellInner<T> {
    tracker: RequestTracker,
    state: FetchState<T>,
    cancel: Option<CancellationToken>,
}

/// State machine for a single fetch key.
///
/// Cloning is cheap and yields a handle to the same cell.
pub struct FetchCell<T> {
    key: FetchKey,
    inner: Arc<Mutex<CellInner<T>>>,
}

impl<T> Clone for FetchCell<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key,
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Send + 'static> FetchCell<T> {
    pub fn new(key: FetchKey) -> Self {
        Self {
            key,
            inner: Arc::new(Mutex::new(CellInner {
                tracker: RequestTracker::new(),
                state: FetchState::idle(),
                cancel: None,
            })),
        }
    }

    pub fn key(&self) -> FetchKey {
        self.key
    }

    pub fn snapshot(&self) -> FetchState<T> {
        self.lock().state.clone()
    }

    pub fn status(&self) -> FetchStatus {
        self.lock().state.status()
    }

    /// Issue a new generation and move to `Loading`.
    pub fn begin(&self) -> FetchTicket {
        let mut inner = self.lock();
        let generation = inner.tracker.issue();
        let cancel = CancellationToken::new();
        if let Some(previous) = inner.cancel.replace(cancel.clone()) {
            previous.cancel();
        }
        inner.state = FetchState::loading();

        tracing::debug!(key = self.key.as_str(), generation, "Fetch started");
        FetchTicket { generation, cancel }
    }

    /// Apply a finished operation if `ticket` is still authoritative.
    ///
    /// Returns `false` when the result was discarded as stale.
    pub fn complete<E: std::fmt::Display>(&self, ticket: FetchTicket, result: Result<T, E>) -> bool {
        let mut inner = self.lock();
        if !inner.tracker.is_current(ticket.generation) {
            tracing::debug!(
                key = self.key.as_str(),
                generation = ticket.generation,
                latest = inner.tracker.latest(),
                "Discarding stale fetch result",
            );
            return false;
        }

        match &result {
            Ok(_) => {
                tracing::info!(key = self.key.as_str(), generation = ticket.generation, "Fetch succeeded");
            }
            Err(e) => self.log_failure(ticket.generation, e),
        }
        inner.state = FetchState::from_result(result);
        inner.cancel = None;
        true
    }

    /// Start `operation` and return a future resolving to the cell's state
    /// once it completes.
    ///
    /// The transition to `Loading` happens here, synchronously. The
    /// operation receives the ticket's cancellation token.
    pub fn fetch<F, Fut, E>(&self, operation: F) -> impl Future<Output = FetchState<T>> + Send + 'static
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: std::fmt::Display + Send + 'static,
    {
        let ticket = self.begin();
        let pending = operation(ticket.cancel_token());
        let cell = self.clone();
        async move {
            let result = pending.await;
            cell.complete(ticket, result);
            cell.snapshot()
        }
    }

    /// Drop any result and return to `Idle`. In-flight work becomes stale.
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.tracker.invalidate();
        if let Some(cancel) = inner.cancel.take() {
            cancel.cancel();
        }
        inner.state = FetchState::idle();
    }

    // ---- private helpers ----

    fn lock(&self) -> MutexGuard<'_, CellInner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Feedback failures are suppressed in the UI, so the detail only lives
    /// in the log.
    fn log_failure(&self, generation: Generation, error: &dyn std::fmt::Display) {
        match self.key {
            FetchKey::Feedback => {
                tracing::error!(key = self.key.as_str(), generation, error = %error, "Fetch failed");
            }
            _ => {
                tracing::warn!(key = self.key.as_str(), generation, error = %error, "Fetch failed");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// FetchController
// ---------------------------------------------------------------------------

/// Owns the gated dashboard and feedback queries.
pub struct FetchController {
    gate: Arc<SessionGate>,
    api: Arc<dyn ConsoleApi>,
    retry: RetryPolicy,
    dashboard: FetchCell<DashboardStats>,
    feedback: FetchCell<FeedbackBundle>,
}

impl FetchController {
    pub fn new(gate: Arc<SessionGate>, api: Arc<dyn ConsoleApi>, retry: RetryPolicy) -> Self {
        Self {
            gate,
            api,
            retry,
            dashboard: FetchCell::new(FetchKey::DashboardStats),
            feedback: FetchCell::new(FetchKey::Feedback),
        }
    }

    pub fn dashboard(&self) -> FetchState<DashboardStats> {
        self.dashboard.snapshot()
    }

    pub fn feedback(&self) -> FetchState<FeedbackBundle> {
        self.feedback.snapshot()
    }

    pub fn dashboard_status(&self) -> FetchStatus {
        self.dashboard.status()
    }

    /// (Re)fetch dashboard stats. Skipped while locked.
    pub fn fetch_dashboard(&self) -> BoxFuture<'static, FetchState<DashboardStats>> {
        if !self.gate.is_unlocked() {
            tracing::debug!(key = FetchKey::DashboardStats.as_str(), "Gate locked, fetch skipped");
            return futures::future::ready(self.dashboard.snapshot()).boxed();
        }

        let api = Arc::clone(&self.api);
        let retry = self.retry.clone();
        self.dashboard
            .fetch(move |cancel| async move {
                retry_with_backoff(&retry, &cancel, || api.dashboard_stats()).await
            })
            .boxed()
    }

    /// Fetch the feedback bundle unless it is already loaded or loading.
    /// Skipped while locked.
    pub fn fetch_feedback(&self) -> BoxFuture<'static, FetchState<FeedbackBundle>> {
        if !self.gate.is_unlocked() {
            tracing::debug!(key = FetchKey::Feedback.as_str(), "Gate locked, fetch skipped");
            return futures::future::ready(self.feedback.snapshot()).boxed();
        }
        match self.feedback.status() {
            FetchStatus::Success | FetchStatus::Loading => {
                return futures::future::ready(self.feedback.snapshot()).boxed();
            }
            FetchStatus::Idle | FetchStatus::Error => {}
        }

        let api = Arc::clone(&self.api);
        let retry = self.retry.clone();
        self.feedback
            .fetch(move |cancel| async move {
                retry_with_backoff(&retry, &cancel, || api.feedback_bundle()).await
            })
            .boxed()
    }

    /// Forget every cached result. Completions still in flight are dropped.
    pub fn clear(&self) {
        self.dashboard.reset();
        self.feedback.reset();
    }
}
