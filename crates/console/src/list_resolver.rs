//! Resolves the caller's identity to the list of videos they own.
//!
//! Every resolution replaces the collection wholesale. A resolution result
//! is applied only if, at completion time, both its generation is the
//! latest issued and its identity is still the active one, so rapid identity
//! switches never show another caller's videos. An absent identity resolves
//! to the empty list without touching the backend.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt};
use tokio_util::sync::CancellationToken;
use x121_console_core::fetch_state::{FetchState, RequestTracker};
use x121_console_core::identity::CallerIdentity;
use x121_console_core::types::Generation;
use x121_console_core::videos::OwnedItem;

use crate::api::{ApiError, ConsoleApi};
use crate::fetch::FetchKey;
use crate::retry::{retry_with_backoff, RetryPolicy};

struct ResolverInner {
    active: CallerIdentity,
    tracker: RequestTracker,
    cancel: Option<CancellationToken>,
    state: FetchState<Vec<OwnedItem>>,
    /// Weak reference: may name an id that the current list no longer has.
    selected: Option<String>,
}

/// Sidebar list of owned videos, keyed on caller identity.
#[derive(Clone)]
pub struct ListResolver {
    api: Arc<dyn ConsoleApi>,
    retry: RetryPolicy,
    inner: Arc<Mutex<ResolverInner>>,
}

impl ListResolver {
    pub fn new(api: Arc<dyn ConsoleApi>, retry: RetryPolicy) -> Self {
        Self {
            api,
            retry,
            inner: Arc::new(Mutex::new(ResolverInner {
                active: CallerIdentity::Absent,
                tracker: RequestTracker::new(),
                cancel: None,
                state: FetchState::success(Vec::new()),
                selected: None,
            })),
        }
    }

    pub fn active_identity(&self) -> CallerIdentity {
        self.lock().active.clone()
    }

    pub fn state(&self) -> FetchState<Vec<OwnedItem>> {
        self.lock().state.clone()
    }

    /// The resolved collection; empty while loading or after a failure.
    pub fn items(&self) -> Vec<OwnedItem> {
        self.lock().state.data().cloned().unwrap_or_default()
    }

    /// Resolve `identity`, superseding any resolution still in flight.
    ///
    /// The new identity becomes active immediately. The returned future
    /// yields the collection visible once this resolution settles.
    pub fn resolve(&self, identity: CallerIdentity) -> BoxFuture<'static, Vec<OwnedItem>> {
        let mut inner = self.lock();
        let generation = inner.tracker.issue();
        if let Some(previous) = inner.cancel.take() {
            previous.cancel();
        }
        inner.active = identity.clone();

        if identity.is_absent() {
            inner.state = FetchState::success(Vec::new());
            tracing::debug!(key = FetchKey::OwnedItems.as_str(), "No caller identity, list cleared");
            return futures::future::ready(Vec::new()).boxed();
        }

        let cancel = CancellationToken::new();
        inner.cancel = Some(cancel.clone());
        inner.state = FetchState::loading();
        drop(inner);

        tracing::debug!(
            key = FetchKey::OwnedItems.as_str(),
            %identity,
            generation,
            "Resolving owned items",
        );

        let api = Arc::clone(&self.api);
        let retry = self.retry.clone();
        let resolver = self.clone();
        async move {
            let result =
                retry_with_backoff(&retry, &cancel, || api.owned_items(&identity)).await;
            resolver.apply(generation, &identity, result);
            resolver.items()
        }
        .boxed()
    }

    /// Re-resolve the active identity.
    pub fn refresh(&self) -> BoxFuture<'static, Vec<OwnedItem>> {
        let identity = self.active_identity();
        self.resolve(identity)
    }

    /// Mark `id` as selected. Not validated against the current list.
    pub fn select(&self, id: impl Into<String>) {
        self.lock().selected = Some(id.into());
    }

    pub fn selected_id(&self) -> Option<String> {
        self.lock().selected.clone()
    }

    /// The selected item, or `None` if the current list does not contain it.
    pub fn selected_item(&self) -> Option<OwnedItem> {
        let inner = self.lock();
        let selected = inner.selected.as_deref()?;
        inner
            .state
            .data()?
            .iter()
            .find(|item| item.id == selected)
            .cloned()
    }

    // ---- private helpers ----

    fn lock(&self) -> MutexGuard<'_, ResolverInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn apply(
        &self,
        generation: Generation,
        identity: &CallerIdentity,
        result: Result<Vec<OwnedItem>, ApiError>,
    ) {
        let mut inner = self.lock();
        if !inner.tracker.is_current(generation) || inner.active != *identity {
            tracing::debug!(
                key = FetchKey::OwnedItems.as_str(),
                %identity,
                generation,
                "Discarding stale owned-items result",
            );
            return;
        }

        inner.cancel = None;
        inner.state = match result {
            Ok(items) => {
                tracing::info!(
                    key = FetchKey::OwnedItems.as_str(),
                    %identity,
                    count = items.len(),
                    "Owned items resolved",
                );
                FetchState::success(items)
            }
            Err(e) => {
                tracing::warn!(
                    key = FetchKey::OwnedItems.as_str(),
                    %identity,
                    error = %e,
                    "Owned items query failed",
                );
                FetchState::failed(e.to_string())
            }
        };
    }
}
