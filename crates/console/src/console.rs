//! The admin console: session gate, fetch lifecycle, owned-item list and
//! tab selection wired together.
//!
//! [`AdminConsole`] is the single entry point an embedding UI drives. It
//! decides when gated queries run:
//!
//! - the dashboard stats are fetched once per unlock transition (and on
//!   startup when the session was restored unlocked);
//! - the feedback bundle is fetched the first time the feedback tab is
//!   selected and then reused until logout;
//! - logout locks the gate and drops every cached result.
//!
//! A failed credential check only yields [`ConsoleError::AuthRejected`].
//! There is no attempt limit or lockout.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use x121_console_core::credentials::CredentialCheck;
use x121_console_core::dashboard::{DashboardStats, DashboardView};
use x121_console_core::error::ConsoleError;
use x121_console_core::feedback::{
    distribution_bars, feedback_rows, filter_feedback, DistributionBar, FeedbackBundle,
    FeedbackRecord, FeedbackRow, FeedbackView, RatingFilter,
};
use x121_console_core::fetch_state::{FetchState, FetchStatus};
use x121_console_core::identity::CallerIdentity;
use x121_console_core::session::SessionGate;
use x121_console_core::videos::OwnedItem;
use x121_console_core::view::{ConsoleTab, ViewSelector};

use crate::api::{ConsoleApi, HttpConsoleApi};
use crate::config::ConsoleConfig;
use crate::fetch::FetchController;
use crate::list_resolver::ListResolver;
use crate::retry::RetryPolicy;

/// Shown when the credential check fails.
pub const AUTH_REJECTED_MESSAGE: &str = "Invalid credentials";

/// UI-local state that is not fetched.
#[derive(Debug, Default)]
struct UiState {
    view: ViewSelector,
    filter: RatingFilter,
}

pub struct AdminConsole {
    gate: Arc<SessionGate>,
    credentials: Arc<dyn CredentialCheck>,
    fetches: FetchController,
    items: ListResolver,
    ui: Mutex<UiState>,
}

impl AdminConsole {
    pub fn new(
        gate: Arc<SessionGate>,
        credentials: Arc<dyn CredentialCheck>,
        api: Arc<dyn ConsoleApi>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            fetches: FetchController::new(Arc::clone(&gate), Arc::clone(&api), retry.clone()),
            items: ListResolver::new(api, retry),
            gate,
            credentials,
            ui: Mutex::new(UiState::default()),
        }
    }

    /// Build a console talking HTTP to the configured backend.
    ///
    /// An unreadable persisted session is logged and treated as locked.
    pub fn from_config(config: &ConsoleConfig) -> Result<Self, ConsoleError> {
        let api = HttpConsoleApi::new(config)?;
        let store = config.session_store();
        let gate = SessionGate::restore(Arc::clone(&store)).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Could not restore session, starting locked");
            SessionGate::locked(store)
        });

        Ok(Self::new(
            Arc::new(gate),
            Arc::new(config.credentials.clone()),
            Arc::new(api),
            config.retry.clone(),
        ))
    }

    /// Run the startup fetch if the session was restored unlocked.
    ///
    /// Only fires while the dashboard cell is still `Idle`, so repeated calls
    /// (or a call after `login`) do not refetch within one unlock.
    pub async fn start(&self) {
        if !self.gate.is_unlocked() {
            return;
        }
        if self.fetches.dashboard_status() != FetchStatus::Idle {
            tracing::debug!("Startup fetch already ran for this unlock");
            return;
        }
        tracing::info!("Session restored unlocked");
        self.fetches.fetch_dashboard().await;
    }

    // ---- session ----

    pub fn is_unlocked(&self) -> bool {
        self.gate.is_unlocked()
    }

    /// Check credentials and unlock.
    ///
    /// On a locked -> unlocked transition the dashboard stats are fetched
    /// before this returns. Logging in while already unlocked triggers no
    /// fetch. A dashboard failure does not fail the login; it shows up in
    /// [`AdminConsole::dashboard_view`].
    pub async fn login(&self, id: &str, secret: &str) -> Result<(), ConsoleError> {
        if !self.credentials.check(id, secret) {
            tracing::warn!(id, "Credential check failed");
            return Err(ConsoleError::AuthRejected(AUTH_REJECTED_MESSAGE.to_string()));
        }

        if self.gate.unlock()? {
            tracing::info!(id, "Console unlocked");
            self.fetches.fetch_dashboard().await;
        }
        Ok(())
    }

    /// Lock the gate and drop every cached query result.
    pub fn logout(&self) -> Result<(), ConsoleError> {
        self.fetches.clear();
        {
            let mut ui = self.ui();
            ui.view.select(ConsoleTab::Dashboard);
            ui.filter = RatingFilter::All;
        }
        if self.gate.lock()? {
            tracing::info!("Console locked");
        }
        Ok(())
    }

    // ---- tabs ----

    pub fn current_tab(&self) -> ConsoleTab {
        self.ui().view.current()
    }

    /// Switch tabs. Selecting the feedback tab loads the bundle if it has
    /// not been loaded in this session.
    pub async fn select_tab(&self, tab: ConsoleTab) {
        if self.ui().view.select(tab) {
            tracing::debug!(tab = tab.as_str(), "Tab selected");
        }
        if tab == ConsoleTab::Feedback {
            self.fetches.fetch_feedback().await;
        }
    }

    // ---- dashboard ----

    pub fn dashboard_state(&self) -> FetchState<DashboardStats> {
        self.fetches.dashboard()
    }

    /// Render the dashboard from the current stats snapshot.
    pub fn dashboard_view<R>(&self, render: impl FnOnce(DashboardView<'_>) -> R) -> R {
        let state = self.fetches.dashboard();
        render(DashboardView::derive(self.gate.is_unlocked(), &state))
    }

    // ---- feedback ----

    pub fn feedback_state(&self) -> FetchState<FeedbackBundle> {
        self.fetches.feedback()
    }

    /// Render the feedback tab from the current bundle snapshot.
    pub fn feedback_view<R>(&self, render: impl FnOnce(FeedbackView<'_>) -> R) -> R {
        let state = self.fetches.feedback();
        render(FeedbackView::derive(&state))
    }

    /// Render the filtered feedback list with a stable key per row.
    pub fn feedback_rows<R>(&self, render: impl FnOnce(&[FeedbackRow<'_>]) -> R) -> R {
        let filter = self.rating_filter();
        let state = self.fetches.feedback();
        let rows = state
            .data()
            .map(|bundle| feedback_rows(bundle, filter))
            .unwrap_or_default();
        render(&rows)
    }

    pub fn rating_filter(&self) -> RatingFilter {
        self.ui().filter
    }

    /// Set the rating filter from the UI index (`0` = all, `1..=5`).
    pub fn set_rating_filter(&self, index: u8) -> Result<(), ConsoleError> {
        let filter = RatingFilter::from_index(index)?;
        self.ui().filter = filter;
        Ok(())
    }

    /// Records matching the current filter, in fetched order. Empty until
    /// the bundle has loaded.
    pub fn visible_feedback(&self) -> Vec<FeedbackRecord> {
        let filter = self.rating_filter();
        self.fetches
            .feedback()
            .data()
            .map(|bundle| filter_feedback(bundle, filter).into_iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Bars for the loaded bundle's rating distribution.
    pub fn distribution(&self) -> Option<[DistributionBar; 5]> {
        self.fetches
            .feedback()
            .data()
            .map(|bundle| distribution_bars(&bundle.summary))
    }

    // ---- owned items ----

    /// Switch the caller identity, re-resolving the list when it changed.
    pub async fn set_identity(&self, identity: CallerIdentity) -> Vec<OwnedItem> {
        if self.items.active_identity() == identity {
            return self.items.items();
        }
        self.items.resolve(identity).await
    }

    /// Re-resolve the list for the active identity.
    pub async fn refresh_items(&self) -> Vec<OwnedItem> {
        self.items.refresh().await
    }

    pub fn items(&self) -> &ListResolver {
        &self.items
    }

    // ---- private helpers ----

    fn ui(&self) -> MutexGuard<'_, UiState> {
        self.ui.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
