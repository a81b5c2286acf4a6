//! Fetch lifecycle state machine and request-generation tracking.
//!
//! [`FetchState`] is the read-only snapshot renderers consume. It can only be
//! built through its constructors, which keeps `data` and `error` consistent
//! with `status`. [`RequestTracker`] issues monotonically increasing
//! generations; a completion is authoritative only if its generation is still
//! the latest one issued.

use serde::Serialize;

use crate::types::Generation;

// ---------------------------------------------------------------------------
// FetchStatus / FetchState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStatus {
    Idle,
    Loading,
    Success,
    Error,
}

impl FetchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

/// Snapshot of one logical query.
///
/// `data` is set only for [`FetchStatus::Success`], `error` only for
/// [`FetchStatus::Error`].
#[derive(Debug, Clone, PartialEq)]
pub struct FetchState<T> {
    status: FetchStatus,
    data: Option<T>,
    error: Option<String>,
}

impl<T> FetchState<T> {
    pub fn idle() -> Self {
        Self {
            status: FetchStatus::Idle,
            data: None,
            error: None,
        }
    }

    pub fn loading() -> Self {
        Self {
            status: FetchStatus::Loading,
            data: None,
            error: None,
        }
    }

    pub fn success(data: T) -> Self {
        Self {
            status: FetchStatus::Success,
            data: Some(data),
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: FetchStatus::Error,
            data: None,
            error: Some(message.into()),
        }
    }

    /// Build the terminal state for a finished operation.
    pub fn from_result<E: std::fmt::Display>(result: Result<T, E>) -> Self {
        match result {
            Ok(data) => Self::success(data),
            Err(e) => Self::failed(e.to_string()),
        }
    }

    pub fn status(&self) -> FetchStatus {
        self.status
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_idle(&self) -> bool {
        self.status == FetchStatus::Idle
    }

    pub fn is_loading(&self) -> bool {
        self.status == FetchStatus::Loading
    }

    pub fn is_success(&self) -> bool {
        self.status == FetchStatus::Success
    }

    pub fn is_error(&self) -> bool {
        self.status == FetchStatus::Error
    }
}

impl<T> Default for FetchState<T> {
    fn default() -> Self {
        Self::idle()
    }
}

// ---------------------------------------------------------------------------
// RequestTracker
// ---------------------------------------------------------------------------

/// Per-key request generation counter.
///
/// Generation `0` is never issued, so a fresh tracker treats every
/// completion as stale until [`RequestTracker::issue`] is called.
#[derive(Debug, Clone, Default)]
pub struct RequestTracker {
    latest: Generation,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a new generation, superseding every earlier one.
    pub fn issue(&mut self) -> Generation {
        self.latest = self.latest.wrapping_add(1).max(1);
        self.latest
    }

    /// Supersede all outstanding generations without issuing a usable one.
    pub fn invalidate(&mut self) {
        self.issue();
    }

    pub fn is_current(&self, generation: Generation) -> bool {
        generation != 0 && generation == self.latest
    }

    pub fn latest(&self) -> Generation {
        self.latest
    }
}
