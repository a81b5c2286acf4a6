//! Aggregate platform metrics shown on the console's dashboard tab.
//!
//! Stats are immutable once fetched and replaced wholesale on refetch. The
//! [`DashboardView`] derivation encodes the blocking-error policy: a failed
//! stats query replaces the whole dashboard with an error, never a partial
//! render.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::fetch_state::{FetchState, FetchStatus};

/// A single named metric as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Number(f64),
    Text(String),
}

impl std::fmt::Display for MetricValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Flat mapping of metric name to value.
pub type MetricGroup = BTreeMap<String, MetricValue>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    #[serde(default)]
    pub data_volume: MetricGroup,
    #[serde(default)]
    pub video_types: MetricGroup,
    #[serde(default)]
    pub user_scale: MetricGroup,
}

/// What the dashboard tab should show.
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardView<'a> {
    /// Gate is locked; the credential form is shown instead.
    Locked,
    Loading,
    /// Blocking error; nothing else of the dashboard renders.
    Failed(&'a str),
    Ready(&'a DashboardStats),
}

impl<'a> DashboardView<'a> {
    pub fn derive(unlocked: bool, state: &'a FetchState<DashboardStats>) -> Self {
        if !unlocked {
            return Self::Locked;
        }
        match state.status() {
            // Unlocked but not yet started counts as loading: the fetch is
            // issued on the unlock transition.
            FetchStatus::Idle | FetchStatus::Loading => Self::Loading,
            FetchStatus::Error => Self::Failed(state.error().unwrap_or("Failed to load data")),
            FetchStatus::Success => match state.data() {
                Some(stats) => Self::Ready(stats),
                None => Self::Loading,
            },
        }
    }
}
