//! Tab selection for the console.
//!
//! Transitions happen only through explicit user selection; nothing here is
//! driven by time or by fetch results.

use serde::{Deserialize, Serialize};

use crate::error::ConsoleError;

pub const TAB_DASHBOARD: &str = "dashboard";
pub const TAB_FEEDBACK: &str = "feedback";

/// All valid tab names.
pub const VALID_TABS: &[&str] = &[TAB_DASHBOARD, TAB_FEEDBACK];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsoleTab {
    #[default]
    Dashboard,
    Feedback,
}

impl ConsoleTab {
    pub const ALL: [ConsoleTab; 2] = [ConsoleTab::Dashboard, ConsoleTab::Feedback];

    pub fn from_str_value(s: &str) -> Result<Self, ConsoleError> {
        match s {
            TAB_DASHBOARD => Ok(Self::Dashboard),
            TAB_FEEDBACK => Ok(Self::Feedback),
            _ => Err(ConsoleError::Validation(format!(
                "Invalid tab '{s}'. Must be one of: {}",
                VALID_TABS.join(", ")
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dashboard => TAB_DASHBOARD,
            Self::Feedback => TAB_FEEDBACK,
        }
    }
}

/// Which tab is currently visible.
#[derive(Debug, Clone, Default)]
pub struct ViewSelector {
    current: ConsoleTab,
}

impl ViewSelector {
    pub fn new(initial: ConsoleTab) -> Self {
        Self { current: initial }
    }

    pub fn current(&self) -> ConsoleTab {
        self.current
    }

    /// Switch tabs. Returns `true` if the visible tab changed.
    pub fn select(&mut self, tab: ConsoleTab) -> bool {
        let changed = self.current != tab;
        self.current = tab;
        changed
    }
}
