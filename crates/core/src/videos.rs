//! Videos owned by a caller, as listed in the console sidebar.

use serde::{Deserialize, Serialize};

/// A video owned by the caller. The collection is always replaced as a whole
/// on re-resolution, never patched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnedItem {
    pub id: String,
    #[serde(default)]
    pub original_filename: Option<String>,
}

impl OwnedItem {
    /// Label for list display, falling back to the id.
    pub fn display_name(&self) -> &str {
        self.original_filename
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.id)
    }
}
