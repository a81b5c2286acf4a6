//! Caller identity resolution.
//!
//! The console knows who is looking at it through an optional user id and an
//! optional email. [`CallerIdentity::resolve`] collapses that fallback chain
//! into a single value once, at the boundary, so downstream components never
//! re-derive it.

use serde::{Deserialize, Serialize};

/// Who the owned-item list is resolved for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum CallerIdentity {
    UserId(String),
    Email(String),
    /// Not logged in. Resolves to an empty collection without a query.
    Absent,
}

impl CallerIdentity {
    /// Pick the user id when present, then the email, else [`Self::Absent`].
    ///
    /// Blank strings count as missing.
    pub fn resolve(user_id: Option<&str>, email: Option<&str>) -> Self {
        let non_blank = |v: Option<&str>| {
            v.map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        if let Some(id) = non_blank(user_id) {
            Self::UserId(id)
        } else if let Some(email) = non_blank(email) {
            Self::Email(email)
        } else {
            Self::Absent
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// The raw identifier, or `None` for [`Self::Absent`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::UserId(id) => Some(id),
            Self::Email(email) => Some(email),
            Self::Absent => None,
        }
    }
}

impl std::fmt::Display for CallerIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UserId(id) => write!(f, "user:{id}"),
            Self::Email(email) => write!(f, "email:{email}"),
            Self::Absent => f.write_str("absent"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_wins_over_email() {
        let identity = CallerIdentity::resolve(Some("u-42"), Some("a@b.c"));
        assert_eq!(identity, CallerIdentity::UserId("u-42".into()));
    }

    #[test]
    fn falls_back_to_email() {
        let identity = CallerIdentity::resolve(None, Some("a@b.c"));
        assert_eq!(identity, CallerIdentity::Email("a@b.c".into()));
    }

    #[test]
    fn blank_values_are_absent() {
        assert!(CallerIdentity::resolve(Some("  "), Some("")).is_absent());
        assert!(CallerIdentity::resolve(None, None).is_absent());
    }

    #[test]
    fn blank_id_falls_through_to_email() {
        let identity = CallerIdentity::resolve(Some(""), Some("ops@x121.io"));
        assert_eq!(identity.as_str(), Some("ops@x121.io"));
    }

    #[test]
    fn display_tags_variant() {
        assert_eq!(CallerIdentity::UserId("7".into()).to_string(), "user:7");
        assert_eq!(CallerIdentity::Absent.to_string(), "absent");
    }
}
