//! Credential check for unlocking the console.
//!
//! The only implementation is a shared-secret comparison against a fixed
//! identifier pair. It provides no real authentication: there is no hashing,
//! no rate limiting and no lockout after repeated failures. Real secret
//! management belongs to an external identity provider plugged in behind
//! [`CredentialCheck`].

/// Header carrying the shared secret on gated admin queries.
pub const ADMIN_KEY_HEADER: &str = "x-admin-key";

/// Decides whether an `(id, secret)` pair may unlock the console.
pub trait CredentialCheck: Send + Sync {
    /// Never errors; a mismatch is just `false`.
    fn check(&self, id: &str, secret: &str) -> bool;
}

/// Fixed identifier pair, compared verbatim.
#[derive(Clone)]
pub struct StaticCredentials {
    id: String,
    secret: String,
}

impl StaticCredentials {
    pub fn new(id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            secret: secret.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Value for [`ADMIN_KEY_HEADER`], derived from the identifier pair.
    pub fn header_value(&self) -> String {
        format!("{}:{}", self.id, self.secret)
    }
}

impl CredentialCheck for StaticCredentials {
    fn check(&self, id: &str, secret: &str) -> bool {
        id == self.id && secret == self.secret
    }
}

impl std::fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("id", &self.id)
            .field("secret", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_pair_passes() {
        let creds = StaticCredentials::new("admin", "s3cret");
        assert!(creds.check("admin", "s3cret"));
    }

    #[test]
    fn wrong_secret_or_id_fails() {
        let creds = StaticCredentials::new("admin", "s3cret");
        assert!(!creds.check("admin", "nope"));
        assert!(!creds.check("root", "s3cret"));
        assert!(!creds.check("", ""));
    }

    #[test]
    fn header_value_joins_pair() {
        let creds = StaticCredentials::new("admin", "s3cret");
        assert_eq!(creds.header_value(), "admin:s3cret");
    }

    #[test]
    fn debug_redacts_secret() {
        let creds = StaticCredentials::new("admin", "s3cret");
        let dbg = format!("{creds:?}");
        assert!(dbg.contains("admin"));
        assert!(!dbg.contains("s3cret"));
    }
}
