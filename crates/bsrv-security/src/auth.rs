//! C5 — constant-time credential comparison.

use subtle::ConstantTimeEq;

#[derive(Clone)]
pub struct Authenticator {
    enabled: bool,
    api_key: String,
}

impl Authenticator {
    pub fn new(enabled: bool, api_key: impl Into<String>) -> Self {
        Self { enabled, api_key: api_key.into() }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Constant-time comparison against the configured secret. Length
    /// differences are not hidden (comparing unequal-length byte slices
    /// is intentionally not constant-time itself — only the per-byte
    /// comparison of equal-length candidates is).
    pub fn authenticate(&self, provided: &str) -> bool {
        if !self.enabled {
            return true;
        }
        let expected = self.api_key.as_bytes();
        let provided = provided.as_bytes();
        if expected.len() != provided.len() {
            return false;
        }
        expected.ct_eq(provided).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_auth_always_succeeds() {
        let auth = Authenticator::new(false, "secret");
        assert!(auth.authenticate(""));
        assert!(auth.authenticate("wrong"));
    }

    #[test]
    fn matching_key_succeeds() {
        let auth = Authenticator::new(true, "correct-horse-battery");
        assert!(auth.authenticate("correct-horse-battery"));
    }

    #[test]
    fn mismatched_key_fails() {
        let auth = Authenticator::new(true, "correct-horse-battery");
        assert!(!auth.authenticate("incorrect"));
    }

    #[test]
    fn differing_length_fails() {
        let auth = Authenticator::new(true, "longer-secret-value");
        assert!(!auth.authenticate("short"));
    }
}
