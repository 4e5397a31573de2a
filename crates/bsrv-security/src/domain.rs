//! C3 — allow/deny-list check for navigation targets.

#[derive(Debug, Clone, Default)]
pub struct DomainPolicy {
    allowed: Vec<String>,
    blocked: Vec<String>,
}

impl DomainPolicy {
    pub fn new(allowed: Vec<String>, blocked: Vec<String>) -> Self {
        Self { allowed, blocked }
    }

    /// `host` may include a port; it is stripped before matching.
    pub fn is_allowed(&self, host: &str) -> bool {
        let host = host.split(':').next().unwrap_or(host);

        if matches_any(&self.blocked, host) {
            return false;
        }
        if self.allowed.is_empty() {
            return true;
        }
        matches_any(&self.allowed, host)
    }
}

fn matches_any(patterns: &[String], host: &str) -> bool {
    patterns.iter().any(|pattern| matches_one(pattern, host))
}

fn matches_one(pattern: &str, host: &str) -> bool {
    match pattern.strip_prefix("*.") {
        Some(suffix) => host == suffix || host.ends_with(&format!(".{suffix}")),
        None => host == pattern,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_allowlist_permits_anything_not_blocked() {
        let policy = DomainPolicy::new(vec![], vec!["evil.test".into()]);
        assert!(policy.is_allowed("example.test"));
        assert!(!policy.is_allowed("evil.test"));
    }

    #[test]
    fn allowlist_restricts_to_matches() {
        let policy = DomainPolicy::new(vec!["example.test".into()], vec![]);
        assert!(policy.is_allowed("example.test"));
        assert!(!policy.is_allowed("other.test"));
    }

    #[test]
    fn wildcard_matches_subdomains() {
        let policy = DomainPolicy::new(vec!["*.example.test".into()], vec![]);
        assert!(policy.is_allowed("api.example.test"));
        assert!(policy.is_allowed("example.test"));
        assert!(!policy.is_allowed("example.evil.test"));
    }

    #[test]
    fn blocked_takes_priority_over_allowed() {
        let policy = DomainPolicy::new(vec!["*.example.test".into()], vec!["bad.example.test".into()]);
        assert!(!policy.is_allowed("bad.example.test"));
        assert!(policy.is_allowed("good.example.test"));
    }

    #[test]
    fn port_is_stripped_before_matching() {
        let policy = DomainPolicy::new(vec![], vec!["evil.test".into()]);
        assert!(!policy.is_allowed("evil.test:8080"));
    }
}
