//! Origin allow-list policy.
//!
//! Browsers attach an `Origin` header to cross-origin requests; the policy
//! decides whether such a request may reach the service at all. Matching is
//! exact (scheme, host and port), with no wildcard support.

use std::collections::HashSet;

/// Outcome of evaluating a request's `Origin` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginDecision {
    /// The origin is on the allow-list.
    Allowed,
    /// No `Origin` header was sent and such requests are trusted.
    NoOrigin,
    /// The request must be rejected.
    Denied,
}

impl OriginDecision {
    pub fn is_permitted(&self) -> bool {
        !matches!(self, OriginDecision::Denied)
    }
}

/// Binary allow/deny policy over request origins.
#[derive(Debug, Clone)]
pub struct OriginPolicy {
    allowed: HashSet<String>,
    allow_missing: bool,
}

impl OriginPolicy {
    pub fn new<I, S>(allowed: I, allow_missing: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: allowed.into_iter().map(Into::into).collect(),
            allow_missing,
        }
    }

    /// Evaluate the raw `Origin` header value, if any.
    pub fn evaluate(&self, origin: Option<&str>) -> OriginDecision {
        match origin {
            None if self.allow_missing => OriginDecision::NoOrigin,
            None => {
                tracing::debug!(target: "blogsmith-authz", "request without origin rejected");
                OriginDecision::Denied
            }
            Some(origin) if self.allowed.contains(origin) => OriginDecision::Allowed,
            Some(origin) => {
                tracing::warn!(target: "blogsmith-authz", %origin, "origin not on allow-list");
                OriginDecision::Denied
            }
        }
    }

    /// Allowed origins, in no particular order.
    pub fn origins(&self) -> impl Iterator<Item = &str> {
        self.allowed.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(allow_missing: bool) -> OriginPolicy {
        OriginPolicy::new(
            ["http://localhost:3000", "https://app.example.com"],
            allow_missing,
        )
    }

    #[test]
    fn listed_origin_is_allowed() {
        assert_eq!(
            policy(true).evaluate(Some("http://localhost:3000")),
            OriginDecision::Allowed
        );
    }

    #[test]
    fn unlisted_origin_is_denied() {
        let decision = policy(true).evaluate(Some("https://evil.example.org"));
        assert_eq!(decision, OriginDecision::Denied);
        assert!(!decision.is_permitted());
    }

    #[test]
    fn matching_is_exact() {
        let policy = policy(true);
        assert!(!policy.evaluate(Some("http://localhost:3000/")).is_permitted());
        assert!(!policy.evaluate(Some("http://localhost:30001")).is_permitted());
        assert!(!policy.evaluate(Some("HTTP://LOCALHOST:3000")).is_permitted());
    }

    #[test]
    fn missing_origin_follows_configuration() {
        assert_eq!(policy(true).evaluate(None), OriginDecision::NoOrigin);
        assert_eq!(policy(false).evaluate(None), OriginDecision::Denied);
    }
}
