use thiserror::Error;

/// Failure categories for tool calls. Retry eligibility is decided on the
/// kind, not by matching message text at the call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolErrorKind {
    /// Requested entity does not exist (missing city, article, repository).
    NotFound,
    /// Upstream service asked us to slow down.
    RateLimited,
    /// Connection, timeout, or server-side trouble likely to clear on retry.
    Network,
    /// Caller passed parameters the tool cannot use.
    Invalid,
    Other,
}

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ToolError {
    pub kind: ToolErrorKind,
    pub message: String,
}

/// Error-text fragments treated as transient. Upstream services report
/// failures as free text, so this set is the compatibility fallback when the
/// kind alone is not conclusive.
const TRANSIENT_KEYWORDS: &[&str] = &[
    "timeout",
    "rate limit",
    "429",
    "503",
    "502",
    "connection",
    "network",
];

impl ToolError {
    pub fn new(kind: ToolErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::NotFound, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::RateLimited, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Network, message)
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Invalid, message)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Other, message)
    }

    /// Derive a kind from an arbitrary error message. Substring matching on
    /// error text is brittle, so it lives only here.
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();

        let kind = if lower.contains("rate limit") || lower.contains("429") {
            ToolErrorKind::RateLimited
        } else if TRANSIENT_KEYWORDS.iter().any(|k| lower.contains(k)) {
            ToolErrorKind::Network
        } else if lower.contains("not found") || lower.contains("404") {
            ToolErrorKind::NotFound
        } else {
            ToolErrorKind::Other
        };

        Self { kind, message }
    }

    /// Whether a retry with backoff is worth attempting.
    pub fn is_transient(&self) -> bool {
        match self.kind {
            ToolErrorKind::RateLimited | ToolErrorKind::Network => true,
            ToolErrorKind::NotFound | ToolErrorKind::Invalid => false,
            ToolErrorKind::Other => {
                let lower = self.message.to_lowercase();
                TRANSIENT_KEYWORDS.iter().any(|k| lower.contains(k))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_rate_limit() {
        let err = ToolError::classify("HTTP 429: rate limit exceeded");
        assert_eq!(err.kind, ToolErrorKind::RateLimited);
        assert!(err.is_transient());
    }

    #[test]
    fn classify_connection() {
        let err = ToolError::classify("connection timeout while reading response");
        assert_eq!(err.kind, ToolErrorKind::Network);
        assert!(err.is_transient());
    }

    #[test]
    fn classify_not_found() {
        let err = ToolError::classify("article 'Foo' not found");
        assert_eq!(err.kind, ToolErrorKind::NotFound);
        assert!(!err.is_transient());
    }

    #[test]
    fn other_with_transient_text_is_retried() {
        // Kind is Other but the message matches the keyword set, so the
        // compatibility fallback applies.
        let err = ToolError::other("upstream returned 503 service unavailable");
        assert!(err.is_transient());
    }

    #[test]
    fn invalid_is_never_transient() {
        let err = ToolError::invalid("weather step requires 'city' or 'cities'");
        assert!(!err.is_transient());
    }
}
