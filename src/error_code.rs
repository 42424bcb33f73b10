//! Failure taxonomy for a single generation job.
//!
//! Every terminal outcome of a job that did not produce an image is classified
//! into one [`FailureKind`]. The kind drives two independent decisions:
//!
//! | Decision | Owner | Method |
//! |----------|-------|--------|
//! | Retry the same request transparently | HTTP collaborator | [`FailureKind::retryable`] |
//! | Slow down future dispatches | batch manager | [`FailureKind::counts_toward_streak`], [`FailureKind::is_rate_limit`] |
//!
//! ## Example
//!
//! ```rust
//! use nano_banana_nodes::error_code::FailureKind;
//!
//! let kind = FailureKind::from_http_status(503);
//! assert_eq!(kind.code(), "E3002");
//! assert!(kind.retryable());
//! assert_eq!(kind.category(), "server");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// E1000: No API key configured; nothing was sent
    MissingCredential,
    /// E1001: Job parameters rejected locally (e.g. 4K on a non-Pro model)
    InvalidJob,
    /// E1002: Invalid or expired API key (401/403)
    Authentication,
    /// E1004: Upstream has no channel serving the requested model
    ModelUnavailable,
    /// E1009: Any other 4xx response
    Rejected,
    /// E2001: Request rate limit exceeded (429)
    RateLimited,
    /// E3002: Server or gateway overloaded (5xx, Cloudflare 520-524)
    ServerOverload,
    /// E3003: Connection failure or attempt timeout
    Network,
    /// E3004: Success status but the body is not a usable image response
    Validation,
    /// E4002: Job skipped because the run was stopped
    Cancelled,
}

impl FailureKind {
    /// Returns the canonical code string (e.g., `"E2001"`).
    #[inline]
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingCredential => "E1000",
            Self::InvalidJob => "E1001",
            Self::Authentication => "E1002",
            Self::ModelUnavailable => "E1004",
            Self::Rejected => "E1009",
            Self::RateLimited => "E2001",
            Self::ServerOverload => "E3002",
            Self::Network => "E3003",
            Self::Validation => "E3004",
            Self::Cancelled => "E4002",
        }
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            Self::MissingCredential => "missing_credential",
            Self::InvalidJob => "invalid_job",
            Self::Authentication => "authentication",
            Self::ModelUnavailable => "model_unavailable",
            Self::Rejected => "rejected",
            Self::RateLimited => "rate_limited",
            Self::ServerOverload => "server_overload",
            Self::Network => "network",
            Self::Validation => "validation",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether the HTTP collaborator retries this failure with backoff.
    ///
    /// 429 is deliberately absent: the manager reacts to it by widening the
    /// interval for the jobs that follow.
    #[inline]
    pub fn retryable(&self) -> bool {
        matches!(self, Self::ServerOverload | Self::Network)
    }

    /// Whether the failure reached (or tried to reach) the upstream and so
    /// belongs to the consecutive-failure streak.
    #[inline]
    pub fn counts_toward_streak(&self) -> bool {
        !matches!(
            self,
            Self::MissingCredential | Self::InvalidJob | Self::Cancelled
        )
    }

    #[inline]
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Self::RateLimited)
    }

    /// Returns the category: `"client"`, `"rate"`, `"server"` or `"operational"`.
    #[inline]
    pub fn category(&self) -> &'static str {
        match self {
            Self::MissingCredential
            | Self::InvalidJob
            | Self::Authentication
            | Self::ModelUnavailable
            | Self::Rejected => "client",
            Self::RateLimited => "rate",
            Self::ServerOverload | Self::Network | Self::Validation => "server",
            Self::Cancelled => "operational",
        }
    }

    /// Maps a non-success HTTP status to its failure kind.
    ///
    /// The body-level `model_not_found` check lives in the classifier, since it
    /// needs the response text.
    pub fn from_http_status(status: u16) -> Self {
        match status {
            401 | 403 => Self::Authentication,
            429 => Self::RateLimited,
            // 500/502/503/504 and Cloudflare 520-524 included
            500..=599 => Self::ServerOverload,
            _ => Self::Rejected,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(FailureKind::from_http_status(401), FailureKind::Authentication);
        assert_eq!(FailureKind::from_http_status(429), FailureKind::RateLimited);
        for status in [500u16, 502, 503, 504, 520, 521, 522, 523, 524] {
            assert_eq!(
                FailureKind::from_http_status(status),
                FailureKind::ServerOverload,
                "status {} should be an overload",
                status
            );
        }
        assert_eq!(FailureKind::from_http_status(400), FailureKind::Rejected);
        assert_eq!(FailureKind::from_http_status(418), FailureKind::Rejected);
        // model availability is decided by the body marker, not the status
        assert_eq!(FailureKind::from_http_status(404), FailureKind::Rejected);
        assert_eq!(FailureKind::from_http_status(408), FailureKind::Rejected);
    }

    #[test]
    fn test_only_transient_kinds_are_retryable() {
        assert!(FailureKind::ServerOverload.retryable());
        assert!(FailureKind::Network.retryable());
        assert!(!FailureKind::RateLimited.retryable());
        assert!(!FailureKind::Authentication.retryable());
        assert!(!FailureKind::Validation.retryable());
    }

    #[test]
    fn test_local_failures_do_not_count_toward_streak() {
        assert!(!FailureKind::MissingCredential.counts_toward_streak());
        assert!(!FailureKind::InvalidJob.counts_toward_streak());
        assert!(!FailureKind::Cancelled.counts_toward_streak());
        assert!(FailureKind::RateLimited.counts_toward_streak());
        assert!(FailureKind::Network.counts_toward_streak());
    }

    #[test]
    fn test_serde_names_match_name() {
        let json = serde_json::to_string(&FailureKind::ServerOverload).unwrap();
        assert_eq!(json, format!("\"{}\"", FailureKind::ServerOverload.name()));
    }
}
