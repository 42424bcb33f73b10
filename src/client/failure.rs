use crate::error_code::FailureKind;
use crate::i18n::Locale;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Terminal, classified failure of one job.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct GenerationFailure {
    pub kind: FailureKind,
    /// Originating HTTP status, when the upstream answered.
    pub status: Option<u16>,
    /// Localized, user-facing headline.
    pub message: String,
    /// Truncated upstream body or transport error text. Never HTML.
    pub detail: Option<String>,
    /// `Retry-After` sent with the response, if any.
    pub retry_after: Option<Duration>,
    /// HTTP attempts spent on this job (0 when nothing was sent).
    pub attempts: u32,
}

impl GenerationFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            message: message.into(),
            detail: None,
            retry_after: None,
            attempts: 0,
        }
    }

    /// Failure carrying the locale's default headline for `kind`.
    pub fn localized(kind: FailureKind, locale: Locale) -> Self {
        Self::new(kind, locale.failure_message(kind))
    }

    pub fn missing_credential(locale: Locale) -> Self {
        Self::localized(FailureKind::MissingCredential, locale)
    }

    pub fn cancelled(locale: Locale) -> Self {
        Self::localized(FailureKind::Cancelled, locale)
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        self.detail = (!detail.trim().is_empty()).then_some(detail);
        self
    }

    pub fn with_retry_after(mut self, retry_after: Option<Duration>) -> Self {
        self.retry_after = retry_after;
        self
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    /// Multi-line text for the person running the workflow.
    pub fn user_message(&self, locale: Locale) -> String {
        let mut out = self.message.clone();
        if let Some(status) = self.status {
            out.push_str(&format!(" ({}: {})", locale.status_label(), status));
        }
        if let Some(detail) = &self.detail {
            out.push_str(&format!("\n  {}: {}", locale.detail_label(), detail));
        }
        out
    }
}

impl fmt::Display for GenerationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} [{}, HTTP {}]", self.message, self.kind, status),
            None => write!(f, "{} [{}]", self.message, self.kind),
        }
    }
}
