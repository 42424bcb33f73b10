//! Classification of non-success HTTP responses.

use super::failure::GenerationFailure;
use crate::error_code::FailureKind;
use crate::i18n::Locale;
use std::time::Duration;

/// Markers the upstream puts in the body when no channel serves the model.
const MODEL_UNAVAILABLE_MARKERS: &[&str] = &["model_not_found", "无可用渠道"];

/// Gateways (Cloudflare and friends) answer with HTML pages.
pub fn is_html(body: &str) -> bool {
    let head: String = body.trim_start().chars().take(16).collect();
    let head = head.to_ascii_lowercase();
    head.starts_with("<!doctype") || head.starts_with("<html")
}

fn truncate(body: &str, max_chars: usize) -> String {
    body.trim().chars().take(max_chars).collect()
}

/// Turn a non-2xx response into a [`GenerationFailure`].
///
/// Known gateway statuses get a specific headline and at most 100 characters
/// of the body; anything else keeps up to 200 characters. HTML bodies are
/// never echoed.
pub fn classify_status(
    status: u16,
    body: &str,
    retry_after: Option<Duration>,
    locale: Locale,
) -> GenerationFailure {
    let html = is_html(body);
    let kind = if MODEL_UNAVAILABLE_MARKERS.iter().any(|m| body.contains(m)) {
        FailureKind::ModelUnavailable
    } else {
        FailureKind::from_http_status(status)
    };

    let described = match kind {
        FailureKind::ServerOverload => locale.status_description(status),
        _ => None,
    };
    let (message, detail_limit) = match described {
        Some(text) => (text.to_string(), 100),
        None => (locale.failure_message(kind).to_string(), 200),
    };

    let mut failure = GenerationFailure::new(kind, message)
        .with_status(status)
        .with_retry_after(retry_after);
    if !html {
        failure = failure.with_detail(truncate(body, detail_limit));
    }
    failure
}

/// Parse a `Retry-After` header value given in seconds.
pub fn parse_retry_after(value: Option<&str>) -> Option<Duration> {
    value
        .map(str::trim)
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
}
