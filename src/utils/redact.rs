//! Log-safe rendering of request and response bodies.

use super::b64::looks_like_base64;
use serde_json::Value;

/// Replace long base64 payloads (raw or `data:` URIs) by a short head and the
/// original length, recursively.
pub fn redact_payload(value: &Value, keep: usize) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), redact_payload(v, keep)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(|v| redact_payload(v, keep)).collect()),
        Value::String(s) if is_payload(s, keep) => {
            let head: String = s.chars().take(keep).collect();
            Value::String(format!("{head}... [truncated, {} chars]", s.len()))
        }
        other => other.clone(),
    }
}

fn is_payload(s: &str, keep: usize) -> bool {
    if s.starts_with("data:") {
        return s.len() > keep;
    }
    s.len() > keep.saturating_mul(10) && looks_like_base64(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_long_base64_is_truncated() {
        let blob = "A".repeat(2_000);
        let body = json!({
            "prompt": "a cat",
            "image": [format!("data:image/png;base64,{blob}")],
            "data": [{"b64_json": blob.clone()}],
        });
        let redacted = redact_payload(&body, 16);
        assert_eq!(redacted["prompt"], "a cat");
        let image = redacted["image"][0].as_str().unwrap();
        assert!(image.starts_with("data:image/png;b"));
        assert!(image.ends_with("[truncated, 2022 chars]"));
        let b64 = redacted["data"][0]["b64_json"].as_str().unwrap();
        assert!(b64.ends_with("[truncated, 2000 chars]"));
    }

    #[test]
    fn test_long_prose_is_kept() {
        let prose = "a very long prompt with spaces ".repeat(20);
        let body = json!({ "prompt": prose.clone() });
        assert_eq!(redact_payload(&body, 16)["prompt"], prose);
    }
}
