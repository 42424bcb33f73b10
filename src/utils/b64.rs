//! Base64 helpers tolerant of what image APIs actually send back.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Encode bytes as a `data:` URI.
pub fn encode_data_uri(mime: &str, data: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(data))
}

/// Decode a base64 image string.
///
/// Accepts an optional `data:<mime>;base64,` prefix, surrounding whitespace
/// and missing `=` padding.
pub fn decode_lenient(input: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let mut payload = input.trim();
    if payload.starts_with("data:") {
        if let Some(comma) = payload.find(',') {
            payload = &payload[comma + 1..];
        }
    }
    let payload: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    let missing = (4 - payload.len() % 4) % 4;
    let mut padded = payload;
    padded.extend(std::iter::repeat('=').take(missing));
    STANDARD.decode(padded)
}

/// Heuristic used for log redaction: long strings made only of base64 characters.
pub fn looks_like_base64(s: &str) -> bool {
    s.bytes()
        .take(100)
        .all(|b| b.is_ascii_alphanumeric() || b == b'+' || b == b'/' || b == b'=')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_strips_data_uri_and_repairs_padding() {
        // "hi!!" -> "aGkhIQ=="
        assert_eq!(decode_lenient("aGkhIQ==").unwrap(), b"hi!!");
        assert_eq!(decode_lenient("aGkhIQ").unwrap(), b"hi!!");
        assert_eq!(decode_lenient("data:image/png;base64,aGkhIQ").unwrap(), b"hi!!");
        assert_eq!(decode_lenient("  aGkh\nIQ==  ").unwrap(), b"hi!!");
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_lenient("not base64 at all!").is_err());
    }

    #[test]
    fn test_encode_data_uri() {
        assert_eq!(encode_data_uri("image/png", b"hi!!"), "data:image/png;base64,aGkhIQ==");
    }
}
