//! Extraction of the generated image from a successful response body.
//!
//! Two shapes are accepted:
//!
//! - OpenAI style: `{"data": [{"b64_json": "..."} | {"url": "..."}]}`
//! - Gemini style: `{"candidates": [{"content": {"parts": [...]}, "finishReason": "STOP"}]}`
//!   where a part carries `inline_data` / `inlineData` (object or bare string)
//!   or text containing an image link.

use super::failure::GenerationFailure;
use super::GeneratedImage;
use crate::error_code::FailureKind;
use crate::i18n::Locale;
use crate::job::ImageMime;
use crate::utils::b64::decode_lenient;
use bytes::Bytes;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static MARKDOWN_IMAGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"!\[.*?\]\((https?://[^\)]+)\)").expect("markdown image pattern")
});

static BARE_IMAGE_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(https?://[^\s\)]+\.(?:png|jpg|jpeg|webp|gif))")
        .expect("bare image url pattern")
});

const ACCEPTED_FINISH_REASONS: &[&str] = &["STOP", "MAX_TOKENS"];

fn unusable(locale: Locale, detail: impl Into<String>) -> GenerationFailure {
    GenerationFailure::localized(FailureKind::Validation, locale).with_detail(detail)
}

fn inline_image(encoded: &str, declared: Option<&str>, locale: Locale) -> Result<GeneratedImage, GenerationFailure> {
    let data = decode_lenient(encoded)
        .map_err(|e| unusable(locale, format!("invalid base64 image data: {e}")))?;
    if data.is_empty() {
        return Err(unusable(locale, "empty image data"));
    }
    let mime = ImageMime::sniff(&data).or_else(|| match declared {
        Some("image/png") => Some(ImageMime::Png),
        Some("image/jpeg") | Some("image/jpg") => Some(ImageMime::Jpeg),
        Some("image/webp") => Some(ImageMime::Webp),
        _ => None,
    });
    Ok(GeneratedImage::Inline {
        data: Bytes::from(data),
        mime,
    })
}

fn from_openai(items: &[Value], locale: Locale) -> Result<GeneratedImage, GenerationFailure> {
    let first = items
        .first()
        .ok_or_else(|| unusable(locale, "response contained an empty data array"))?;
    if let Some(encoded) = first.get("b64_json").and_then(Value::as_str) {
        return inline_image(encoded, None, locale);
    }
    if let Some(url) = first.get("url").and_then(Value::as_str) {
        if !url.trim().is_empty() {
            return Ok(GeneratedImage::Url(url.trim().to_string()));
        }
    }
    Err(unusable(locale, "data[0] has neither b64_json nor url"))
}

fn image_link(text: &str) -> Option<String> {
    MARKDOWN_IMAGE
        .captures(text)
        .or_else(|| BARE_IMAGE_URL.captures(text))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

fn from_gemini(candidates: &[Value], locale: Locale) -> Result<GeneratedImage, GenerationFailure> {
    let candidate = candidates
        .first()
        .ok_or_else(|| unusable(locale, "response contained no candidates"))?;

    let reason = candidate
        .get("finishReason")
        .or_else(|| candidate.get("finish_reason"))
        .and_then(Value::as_str);
    if let Some(reason) = reason {
        if !ACCEPTED_FINISH_REASONS.contains(&reason) {
            return Err(
                GenerationFailure::new(FailureKind::Validation, locale.finish_reason_message(reason))
                    .with_detail(format!("finishReason={reason}")),
            );
        }
    }

    let parts = candidate
        .pointer("/content/parts")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let mut texts = Vec::new();
    for part in parts {
        let inline = part.get("inline_data").or_else(|| part.get("inlineData"));
        match inline {
            Some(Value::String(encoded)) => return inline_image(encoded, None, locale),
            Some(obj @ Value::Object(_)) => {
                if let Some(encoded) = obj.get("data").and_then(Value::as_str) {
                    let declared = obj
                        .get("mime_type")
                        .or_else(|| obj.get("mimeType"))
                        .and_then(Value::as_str);
                    return inline_image(encoded, declared, locale);
                }
            }
            _ => {}
        }
        if let Some(text) = part.get("text").and_then(Value::as_str) {
            if let Some(url) = image_link(text) {
                return Ok(GeneratedImage::Url(url));
            }
            texts.push(text);
        }
    }

    let detail = if texts.is_empty() {
        "candidate contained no image".to_string()
    } else {
        texts.join(" ").chars().take(200).collect()
    };
    Err(unusable(locale, detail))
}

/// Pull the image out of a 2xx JSON body.
pub fn parse_generation_response(body: &Value, locale: Locale) -> Result<GeneratedImage, GenerationFailure> {
    if let Some(items) = body.get("data").and_then(Value::as_array) {
        return from_openai(items, locale);
    }
    if let Some(candidates) = body.get("candidates").and_then(Value::as_array) {
        return from_gemini(candidates, locale);
    }
    if let Some(error) = body.get("error") {
        let detail = error
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return Err(GenerationFailure::localized(FailureKind::Rejected, locale)
            .with_detail(detail.chars().take(200).collect::<String>()));
    }
    Err(unusable(locale, "unrecognized response shape"))
}
