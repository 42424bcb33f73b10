//! Generation jobs: one prompt plus its parameters.

use crate::presets::{AspectRatio, ModelId, Resolution, MAX_REFERENCE_IMAGES, MAX_SEED};
use crate::utils::b64::encode_data_uri;
use crate::{Error, ErrorContext, Result};
use bytes::Bytes;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Seed for a generation. The host uses `-1` for "random".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Seed {
    #[default]
    Random,
    Fixed(u32),
}

impl Seed {
    /// Interpret the host's integer seed (`-1` or any negative value means random).
    pub fn from_raw(raw: i64) -> Result<Self> {
        if raw < 0 {
            return Ok(Seed::Random);
        }
        if raw > MAX_SEED as i64 {
            return Err(Error::validation_with_context(
                format!("seed must be at most {MAX_SEED}"),
                ErrorContext::new()
                    .with_field_path("seed")
                    .with_details(raw.to_string())
                    .with_source("job"),
            ));
        }
        Ok(Seed::Fixed(raw as u32))
    }

    /// Value sent upstream; `None` lets the upstream pick.
    pub fn value(&self) -> Option<u32> {
        match self {
            Seed::Random => None,
            Seed::Fixed(v) => Some(*v),
        }
    }

    /// Draw a concrete seed once so that every job of a batch shares it.
    pub fn resolve(self) -> Self {
        match self {
            Seed::Random => Seed::Fixed(rand::thread_rng().gen_range(0..=MAX_SEED)),
            fixed => fixed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageMime {
    #[serde(rename = "image/png")]
    Png,
    #[serde(rename = "image/jpeg")]
    Jpeg,
    #[serde(rename = "image/webp")]
    Webp,
}

impl ImageMime {
    /// Sniff the container format from its magic bytes.
    pub fn sniff(data: &[u8]) -> Option<Self> {
        if data.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
            Some(ImageMime::Png)
        } else if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(ImageMime::Jpeg)
        } else if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            Some(ImageMime::Webp)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ImageMime::Png => "image/png",
            ImageMime::Jpeg => "image/jpeg",
            ImageMime::Webp => "image/webp",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ImageMime::Png => "png",
            ImageMime::Jpeg => "jpg",
            ImageMime::Webp => "webp",
        }
    }
}

/// An already-encoded reference image (the host converts its tensors).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceImage {
    data: Bytes,
    mime: ImageMime,
}

impl ReferenceImage {
    pub fn from_bytes(data: impl Into<Bytes>) -> Result<Self> {
        let data = data.into();
        let mime = ImageMime::sniff(&data).ok_or_else(|| {
            Error::validation_with_context(
                "reference image is not PNG, JPEG or WebP",
                ErrorContext::new()
                    .with_field_path("references")
                    .with_details(format!("{} bytes", data.len()))
                    .with_source("job"),
            )
        })?;
        Ok(Self { data, mime })
    }

    pub fn mime(&self) -> ImageMime {
        self.mime
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn to_data_uri(&self) -> String {
        encode_data_uri(self.mime.as_str(), &self.data)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationParams {
    pub model: ModelId,
    pub aspect_ratio: AspectRatio,
    pub resolution: Resolution,
    pub seed: Seed,
    pub references: Vec<ReferenceImage>,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            model: ModelId::ProSvip,
            aspect_ratio: AspectRatio::Square,
            resolution: Resolution::K2,
            seed: Seed::Random,
            references: Vec::new(),
        }
    }
}

impl GenerationParams {
    pub fn new(model: ModelId) -> Self {
        Self {
            model,
            ..Self::default()
        }
    }

    pub fn with_aspect_ratio(mut self, ratio: AspectRatio) -> Self {
        self.aspect_ratio = ratio;
        self
    }

    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn with_seed(mut self, seed: Seed) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_references(mut self, references: Vec<ReferenceImage>) -> Self {
        self.references = references;
        self
    }

    /// Constraints the upstream would reject anyway, checked before any request.
    pub fn check(&self) -> std::result::Result<(), String> {
        if !self.model.supports(self.resolution) {
            return Err(format!(
                "{} is only available on Pro models, {} does not support it",
                self.resolution, self.model
            ));
        }
        if self.references.len() > MAX_REFERENCE_IMAGES {
            return Err(format!(
                "at most {} reference images are allowed, got {}",
                MAX_REFERENCE_IMAGES,
                self.references.len()
            ));
        }
        Ok(())
    }
}

/// One unit of work. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    prompt: String,
    params: GenerationParams,
    label: Option<String>,
}

impl Job {
    /// Fails on a blank prompt.
    pub fn new(prompt: impl Into<String>, params: GenerationParams) -> Result<Self> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(Error::validation_with_context(
                "prompt must not be blank",
                ErrorContext::new()
                    .with_field_path("prompt")
                    .with_source("job"),
            ));
        }
        Ok(Self {
            prompt,
            params,
            label: None,
        })
    }

    /// Free-form label carried into outcomes (e.g. the source file name).
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn params(&self) -> &GenerationParams {
        &self.params
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Prompt shortened for log lines.
    pub fn prompt_preview(&self, max_chars: usize) -> String {
        let mut chars = self.prompt.chars();
        let head: String = chars.by_ref().take(max_chars).collect();
        if chars.next().is_some() {
            format!("{head}...")
        } else {
            head
        }
    }
}
