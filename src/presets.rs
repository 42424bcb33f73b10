//! Model, aspect ratio and resolution presets.
//!
//! [`GenerationCatalog`] is the immutable description of what the upstream
//! accepts. Nodes receive it at construction time instead of consulting
//! module-level tables.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Largest seed the upstream accepts.
pub const MAX_SEED: u32 = 2_147_483_647;

/// Maximum number of reference images per request.
pub const MAX_REFERENCE_IMAGES: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelId {
    #[serde(rename = "nano-banana-pro-default")]
    ProDefault,
    #[serde(rename = "nano-banana-pro-svip")]
    ProSvip,
    #[serde(rename = "nano-banana-svip")]
    Svip,
}

impl ModelId {
    pub const ALL: [ModelId; 3] = [ModelId::ProDefault, ModelId::ProSvip, ModelId::Svip];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelId::ProDefault => "nano-banana-pro-default",
            ModelId::ProSvip => "nano-banana-pro-svip",
            ModelId::Svip => "nano-banana-svip",
        }
    }

    /// Pro models are the only ones serving the 4K tier.
    pub fn is_pro(&self) -> bool {
        matches!(self, ModelId::ProDefault | ModelId::ProSvip)
    }

    pub fn supports(&self, resolution: Resolution) -> bool {
        resolution != Resolution::K4 || self.is_pro()
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModelId::ALL
            .into_iter()
            .find(|m| m.as_str() == s.trim())
            .ok_or_else(|| format!("unknown model: {s}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AspectRatio {
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "4:3")]
    Landscape4x3,
    #[serde(rename = "3:4")]
    Portrait3x4,
    #[serde(rename = "16:9")]
    Landscape16x9,
    #[serde(rename = "9:16")]
    Portrait9x16,
    #[serde(rename = "2:3")]
    Portrait2x3,
    #[serde(rename = "3:2")]
    Landscape3x2,
    #[serde(rename = "4:5")]
    Portrait4x5,
    #[serde(rename = "5:4")]
    Landscape5x4,
    #[serde(rename = "21:9")]
    Ultrawide21x9,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 10] = [
        AspectRatio::Square,
        AspectRatio::Landscape4x3,
        AspectRatio::Portrait3x4,
        AspectRatio::Landscape16x9,
        AspectRatio::Portrait9x16,
        AspectRatio::Portrait2x3,
        AspectRatio::Landscape3x2,
        AspectRatio::Portrait4x5,
        AspectRatio::Landscape5x4,
        AspectRatio::Ultrawide21x9,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Landscape4x3 => "4:3",
            AspectRatio::Portrait3x4 => "3:4",
            AspectRatio::Landscape16x9 => "16:9",
            AspectRatio::Portrait9x16 => "9:16",
            AspectRatio::Portrait2x3 => "2:3",
            AspectRatio::Landscape3x2 => "3:2",
            AspectRatio::Portrait4x5 => "4:5",
            AspectRatio::Landscape5x4 => "5:4",
            AspectRatio::Ultrawide21x9 => "21:9",
        }
    }

    /// Pixel size of the 1K tier, as `"WxH"`.
    pub fn base_size(&self) -> &'static str {
        match self {
            AspectRatio::Square => "1024x1024",
            AspectRatio::Portrait2x3 => "848x1264",
            AspectRatio::Landscape3x2 => "1264x848",
            AspectRatio::Portrait3x4 => "896x1200",
            AspectRatio::Landscape4x3 => "1200x896",
            AspectRatio::Portrait4x5 => "928x1152",
            AspectRatio::Landscape5x4 => "1152x928",
            AspectRatio::Portrait9x16 => "768x1376",
            AspectRatio::Landscape16x9 => "1376x768",
            AspectRatio::Ultrawide21x9 => "1584x672",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AspectRatio::ALL
            .into_iter()
            .find(|r| r.as_str() == s.trim())
            .ok_or_else(|| format!("unknown aspect ratio: {s}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resolution {
    #[serde(rename = "1K")]
    K1,
    #[serde(rename = "2K")]
    K2,
    #[serde(rename = "4K")]
    K4,
}

impl Resolution {
    pub const ALL: [Resolution; 3] = [Resolution::K1, Resolution::K2, Resolution::K4];

    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::K1 => "1K",
            Resolution::K2 => "2K",
            Resolution::K4 => "4K",
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "1K" => Ok(Resolution::K1),
            "2K" => Ok(Resolution::K2),
            "4K" => Ok(Resolution::K4),
            _ => Err(format!("unknown resolution: {s}")),
        }
    }
}

/// What a node is allowed to offer, and its defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationCatalog {
    pub models: Vec<ModelId>,
    pub aspect_ratios: Vec<AspectRatio>,
    pub resolutions: Vec<Resolution>,
    pub default_model: ModelId,
    pub default_aspect_ratio: AspectRatio,
    pub default_resolution: Resolution,
    pub max_reference_images: usize,
    pub max_seed: u32,
}

impl GenerationCatalog {
    /// Catalog offered by the text-to-image and batch nodes.
    pub fn standard() -> Self {
        Self {
            models: vec![ModelId::ProSvip, ModelId::Svip],
            aspect_ratios: AspectRatio::ALL.to_vec(),
            resolutions: Resolution::ALL.to_vec(),
            default_model: ModelId::ProSvip,
            default_aspect_ratio: AspectRatio::Square,
            default_resolution: Resolution::K2,
            max_reference_images: MAX_REFERENCE_IMAGES,
            max_seed: MAX_SEED,
        }
    }

    /// Catalog offered by the image-to-image node, which also exposes the default Pro channel.
    pub fn with_all_models() -> Self {
        Self {
            models: ModelId::ALL.to_vec(),
            default_model: ModelId::ProDefault,
            ..Self::standard()
        }
    }

    pub fn offers_model(&self, model: ModelId) -> bool {
        self.models.contains(&model)
    }

    pub fn offers_aspect_ratio(&self, ratio: AspectRatio) -> bool {
        self.aspect_ratios.contains(&ratio)
    }

    pub fn offers_resolution(&self, resolution: Resolution) -> bool {
        self.resolutions.contains(&resolution)
    }
}

impl Default for GenerationCatalog {
    fn default() -> Self {
        Self::standard()
    }
}
