//! 节点模块：宿主工作流调用的节点入口。
//!
//! # Workflow Nodes
//!
//! Entry points the visual workflow host calls. The host converts its image
//! tensors to encoded bytes before calling in and decodes [`NodeImage`] on the
//! way out; nothing here touches pixels.
//!
//! | Node | Category | Output |
//! |------|----------|--------|
//! | [`TextToImageNode`] | `o1key` | one image |
//! | [`ImageToImageNode`] | `o1key` | one image |
//! | [`BatchProcessorNode`] | `o1key/batch` | images of every successful job |
//! | [`ApiConfigNode`] | `o1key/config` | a [`ClientConfig`](crate::config::ClientConfig) |

mod api_config;
mod batch_processor;
mod image_to_image;
mod text_to_image;

pub use api_config::{ApiConfigInput, ApiConfigNode};
pub use batch_processor::{parse_prompts, BatchOutput, BatchProcessorInput, BatchProcessorNode};
pub use image_to_image::{ImageToImageInput, ImageToImageNode};
pub use text_to_image::{TextToImageInput, TextToImageNode};

use crate::client::{GeneratedImage, GenerationFailure, ImageGenerator};
use crate::i18n::Locale;
use crate::job::{ImageMime, Job};
use crate::presets::{AspectRatio, GenerationCatalog, ModelId, Resolution};
use crate::{Error, ErrorContext, Result};
use bytes::Bytes;
use serde::Serialize;
use tracing::info;

/// Encoded image handed back to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeImage {
    pub data: Bytes,
    pub mime: Option<ImageMime>,
}

impl NodeImage {
    pub fn extension(&self) -> &'static str {
        self.mime.map_or("png", |m| m.extension())
    }
}

/// Registration entry for one node type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeDescriptor {
    pub type_name: &'static str,
    pub display_name: &'static str,
    pub category: &'static str,
    pub output: &'static str,
}

/// Every node this crate provides, with display names in `locale`.
pub fn node_registry(locale: Locale) -> Vec<NodeDescriptor> {
    let zh = locale == Locale::SimplifiedChinese;
    vec![
        NodeDescriptor {
            type_name: TextToImageNode::TYPE_NAME,
            display_name: if zh { "Nano Banana 文生图" } else { "Nano Banana Text to Image" },
            category: "o1key",
            output: "IMAGE",
        },
        NodeDescriptor {
            type_name: ImageToImageNode::TYPE_NAME,
            display_name: if zh { "Nano Banana 图生图" } else { "Nano Banana Image to Image" },
            category: "o1key",
            output: "IMAGE",
        },
        NodeDescriptor {
            type_name: BatchProcessorNode::TYPE_NAME,
            display_name: if zh { "Nano Banana 批量处理" } else { "Nano Banana Batch Processor" },
            category: "o1key/batch",
            output: "IMAGE",
        },
        NodeDescriptor {
            type_name: ApiConfigNode::TYPE_NAME,
            display_name: if zh { "Nano Banana API 配置" } else { "Nano Banana API Config" },
            category: "o1key/config",
            output: "APICONFIG",
        },
    ]
}

/// Reject choices the node's catalog does not offer.
pub(crate) fn check_choices(
    catalog: &GenerationCatalog,
    model: ModelId,
    ratio: AspectRatio,
    resolution: Resolution,
    source: &str,
) -> Result<()> {
    let reject = |field: &str, value: String| -> Result<()> {
        Err(Error::validation_with_context(
            format!("{field} {value} is not offered by this node"),
            ErrorContext::new()
                .with_field_path(field)
                .with_details(value)
                .with_source(source),
        ))
    };
    if !catalog.offers_model(model) {
        return reject("model", model.to_string());
    }
    if !catalog.offers_aspect_ratio(ratio) {
        return reject("aspect_ratio", ratio.to_string());
    }
    if !catalog.offers_resolution(resolution) {
        return reject("image_size", resolution.to_string());
    }
    Ok(())
}

/// Turn a generated image into bytes, downloading URL results.
pub(crate) async fn resolve_image(
    generator: &dyn ImageGenerator,
    image: GeneratedImage,
) -> std::result::Result<NodeImage, GenerationFailure> {
    match image {
        GeneratedImage::Inline { data, mime } => Ok(NodeImage { data, mime }),
        GeneratedImage::Url(url) => {
            let data = generator.download(&url).await?;
            let mime = ImageMime::sniff(&data);
            Ok(NodeImage { data, mime })
        }
    }
}

/// One job, no pacing: what the single-image nodes run.
pub(crate) async fn generate_single(generator: &dyn ImageGenerator, job: &Job) -> Result<NodeImage> {
    generator.preflight(job)?;
    let image = generator.execute(job).await?;
    let image = resolve_image(generator, image).await?;
    info!(
        bytes = image.data.len(),
        mime = image.mime.map_or("unknown", |m| m.as_str()),
        "image generated"
    );
    Ok(image)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::error_code::FailureKind;
    use crate::job::fixtures::PNG_MAGIC;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records every job and answers with a URL or inline PNG.
    #[derive(Default)]
    pub struct RecordingGenerator {
        pub jobs: Mutex<Vec<Job>>,
        pub by_url: bool,
        pub fail_prompts: Vec<String>,
    }

    #[async_trait]
    impl ImageGenerator for RecordingGenerator {
        async fn execute(&self, job: &Job) -> std::result::Result<GeneratedImage, GenerationFailure> {
            self.jobs.lock().unwrap().push(job.clone());
            if self.fail_prompts.iter().any(|p| p == job.prompt()) {
                return Err(GenerationFailure::localized(FailureKind::ServerOverload, Locale::English)
                    .with_status(503));
            }
            if self.by_url {
                Ok(GeneratedImage::Url("https://img.example.com/out.png".into()))
            } else {
                Ok(GeneratedImage::Inline {
                    data: Bytes::from_static(PNG_MAGIC),
                    mime: Some(ImageMime::Png),
                })
            }
        }

        async fn download(&self, _url: &str) -> std::result::Result<Bytes, GenerationFailure> {
            Ok(Bytes::from_static(PNG_MAGIC))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_lists_four_nodes_with_categories() {
        let nodes = node_registry(Locale::SimplifiedChinese);
        assert_eq!(nodes.len(), 4);
        assert_eq!(nodes[0].display_name, "Nano Banana 文生图");
        assert_eq!(nodes[2].category, "o1key/batch");
        assert_eq!(nodes[3].category, "o1key/config");

        let en = node_registry(Locale::English);
        assert_eq!(en[1].display_name, "Nano Banana Image to Image");
        assert_eq!(en[1].type_name, "NanoBananaImageToImage");
    }

    #[test]
    fn test_check_choices_against_catalog() {
        let catalog = GenerationCatalog::standard();
        assert!(check_choices(&catalog, ModelId::Svip, AspectRatio::Square, Resolution::K1, "t").is_ok());
        let err = check_choices(&catalog, ModelId::ProDefault, AspectRatio::Square, Resolution::K1, "t")
            .unwrap_err();
        assert_eq!(err.context().and_then(|c| c.field_path.as_deref()), Some("model"));
    }
}
