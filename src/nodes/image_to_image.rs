use super::{check_choices, generate_single, NodeImage};
use crate::client::{HttpGenerator, ImageGenerator};
use crate::config::ClientConfig;
use crate::job::{GenerationParams, Job, ReferenceImage, Seed};
use crate::presets::{AspectRatio, GenerationCatalog, ModelId, Resolution};
use crate::{Error, ErrorContext, Result};
use bytes::Bytes;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageToImageInput {
    pub prompt: String,
    /// Encoded reference images, first one required.
    pub images: Vec<Bytes>,
    pub model: ModelId,
    pub aspect_ratio: AspectRatio,
    pub resolution: Resolution,
    pub seed: i64,
}

pub struct ImageToImageNode {
    catalog: GenerationCatalog,
}

impl ImageToImageNode {
    pub const TYPE_NAME: &'static str = "NanoBananaImageToImage";
    pub const DEFAULT_PROMPT: &'static str = "transform this into a watercolor painting";

    pub fn new(catalog: GenerationCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &GenerationCatalog {
        &self.catalog
    }

    pub fn default_input(&self, prompt: impl Into<String>, images: Vec<Bytes>) -> ImageToImageInput {
        ImageToImageInput {
            prompt: prompt.into(),
            images,
            model: self.catalog.default_model,
            aspect_ratio: self.catalog.default_aspect_ratio,
            resolution: self.catalog.default_resolution,
            seed: -1,
        }
    }

    pub fn build_job(&self, input: &ImageToImageInput) -> Result<Job> {
        check_choices(
            &self.catalog,
            input.model,
            input.aspect_ratio,
            input.resolution,
            Self::TYPE_NAME,
        )?;
        let max = self.catalog.max_reference_images;
        if input.images.is_empty() || input.images.len() > max {
            return Err(Error::validation_with_context(
                format!("between 1 and {max} reference images are required"),
                ErrorContext::new()
                    .with_field_path("image")
                    .with_details(format!("got {}", input.images.len()))
                    .with_source(Self::TYPE_NAME),
            ));
        }
        let references = input
            .images
            .iter()
            .cloned()
            .map(ReferenceImage::from_bytes)
            .collect::<Result<Vec<_>>>()?;
        let params = GenerationParams::new(input.model)
            .with_aspect_ratio(input.aspect_ratio)
            .with_resolution(input.resolution)
            .with_seed(Seed::from_raw(input.seed)?)
            .with_references(references);
        Job::new(input.prompt.clone(), params)
    }

    pub async fn run(&self, config: &ClientConfig, input: &ImageToImageInput) -> Result<NodeImage> {
        let generator = HttpGenerator::new(config.clone())?;
        self.run_with(&generator, input).await
    }

    pub async fn run_with(&self, generator: &dyn ImageGenerator, input: &ImageToImageInput) -> Result<NodeImage> {
        let job = self.build_job(input)?;
        info!(
            node = Self::TYPE_NAME,
            model = input.model.as_str(),
            references = input.images.len(),
            image_size = input.resolution.as_str(),
            prompt = job.prompt_preview(80).as_str(),
            "image-to-image started"
        );
        generate_single(generator, &job).await
    }
}

impl Default for ImageToImageNode {
    fn default() -> Self {
        Self::new(GenerationCatalog::with_all_models())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::fixtures::PNG_MAGIC;
    use crate::nodes::testing::RecordingGenerator;

    fn png() -> Bytes {
        Bytes::from_static(PNG_MAGIC)
    }

    #[tokio::test]
    async fn test_references_travel_with_the_job() {
        let node = ImageToImageNode::default();
        let generator = RecordingGenerator::default();
        let input = node.default_input("make it snow", vec![png(), png(), png()]);
        node.run_with(&generator, &input).await.unwrap();

        let jobs = generator.jobs.lock().unwrap();
        assert_eq!(jobs[0].params().references.len(), 3);
        assert_eq!(jobs[0].params().model, ModelId::ProDefault);
    }

    #[test]
    fn test_reference_count_bounds() {
        let node = ImageToImageNode::default();
        assert!(node.build_job(&node.default_input("x", vec![])).is_err());
        assert!(node.build_job(&node.default_input("x", vec![png(); 7])).is_err());
        assert!(node.build_job(&node.default_input("x", vec![png(); 6])).is_ok());
    }

    #[test]
    fn test_undecodable_reference_rejected() {
        let node = ImageToImageNode::default();
        let input = node.default_input("x", vec![Bytes::from_static(b"GIF89a....")]);
        assert!(node.build_job(&input).is_err());
    }
}
