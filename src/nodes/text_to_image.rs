use super::{check_choices, generate_single, NodeImage};
use crate::client::{HttpGenerator, ImageGenerator};
use crate::config::ClientConfig;
use crate::job::{GenerationParams, Job, Seed};
use crate::presets::{AspectRatio, GenerationCatalog, ModelId, Resolution};
use crate::Result;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextToImageInput {
    pub prompt: String,
    pub model: ModelId,
    pub aspect_ratio: AspectRatio,
    pub resolution: Resolution,
    /// Host seed; `-1` draws a random one upstream.
    pub seed: i64,
}

pub struct TextToImageNode {
    catalog: GenerationCatalog,
}

impl TextToImageNode {
    pub const TYPE_NAME: &'static str = "NanoBananaTextToImage";
    pub const DEFAULT_PROMPT: &'static str = "a beautiful sunset over mountains";

    pub fn new(catalog: GenerationCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &GenerationCatalog {
        &self.catalog
    }

    /// Input prefilled with the catalog defaults.
    pub fn default_input(&self, prompt: impl Into<String>) -> TextToImageInput {
        TextToImageInput {
            prompt: prompt.into(),
            model: self.catalog.default_model,
            aspect_ratio: self.catalog.default_aspect_ratio,
            resolution: self.catalog.default_resolution,
            seed: -1,
        }
    }

    pub fn build_job(&self, input: &TextToImageInput) -> Result<Job> {
        check_choices(
            &self.catalog,
            input.model,
            input.aspect_ratio,
            input.resolution,
            Self::TYPE_NAME,
        )?;
        let params = GenerationParams::new(input.model)
            .with_aspect_ratio(input.aspect_ratio)
            .with_resolution(input.resolution)
            .with_seed(Seed::from_raw(input.seed)?);
        Job::new(input.prompt.clone(), params)
    }

    pub async fn run(&self, config: &ClientConfig, input: &TextToImageInput) -> Result<NodeImage> {
        let generator = HttpGenerator::new(config.clone())?;
        self.run_with(&generator, input).await
    }

    pub async fn run_with(&self, generator: &dyn ImageGenerator, input: &TextToImageInput) -> Result<NodeImage> {
        let job = self.build_job(input)?;
        info!(
            node = Self::TYPE_NAME,
            model = input.model.as_str(),
            aspect_ratio = input.aspect_ratio.as_str(),
            image_size = input.resolution.as_str(),
            prompt = job.prompt_preview(80).as_str(),
            "text-to-image started"
        );
        generate_single(generator, &job).await
    }
}

impl Default for TextToImageNode {
    fn default() -> Self {
        Self::new(GenerationCatalog::standard())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::ImageMime;
    use crate::nodes::testing::RecordingGenerator;
    use crate::Error;

    #[tokio::test]
    async fn test_generates_one_image_with_defaults() {
        let node = TextToImageNode::default();
        let generator = RecordingGenerator::default();
        let input = node.default_input("a cat in a hat");
        let image = node.run_with(&generator, &input).await.unwrap();
        assert_eq!(image.mime, Some(ImageMime::Png));

        let jobs = generator.jobs.lock().unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].params().model, ModelId::ProSvip);
        assert_eq!(jobs[0].params().seed, Seed::Random);
    }

    #[tokio::test]
    async fn test_url_results_are_downloaded() {
        let node = TextToImageNode::default();
        let generator = RecordingGenerator {
            by_url: true,
            ..Default::default()
        };
        let image = node
            .run_with(&generator, &node.default_input("harbor at night"))
            .await
            .unwrap();
        assert_eq!(image.extension(), "png");
    }

    #[tokio::test]
    async fn test_model_outside_catalog_is_rejected_before_generation() {
        let node = TextToImageNode::default();
        let generator = RecordingGenerator::default();
        let mut input = node.default_input("x");
        input.model = ModelId::ProDefault;
        let err = node.run_with(&generator, &input).await.unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
        assert!(generator.jobs.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_key_fails_without_request() {
        let node = TextToImageNode::default();
        let err = node
            .run(&ClientConfig::new(), &node.default_input("x"))
            .await
            .unwrap_err();
        match err {
            Error::Generation(f) => {
                assert_eq!(f.kind, crate::error_code::FailureKind::MissingCredential)
            }
            other => panic!("unexpected {other}"),
        }
    }
}
