use super::{check_choices, resolve_image, NodeImage};
use crate::batch::{BatchReport, BatchRequestManager, ProgressSink, StopSignal};
use crate::client::{GenerationFailure, HttpGenerator, ImageGenerator};
use crate::config::ClientConfig;
use crate::error_code::FailureKind;
use crate::job::{GenerationParams, Job, ReferenceImage, Seed};
use crate::presets::{AspectRatio, GenerationCatalog, ModelId, Resolution};
use crate::resilience::PacingConfig;
use crate::utils::folder::{load_folder_images, save_unique, DEFAULT_FILE_PATTERN};
use crate::{Error, ErrorContext, Result};
use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct BatchProcessorInput {
    /// One prompt per line; blank lines are ignored.
    pub prompts: String,
    pub model: ModelId,
    pub aspect_ratio: AspectRatio,
    pub resolution: Resolution,
    pub folder: PathBuf,
    /// Comma-separated glob patterns.
    pub file_pattern: String,
    pub output_folder: Option<PathBuf>,
    pub seed: i64,
    /// Sent before the folder image in every job.
    pub fixed_references: Vec<Bytes>,
}

#[derive(Debug)]
pub struct BatchOutput {
    /// Images of successful jobs, in job order.
    pub images: Vec<NodeImage>,
    /// Files written to the output folder.
    pub saved: Vec<PathBuf>,
    pub report: BatchReport,
    /// Seed shared by every job of the run.
    pub seed: Seed,
}

/// Split multi-line prompt input.
pub fn parse_prompts(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn output_name(prompt_number: usize, file_name: &str) -> String {
    format!("prompt{prompt_number}_{file_name}")
}

/// Swap the extension for the one matching the generated bytes.
fn output_file_name(label: &str, image: &NodeImage) -> String {
    match image.mime {
        Some(mime) => {
            let stem = Path::new(label)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| label.to_string());
            format!("{stem}.{}", mime.extension())
        }
        None => label.to_string(),
    }
}

pub struct BatchProcessorNode {
    catalog: GenerationCatalog,
    pacing: PacingConfig,
}

impl BatchProcessorNode {
    pub const TYPE_NAME: &'static str = "NanoBananaBatchProcessor";

    pub fn new(catalog: GenerationCatalog, pacing: PacingConfig) -> Self {
        Self { catalog, pacing }
    }

    pub fn catalog(&self) -> &GenerationCatalog {
        &self.catalog
    }

    pub fn default_input(&self, prompts: impl Into<String>, folder: impl Into<PathBuf>) -> BatchProcessorInput {
        BatchProcessorInput {
            prompts: prompts.into(),
            model: self.catalog.default_model,
            aspect_ratio: self.catalog.default_aspect_ratio,
            resolution: self.catalog.default_resolution,
            folder: folder.into(),
            file_pattern: DEFAULT_FILE_PATTERN.to_string(),
            output_folder: None,
            seed: -1,
            fixed_references: Vec::new(),
        }
    }

    /// Expand the input into jobs: every prompt against every folder image,
    /// prompt-major. Returns the jobs and the seed they share.
    pub fn build_jobs(&self, input: &BatchProcessorInput) -> Result<(Vec<Job>, Seed)> {
        check_choices(
            &self.catalog,
            input.model,
            input.aspect_ratio,
            input.resolution,
            Self::TYPE_NAME,
        )?;
        let invalid = |field: &str, message: String| {
            Error::validation_with_context(
                message,
                ErrorContext::new()
                    .with_field_path(field)
                    .with_source(Self::TYPE_NAME),
            )
        };

        let prompts = parse_prompts(&input.prompts);
        if prompts.is_empty() {
            return Err(invalid("prompt", "at least one prompt is required".into()));
        }
        // the folder image takes the last reference slot
        let max_fixed = self.catalog.max_reference_images.saturating_sub(1);
        if input.fixed_references.len() > max_fixed {
            return Err(invalid(
                "image_1",
                format!("at most {max_fixed} fixed reference images are allowed"),
            ));
        }
        let fixed = input
            .fixed_references
            .iter()
            .cloned()
            .map(ReferenceImage::from_bytes)
            .collect::<Result<Vec<_>>>()?;

        let folder_images = load_folder_images(&input.folder, &input.file_pattern)?;
        if folder_images.is_empty() {
            return Err(invalid(
                "folder_path",
                format!("no images found in {}", input.folder.display()),
            ));
        }

        let seed = Seed::from_raw(input.seed)?.resolve();
        let base = GenerationParams::new(input.model)
            .with_aspect_ratio(input.aspect_ratio)
            .with_resolution(input.resolution)
            .with_seed(seed);

        let mut jobs = Vec::with_capacity(prompts.len() * folder_images.len());
        for (prompt_idx, prompt) in prompts.iter().enumerate() {
            for folder_image in &folder_images {
                let mut references = fixed.clone();
                references.push(folder_image.image.clone());
                let job = Job::new(prompt.clone(), base.clone().with_references(references))?
                    .with_label(output_name(prompt_idx + 1, &folder_image.file_name));
                jobs.push(job);
            }
        }
        info!(
            node = Self::TYPE_NAME,
            prompts = prompts.len(),
            images = folder_images.len(),
            fixed_references = fixed.len(),
            jobs = jobs.len(),
            seed = seed.value().unwrap_or(0),
            "batch expanded"
        );
        Ok((jobs, seed))
    }

    pub async fn run(
        &self,
        config: &ClientConfig,
        input: &BatchProcessorInput,
        sink: Arc<dyn ProgressSink>,
        stop: StopSignal,
    ) -> Result<BatchOutput> {
        let generator = Arc::new(HttpGenerator::new(config.clone())?);
        self.run_with(generator, input, sink, stop).await
    }

    /// Fails when the input is invalid or when no job produced an image.
    pub async fn run_with(
        &self,
        generator: Arc<dyn ImageGenerator>,
        input: &BatchProcessorInput,
        sink: Arc<dyn ProgressSink>,
        stop: StopSignal,
    ) -> Result<BatchOutput> {
        let (jobs, seed) = self.build_jobs(input)?;
        let manager = BatchRequestManager::new(generator.clone(), self.pacing.clone())?
            .with_progress_sink(sink)
            .with_stop_signal(stop);
        let report = manager.run_batch(jobs).await?;

        let mut images = Vec::with_capacity(report.success_count());
        let mut saved = Vec::new();
        let mut save_failures = 0usize;
        let mut last_failure: Option<GenerationFailure> = report.failures().last().cloned();
        for outcome in &report.outcomes {
            let Some(generated) = outcome.image() else {
                continue;
            };
            let image = match resolve_image(generator.as_ref(), generated.clone()).await {
                Ok(image) => image,
                Err(failure) => {
                    warn!(
                        job_index = outcome.index,
                        failure_code = failure.kind.code(),
                        "generated image could not be fetched"
                    );
                    last_failure = Some(failure);
                    continue;
                }
            };
            if let Some(folder) = &input.output_folder {
                let label = outcome.label.as_deref().unwrap_or("output.png");
                match save_unique(folder, &output_file_name(label, &image), &image.data) {
                    Ok(path) => saved.push(path),
                    Err(e) => {
                        warn!(job_index = outcome.index, error = %e, "output image could not be saved");
                        save_failures += 1;
                    }
                }
            }
            images.push(image);
        }

        info!(
            node = Self::TYPE_NAME,
            total = report.total(),
            succeeded = images.len(),
            failed = report.total() - images.len(),
            saved = saved.len(),
            save_failures,
            "batch processing finished"
        );

        if images.is_empty() {
            let total = report.total();
            let mut failure = GenerationFailure::new(
                last_failure.as_ref().map_or(FailureKind::Validation, |f| f.kind),
                format!("all {total} jobs failed"),
            );
            if let Some(last) = last_failure {
                failure = failure.with_detail(last.to_string());
                if let Some(status) = last.status {
                    failure = failure.with_status(status);
                }
            }
            return Err(failure.into());
        }

        Ok(BatchOutput {
            images,
            saved,
            report,
            seed,
        })
    }
}

impl Default for BatchProcessorNode {
    fn default() -> Self {
        Self::new(GenerationCatalog::standard(), PacingConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{noop_sink, InMemoryProgressSink};
    use crate::job::fixtures::PNG_MAGIC;
    use crate::nodes::testing::RecordingGenerator;
    use std::time::Duration;

    fn fast_node() -> BatchProcessorNode {
        BatchProcessorNode::new(
            GenerationCatalog::standard(),
            PacingConfig::new().with_base_interval(Duration::from_millis(500)),
        )
    }

    fn folder_with(names: &[&str]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for name in names {
            std::fs::write(dir.path().join(name), PNG_MAGIC).unwrap();
        }
        dir
    }

    #[test]
    fn test_parse_prompts_skips_blank_lines() {
        assert_eq!(
            parse_prompts("  first \n\n   \nsecond\r\n"),
            vec!["first".to_string(), "second".to_string()]
        );
    }

    #[test]
    fn test_jobs_are_prompt_major_and_share_one_seed() {
        let dir = folder_with(&["b.png", "a.png"]);
        let node = fast_node();
        let mut input = node.default_input("p1\np2", dir.path());
        input.fixed_references = vec![Bytes::from_static(PNG_MAGIC)];
        let (jobs, seed) = node.build_jobs(&input).unwrap();

        let labels: Vec<_> = jobs.iter().map(|j| j.label().unwrap().to_string()).collect();
        assert_eq!(labels, ["prompt1_a.png", "prompt1_b.png", "prompt2_a.png", "prompt2_b.png"]);
        assert!(matches!(seed, Seed::Fixed(_)));
        assert!(jobs.iter().all(|j| j.params().seed == seed));
        assert!(jobs.iter().all(|j| j.params().references.len() == 2));
    }

    #[test]
    fn test_input_rejections() {
        let dir = folder_with(&[]);
        let node = fast_node();
        assert!(node.build_jobs(&node.default_input(" \n ", dir.path())).is_err());
        assert!(node.build_jobs(&node.default_input("p", dir.path())).is_err());

        let dir = folder_with(&["a.png"]);
        let mut input = node.default_input("p", dir.path());
        input.fixed_references = vec![Bytes::from_static(PNG_MAGIC); 6];
        assert!(node.build_jobs(&input).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_outputs_saved_without_overwriting() {
        let input_dir = folder_with(&["cat.jpg"]);
        let out_dir = tempfile::tempdir().unwrap();
        std::fs::write(out_dir.path().join("prompt1_cat.png"), b"existing").unwrap();

        let node = fast_node();
        let mut input = node.default_input("p1", input_dir.path());
        input.output_folder = Some(out_dir.path().to_path_buf());
        input.file_pattern = "*.jpg".into();
        input.seed = 7;

        let sink = InMemoryProgressSink::new();
        let output = node
            .run_with(
                Arc::new(RecordingGenerator::default()),
                &input,
                Arc::new(sink.clone()),
                StopSignal::new(),
            )
            .await
            .unwrap();
        assert_eq!(output.seed, Seed::Fixed(7));
        assert_eq!(output.images.len(), 1);
        assert_eq!(output.saved, vec![out_dir.path().join("prompt1_cat_1.png")]);
        assert_eq!(sink.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_save_keeps_the_image_and_the_other_files() {
        // the output name gains a "prompt1_" prefix and exceeds the file name limit
        let long_name = format!("{}.png", "x".repeat(248));
        let input_dir = folder_with(&["a.png", long_name.as_str()]);
        let out_dir = tempfile::tempdir().unwrap();

        let node = fast_node();
        let mut input = node.default_input("p1", input_dir.path());
        input.output_folder = Some(out_dir.path().to_path_buf());
        let generator = Arc::new(RecordingGenerator::default());

        let output = node
            .run_with(generator.clone(), &input, noop_sink(), StopSignal::new())
            .await
            .unwrap();
        assert_eq!(generator.jobs.lock().unwrap().len(), 2);
        assert_eq!(output.images.len(), 2);
        assert!(output.report.all_succeeded());
        assert_eq!(output.saved, vec![out_dir.path().join("prompt1_a.png")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_partial_failure_keeps_going_and_total_failure_errors() {
        let dir = folder_with(&["a.png", "b.png"]);
        let node = fast_node();
        let generator = Arc::new(RecordingGenerator {
            fail_prompts: vec!["bad".into()],
            ..Default::default()
        });

        let output = node
            .run_with(generator.clone(), &node.default_input("bad\ngood", dir.path()), noop_sink(), StopSignal::new())
            .await
            .unwrap();
        assert_eq!(output.images.len(), 2);
        assert_eq!(output.report.failure_count(), 2);

        let err = node
            .run_with(generator, &node.default_input("bad", dir.path()), noop_sink(), StopSignal::new())
            .await
            .unwrap_err();
        match err {
            Error::Generation(f) => {
                assert_eq!(f.kind, FailureKind::ServerOverload);
                assert!(f.message.contains("all 2 jobs failed"));
            }
            other => panic!("unexpected {other}"),
        }
    }
}
