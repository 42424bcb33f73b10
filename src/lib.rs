//! # nano-banana-nodes
//!
//! Nano Banana 图像生成节点：文生图、图生图、批量处理，以及自适应节奏的批量请求管理器。
//!
//! Workflow nodes for the Nano Banana image generation API, plus the batch
//! request manager that paces a queue of generation jobs against one upstream.
//!
//! ## Overview
//!
//! The host application hands over prompts, parameters and already-encoded
//! reference images; this crate turns them into generation jobs, sends them to
//! `POST /v1/images/generations` and hands images back.
//!
//! Batches run strictly one request at a time. The manager waits out a
//! politeness interval between request starts, inflates it when the upstream
//! signals rate limiting or keeps failing, relaxes it after successes, and
//! reports progress with an ETA after every job.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use nano_banana_nodes::batch::{BatchRequestManager, LoggingProgressSink};
//! use nano_banana_nodes::client::HttpGenerator;
//! use nano_banana_nodes::config::ClientConfig;
//! use nano_banana_nodes::job::{GenerationParams, Job};
//! use nano_banana_nodes::resilience::PacingConfig;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> nano_banana_nodes::Result<()> {
//!     let config = ClientConfig::from_env()?;
//!     let generator = Arc::new(HttpGenerator::new(config)?);
//!     let manager = BatchRequestManager::new(generator, PacingConfig::default())?
//!         .with_progress_sink(Arc::new(LoggingProgressSink::default()));
//!
//!     let jobs = vec![
//!         Job::new("a lighthouse at dusk", GenerationParams::default())?,
//!         Job::new("a lighthouse at dawn", GenerationParams::default())?,
//!     ];
//!     let report = manager.run_batch(jobs).await?;
//!     println!("{}/{} succeeded", report.success_count(), report.total());
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`batch`] | Batch request manager, outcomes, progress sinks, stop signal |
//! | [`resilience`] | Adaptive politeness interval |
//! | [`client`] | HTTP collaborator: request, retries, classification, response parsing |
//! | [`config`] | Client configuration from builder, environment or YAML |
//! | [`job`] | Jobs, parameters, seeds, reference images |
//! | [`presets`] | Models, aspect ratios, resolutions and the generation catalog |
//! | [`nodes`] | Host-facing node entry points and registry |
//! | [`error_code`] | Failure taxonomy |
//! | [`i18n`] | Localized user-facing text |

pub mod batch;
pub mod client;
pub mod config;
pub mod error_code;
pub mod i18n;
pub mod job;
pub mod nodes;
pub mod presets;
pub mod resilience;
pub mod utils;

// Re-export main types for convenience
pub use batch::{BatchReport, BatchRequestManager, JobOutcome, JobState, ProgressSink, StopSignal};
pub use client::{GeneratedImage, GenerationFailure, HttpGenerator, ImageGenerator};
pub use config::ClientConfig;
pub use error_code::FailureKind;
pub use i18n::Locale;
pub use job::{GenerationParams, Job, Seed};
pub use resilience::PacingConfig;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
