//! Image generation client.
//!
//! The batch manager only sees the [`ImageGenerator`] trait; [`HttpGenerator`]
//! is the production implementation talking to the generations endpoint.
//! Implementation details are split into submodules under `src/client/`.

pub mod classify;
mod failure;
mod http;
pub mod request;
pub mod response;
pub mod retry;

pub use failure::GenerationFailure;
pub use http::{HttpGenerator, DOWNLOAD_ATTEMPTS, DOWNLOAD_PAUSE};
pub use retry::RetryPolicy;

use crate::error_code::FailureKind;
use crate::job::{ImageMime, Job};
use async_trait::async_trait;
use bytes::Bytes;

/// A successfully generated image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratedImage {
    /// Decoded image bytes. `mime` is `None` when neither sniffing nor the
    /// response declared a known format.
    Inline { data: Bytes, mime: Option<ImageMime> },
    /// The upstream returned a link; fetch it with [`ImageGenerator::download`].
    Url(String),
}

/// Performs one job end to end, internal retries included.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Cheap checks that need no I/O (credential present, parameters valid).
    /// A failure here means no request is sent for the job.
    fn preflight(&self, _job: &Job) -> Result<(), GenerationFailure> {
        Ok(())
    }

    async fn execute(&self, job: &Job) -> Result<GeneratedImage, GenerationFailure>;

    /// Fetch a [`GeneratedImage::Url`] result. Generators that only return
    /// inline images keep the default, which refuses.
    async fn download(&self, url: &str) -> Result<Bytes, GenerationFailure> {
        Err(GenerationFailure::new(
            FailureKind::Validation,
            format!("this generator cannot fetch {url}"),
        ))
    }
}
