//! Shared fixtures for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use base64::Engine;
use bytes::Bytes;
use mockito::{Mock, Server, ServerGuard};
use nano_banana_nodes::client::{GeneratedImage, GenerationFailure, ImageGenerator, RetryPolicy};
use nano_banana_nodes::config::{ClientConfig, NetworkRoute, ResponseFormat};
use nano_banana_nodes::error_code::FailureKind;
use nano_banana_nodes::job::{GenerationParams, Job};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

pub const GENERATIONS_PATH: &str = "/v1/images/generations";

/// Smallest byte string recognized as PNG.
pub const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13];

pub fn png_b64() -> String {
    base64::engine::general_purpose::STANDARD.encode(PNG)
}

pub fn jobs(n: usize) -> Vec<Job> {
    (0..n)
        .map(|i| {
            Job::new(format!("prompt {i}"), GenerationParams::default())
                .map(|job| job.with_label(format!("job-{i}")))
                .unwrap()
        })
        .collect()
}

/// Mock upstream plus a client configuration pointing at it.
pub struct MockServerFixture {
    pub server: ServerGuard,
    pub base_url: String,
}

impl MockServerFixture {
    pub async fn new() -> Self {
        let server = Server::new_async().await;
        let base_url = server.url();
        Self { server, base_url }
    }

    /// Keyed config aimed at the mock with millisecond retry delays.
    pub fn config(&self) -> ClientConfig {
        ClientConfig::new()
            .with_api_key("sk-test")
            .with_base_url(self.base_url.as_str())
            .with_network(NetworkRoute::Direct)
            .with_retry_policy(RetryPolicy::new(3, Duration::from_millis(10)))
            .with_response_format(ResponseFormat::B64Json)
    }

    pub async fn mock_json(&mut self, status: u16, body: &str) -> Mock {
        self.server
            .mock("POST", GENERATIONS_PATH)
            .with_status(status as usize)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await
    }

    pub async fn mock_b64_success(&mut self) -> Mock {
        let body = serde_json::json!({ "data": [{ "b64_json": png_b64() }] }).to_string();
        self.mock_json(200, &body).await
    }
}

/// One scripted reply of [`ScriptedGenerator`].
#[derive(Debug, Clone)]
pub struct Step {
    pub latency: Duration,
    pub result: Result<(), GenerationFailure>,
}

impl Step {
    pub fn ok(latency: Duration) -> Self {
        Self {
            latency,
            result: Ok(()),
        }
    }

    pub fn fail(kind: FailureKind, status: u16, latency: Duration) -> Self {
        Self {
            latency,
            result: Err(GenerationFailure::new(kind, kind.name()).with_status(status)),
        }
    }

    pub fn rate_limited(retry_after: Option<Duration>, latency: Duration) -> Self {
        Self {
            latency,
            result: Err(GenerationFailure::new(FailureKind::RateLimited, "rate limited")
                .with_status(429)
                .with_retry_after(retry_after)),
        }
    }
}

/// Generator that replays [`Step`]s in order and records dispatch times.
///
/// Once the script runs out every further call succeeds after `fallback`.
pub struct ScriptedGenerator {
    steps: Mutex<VecDeque<Step>>,
    fallback: Duration,
    keyed: bool,
    pub dispatches: Mutex<Vec<(Instant, String)>>,
}

impl ScriptedGenerator {
    pub fn new(steps: Vec<Step>, fallback: Duration) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            fallback,
            keyed: true,
            dispatches: Mutex::new(Vec::new()),
        }
    }

    pub fn always_ok(latency: Duration) -> Self {
        Self::new(Vec::new(), latency)
    }

    /// Behaves like a client with no API key configured.
    pub fn without_key(mut self) -> Self {
        self.keyed = false;
        self
    }

    pub fn dispatch_count(&self) -> usize {
        self.dispatches.lock().unwrap().len()
    }

    /// Gaps between consecutive dispatch starts.
    pub fn gaps(&self) -> Vec<Duration> {
        let dispatches = self.dispatches.lock().unwrap();
        dispatches.windows(2).map(|w| w[1].0 - w[0].0).collect()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.dispatches
            .lock()
            .unwrap()
            .iter()
            .map(|(_, p)| p.clone())
            .collect()
    }
}

#[async_trait]
impl ImageGenerator for ScriptedGenerator {
    fn preflight(&self, _job: &Job) -> Result<(), GenerationFailure> {
        if self.keyed {
            Ok(())
        } else {
            Err(GenerationFailure::new(FailureKind::MissingCredential, "no API key"))
        }
    }

    async fn execute(&self, job: &Job) -> Result<GeneratedImage, GenerationFailure> {
        self.dispatches
            .lock()
            .unwrap()
            .push((Instant::now(), job.prompt().to_string()));
        let step = self
            .steps
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Step::ok(self.fallback));
        tokio::time::sleep(step.latency).await;
        step.result.map(|()| GeneratedImage::Inline {
            data: Bytes::from_static(PNG),
            mime: None,
        })
    }
}
