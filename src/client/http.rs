use super::classify::{classify_status, is_html, parse_retry_after};
use super::failure::GenerationFailure;
use super::request::GenerationRequestBody;
use super::response::parse_generation_response;
use super::{GeneratedImage, ImageGenerator};
use crate::config::ClientConfig;
use crate::error_code::FailureKind;
use crate::i18n::Locale;
use crate::job::Job;
use crate::utils::redact::redact_payload;
use crate::Result;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::Proxy;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Attempts spent fetching a URL result.
pub const DOWNLOAD_ATTEMPTS: u32 = 3;
pub const DOWNLOAD_PAUSE: Duration = Duration::from_secs(2);

/// Characters of base64 kept when a payload is logged.
const LOG_KEEP_CHARS: usize = 48;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// [`ImageGenerator`] backed by the generations HTTP endpoint.
pub struct HttpGenerator {
    client: reqwest::Client,
    config: ClientConfig,
    url: String,
    download_pause: Duration,
}

impl HttpGenerator {
    /// Build the transport. Fails only on structural configuration problems;
    /// a missing API key surfaces per job.
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let mut builder = reqwest::Client::builder()
            .timeout(config.attempt_timeout)
            .pool_idle_timeout(Some(Duration::from_secs(90)));
        if let Some(proxy_url) = &config.proxy {
            builder = builder.proxy(Proxy::all(proxy_url)?);
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            url: config.generations_url(),
            config,
            download_pause: DOWNLOAD_PAUSE,
        })
    }

    /// Shorten the pause between download attempts.
    pub fn with_download_pause(mut self, pause: Duration) -> Self {
        self.download_pause = pause;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn locale(&self) -> Locale {
        self.config.locale
    }

    fn network_failure(&self, err: &reqwest::Error) -> GenerationFailure {
        let detail = if err.is_timeout() {
            format!("timed out after {:?}", self.config.attempt_timeout)
        } else {
            err.to_string()
        };
        GenerationFailure::localized(FailureKind::Network, self.locale()).with_detail(detail)
    }

    fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
        headers.get(name).and_then(|v| v.to_str().ok())
    }

    async fn attempt(
        &self,
        api_key: &str,
        body: &GenerationRequestBody,
        request_id: &str,
    ) -> std::result::Result<GeneratedImage, GenerationFailure> {
        let start = Instant::now();
        let resp = self
            .client
            .post(&self.url)
            .bearer_auth(api_key)
            .header(REQUEST_ID_HEADER, request_id)
            .json(body)
            .send()
            .await
            .map_err(|e| self.network_failure(&e))?;

        let status = resp.status().as_u16();
        let retry_after = parse_retry_after(Self::header_str(resp.headers(), "retry-after"));
        let text = resp.text().await.map_err(|e| self.network_failure(&e))?;

        if !(200..300).contains(&status) {
            let failure = classify_status(status, &text, retry_after, self.locale());
            info!(
                http_status = status,
                failure_code = failure.kind.code(),
                request_id,
                duration_ms = start.elapsed().as_millis(),
                "nano-banana generation request failed"
            );
            return Err(failure);
        }

        let value: serde_json::Value = serde_json::from_str(&text).map_err(|e| {
            let failure = GenerationFailure::localized(FailureKind::Validation, self.locale())
                .with_status(status);
            if is_html(&text) {
                failure
            } else {
                failure.with_detail(format!("response is not JSON: {e}"))
            }
        })?;
        debug!(
            request_id,
            body = %redact_payload(&value, LOG_KEEP_CHARS),
            "nano-banana response body"
        );

        let image = parse_generation_response(&value, self.locale())
            .map_err(|f| f.with_status(status))?;
        info!(
            http_status = status,
            request_id,
            duration_ms = start.elapsed().as_millis(),
            inline = matches!(image, GeneratedImage::Inline { .. }),
            "nano-banana generation request succeeded"
        );
        Ok(image)
    }

    async fn download_once(&self, url: &str) -> std::result::Result<Bytes, GenerationFailure> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.network_failure(&e))?;
        let status = resp.status().as_u16();
        if !(200..300).contains(&status) {
            let text = resp.text().await.unwrap_or_default();
            return Err(classify_status(status, &text, None, self.locale()));
        }
        let bytes = resp.bytes().await.map_err(|e| self.network_failure(&e))?;
        if bytes.is_empty() {
            return Err(GenerationFailure::localized(FailureKind::Validation, self.locale())
                .with_status(status)
                .with_detail("downloaded image is empty"));
        }
        Ok(bytes)
    }
}

#[async_trait]
impl ImageGenerator for HttpGenerator {
    fn preflight(&self, job: &Job) -> std::result::Result<(), GenerationFailure> {
        if self.config.credential().is_none() {
            return Err(GenerationFailure::missing_credential(self.locale()));
        }
        job.params().check().map_err(|reason| {
            GenerationFailure::localized(FailureKind::InvalidJob, self.locale()).with_detail(reason)
        })
    }

    async fn execute(&self, job: &Job) -> std::result::Result<GeneratedImage, GenerationFailure> {
        self.preflight(job)?;
        let api_key = self
            .config
            .credential()
            .ok_or_else(|| GenerationFailure::missing_credential(self.locale()))?;

        let body = GenerationRequestBody::from_job(job, self.config.response_format);
        let request_id = uuid::Uuid::new_v4().to_string();
        let policy = &self.config.retry;

        debug!(
            request_id = request_id.as_str(),
            model = body.model.as_str(),
            aspect_ratio = body.aspect_ratio.as_str(),
            image_size = body.image_size.as_str(),
            references = body.image.len(),
            prompt = job.prompt_preview(60).as_str(),
            "sending nano-banana generation request"
        );

        let mut attempt = 0u32;
        loop {
            match self.attempt(api_key, &body, &request_id).await {
                Ok(image) => return Ok(image),
                Err(failure) if failure.kind.retryable() && policy.should_retry(attempt) => {
                    let delay = policy.delay(attempt, failure.retry_after);
                    warn!(
                        attempt = attempt + 1,
                        max_retries = policy.max_retries,
                        failure_code = failure.kind.code(),
                        http_status = failure.status.unwrap_or(0),
                        delay_ms = delay.as_millis(),
                        request_id = request_id.as_str(),
                        "transient generation failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(failure) => return Err(failure.with_attempts(attempt + 1)),
            }
        }
    }

    /// Fetch an image returned by URL. Three attempts, pausing between them.
    async fn download(&self, url: &str) -> std::result::Result<Bytes, GenerationFailure> {
        let mut last = GenerationFailure::localized(FailureKind::Network, self.locale());
        for attempt in 1..=DOWNLOAD_ATTEMPTS {
            match self.download_once(url).await {
                Ok(bytes) => return Ok(bytes),
                Err(failure) => {
                    warn!(
                        attempt,
                        max_attempts = DOWNLOAD_ATTEMPTS,
                        failure_code = failure.kind.code(),
                        url,
                        "image download failed"
                    );
                    last = failure;
                }
            }
            if attempt < DOWNLOAD_ATTEMPTS {
                tokio::time::sleep(self.download_pause).await;
            }
        }
        Err(last.with_attempts(DOWNLOAD_ATTEMPTS))
    }
}
