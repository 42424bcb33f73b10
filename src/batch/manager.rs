use super::outcome::{BatchReport, JobOutcome, JobState};
use super::progress::{noop_sink, ProgressSink, ProgressUpdate};
use super::signal::StopSignal;
use crate::client::{GenerationFailure, ImageGenerator};
use crate::i18n::Locale;
use crate::job::Job;
use crate::resilience::{AdaptivePacer, PacingConfig};
use crate::{Error, ErrorContext, Result};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{info, warn};

/// Runs a list of jobs against one upstream, one request at a time.
///
/// Each [`run_batch`](Self::run_batch) call builds its own pacing state, so a
/// manager can be reused and concurrent runs never share mutable state.
pub struct BatchRequestManager {
    generator: Arc<dyn ImageGenerator>,
    pacing: PacingConfig,
    sink: Arc<dyn ProgressSink>,
    stop: StopSignal,
    locale: Locale,
}

impl BatchRequestManager {
    pub fn new(generator: Arc<dyn ImageGenerator>, pacing: PacingConfig) -> Result<Self> {
        pacing.validate()?;
        Ok(Self {
            generator,
            pacing,
            sink: noop_sink(),
            stop: StopSignal::new(),
            locale: Locale::default(),
        })
    }

    pub fn with_progress_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_stop_signal(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }

    /// Locale for failures the manager produces itself (cancelled jobs).
    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    pub fn pacing(&self) -> &PacingConfig {
        &self.pacing
    }

    /// Handle that stops this manager's runs when raised.
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// Execute `jobs` in order and return one outcome per job.
    ///
    /// Fails only when `jobs` is empty; individual job failures are reported
    /// in the outcomes and never abort the run.
    pub async fn run_batch(&self, jobs: Vec<Job>) -> Result<BatchReport> {
        if jobs.is_empty() {
            return Err(Error::validation_with_context(
                "job list must not be empty",
                ErrorContext::new()
                    .with_field_path("jobs")
                    .with_source("batch_manager"),
            ));
        }

        let total = jobs.len();
        let started = Instant::now();
        let mut pacer = AdaptivePacer::new(self.pacing.clone(), total);
        let mut outcomes = Vec::with_capacity(total);

        info!(
            total,
            base_interval_ms = self.pacing.base_interval.as_millis(),
            "batch started"
        );
        for index in 0..total {
            self.sink.on_job_state(index, JobState::Pending);
        }

        for (index, job) in jobs.iter().enumerate() {
            let outcome = self.run_one(index, job, &mut pacer).await;
            self.sink.on_job_state(index, outcome.state());

            let pacing = pacer.snapshot();
            let update = ProgressUpdate {
                completed: pacing.completed,
                total,
                eta: pacer.eta(),
                last_outcome: outcome.clone(),
                pacing,
            };
            self.sink.on_progress(&update);
            outcomes.push(outcome);
        }

        let report = BatchReport {
            outcomes,
            elapsed: started.elapsed(),
            final_pacing: pacer.snapshot(),
        };
        info!(
            total,
            succeeded = report.success_count(),
            failed = report.failure_count(),
            cancelled = report.cancelled_count(),
            elapsed_ms = report.elapsed.as_millis(),
            final_interval_ms = report.final_pacing.current_interval.as_millis(),
            "batch finished"
        );
        Ok(report)
    }

    async fn run_one(&self, index: usize, job: &Job, pacer: &mut AdaptivePacer) -> JobOutcome {
        if self.stop.is_raised() {
            return self.cancelled(index, job, pacer);
        }

        if let Err(failure) = self.generator.preflight(job) {
            info!(
                job_index = index,
                failure_code = failure.kind.code(),
                "job rejected before dispatch"
            );
            pacer.on_failure(failure.kind, None, None);
            return JobOutcome::new(index, job, Err(failure), None);
        }

        tokio::select! {
            _ = pacer.wait_turn() => {}
            _ = self.stop.raised() => {}
        }
        if self.stop.is_raised() {
            return self.cancelled(index, job, pacer);
        }

        self.sink.on_job_state(index, JobState::InFlight);
        info!(
            job_index = index,
            interval_ms = pacer.current_interval().as_millis(),
            prompt = job.prompt_preview(40).as_str(),
            "dispatching job"
        );
        let dispatched = Instant::now();
        let result = self.generator.execute(job).await;
        let latency = dispatched.elapsed();

        match &result {
            Ok(_) => {
                pacer.on_success(latency);
                info!(
                    job_index = index,
                    latency_ms = latency.as_millis(),
                    "job succeeded"
                );
            }
            Err(failure) => {
                pacer.on_failure(failure.kind, failure.retry_after, Some(latency));
                warn!(
                    job_index = index,
                    failure_code = failure.kind.code(),
                    http_status = failure.status.unwrap_or(0),
                    attempts = failure.attempts,
                    latency_ms = latency.as_millis(),
                    "job failed"
                );
            }
        }
        JobOutcome::new(index, job, result, Some(latency))
    }

    fn cancelled(&self, index: usize, job: &Job, pacer: &mut AdaptivePacer) -> JobOutcome {
        pacer.on_skipped();
        JobOutcome::new(index, job, Err(GenerationFailure::cancelled(self.locale)), None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::GeneratedImage;
    use crate::job::GenerationParams;
    use async_trait::async_trait;

    struct AlwaysOk;

    #[async_trait]
    impl ImageGenerator for AlwaysOk {
        async fn execute(&self, _job: &Job) -> std::result::Result<GeneratedImage, GenerationFailure> {
            Ok(GeneratedImage::Url("https://img.example.com/a.png".into()))
        }
    }

    #[test]
    fn test_invalid_pacing_rejected_at_construction() {
        let cfg = PacingConfig::new().with_rate_limit_multiplier(0.5);
        assert!(BatchRequestManager::new(Arc::new(AlwaysOk), cfg).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_batch_is_a_validation_error() {
        let manager = BatchRequestManager::new(Arc::new(AlwaysOk), PacingConfig::default()).unwrap();
        let err = manager.run_batch(Vec::new()).await.unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_raised_before_start_cancels_everything() {
        let manager = BatchRequestManager::new(Arc::new(AlwaysOk), PacingConfig::default()).unwrap();
        manager.stop_signal().raise();
        let jobs = vec![Job::new("a", GenerationParams::default()).unwrap(); 3];
        let report = manager.run_batch(jobs).await.unwrap();
        assert_eq!(report.cancelled_count(), 3);
        assert_eq!(report.dispatched_count(), 0);
        assert_eq!(report.final_pacing.completed, 3);
    }
}
