//! Progress notifications emitted by the batch manager.

use super::outcome::{JobOutcome, JobState};
use crate::i18n::Locale;
use crate::resilience::PacingSnapshot;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::info;

/// Emitted once per finished job.
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    pub completed: usize,
    pub total: usize,
    pub eta: Duration,
    pub last_outcome: JobOutcome,
    pub pacing: PacingSnapshot,
}

impl ProgressUpdate {
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }
}

/// Destination for progress notifications. Called inline by the run loop,
/// so implementations should return quickly.
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, update: &ProgressUpdate);

    fn on_job_state(&self, _index: usize, _state: JobState) {}
}

impl<F> ProgressSink for F
where
    F: Fn(&ProgressUpdate) + Send + Sync,
{
    fn on_progress(&self, update: &ProgressUpdate) {
        self(update)
    }
}

/// Drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgressSink;

impl ProgressSink for NoopProgressSink {
    fn on_progress(&self, _update: &ProgressUpdate) {}
}

pub fn noop_sink() -> Arc<dyn ProgressSink> {
    Arc::new(NoopProgressSink)
}

/// Writes a `tracing` event per finished job.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingProgressSink {
    locale: Locale,
}

impl LoggingProgressSink {
    pub fn new(locale: Locale) -> Self {
        Self { locale }
    }
}

impl ProgressSink for LoggingProgressSink {
    fn on_progress(&self, update: &ProgressUpdate) {
        let outcome = &update.last_outcome;
        info!(
            completed = update.completed,
            total = update.total,
            job_index = outcome.index,
            succeeded = outcome.is_success(),
            failure_code = outcome.failure().map(|f| f.kind.code()).unwrap_or(""),
            interval_ms = update.pacing.current_interval.as_millis(),
            eta_ms = update.eta.as_millis(),
            eta = %self.locale.format_duration(Some(update.eta)),
            "batch progress"
        );
    }
}

/// Keeps every notification; for tests and for hosts polling progress.
#[derive(Debug, Default, Clone)]
pub struct InMemoryProgressSink {
    updates: Arc<RwLock<Vec<ProgressUpdate>>>,
    states: Arc<RwLock<Vec<(usize, JobState)>>>,
}

impl InMemoryProgressSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn updates(&self) -> Vec<ProgressUpdate> {
        self.updates
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// State transitions in the order they were reported.
    pub fn transitions(&self) -> Vec<(usize, JobState)> {
        self.states
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.updates.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.updates.write().unwrap_or_else(|e| e.into_inner()).clear();
        self.states.write().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

impl ProgressSink for InMemoryProgressSink {
    fn on_progress(&self, update: &ProgressUpdate) {
        self.updates
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(update.clone());
    }

    fn on_job_state(&self, index: usize, state: JobState) {
        self.states
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push((index, state));
    }
}
