//! Per-job outcomes and the final batch report.

use crate::client::{GeneratedImage, GenerationFailure};
use crate::error_code::FailureKind;
use crate::job::Job;
use crate::resilience::PacingSnapshot;
use std::time::Duration;

/// Lifecycle of one job inside a run. `Succeeded` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobState {
    Pending,
    InFlight,
    Succeeded,
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JobOutcome {
    /// Position of the job in the submitted list.
    pub index: usize,
    pub label: Option<String>,
    pub result: Result<GeneratedImage, GenerationFailure>,
    /// Wall time of the collaborator call; `None` when nothing was dispatched.
    pub latency: Option<Duration>,
}

impl JobOutcome {
    pub(crate) fn new(
        index: usize,
        job: &Job,
        result: Result<GeneratedImage, GenerationFailure>,
        latency: Option<Duration>,
    ) -> Self {
        Self {
            index,
            label: job.label().map(str::to_string),
            result,
            latency,
        }
    }

    pub fn state(&self) -> JobState {
        match self.result {
            Ok(_) => JobState::Succeeded,
            Err(_) => JobState::Failed,
        }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn image(&self) -> Option<&GeneratedImage> {
        self.result.as_ref().ok()
    }

    pub fn failure(&self) -> Option<&GenerationFailure> {
        self.result.as_ref().err()
    }

    pub fn was_dispatched(&self) -> bool {
        self.latency.is_some()
    }
}

/// Everything a run produced, in input order.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub outcomes: Vec<JobOutcome>,
    pub elapsed: Duration,
    /// Pacing state after the last job.
    pub final_pacing: PacingSnapshot,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn success_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.total() - self.success_count()
    }

    pub fn cancelled_count(&self) -> usize {
        self.failures()
            .filter(|f| f.kind == FailureKind::Cancelled)
            .count()
    }

    pub fn success_rate(&self) -> f64 {
        if self.outcomes.is_empty() {
            0.0
        } else {
            self.success_count() as f64 / self.total() as f64
        }
    }

    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(JobOutcome::is_success)
    }

    pub fn any_succeeded(&self) -> bool {
        self.outcomes.iter().any(JobOutcome::is_success)
    }

    pub fn failures(&self) -> impl Iterator<Item = &GenerationFailure> {
        self.outcomes.iter().filter_map(JobOutcome::failure)
    }

    /// Number of jobs that actually reached the collaborator.
    pub fn dispatched_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.was_dispatched()).count()
    }
}
