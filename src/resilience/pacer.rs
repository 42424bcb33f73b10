use crate::error_code::FailureKind;
use crate::{Error, ErrorContext, Result};
use std::time::Duration;
use tokio::time::Instant;
use tracing::warn;

/// Allowed range for the base interval.
pub const BASE_INTERVAL_RANGE: (Duration, Duration) =
    (Duration::from_millis(500), Duration::from_secs(10));

#[derive(Debug, Clone, PartialEq)]
pub struct PacingConfig {
    /// Spacing between request starts when the upstream is healthy.
    pub base_interval: Duration,
    /// Floor for any adjustment.
    pub min_interval: Duration,
    /// Ceiling for any adjustment.
    pub max_interval: Duration,
    /// Failure streak at which the interval is inflated.
    pub failure_threshold: u32,
    /// Applied to the interval on a rate-limit signal.
    pub rate_limit_multiplier: f64,
    /// Added to the interval once the streak reaches the threshold.
    pub failure_increment: Duration,
    /// Relaxation factor applied on success while above base.
    pub success_decay: f64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            base_interval: Duration::from_secs(3),
            min_interval: Duration::from_millis(500),
            max_interval: Duration::from_secs(60),
            failure_threshold: 3,
            rate_limit_multiplier: 2.0,
            failure_increment: Duration::from_secs(2),
            success_decay: 0.8,
        }
    }
}

impl PacingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_interval(mut self, interval: Duration) -> Self {
        self.base_interval = interval;
        self
    }

    pub fn with_bounds(mut self, min: Duration, max: Duration) -> Self {
        self.min_interval = min;
        self.max_interval = max;
        self
    }

    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    pub fn with_rate_limit_multiplier(mut self, multiplier: f64) -> Self {
        self.rate_limit_multiplier = multiplier;
        self
    }

    pub fn with_failure_increment(mut self, increment: Duration) -> Self {
        self.failure_increment = increment;
        self
    }

    pub fn with_success_decay(mut self, decay: f64) -> Self {
        self.success_decay = decay;
        self
    }

    pub fn validate(&self) -> Result<()> {
        let fail = |field: &str, msg: String| -> Result<()> {
            Err(Error::configuration_with_context(
                msg,
                ErrorContext::new()
                    .with_field_path(format!("pacing.{field}"))
                    .with_source("pacing_config"),
            ))
        };
        let (lo, hi) = BASE_INTERVAL_RANGE;
        if self.base_interval < lo || self.base_interval > hi {
            return fail(
                "base_interval",
                format!(
                    "base interval must be within {:?}..={:?}, got {:?}",
                    lo, hi, self.base_interval
                ),
            );
        }
        if self.min_interval.is_zero() {
            return fail("min_interval", "minimum interval must be positive".into());
        }
        if !(self.min_interval <= self.base_interval && self.base_interval <= self.max_interval) {
            return fail(
                "base_interval",
                format!(
                    "expected min <= base <= max, got {:?} / {:?} / {:?}",
                    self.min_interval, self.base_interval, self.max_interval
                ),
            );
        }
        if self.failure_threshold == 0 {
            return fail("failure_threshold", "failure threshold must be at least 1".into());
        }
        if !self.rate_limit_multiplier.is_finite() || self.rate_limit_multiplier <= 1.0 {
            return fail(
                "rate_limit_multiplier",
                format!("multiplier must be > 1, got {}", self.rate_limit_multiplier),
            );
        }
        if self.failure_increment.is_zero() {
            return fail("failure_increment", "failure increment must be positive".into());
        }
        if !(self.success_decay > 0.0 && self.success_decay <= 1.0) {
            return fail(
                "success_decay",
                format!("decay must be within (0, 1], got {}", self.success_decay),
            );
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PacingSnapshot {
    pub current_interval: Duration,
    pub consecutive_failures: u32,
    pub completed: usize,
    pub total: usize,
    pub elapsed: Duration,
}

#[derive(Debug)]
struct State {
    current_interval: Duration,
    consecutive_failures: u32,
    completed: usize,
    total: usize,
    started: Instant,
    last_dispatch: Option<Instant>,
    latency_sum: Duration,
    latency_samples: u32,
}

/// Politeness interval that adapts to what the upstream reports.
///
/// Owned by exactly one batch run; every method takes `&mut self` so no
/// locking is involved.
#[derive(Debug)]
pub struct AdaptivePacer {
    cfg: PacingConfig,
    state: State,
}

impl AdaptivePacer {
    /// `cfg` is expected to have passed [`PacingConfig::validate`].
    pub fn new(cfg: PacingConfig, total: usize) -> Self {
        let state = State {
            current_interval: cfg.base_interval,
            consecutive_failures: 0,
            completed: 0,
            total,
            started: Instant::now(),
            last_dispatch: None,
            latency_sum: Duration::ZERO,
            latency_samples: 0,
        };
        Self { cfg, state }
    }

    pub fn config(&self) -> &PacingConfig {
        &self.cfg
    }

    fn clamp(&self, interval: Duration) -> Duration {
        interval.clamp(self.cfg.min_interval, self.cfg.max_interval)
    }

    fn scaled(interval: Duration, factor: f64) -> Duration {
        let secs = interval.as_secs_f64() * factor;
        if secs.is_finite() && secs >= 0.0 {
            Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
        } else {
            Duration::MAX
        }
    }

    /// Remaining wait before the next request may start.
    pub fn pending_delay(&self) -> Duration {
        match self.state.last_dispatch {
            Some(last) => (last + self.state.current_interval).saturating_duration_since(Instant::now()),
            None => Duration::ZERO,
        }
    }

    /// Sleep out the politeness interval, then mark the dispatch time.
    pub async fn wait_turn(&mut self) {
        let delay = self.pending_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.state.last_dispatch = Some(Instant::now());
    }

    fn finish_job(&mut self, latency: Option<Duration>) {
        if self.state.completed < self.state.total {
            self.state.completed += 1;
        }
        if let Some(latency) = latency {
            self.state.latency_sum += latency;
            self.state.latency_samples += 1;
        }
    }

    pub fn on_success(&mut self, latency: Duration) {
        self.finish_job(Some(latency));
        self.state.consecutive_failures = 0;
        let current = self.state.current_interval;
        if current > self.cfg.base_interval {
            let relaxed = Self::scaled(current, self.cfg.success_decay).max(self.cfg.base_interval);
            self.state.current_interval = self.clamp(relaxed);
        } else {
            self.state.current_interval = self.clamp(current);
        }
    }

    /// Record a failed job. `latency` is `None` when no request was sent.
    ///
    /// A rate-limit proposes `interval * multiplier` (raised to `retry_after`),
    /// a streak at or above the threshold proposes `interval + increment`;
    /// the larger proposal wins and is clamped to the bounds.
    pub fn on_failure(&mut self, kind: FailureKind, retry_after: Option<Duration>, latency: Option<Duration>) {
        self.finish_job(latency);
        if !kind.counts_toward_streak() {
            return;
        }
        self.state.consecutive_failures += 1;

        let current = self.state.current_interval;
        let rate_limit = kind.is_rate_limit().then(|| {
            let proposed = Self::scaled(current, self.cfg.rate_limit_multiplier);
            match retry_after {
                Some(ra) if ra > proposed => ra,
                _ => proposed,
            }
        });
        let streak = (self.state.consecutive_failures >= self.cfg.failure_threshold)
            .then(|| current.saturating_add(self.cfg.failure_increment));

        let proposed = match (rate_limit, streak) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        if let Some(proposed) = proposed {
            let next = self.clamp(proposed);
            self.state.current_interval = next;
            warn!(
                failure_code = kind.code(),
                consecutive_failures = self.state.consecutive_failures,
                previous_interval_ms = current.as_millis(),
                interval_ms = next.as_millis(),
                "pacing interval inflated"
            );
        }
    }

    /// Count a job that never reached dispatch (stopped run).
    pub fn on_skipped(&mut self) {
        self.finish_job(None);
    }

    pub fn average_latency(&self) -> Option<Duration> {
        (self.state.latency_samples > 0)
            .then(|| self.state.latency_sum / self.state.latency_samples)
    }

    /// `(total - completed) * max(current_interval, average_latency)`.
    pub fn eta(&self) -> Duration {
        let remaining = self.state.total.saturating_sub(self.state.completed);
        let per_job = self
            .average_latency()
            .map_or(self.state.current_interval, |avg| avg.max(self.state.current_interval));
        per_job.saturating_mul(u32::try_from(remaining).unwrap_or(u32::MAX))
    }

    pub fn current_interval(&self) -> Duration {
        self.state.current_interval
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.state.consecutive_failures
    }

    pub fn snapshot(&self) -> PacingSnapshot {
        PacingSnapshot {
            current_interval: self.state.current_interval,
            consecutive_failures: self.state.consecutive_failures,
            completed: self.state.completed,
            total: self.state.total,
            elapsed: self.state.started.elapsed(),
        }
    }
}
