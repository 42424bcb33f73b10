//! 批量请求管理模块：按节奏顺序执行生成任务并汇报进度。
//!
//! # Batch Request Manager
//!
//! Sequences a list of generation jobs against one upstream endpoint.
//!
//! ## Run loop
//!
//! `START -> (PACE -> DISPATCH -> RECORD)* -> DONE`
//!
//! - **PACE**: wait until the current politeness interval has passed since the
//!   previous request started (see [`crate::resilience`])
//! - **DISPATCH**: hand the job to the [`ImageGenerator`](crate::client::ImageGenerator),
//!   which owns transient retries
//! - **RECORD**: feed the outcome back into the pacer and notify the
//!   [`ProgressSink`]
//!
//! A failed job is never replayed; it only influences the pacing of the jobs
//! after it. Jobs whose preflight fails are recorded without waiting or
//! dispatching.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`BatchRequestManager`] | Owns the run loop |
//! | [`JobOutcome`] / [`JobState`] | Per-job result and lifecycle |
//! | [`BatchReport`] | Ordered outcomes plus aggregate statistics |
//! | [`ProgressSink`] | Progress destination (closures work too) |
//! | [`StopSignal`] | Cooperative stop from the host |

mod manager;
mod outcome;
mod progress;
mod signal;

pub use manager::BatchRequestManager;
pub use outcome::{BatchReport, JobOutcome, JobState};
pub use progress::{
    noop_sink, InMemoryProgressSink, LoggingProgressSink, NoopProgressSink, ProgressSink,
    ProgressUpdate,
};
pub use signal::StopSignal;
