//! 弹性模块：自适应请求节奏控制。
//!
//! # Request Pacing
//!
//! One batch run sends one request at a time. Between request starts the
//! [`AdaptivePacer`] enforces a politeness interval that reacts to the
//! upstream:
//!
//! | Signal | Effect on the interval |
//! |--------|------------------------|
//! | success | streak reset, relax toward base by `success_decay` |
//! | HTTP 429 | `interval * rate_limit_multiplier`, at least `Retry-After` |
//! | failure streak >= threshold | `interval + failure_increment` |
//!
//! When both inflation rules fire on the same outcome the larger proposal
//! wins. Every adjustment is clamped to `[min_interval, max_interval]`.
//!
//! ```rust
//! use nano_banana_nodes::error_code::FailureKind;
//! use nano_banana_nodes::resilience::{AdaptivePacer, PacingConfig};
//! use std::time::Duration;
//!
//! let cfg = PacingConfig::new().with_base_interval(Duration::from_secs(2));
//! cfg.validate().unwrap();
//! let mut pacer = AdaptivePacer::new(cfg, 4);
//! pacer.on_failure(FailureKind::RateLimited, None, Some(Duration::from_millis(300)));
//! assert_eq!(pacer.current_interval(), Duration::from_secs(4));
//! ```

mod pacer;

pub use pacer::{AdaptivePacer, PacingConfig, PacingSnapshot, BASE_INTERVAL_RANGE};
