//! Run limits and cooperative cancellation.
//!
//! Limits are checked between cases only. A procedure is an opaque unit of
//! work, so a run that hits a limit stops before its next case and reports
//! how far it got rather than failing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

/// Caps on a single run. `None` means unlimited.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunLimits {
    /// Maximum number of cases to execute.
    pub max_cases: Option<usize>,
    /// Maximum wall-clock seconds before the run stops.
    pub max_wall_secs: Option<u64>,
}

/// Reason a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// Every generated case was executed.
    Complete,
    /// The case limit was reached before coverage was complete.
    CaseLimitReached,
    /// Wall-clock time limit exceeded.
    WallTimeExceeded,
    /// A `CancellationToken` attached to the run was cancelled.
    Cancelled,
}

/// Shared flag a caller can flip to stop a run between cases.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Checks a run in progress against its limits.
#[derive(Debug)]
pub struct LimitChecker {
    limits: RunLimits,
    cancellation: Option<CancellationToken>,
    start_time: Instant,
}

impl LimitChecker {
    pub fn new(limits: RunLimits, cancellation: Option<CancellationToken>) -> Self {
        Self {
            limits,
            cancellation,
            start_time: Instant::now(),
        }
    }

    /// Whether the run must stop before executing another case.
    /// Returns None if it may continue.
    pub fn check(&self, cases_executed: usize) -> Option<StopReason> {
        if self
            .cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
        {
            return Some(StopReason::Cancelled);
        }
        if self.wall_time_exceeded() {
            return Some(StopReason::WallTimeExceeded);
        }
        if self.limits.max_cases.is_some_and(|max| cases_executed >= max) {
            return Some(StopReason::CaseLimitReached);
        }
        None
    }

    pub fn wall_time_exceeded(&self) -> bool {
        self.limits
            .max_wall_secs
            .is_some_and(|max| self.start_time.elapsed().as_secs() >= max)
    }

    /// Elapsed seconds since start.
    pub fn elapsed_secs(&self) -> f64 {
        self.start_time.elapsed().as_secs_f64()
    }

    pub fn limits(&self) -> &RunLimits {
        &self.limits
    }
}
