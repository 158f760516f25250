//! Running a test procedure against generated or reproduced cases.

pub mod cases;
pub mod config;
pub mod limits;
pub mod outcome;
pub mod runner;

pub use cases::{Cases, KeyedCases};
pub use config::{ConfigError, RunConfig};
pub use limits::{CancellationToken, LimitChecker, RunLimits, StopReason};
pub use outcome::{Outcome, RunError};
pub use runner::{CaseRunner, RunReport};
