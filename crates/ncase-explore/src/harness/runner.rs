use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;

use ncase_factory::{CasePath, ChoiceSpace, Factory, ReproductionKey};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::config::RunConfig;
use super::limits::{CancellationToken, LimitChecker, StopReason};
use super::outcome::{panic_message, CaseFailure, Outcome, RunError};
use crate::solver::generator::CaseGenerator;

/// Summary of a run that did not fail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub strength: usize,
    /// Cases the procedure was called on.
    pub cases_executed: usize,
    pub stop_reason: StopReason,
    pub elapsed_secs: f64,
}

/// Runs a procedure over the generated cases of a factory.
///
/// Generation is always sequential, so case order and keys are the same
/// whether the cases then execute sequentially or on the rayon pool.
#[derive(Debug, Clone, Default)]
pub struct CaseRunner {
    config: RunConfig,
    cancellation: Option<CancellationToken>,
}

impl CaseRunner {
    pub fn new(config: RunConfig) -> Self {
        Self {
            config,
            cancellation: None,
        }
    }

    /// Honor `token` between cases.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run sequentially or in parallel, as configured.
    pub fn run<T, O, P>(
        &self,
        factory: &Factory<T>,
        procedure: P,
    ) -> Result<RunReport, RunError<O::Failure>>
    where
        T: Send + 'static,
        O: Outcome,
        O::Failure: Send,
        P: Fn(T) -> O + Sync,
    {
        if self.config.parallel {
            self.run_parallel(factory, procedure)
        } else {
            self.run_sequential(factory, procedure)
        }
    }

    /// Execute cases one at a time in generation order, stopping at the
    /// first failure.
    pub fn run_sequential<T, O, P>(
        &self,
        factory: &Factory<T>,
        mut procedure: P,
    ) -> Result<RunReport, RunError<O::Failure>>
    where
        T: Send + 'static,
        O: Outcome,
        P: FnMut(T) -> O,
    {
        let space = factory.choice_space();
        let checker = self.checker();
        let mut executed = 0;
        let mut stop_reason = StopReason::Complete;

        for path in CaseGenerator::new(space.clone(), self.config.strength) {
            if let Some(reason) = checker.check(executed) {
                stop_reason = reason;
                break;
            }
            let case = factory.materialize(&path)?;
            executed += 1;
            if let Err(failure) = call(&mut procedure, case) {
                return Err(report_failure(&space, &path, executed, failure));
            }
        }

        Ok(self.finish(executed, stop_reason, &checker))
    }

    /// Generate every case first, then execute them across the rayon pool.
    ///
    /// The failure reported is that of the lowest-numbered failing case,
    /// regardless of which thread found a failure first.
    pub fn run_parallel<T, O, P>(
        &self,
        factory: &Factory<T>,
        procedure: P,
    ) -> Result<RunReport, RunError<O::Failure>>
    where
        T: Send + 'static,
        O: Outcome,
        O::Failure: Send,
        P: Fn(T) -> O + Sync,
    {
        let space = factory.choice_space();
        let checker = self.checker();
        let generator = CaseGenerator::new(space.clone(), self.config.strength);
        let paths: Vec<CasePath> = match self.config.max_cases {
            Some(max) => generator.take(max.saturating_add(1)).collect(),
            None => generator.collect(),
        };

        let executed = AtomicUsize::new(0);
        let stopped: OnceLock<StopReason> = OnceLock::new();

        let failure = paths.par_iter().enumerate().find_map_first(|(index, path)| {
            // `index` cases precede this one, so the case limit is exact
            // even though cases finish out of order.
            if let Some(reason) = checker.check(index) {
                let _ = stopped.set(reason);
                return None;
            }
            let case = match factory.materialize(path) {
                Ok(case) => case,
                Err(err) => return Some(RunError::from(err)),
            };
            executed.fetch_add(1, Ordering::Relaxed);
            call(&procedure, case)
                .err()
                .map(|failure| report_failure(&space, path, index + 1, failure))
        });

        if let Some(err) = failure {
            return Err(err);
        }
        let stop_reason = stopped.get().copied().unwrap_or(StopReason::Complete);
        Ok(self.finish(executed.into_inner(), stop_reason, &checker))
    }

    fn checker(&self) -> LimitChecker {
        LimitChecker::new(self.config.limits(), self.cancellation.clone())
    }

    fn finish(&self, cases_executed: usize, stop_reason: StopReason, checker: &LimitChecker) -> RunReport {
        let report = RunReport {
            strength: self.config.strength,
            cases_executed,
            stop_reason,
            elapsed_secs: checker.elapsed_secs(),
        };
        tracing::info!(
            strength = report.strength,
            cases = report.cases_executed,
            stop_reason = ?report.stop_reason,
            elapsed_secs = report.elapsed_secs,
            "run finished"
        );
        report
    }
}

/// Call `procedure` on one case, catching a panic as a failure.
pub(crate) fn call<T, O, P>(procedure: P, case: T) -> Result<(), CaseFailure<O::Failure>>
where
    O: Outcome,
    P: FnOnce(T) -> O,
{
    match catch_unwind(AssertUnwindSafe(move || procedure(case))) {
        Ok(outcome) => outcome.into_result().map_err(CaseFailure::Failed),
        Err(payload) => Err(CaseFailure::Panicked(panic_message(payload.as_ref()))),
    }
}

pub(crate) fn report_failure<F>(
    space: &ChoiceSpace,
    path: &CasePath,
    case_number: usize,
    failure: CaseFailure<F>,
) -> RunError<F> {
    let key = ReproductionKey::encode(space, path);
    tracing::warn!(case_number, %key, "case failed");
    failure.into_run_error(case_number, key)
}
