//! Strength-bounded case generation and execution over factory trees.
//!
//! [`FactoryExt`] adds generation and execution to every
//! [`Factory`](ncase_factory::Factory):
//!
//! ```
//! use ncase_explore::FactoryExt;
//! use ncase_factory::{Synthesis, Variable};
//!
//! let f = Synthesis::create(
//!     (Variable::create(0..3).unwrap(), Variable::create(0..2).unwrap()),
//!     |(a, b)| a * 10 + b,
//! );
//! let executed = f.execute_for_all_cases(2, |case| assert!(case < 30)).unwrap();
//! assert_eq!(executed, 6);
//! ```

pub mod harness;
pub mod solver;

pub use harness::{
    CancellationToken, CaseRunner, Cases, ConfigError, KeyedCases, Outcome, RunConfig, RunError,
    RunLimits, RunReport, StopReason,
};
pub use solver::coverage::{check_coverage, coverage_targets, CoverageReport};
pub use solver::generator::CaseGenerator;
pub use solver::{Choice, Interaction};

use ncase_factory::{Factory, ReproductionKey};

use harness::runner::{call, report_failure};

/// Generation and execution on a factory.
pub trait FactoryExt<T> {
    /// Case paths achieving coverage of `strength`, in generation order.
    fn case_paths(&self, strength: usize) -> CaseGenerator;

    /// The generated cases, without executing anything.
    fn create_enumerable(&self, strength: usize) -> Cases<T>;

    /// The generated cases, each with its reproduction key.
    fn cases_with_keys(&self, strength: usize) -> KeyedCases<T>;

    /// Call `procedure` on every generated case in order, stopping at the
    /// first failure. Returns the number of cases executed.
    fn execute_for_all_cases<O, P>(
        &self,
        strength: usize,
        procedure: P,
    ) -> Result<usize, RunError<O::Failure>>
    where
        O: Outcome,
        P: FnMut(T) -> O;

    /// Like `execute_for_all_cases`, with cases executed on the rayon pool.
    fn execute_for_all_cases_in_parallel<O, P>(
        &self,
        strength: usize,
        procedure: P,
    ) -> Result<usize, RunError<O::Failure>>
    where
        O: Outcome,
        O::Failure: Send,
        P: Fn(T) -> O + Sync;

    /// Rebuild the case named by `key` and call `procedure` on it once.
    fn execute_for_reproduced_case<O, P>(
        &self,
        procedure: P,
        key: &str,
    ) -> Result<(), RunError<O::Failure>>
    where
        O: Outcome,
        P: FnOnce(T) -> O;
}

impl<T: Send + 'static> FactoryExt<T> for Factory<T> {
    fn case_paths(&self, strength: usize) -> CaseGenerator {
        CaseGenerator::new(self.choice_space(), strength)
    }

    fn create_enumerable(&self, strength: usize) -> Cases<T> {
        Cases::new(self, strength)
    }

    fn cases_with_keys(&self, strength: usize) -> KeyedCases<T> {
        Cases::new(self, strength).with_keys()
    }

    fn execute_for_all_cases<O, P>(
        &self,
        strength: usize,
        procedure: P,
    ) -> Result<usize, RunError<O::Failure>>
    where
        O: Outcome,
        P: FnMut(T) -> O,
    {
        let report = CaseRunner::new(RunConfig::with_strength(strength))
            .run_sequential(self, procedure)?;
        Ok(report.cases_executed)
    }

    fn execute_for_all_cases_in_parallel<O, P>(
        &self,
        strength: usize,
        procedure: P,
    ) -> Result<usize, RunError<O::Failure>>
    where
        O: Outcome,
        O::Failure: Send,
        P: Fn(T) -> O + Sync,
    {
        let report = CaseRunner::new(RunConfig::with_strength(strength))
            .run_parallel(self, procedure)?;
        Ok(report.cases_executed)
    }

    fn execute_for_reproduced_case<O, P>(
        &self,
        procedure: P,
        key: &str,
    ) -> Result<(), RunError<O::Failure>>
    where
        O: Outcome,
        P: FnOnce(T) -> O,
    {
        let space = self.choice_space();
        let path = key.parse::<ReproductionKey>()?.decode(&space)?;
        let case = self.materialize(&path)?;
        match call(procedure, case) {
            Ok(()) => Ok(()),
            Err(failure) => Err(report_failure(&space, &path, 1, failure)),
        }
    }
}
