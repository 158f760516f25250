//! How a test procedure signals pass or fail, and how a run reports it.

use std::any::Any;
use std::convert::Infallible;

use ncase_factory::{KeyError, PathError, ReproductionKey};

/// Return type of a test procedure.
///
/// A procedure returning `()` can only fail by panicking (a failing
/// `assert!`, say). One returning `Result<(), E>` may also fail with `E`.
pub trait Outcome {
    type Failure;

    fn into_result(self) -> Result<(), Self::Failure>;
}

impl Outcome for () {
    type Failure = Infallible;

    fn into_result(self) -> Result<(), Infallible> {
        Ok(())
    }
}

impl<E> Outcome for Result<(), E> {
    type Failure = E;

    fn into_result(self) -> Result<(), E> {
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RunError<F> {
    #[error("case {case_number} failed: {failure:?} (reproduction key {key})")]
    ProcedureFailure {
        /// 1-based position of the case in the run.
        case_number: usize,
        key: ReproductionKey,
        failure: F,
    },

    #[error("case {case_number} panicked: {message} (reproduction key {key})")]
    ProcedurePanicked {
        case_number: usize,
        key: ReproductionKey,
        message: String,
    },

    #[error(transparent)]
    Key(#[from] KeyError),

    #[error(transparent)]
    Path(#[from] PathError),
}

impl<F> RunError<F> {
    /// Key of the failing case, when a procedure failed.
    pub fn reproduction_key(&self) -> Option<&ReproductionKey> {
        match self {
            Self::ProcedureFailure { key, .. } | Self::ProcedurePanicked { key, .. } => Some(key),
            Self::Key(_) | Self::Path(_) => None,
        }
    }

    /// Number of cases executed up to and including the failing one.
    pub fn case_number(&self) -> Option<usize> {
        match self {
            Self::ProcedureFailure { case_number, .. }
            | Self::ProcedurePanicked { case_number, .. } => Some(*case_number),
            Self::Key(_) | Self::Path(_) => None,
        }
    }
}

/// What went wrong inside one procedure call, before a key is attached.
pub(crate) enum CaseFailure<F> {
    Failed(F),
    Panicked(String),
}

impl<F> CaseFailure<F> {
    pub(crate) fn into_run_error(self, case_number: usize, key: ReproductionKey) -> RunError<F> {
        match self {
            Self::Failed(failure) => RunError::ProcedureFailure {
                case_number,
                key,
                failure,
            },
            Self::Panicked(message) => RunError::ProcedurePanicked {
                case_number,
                key,
                message,
            },
        }
    }
}

/// Best-effort text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
