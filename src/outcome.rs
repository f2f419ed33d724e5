//! Mapping of pipeline results to process exit codes

use crate::coverage::GateResult;
use crate::error::GateError;
use crate::execution::Evaluation;

/// Exit code for fatal errors that are not gate outcomes
pub const FATAL_EXIT_CODE: i32 = 3;

/// Terminal state of a gate run, in order of precedence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// No coverage artifact could be found
    DataUnavailable,
    GateFailed,
    GatePassed,
}

impl Outcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            Outcome::DataUnavailable => 2,
            Outcome::GateFailed => 1,
            Outcome::GatePassed => 0,
        }
    }

    pub fn from_result(result: &GateResult) -> Self {
        if result.overall_pass {
            Outcome::GatePassed
        } else {
            Outcome::GateFailed
        }
    }

    /// `None` for errors that are not gate outcomes (they exit with
    /// [`FATAL_EXIT_CODE`])
    pub fn from_run(run: &Result<Evaluation, GateError>) -> Option<Self> {
        match run {
            Ok(evaluation) => Some(Self::from_result(&evaluation.result)),
            Err(GateError::NoCoverageData { .. }) => Some(Outcome::DataUnavailable),
            Err(_) => None,
        }
    }
}
