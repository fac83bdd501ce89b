use crate::exec::ExecutionResult;

/// Relationship between the reference run and the ancl run of one test case.
///
/// `expected` is always the reference side, `actual` the ancl side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComparisonOutcome {
    Match,
    ExitCodeMismatch { expected: i32, actual: i32 },
    OutputMismatch { expected: Vec<u8>, actual: Vec<u8> },
}

impl ComparisonOutcome {
    pub fn is_match(&self) -> bool {
        matches!(self, ComparisonOutcome::Match)
    }
}

/// Exit status is checked first; stdout is only compared when the statuses agree.
pub fn compare(reference: &ExecutionResult, under_test: &ExecutionResult) -> ComparisonOutcome {
    if reference.exit_status != under_test.exit_status {
        return ComparisonOutcome::ExitCodeMismatch {
            expected: reference.exit_status,
            actual: under_test.exit_status,
        };
    }
    if reference.stdout != under_test.stdout {
        return ComparisonOutcome::OutputMismatch {
            expected: reference.stdout.clone(),
            actual: under_test.stdout.clone(),
        };
    }
    ComparisonOutcome::Match
}
