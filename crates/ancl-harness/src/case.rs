use std::fmt;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

use crate::compare::{compare, ComparisonOutcome};
use crate::exec::{run_artifact_file, Execution, ExecutionResult, RunnerConfig};
use crate::pipeline::{build_case, ArtifactPaths, BuildFault};
use crate::RunConfig;

/// One conformance program, identified by its path relative to the tests dir.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TestCase {
    path: &'static str,
}

impl TestCase {
    pub const fn new(path: &'static str) -> Self {
        TestCase { path }
    }

    pub fn id(&self) -> &'static str {
        self.path
    }

    /// Leading path component (`loop` for `loop/fib.c`).
    pub fn category(&self) -> &'static str {
        match self.path.split_once('/') {
            Some((category, _)) if !category.is_empty() => category,
            _ => "uncategorized",
        }
    }

    pub fn source(&self) -> &'static Path {
        Path::new(self.path)
    }
}

impl fmt::Display for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Reference,
    UnderTest,
}

impl Side {
    pub fn as_str(self) -> &'static str {
        match self {
            Side::Reference => "reference",
            Side::UnderTest => "under-test",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaseOutcome {
    /// Both executables ran to completion.
    Compared(ComparisonOutcome),
    BuildFault(BuildFault),
    /// A built executable could not be launched.
    RunFault { side: Side, message: String },
    TimeoutFault { side: Side, limit: Duration },
}

impl CaseOutcome {
    pub fn is_match(&self) -> bool {
        matches!(self, CaseOutcome::Compared(ComparisonOutcome::Match))
    }

    pub fn status(&self) -> &'static str {
        match self {
            CaseOutcome::Compared(ComparisonOutcome::Match) => "match",
            CaseOutcome::Compared(ComparisonOutcome::ExitCodeMismatch { .. }) => "exit_mismatch",
            CaseOutcome::Compared(ComparisonOutcome::OutputMismatch { .. }) => "output_mismatch",
            CaseOutcome::BuildFault(_) => "build_fault",
            CaseOutcome::RunFault { .. } => "run_fault",
            CaseOutcome::TimeoutFault { .. } => "timeout",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CaseResult {
    pub case: TestCase,
    pub outcome: CaseOutcome,
    pub reference: Option<ExecutionResult>,
    pub under_test: Option<ExecutionResult>,
}

/// Directory name for a case's artifacts: readable, and unique per identifier.
pub fn artifact_dir_name(id: &str) -> String {
    let readable: String = id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    let mut hasher = Sha256::new();
    hasher.update(id.as_bytes());
    let hex = hex_lower(&hasher.finalize());
    format!("{readable}-{}", &hex[..12])
}

/// Build, run and compare one test case.
///
/// Faults of the compilers or of the built programs are part of the returned
/// outcome; `Err` is reserved for harness-side failures such as an unusable
/// artifact directory.
pub fn run_case(config: &RunConfig, case: TestCase) -> Result<CaseResult> {
    let dir = config.case_dir(&case);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("create artifact dir: {}", dir.display()))?;
    let dir = std::fs::canonicalize(&dir)
        .with_context(|| format!("canonicalize artifact dir: {}", dir.display()))?;
    let paths = ArtifactPaths::in_dir(&dir);

    let result = build_and_run(config, case, &paths);

    if !config.keep_artifacts {
        let _ = std::fs::remove_dir_all(&dir);
    }

    tracing::info!(case = case.id(), status = result.outcome.status(), "case finished");
    Ok(result)
}

fn build_and_run(config: &RunConfig, case: TestCase, paths: &ArtifactPaths) -> CaseResult {
    let mut result = CaseResult {
        case,
        outcome: CaseOutcome::Compared(ComparisonOutcome::Match),
        reference: None,
        under_test: None,
    };

    let artifacts = match build_case(&config.toolchain, &config.tests_dir, case.source(), paths) {
        Ok(artifacts) => artifacts,
        Err(fault) => {
            result.outcome = CaseOutcome::BuildFault(fault);
            return result;
        }
    };

    let reference = match run_side(
        &config.runner,
        Side::Reference,
        &artifacts.reference_exe,
        &paths.dir,
    ) {
        Ok(r) => r,
        Err(outcome) => {
            result.outcome = outcome;
            return result;
        }
    };
    result.reference = Some(reference.clone());

    let under_test = match run_side(
        &config.runner,
        Side::UnderTest,
        &artifacts.under_test_exe,
        &paths.dir,
    ) {
        Ok(r) => r,
        Err(outcome) => {
            result.outcome = outcome;
            return result;
        }
    };
    result.under_test = Some(under_test.clone());

    result.outcome = CaseOutcome::Compared(compare(&reference, &under_test));
    result
}

fn run_side(
    config: &RunnerConfig,
    side: Side,
    exe: &Path,
    cwd: &Path,
) -> Result<ExecutionResult, CaseOutcome> {
    match run_artifact_file(config, exe, cwd) {
        Ok(Execution::Finished(r)) => Ok(r),
        Ok(Execution::TimedOut { limit }) => Err(CaseOutcome::TimeoutFault { side, limit }),
        Err(err) => Err(CaseOutcome::RunFault {
            side,
            message: format!("{err:#}"),
        }),
    }
}

fn hex_lower(bytes: &[u8]) -> String {
    const LUT: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for &b in bytes {
        out.push(LUT[(b >> 4) as usize] as char);
        out.push(LUT[(b & 0x0F) as usize] as char);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_is_the_leading_component() {
        assert_eq!(TestCase::new("loop/fib.c").category(), "loop");
        assert_eq!(TestCase::new("call/variadic_hello.c").category(), "call");
        assert_eq!(TestCase::new("answer.c").category(), "uncategorized");
    }

    #[test]
    fn artifact_dir_name_is_filesystem_safe() {
        let name = artifact_dir_name("loop/fib.c");
        assert!(name.starts_with("loop_fib_c-"), "name={name}");
        assert_eq!(name.len(), "loop_fib_c-".len() + 12);
        assert!(!name.contains('/'));
    }

    #[test]
    fn artifact_dir_names_differ_when_sanitized_forms_collide() {
        let a = artifact_dir_name("loop/fib.c");
        let b = artifact_dir_name("loop_fib.c");
        assert_ne!(a, b);
    }

    #[test]
    fn outcome_status_strings() {
        let fault = CaseOutcome::TimeoutFault {
            side: Side::UnderTest,
            limit: Duration::from_secs(1),
        };
        assert_eq!(fault.status(), "timeout");
        assert!(!fault.is_match());
        assert!(CaseOutcome::Compared(ComparisonOutcome::Match).is_match());
    }
}
