//! Differential build/run/compare machinery for the ancl C compiler.
//!
//! Every test case is compiled twice: directly by the reference toolchain, and by
//! ancl (source to assembly) followed by the reference toolchain (assembly to
//! executable). Both executables are run and their exit status and stdout compared.

use std::path::{Path, PathBuf};

pub mod case;
pub mod compare;
pub mod exec;
pub mod pipeline;
pub mod toolchain;

pub use case::{artifact_dir_name, run_case, CaseOutcome, CaseResult, Side, TestCase};
pub use compare::{compare, ComparisonOutcome};
pub use exec::{run_artifact_file, Execution, ExecutionResult, RunnerConfig};
pub use pipeline::{build_case, ArtifactPaths, BuildArtifacts, BuildFault, BuildStage};
pub use toolchain::{AsmSyntax, ToolchainConfig, ToolchainOutput};

/// Process-wide configuration, fixed before the first test case runs.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub toolchain: ToolchainConfig,
    pub runner: RunnerConfig,
    /// Root the test-case paths are relative to. Compilers run with this as their
    /// working directory so `#include "include/std.h"` resolves the same way for both.
    pub tests_dir: PathBuf,
    /// Parent of the per-case artifact directories.
    pub artifact_root: PathBuf,
    pub keep_artifacts: bool,
}

impl RunConfig {
    pub fn case_dir(&self, case: &TestCase) -> PathBuf {
        self.artifact_root.join(artifact_dir_name(case.id()))
    }
}

/// Make a program path usable after the child's working directory changes.
///
/// Bare names (`clang`) are left alone so they are still looked up on `PATH`.
pub fn resolve_program(program: &Path) -> PathBuf {
    if program.components().count() <= 1 {
        return program.to_path_buf();
    }
    std::path::absolute(program).unwrap_or_else(|_| program.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_program_keeps_bare_names() {
        assert_eq!(resolve_program(Path::new("clang")), PathBuf::from("clang"));
    }

    #[test]
    fn resolve_program_absolutizes_relative_paths() {
        let resolved = resolve_program(Path::new("build/src/ancl-cli"));
        assert!(resolved.is_absolute(), "resolved={}", resolved.display());
        assert!(resolved.ends_with("build/src/ancl-cli"));
    }
}
