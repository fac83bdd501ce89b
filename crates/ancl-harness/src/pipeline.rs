use std::ffi::OsString;
use std::fmt;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use crate::toolchain::{self, ToolchainConfig};

pub const REFERENCE_EXE_FILE: &str = "clang.out";
pub const ANCL_ASM_FILE: &str = "ancl.s";
pub const ANCL_EXE_FILE: &str = "ancl.out";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStage {
    /// Reference compiler, source to executable.
    ReferenceCompile,
    /// ancl, source to assembly.
    UnderTestCompile,
    /// Reference compiler, ancl's assembly to executable.
    Assemble,
}

impl BuildStage {
    pub fn as_str(self) -> &'static str {
        match self {
            BuildStage::ReferenceCompile => "reference-compile",
            BuildStage::UnderTestCompile => "under-test-compile",
            BuildStage::Assemble => "assemble",
        }
    }
}

impl fmt::Display for BuildStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A compiler invocation that did not produce its declared artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildFault {
    pub stage: BuildStage,
    /// `None` when the compiler could not be launched at all.
    pub exit_status: Option<i32>,
    pub diagnostics: String,
}

/// Where one test case's artifacts live.
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub dir: PathBuf,
    pub reference_exe: PathBuf,
    pub asm: PathBuf,
    pub under_test_exe: PathBuf,
}

impl ArtifactPaths {
    pub fn in_dir(dir: &Path) -> Self {
        ArtifactPaths {
            dir: dir.to_path_buf(),
            reference_exe: dir.join(REFERENCE_EXE_FILE),
            asm: dir.join(ANCL_ASM_FILE),
            under_test_exe: dir.join(ANCL_EXE_FILE),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BuildArtifacts {
    pub reference_exe: PathBuf,
    pub under_test_exe: PathBuf,
}

/// Build the reference and the under-test executable for one source file.
///
/// `source` is relative to `tests_dir`, which is also the compilers' working
/// directory and the reference include path. Stages run in a fixed order and the
/// first failing stage ends the build.
pub fn build_case(
    config: &ToolchainConfig,
    tests_dir: &Path,
    source: &Path,
    paths: &ArtifactPaths,
) -> Result<BuildArtifacts, BuildFault> {
    run_stage(
        BuildStage::ReferenceCompile,
        &config.reference_cc,
        &toolchain::reference_compile_args(source, &paths.reference_exe, Path::new(".")),
        tests_dir,
        &paths.reference_exe,
        false,
    )?;

    run_stage(
        BuildStage::UnderTestCompile,
        &config.ancl,
        &toolchain::ancl_compile_args(config, source, &paths.asm),
        tests_dir,
        &paths.asm,
        true,
    )?;

    run_stage(
        BuildStage::Assemble,
        &config.reference_cc,
        &toolchain::assemble_args(&paths.asm, &paths.under_test_exe),
        tests_dir,
        &paths.under_test_exe,
        false,
    )?;

    Ok(BuildArtifacts {
        reference_exe: paths.reference_exe.clone(),
        under_test_exe: paths.under_test_exe.clone(),
    })
}

fn run_stage(
    stage: BuildStage,
    program: &Path,
    args: &[OsString],
    cwd: &Path,
    artifact: &Path,
    discard_stdout: bool,
) -> Result<(), BuildFault> {
    // A leftover from a kept earlier run must not pass for this run's output.
    let _ = std::fs::remove_file(artifact);

    let out = toolchain::invoke(program, args, cwd, discard_stdout).map_err(|err| BuildFault {
        stage,
        exit_status: None,
        diagnostics: format!("{err:#}"),
    })?;

    if !out.ok {
        return Err(BuildFault {
            stage,
            exit_status: Some(out.exit_status),
            diagnostics: String::from_utf8_lossy(&out.stderr).into_owned(),
        });
    }
    if !out.stderr.is_empty() {
        // Warnings of a successful compile are passed through, not judged.
        let _ = std::io::stderr().write_all(&out.stderr);
    }
    if !artifact.is_file() {
        return Err(BuildFault {
            stage,
            exit_status: Some(out.exit_status),
            diagnostics: format!(
                "{} exited successfully but did not write {}",
                program.display(),
                artifact.display()
            ),
        });
    }
    Ok(())
}
