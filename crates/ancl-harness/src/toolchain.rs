use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{Context, Result};
use clap::ValueEnum;

use crate::exec::exit_status_of;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
#[clap(rename_all = "kebab_case")]
pub enum AsmSyntax {
    #[default]
    Intel,
    Gas,
}

impl AsmSyntax {
    fn output_flag(self) -> &'static str {
        match self {
            AsmSyntax::Intel => "-n",
            AsmSyntax::Gas => "-g",
        }
    }
}

/// The two compilers and the ancl flags applied to every test case.
#[derive(Debug, Clone)]
pub struct ToolchainConfig {
    pub reference_cc: PathBuf,
    pub ancl: PathBuf,
    pub optimize: bool,
    pub asm_syntax: AsmSyntax,
    pub linear_scan: bool,
}

#[derive(Debug, Clone)]
pub struct ToolchainOutput {
    pub ok: bool,
    pub exit_status: i32,
    pub stderr: Vec<u8>,
}

/// `cc <source> -o<exe> -I<include_dir>`
pub fn reference_compile_args(source: &Path, exe_out: &Path, include_dir: &Path) -> Vec<OsString> {
    vec![
        source.as_os_str().to_os_string(),
        joined_flag("-o", exe_out.as_os_str()),
        joined_flag("-I", include_dir.as_os_str()),
    ]
}

/// `ancl-cli -f<source> -n<asm> [-O] [--linscan]`
pub fn ancl_compile_args(config: &ToolchainConfig, source: &Path, asm_out: &Path) -> Vec<OsString> {
    let mut args = vec![
        joined_flag("-f", source.as_os_str()),
        joined_flag(config.asm_syntax.output_flag(), asm_out.as_os_str()),
    ];
    if config.optimize {
        args.push(OsString::from("-O"));
    }
    if config.linear_scan {
        args.push(OsString::from("--linscan"));
    }
    args
}

/// `cc <asm> -o<exe>`
pub fn assemble_args(asm: &Path, exe_out: &Path) -> Vec<OsString> {
    vec![
        asm.as_os_str().to_os_string(),
        joined_flag("-o", exe_out.as_os_str()),
    ]
}

fn joined_flag(flag: &str, value: &OsStr) -> OsString {
    let mut out = OsString::from(flag);
    out.push(value);
    out
}

/// Run a compiler to completion in `cwd`.
///
/// A nonzero exit is reported through `ToolchainOutput::ok`; only a failure to
/// launch the process is an `Err`. Stderr is captured as diagnostics. Stdout is
/// inherited, or sent to the null device with `discard_stdout`.
pub fn invoke(
    program: &Path,
    args: &[OsString],
    cwd: &Path,
    discard_stdout: bool,
) -> Result<ToolchainOutput> {
    let mut cmd = Command::new(program);
    cmd.args(args);
    cmd.current_dir(cwd);
    cmd.stdin(Stdio::null());
    cmd.stdout(if discard_stdout {
        Stdio::null()
    } else {
        Stdio::inherit()
    });

    tracing::debug!(program = %program.display(), ?args, cwd = %cwd.display(), "invoke compiler");
    let out = cmd
        .output()
        .with_context(|| format!("invoke compiler: {}", program.display()))?;
    let (exit_status, _) = exit_status_of(out.status);
    tracing::debug!(program = %program.display(), exit_status, "compiler finished");

    Ok(ToolchainOutput {
        ok: out.status.success(),
        exit_status,
        stderr: out.stderr,
    })
}
