use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use ancl_harness::{
    resolve_program, run_case, AsmSyntax, RunConfig, RunnerConfig, TestCase, ToolchainConfig,
};
use anyhow::{Context, Result};
use clap::Parser;

mod registry;
mod report;
mod reporter;
mod util;

use report::{DifftestReport, Summary, TestCaseReport};
use reporter::ColorArg;

#[derive(Parser, Debug)]
#[command(name = "ancl-difftest")]
#[command(about = "Differential tests for the ancl C compiler.", long_about = None)]
#[command(version)]
struct Cli {
    /// Directory the registered test programs live in.
    #[arg(long, value_name = "DIR", default_value = "conformance")]
    tests_dir: PathBuf,

    #[arg(long, value_name = "PATH", env = "ANCL_REFERENCE_CC", default_value = "clang")]
    reference_cc: PathBuf,

    /// The compiler under test.
    #[arg(long, value_name = "PATH", env = "ANCL_COMPILER", default_value = "build/src/ancl-cli")]
    ancl: PathBuf,

    /// Pass `-O` to ancl.
    #[arg(long)]
    optimize: bool,

    #[arg(long, value_enum, default_value_t = AsmSyntax::Intel)]
    asm_syntax: AsmSyntax,

    /// Use ancl's linear-scan register allocator.
    #[arg(long)]
    linscan: bool,

    #[arg(long, value_name = "DIR", default_value = "target/ancl-difftest")]
    artifact_dir: PathBuf,

    #[arg(long)]
    keep_artifacts: bool,

    /// Wall-clock limit per executed test program; 0 disables it.
    #[arg(long, value_name = "N", default_value_t = 10)]
    timeout_secs: u64,

    #[arg(long, value_name = "SUBSTR")]
    filter: Option<String>,

    #[arg(long)]
    exact: bool,

    #[arg(long)]
    list: bool,

    #[arg(long)]
    verbose: bool,

    #[arg(long, value_enum, default_value_t = ColorArg::Auto)]
    color: ColorArg,

    #[arg(long, value_name = "PATH")]
    report_out: Option<PathBuf>,
}

fn main() -> ExitCode {
    match try_main() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::from(2)
        }
    }
}

fn try_main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing();

    let cases: Vec<TestCase> = registry::select(cli.filter.as_deref(), cli.exact).collect();

    if cli.list {
        for case in &cases {
            println!("{}\t{}", case.id(), case.category());
        }
        return Ok(ExitCode::SUCCESS);
    }

    let config = run_config(&cli)?;
    tracing::debug!(?config, "resolved run configuration");

    if cli.verbose {
        eprintln!(
            "ancl-difftest: {} tests (ancl={}, optimize={})",
            cases.len(),
            config.toolchain.ancl.display(),
            config.toolchain.optimize
        );
    }

    let started = Instant::now();
    let mut reporter = reporter::stdout_reporter(cli.color);
    let mut summary = Summary::default();
    let mut tests = Vec::with_capacity(cases.len());

    for case in cases {
        if cli.verbose {
            eprintln!("test: {}", case.id());
        }
        let case_started = Instant::now();
        let result = run_case(&config, case)?;
        reporter.case(&result).context("write verdict")?;
        summary.record(&result.outcome);
        tests.push(TestCaseReport::from_result(&result, case_started.elapsed()));
    }

    summary.duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    reporter.summary(&summary).context("write summary")?;

    let exit_code = summary.exit_code();
    if let Some(out_path) = &cli.report_out {
        let report = DifftestReport::new(&config, tests, summary);
        write_report(out_path, &report)?;
    }
    Ok(ExitCode::from(exit_code))
}

fn run_config(cli: &Cli) -> Result<RunConfig> {
    let tests_dir = util::resolve_existing_path_upwards(&cli.tests_dir);
    if !tests_dir.is_dir() {
        anyhow::bail!(
            "tests dir not found: {} (pass --tests-dir <dir>)",
            cli.tests_dir.display()
        );
    }
    let tests_dir = std::fs::canonicalize(&tests_dir)
        .with_context(|| format!("canonicalize tests dir: {}", tests_dir.display()))?;

    let artifact_root = std::path::absolute(&cli.artifact_dir)
        .with_context(|| format!("resolve artifact dir: {}", cli.artifact_dir.display()))?;

    let wall_timeout = match cli.timeout_secs {
        0 => None,
        secs => Some(Duration::from_secs(secs)),
    };

    Ok(RunConfig {
        toolchain: ToolchainConfig {
            reference_cc: locate_compiler(&cli.reference_cc),
            ancl: locate_compiler(&cli.ancl),
            optimize: cli.optimize,
            asm_syntax: cli.asm_syntax,
            linear_scan: cli.linscan,
        },
        runner: RunnerConfig { wall_timeout },
        tests_dir,
        artifact_root,
        keep_artifacts: cli.keep_artifacts,
    })
}

/// Bare names stay `PATH` lookups; relative paths are searched for upwards.
fn locate_compiler(program: &Path) -> PathBuf {
    if program.components().count() <= 1 {
        return program.to_path_buf();
    }
    resolve_program(&util::resolve_existing_path_upwards(program))
}

fn write_report(out_path: &Path, report: &DifftestReport) -> Result<()> {
    let json = serde_json::to_string(report)? + "\n";
    if let Some(parent) = out_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create report dir: {}", parent.display()))?;
        }
    }
    std::fs::write(out_path, json.as_bytes())
        .with_context(|| format!("write report: {}", out_path.display()))?;
    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    // Verdicts own stdout; diagnostics only when asked for.
    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_level(true),
            )
            .with(EnvFilter::from_default_env())
            .init();
    }
}
