//! Console verdicts, one per case, in the classic `[ OK ]` / `[ FAILED ]` layout.

use std::io::{self, IsTerminal, Write};

use ancl_harness::{CaseOutcome, CaseResult, ComparisonOutcome, ExecutionResult};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::report::Summary;

const DELIMITER: &str = "===========================";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
#[clap(rename_all = "kebab_case")]
pub enum ColorArg {
    #[default]
    Auto,
    Always,
    Never,
}

/// `NO_COLOR` wins over the flag; `auto` colors only a terminal.
pub fn resolve_color_choice(arg: ColorArg) -> ColorChoice {
    if std::env::var_os("NO_COLOR").is_some() {
        return ColorChoice::Never;
    }
    match arg {
        ColorArg::Always => ColorChoice::Always,
        ColorArg::Never => ColorChoice::Never,
        ColorArg::Auto if io::stdout().is_terminal() => ColorChoice::Auto,
        ColorArg::Auto => ColorChoice::Never,
    }
}

pub fn stdout_reporter(arg: ColorArg) -> Reporter<StandardStream> {
    Reporter::new(StandardStream::stdout(resolve_color_choice(arg)))
}

pub struct Reporter<W> {
    out: W,
}

impl<W: WriteColor> Reporter<W> {
    pub fn new(out: W) -> Self {
        Reporter { out }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn case(&mut self, result: &CaseResult) -> io::Result<()> {
        let id = result.case.id();
        match &result.outcome {
            CaseOutcome::Compared(ComparisonOutcome::Match) => {
                self.tag("[ OK ]", Color::Green)?;
                writeln!(self.out, " {id}")?;
            }
            CaseOutcome::Compared(ComparisonOutcome::ExitCodeMismatch { expected, actual }) => {
                self.tag("[ FAILED ]", Color::Red)?;
                writeln!(
                    self.out,
                    " {id} ANCL={}, SYSTEM={}",
                    status_text(*actual, result.under_test.as_ref()),
                    status_text(*expected, result.reference.as_ref()),
                )?;
            }
            CaseOutcome::Compared(ComparisonOutcome::OutputMismatch { expected, actual }) => {
                self.tag("[ FAILED ]", Color::Red)?;
                writeln!(self.out, " {id}")?;
                writeln!(self.out, "{DELIMITER}")?;
                writeln!(self.out, "ANCL OUTPUT:")?;
                writeln!(self.out, "{}", String::from_utf8_lossy(actual))?;
                writeln!(self.out, "SYSTEM OUTPUT:")?;
                writeln!(self.out, "{}", String::from_utf8_lossy(expected))?;
                writeln!(self.out, "{DELIMITER}")?;
            }
            CaseOutcome::BuildFault(fault) => {
                self.tag("[ FAILED ]", Color::Red)?;
                match fault.exit_status {
                    Some(code) => writeln!(self.out, " {id} {} failed (exit={code})", fault.stage)?,
                    None => writeln!(self.out, " {id} {} failed", fault.stage)?,
                }
                writeln!(self.out, "{DELIMITER}")?;
                writeln!(self.out, "{}", fault.diagnostics.trim_end())?;
                writeln!(self.out, "{DELIMITER}")?;
            }
            CaseOutcome::RunFault { side, message } => {
                self.tag("[ FAILED ]", Color::Red)?;
                writeln!(self.out, " {id} {} run failed: {message}", side.as_str())?;
            }
            CaseOutcome::TimeoutFault { side, limit } => {
                self.tag("[ FAILED ]", Color::Red)?;
                writeln!(
                    self.out,
                    " {id} {} timed out after {}ms",
                    side.as_str(),
                    limit.as_millis()
                )?;
            }
        }
        self.out.flush()
    }

    /// Timeouts are counted with run faults on the console.
    pub fn summary(&mut self, summary: &Summary) -> io::Result<()> {
        writeln!(
            self.out,
            "summary: matched={} failed={} build_faults={} run_faults={} (exit={})",
            summary.matched,
            summary.failed(),
            summary.build_faults,
            summary.run_faults + summary.timeouts,
            summary.exit_code()
        )?;
        self.out.flush()
    }

    fn tag(&mut self, text: &str, color: Color) -> io::Result<()> {
        let mut spec = ColorSpec::new();
        spec.set_fg(Some(color));
        self.out.set_color(&spec)?;
        write!(self.out, "{text}")?;
        self.out.reset()
    }
}

fn status_text(status: i32, run: Option<&ExecutionResult>) -> String {
    match run.and_then(|r| r.exit_signal) {
        Some(signal) => format!("{status} (signal {signal})"),
        None => status.to_string(),
    }
}
