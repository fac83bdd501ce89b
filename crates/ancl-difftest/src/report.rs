use std::time::Duration;

use ancl_harness::{CaseOutcome, CaseResult, ComparisonOutcome, ExecutionResult, RunConfig};
use base64::Engine;

#[derive(Debug, Clone, serde::Serialize)]
pub struct DifftestReport {
    pub schema_version: String,
    pub tool: ToolInfo,
    pub config: ConfigInfo,
    pub summary: Summary,
    pub tests: Vec<TestCaseReport>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ToolInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ConfigInfo {
    pub reference_cc: String,
    pub ancl: String,
    pub tests_dir: String,
    pub optimize: bool,
    pub asm_syntax: String,
    pub linear_scan: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl ConfigInfo {
    pub fn from_run_config(config: &RunConfig) -> Self {
        let asm_syntax = match config.toolchain.asm_syntax {
            ancl_harness::AsmSyntax::Intel => "intel",
            ancl_harness::AsmSyntax::Gas => "gas",
        };
        ConfigInfo {
            reference_cc: config.toolchain.reference_cc.display().to_string(),
            ancl: config.toolchain.ancl.display().to_string(),
            tests_dir: config.tests_dir.display().to_string(),
            optimize: config.toolchain.optimize,
            asm_syntax: asm_syntax.to_string(),
            linear_scan: config.toolchain.linear_scan,
            timeout_ms: config.runner.wall_timeout.map(duration_ms),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct Summary {
    pub matched: u64,
    pub exit_mismatches: u64,
    pub output_mismatches: u64,
    pub build_faults: u64,
    pub run_faults: u64,
    pub timeouts: u64,
    pub duration_ms: u64,
}

impl Summary {
    pub fn record(&mut self, outcome: &CaseOutcome) {
        match outcome {
            CaseOutcome::Compared(ComparisonOutcome::Match) => self.matched += 1,
            CaseOutcome::Compared(ComparisonOutcome::ExitCodeMismatch { .. }) => {
                self.exit_mismatches += 1
            }
            CaseOutcome::Compared(ComparisonOutcome::OutputMismatch { .. }) => {
                self.output_mismatches += 1
            }
            CaseOutcome::BuildFault(_) => self.build_faults += 1,
            CaseOutcome::RunFault { .. } => self.run_faults += 1,
            CaseOutcome::TimeoutFault { .. } => self.timeouts += 1,
        }
    }

    /// Cases where both programs ran but disagreed.
    pub fn failed(&self) -> u64 {
        self.exit_mismatches + self.output_mismatches
    }

    /// Build faults win over run faults, which win over mismatches.
    pub fn exit_code(&self) -> u8 {
        if self.build_faults > 0 {
            return 11;
        }
        if self.run_faults > 0 || self.timeouts > 0 {
            return 12;
        }
        if self.failed() > 0 {
            return 10;
        }
        0
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct TestCaseReport {
    pub id: String,
    pub category: String,
    pub status: String,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_fault: Option<BuildFaultSection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fault: Option<FaultSection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<RunSection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub under_test: Option<RunSection>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct BuildFaultSection {
    pub stage: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    pub diagnostics: String,
}

/// A run-side fault: the program could not be launched or was killed on timeout.
#[derive(Debug, Clone, serde::Serialize)]
pub struct FaultSection {
    pub side: String,
    pub message: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct RunSection {
    pub exit_status: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_signal: Option<i32>,
    pub stdout_b64: String,
}

impl RunSection {
    fn from_execution(r: &ExecutionResult) -> Self {
        RunSection {
            exit_status: r.exit_status,
            exit_signal: r.exit_signal,
            stdout_b64: base64::engine::general_purpose::STANDARD.encode(&r.stdout),
        }
    }
}

impl TestCaseReport {
    pub fn from_result(result: &CaseResult, duration: Duration) -> Self {
        let build_fault = match &result.outcome {
            CaseOutcome::BuildFault(fault) => Some(BuildFaultSection {
                stage: fault.stage.as_str().to_string(),
                exit_code: fault.exit_status,
                diagnostics: fault.diagnostics.clone(),
            }),
            _ => None,
        };
        let fault = match &result.outcome {
            CaseOutcome::RunFault { side, message } => Some(FaultSection {
                side: side.as_str().to_string(),
                message: message.clone(),
            }),
            CaseOutcome::TimeoutFault { side, limit } => Some(FaultSection {
                side: side.as_str().to_string(),
                message: format!("killed after {}ms", duration_ms(*limit)),
            }),
            _ => None,
        };
        TestCaseReport {
            id: result.case.id().to_string(),
            category: result.case.category().to_string(),
            status: result.outcome.status().to_string(),
            duration_ms: duration_ms(duration),
            build_fault,
            fault,
            reference: result.reference.as_ref().map(RunSection::from_execution),
            under_test: result.under_test.as_ref().map(RunSection::from_execution),
        }
    }
}

impl DifftestReport {
    pub fn new(config: &RunConfig, tests: Vec<TestCaseReport>, summary: Summary) -> Self {
        DifftestReport {
            schema_version: ancl_contracts::ANCL_DIFFTEST_REPORT_SCHEMA_VERSION.to_string(),
            tool: ToolInfo {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            config: ConfigInfo::from_run_config(config),
            summary,
            tests,
        }
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
