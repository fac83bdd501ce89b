//! Shared, version-pinned protocol identifiers.
//!
//! These constants are the single source of truth for schema/version strings that
//! appear in machine-readable output of the differential-test harness.

pub const ANCL_DIFFTEST_REPORT_SCHEMA_VERSION: &str = "ancl.difftest.report@0.1.0";
