//! Compliance harness for feature-test macros.
//!
//! This crate provides:
//! - Macro sources: pre-recorded `-dM` dumps, live compiler probes, in-memory tables
//! - Matrix runner: checks every (header, standard) unit against the catalog
//! - Verification summary and markdown/JSON reports with per-header rollup
//! - Structured JSONL logging with an artifact index for report outputs

#![forbid(unsafe_code)]

pub mod report;
pub mod runner;
pub mod source;
pub mod structured_log;
pub mod verify;

pub use report::{HeaderMatrixRow, MatrixReport};
pub use runner::MatrixRunner;
pub use source::{DumpDirSource, MacroSource, ProbeSource, SourceError, StaticSource};
pub use verify::{UnitResult, UnitStatus, VerificationSummary};
