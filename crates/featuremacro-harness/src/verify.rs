//! Per-unit results and their aggregate.

use serde::{Deserialize, Serialize};

use featuremacro_core::{Implementation, Standard, Violation};

/// Status of one (header, standard) unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitStatus {
    Pass,
    Fail,
    /// The macro table could not be obtained.
    Error,
}

impl UnitStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
            Self::Error => "ERROR",
        }
    }
}

/// Result of checking a single unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitResult {
    pub header: String,
    pub standard: Standard,
    /// Unknown when the table could not be read.
    pub implementation: Option<Implementation>,
    pub status: UnitStatus,
    /// Number of expectations evaluated.
    pub checked: usize,
    pub violations: Vec<Violation>,
    pub error: Option<String>,
}

impl UnitResult {
    #[must_use]
    pub fn passed(&self) -> bool {
        self.status == UnitStatus::Pass
    }
}

/// Aggregate verification summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    pub results: Vec<UnitResult>,
}

impl VerificationSummary {
    /// Build a summary from a list of results.
    #[must_use]
    pub fn from_results(results: Vec<UnitResult>) -> Self {
        let total = results.len();
        let passed = results.iter().filter(|r| r.status == UnitStatus::Pass).count();
        let errors = results.iter().filter(|r| r.status == UnitStatus::Error).count();
        Self {
            total,
            passed,
            failed: total - passed - errors,
            errors,
            results,
        }
    }

    /// Returns true if every unit passed.
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failed == 0 && self.errors == 0
    }

    /// Total violations across all units.
    #[must_use]
    pub fn violation_count(&self) -> usize {
        self.results.iter().map(|r| r.violations.len()).sum()
    }
}
