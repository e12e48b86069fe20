//! The compliance checker.
//!
//! For one header and one active standard, every expectation resolves to a
//! requirement (undefined, or defined with an exact value) and is compared
//! against the macro table the compiler produced. All violations of a unit
//! are collected; any violation fails the unit.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::HeaderExpectations;
use crate::expectation::{MacroExpectation, Requirement};
use crate::macro_table::MacroTable;
use crate::overrides::Implementation;
use crate::standard::Standard;

/// Why a macro was required to be absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AbsenceReason {
    Before { introduced_in: Standard },
    Unimplemented { implementation: Implementation },
}

impl fmt::Display for AbsenceReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Before { introduced_in } => write!(f, "before {introduced_in}"),
            Self::Unimplemented { implementation } => write!(
                f,
                "because it is unimplemented in {}!",
                implementation.display_name()
            ),
        }
    }
}

/// A single failed expectation.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Violation {
    #[error("{name} should be defined in {standard}, but it is not defined")]
    MissingMacro {
        name: String,
        standard: Standard,
        expected_value: i64,
    },
    #[error("{name} should not be defined {reason}, but it is defined as `{observed}` in {standard}")]
    UnexpectedMacro {
        name: String,
        standard: Standard,
        reason: AbsenceReason,
        observed: String,
    },
    #[error("{name} should have the value {expected}L in {standard}, but it is `{observed}`")]
    WrongValue {
        name: String,
        standard: Standard,
        expected: i64,
        observed: String,
    },
}

/// Violation taxonomy without payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViolationKind {
    MissingMacro,
    UnexpectedMacro,
    WrongValue,
}

impl ViolationKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MissingMacro => "MissingMacro",
            Self::UnexpectedMacro => "UnexpectedMacro",
            Self::WrongValue => "WrongValue",
        }
    }
}

impl Violation {
    #[must_use]
    pub const fn kind(&self) -> ViolationKind {
        match self {
            Self::MissingMacro { .. } => ViolationKind::MissingMacro,
            Self::UnexpectedMacro { .. } => ViolationKind::UnexpectedMacro,
            Self::WrongValue { .. } => ViolationKind::WrongValue,
        }
    }

    #[must_use]
    pub fn macro_name(&self) -> &str {
        match self {
            Self::MissingMacro { name, .. }
            | Self::UnexpectedMacro { name, .. }
            | Self::WrongValue { name, .. } => name,
        }
    }
}

/// What the compiler actually exposed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Observed {
    Undefined,
    Defined { text: String, value: Option<i64> },
}

impl Observed {
    fn from_table(table: &MacroTable, name: &str) -> Self {
        match table.get(name) {
            None => Self::Undefined,
            Some(value) => Self::Defined {
                text: value.text.clone(),
                value: value.as_integer(),
            },
        }
    }
}

/// Outcome for one expectation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroVerdict {
    pub name: String,
    pub requirement: Requirement,
    pub observed: Observed,
    pub violation: Option<Violation>,
}

/// All verdicts for one (header, standard) unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckReport {
    pub header: String,
    pub standard: Standard,
    pub implementation: Implementation,
    pub verdicts: Vec<MacroVerdict>,
}

impl CheckReport {
    pub fn violations(&self) -> impl Iterator<Item = &Violation> {
        self.verdicts.iter().filter_map(|v| v.violation.as_ref())
    }

    #[must_use]
    pub fn passed(&self) -> bool {
        self.verdicts.iter().all(|v| v.violation.is_none())
    }
}

/// A failed unit: the analogue of a compilation stopped by `#error`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("<{header}> under {standard} ({implementation}): {}", render_violations(.violations))]
pub struct CheckFailure {
    pub header: String,
    pub standard: Standard,
    pub implementation: Implementation,
    pub violations: Vec<Violation>,
}

fn render_violations(violations: &[Violation]) -> String {
    let lines: Vec<String> = violations.iter().map(|v| format!("\n  error: {v}")).collect();
    format!("{} violation(s){}", violations.len(), lines.concat())
}

/// Checks one header's expectations against macro tables.
#[derive(Debug, Clone)]
pub struct Checker {
    expectations: HeaderExpectations,
}

impl Checker {
    #[must_use]
    pub const fn new(expectations: HeaderExpectations) -> Self {
        Self { expectations }
    }

    #[must_use]
    pub const fn expectations(&self) -> &HeaderExpectations {
        &self.expectations
    }

    /// Produce a verdict for every expectation without failing.
    #[must_use]
    pub fn evaluate(&self, standard: Standard, table: &MacroTable) -> CheckReport {
        let implementation = self.expectations.implementation;
        let verdicts = self
            .expectations
            .expectations
            .iter()
            .map(|exp| verdict(exp, standard, implementation, table))
            .collect();
        CheckReport {
            header: self.expectations.header.clone(),
            standard,
            implementation,
            verdicts,
        }
    }

    /// Check every expectation; any violation fails the unit.
    pub fn check(&self, standard: Standard, table: &MacroTable) -> Result<CheckReport, CheckFailure> {
        let report = self.evaluate(standard, table);
        if report.passed() {
            return Ok(report);
        }
        Err(CheckFailure {
            header: report.header.clone(),
            standard,
            implementation: report.implementation,
            violations: report.violations().cloned().collect(),
        })
    }
}

fn verdict(
    exp: &MacroExpectation,
    standard: Standard,
    implementation: Implementation,
    table: &MacroTable,
) -> MacroVerdict {
    let requirement = exp.requirement(standard, implementation);
    let observed = Observed::from_table(table, &exp.name);
    let violation = violation_for(&exp.name, standard, requirement, &observed);
    MacroVerdict {
        name: exp.name.clone(),
        requirement,
        observed,
        violation,
    }
}

fn violation_for(
    name: &str,
    standard: Standard,
    requirement: Requirement,
    observed: &Observed,
) -> Option<Violation> {
    match (requirement, observed) {
        (
            Requirement::UndefinedBefore { .. } | Requirement::UndefinedSuppressed { .. },
            Observed::Undefined,
        ) => None,
        (Requirement::UndefinedBefore { introduced_in }, Observed::Defined { text, .. }) => {
            Some(Violation::UnexpectedMacro {
                name: name.to_string(),
                standard,
                reason: AbsenceReason::Before { introduced_in },
                observed: text.clone(),
            })
        }
        (Requirement::UndefinedSuppressed { implementation }, Observed::Defined { text, .. }) => {
            Some(Violation::UnexpectedMacro {
                name: name.to_string(),
                standard,
                reason: AbsenceReason::Unimplemented { implementation },
                observed: text.clone(),
            })
        }
        (Requirement::Defined { value }, Observed::Undefined) => Some(Violation::MissingMacro {
            name: name.to_string(),
            standard,
            expected_value: value,
        }),
        (Requirement::Defined { value }, Observed::Defined { text, value: actual }) => {
            (*actual != Some(value)).then(|| Violation::WrongValue {
                name: name.to_string(),
                standard,
                expected: value,
                observed: text.clone(),
            })
        }
    }
}
