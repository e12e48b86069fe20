//! Per-macro expectations and the requirement they impose under a standard.

use serde::{Deserialize, Serialize};

use crate::overrides::Implementation;
use crate::standard::Standard;

/// A later revision that raises the mandated value of a macro.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueRevision {
    pub standard: Standard,
    pub value: i64,
}

/// Expected exposure of one feature-test macro by one header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroExpectation {
    /// Macro name, e.g. `__cpp_lib_apply`.
    pub name: String,
    /// First standard in which the macro must be defined.
    pub introduced_in: Standard,
    /// Value mandated from `introduced_in` onward.
    pub expected_value: i64,
    /// The implementation under test deliberately never defines this macro.
    #[serde(default)]
    pub suppressed_by_implementation: bool,
    /// Later standards that mandate a different value.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub revisions: Vec<ValueRevision>,
}

/// What a single expectation demands under a given standard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Requirement {
    /// The standard in effect predates the macro.
    UndefinedBefore { introduced_in: Standard },
    /// The implementation suppresses the macro regardless of standard.
    UndefinedSuppressed { implementation: Implementation },
    /// The macro must be defined with exactly this value.
    Defined { value: i64 },
}

impl Requirement {
    /// Whether this requirement expects the macro to be present.
    #[must_use]
    pub const fn expects_defined(self) -> bool {
        matches!(self, Self::Defined { .. })
    }
}

impl MacroExpectation {
    /// Build an expectation without revisions or suppression.
    #[must_use]
    pub fn new(name: impl Into<String>, introduced_in: Standard, expected_value: i64) -> Self {
        Self {
            name: name.into(),
            introduced_in,
            expected_value,
            suppressed_by_implementation: false,
            revisions: Vec::new(),
        }
    }

    /// Mark the expectation as suppressed by the implementation.
    #[must_use]
    pub fn suppressed(mut self) -> Self {
        self.suppressed_by_implementation = true;
        self
    }

    /// Add a later value revision.
    #[must_use]
    pub fn with_revision(mut self, standard: Standard, value: i64) -> Self {
        self.revisions.push(ValueRevision { standard, value });
        self
    }

    /// Value mandated under `standard`, ignoring whether the macro is required there.
    #[must_use]
    pub fn value_at(&self, standard: Standard) -> i64 {
        self.revisions
            .iter()
            .filter(|rev| rev.standard <= standard)
            .max_by_key(|rev| rev.standard)
            .map_or(self.expected_value, |rev| rev.value)
    }

    /// Whether the generic standard rules require the macro under `standard`.
    #[must_use]
    pub fn required_by_standard(&self, standard: Standard) -> bool {
        standard >= self.introduced_in
    }

    /// Resolve the requirement under `standard` for `implementation`.
    ///
    /// Suppression wins over the standard rule; otherwise the macro is
    /// undefined before `introduced_in` and pinned to [`Self::value_at`] after.
    #[must_use]
    pub fn requirement(&self, standard: Standard, implementation: Implementation) -> Requirement {
        if self.suppressed_by_implementation {
            Requirement::UndefinedSuppressed { implementation }
        } else if !self.required_by_standard(standard) {
            Requirement::UndefinedBefore {
                introduced_in: self.introduced_in,
            }
        } else {
            Requirement::Defined {
                value: self.value_at(standard),
            }
        }
    }
}
