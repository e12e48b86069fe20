//! Implementation-specific suppressions layered over the generic catalog.
//!
//! The catalog states what the standard mandates. Some implementations
//! deliberately omit macros whose feature they do not ship; those omissions
//! live here as data instead of as one-off guards per test.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::macro_table::MacroTable;

/// Standard library implementation whose headers are under test.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Implementation {
    /// Pure standard rules, no suppressions.
    #[default]
    Generic,
    /// NVIDIA libcu++ (`<cuda/std/...>`).
    Libcudacxx,
}

impl Implementation {
    pub const ALL: [Self; 2] = [Self::Generic, Self::Libcudacxx];

    /// Parse with loose casing and common aliases.
    #[must_use]
    pub fn from_str_loose(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "generic" | "standard" | "iso" => Some(Self::Generic),
            "libcudacxx" | "libcu++" | "libcupp" | "cuda" => Some(Self::Libcudacxx),
            _ => None,
        }
    }

    /// Stable identifier used in reports and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Generic => "generic",
            Self::Libcudacxx => "libcudacxx",
        }
    }

    /// Human-readable name used in diagnostics.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Generic => "the standard library",
            Self::Libcudacxx => "libcu++",
        }
    }

    /// Name of the library whose generated tests this implementation inherits.
    #[must_use]
    pub const fn upstream_name(self) -> &'static str {
        match self {
            Self::Generic => "the standard library",
            Self::Libcudacxx => "libc++",
        }
    }

    /// Version symbol every header of this implementation defines.
    #[must_use]
    pub const fn version_macro(self) -> Option<&'static str> {
        match self {
            Self::Generic => None,
            Self::Libcudacxx => Some("_LIBCUDACXX_VERSION"),
        }
    }

    /// Identify the implementation from the macros a header exposes.
    #[must_use]
    pub fn detect(table: &MacroTable) -> Self {
        Self::ALL
            .into_iter()
            .find(|imp| imp.version_macro().is_some_and(|sym| table.is_defined(sym)))
            .unwrap_or(Self::Generic)
    }
}

impl fmt::Display for Implementation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One deliberate omission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suppression {
    pub implementation: Implementation,
    pub name: String,
    pub reason: String,
}

/// Set of suppressions keyed by (implementation, macro name).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverrideTable {
    entries: BTreeMap<(Implementation, String), String>,
}

impl OverrideTable {
    /// An empty table: every implementation follows the standard.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Suppressions shipped with the checker.
    #[must_use]
    pub fn builtin() -> Self {
        let mut table = Self::new();
        for (name, reason) in [
            ("__cpp_lib_bind_front", "std::bind_front is not implemented"),
            (
                "__cpp_lib_boyer_moore_searcher",
                "boyer_moore searchers are not implemented",
            ),
            (
                "__cpp_lib_constexpr_misc",
                "constexpr additions from P1032 are not implemented",
            ),
            ("__cpp_lib_to_chars", "<charconv> is not implemented"),
        ] {
            table.suppress(Implementation::Libcudacxx, name, reason);
        }
        table
    }

    /// Record that `implementation` never defines `name`.
    pub fn suppress(
        &mut self,
        implementation: Implementation,
        name: impl Into<String>,
        reason: impl Into<String>,
    ) -> &mut Self {
        self.entries
            .insert((implementation, name.into()), reason.into());
        self
    }

    /// Whether `implementation` suppresses `name`.
    #[must_use]
    pub fn is_suppressed(&self, implementation: Implementation, name: &str) -> bool {
        self.entries.contains_key(&(implementation, name.to_string()))
    }

    /// Reason recorded for a suppression.
    #[must_use]
    pub fn reason(&self, implementation: Implementation, name: &str) -> Option<&str> {
        self.entries
            .get(&(implementation, name.to_string()))
            .map(String::as_str)
    }

    /// Flattened, ordered view for serialization.
    #[must_use]
    pub fn suppressions(&self) -> Vec<Suppression> {
        self.entries
            .iter()
            .map(|((implementation, name), reason)| Suppression {
                implementation: *implementation,
                name: name.clone(),
                reason: reason.clone(),
            })
            .collect()
    }

    /// Build from a flattened list; later duplicates replace earlier ones.
    #[must_use]
    pub fn from_suppressions(list: Vec<Suppression>) -> Self {
        let mut table = Self::new();
        for entry in list {
            table.suppress(entry.implementation, entry.name, entry.reason);
        }
        table
    }
}
