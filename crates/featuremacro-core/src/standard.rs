//! Language standard revisions used to gate feature-test macros.
//!
//! The ordering `Pre2014 < Cxx14 < Cxx17 < Cxx2a` is the version gate: an
//! expectation introduced in a revision is required for that revision and
//! every later one. `Cxx2a` covers everything after C++17.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Active language standard of a compilation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Standard {
    /// C++03 and C++11 (`TEST_STD_VER < 2014`).
    #[serde(rename = "pre-c++14", alias = "c++11", alias = "c++03")]
    Pre2014,
    #[serde(rename = "c++14")]
    Cxx14,
    #[serde(rename = "c++17")]
    Cxx17,
    /// Every revision after C++17.
    #[serde(rename = "c++2a", alias = "c++20")]
    Cxx2a,
}

impl Standard {
    /// All gates in ascending order.
    pub const ALL: [Self; 4] = [Self::Pre2014, Self::Cxx14, Self::Cxx17, Self::Cxx2a];

    /// Parse with loose spelling (`c++17`, `17`, `c++1z`, `gnu++14`, `post-2017`, ...).
    #[must_use]
    pub fn from_str_loose(raw: &str) -> Option<Self> {
        let lowered = raw.trim().to_ascii_lowercase();
        let stripped = lowered
            .strip_prefix("-std=")
            .unwrap_or(&lowered)
            .trim_start_matches("gnu++")
            .trim_start_matches("c++");
        match stripped {
            "98" | "03" | "0x" | "11" | "pre-2014" | "pre-c++14" | "pre14" => Some(Self::Pre2014),
            "14" | "1y" => Some(Self::Cxx14),
            "17" | "1z" => Some(Self::Cxx17),
            "2a" | "20" | "2b" | "23" | "2c" | "26" | "post-2017" | "latest" => Some(Self::Cxx2a),
            other => {
                let digits = other.trim_end_matches('l');
                if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                let value = digits.parse::<u64>().ok()?;
                if digits.len() == 4 {
                    Self::from_year(value)
                } else {
                    Self::from_cplusplus(value)
                }
            }
        }
    }

    /// Map a revision year (`2014`, `2020`, ...) onto its gate.
    ///
    /// Years after 2017 are open-ended and land on `Cxx2a`.
    #[must_use]
    pub const fn from_year(year: u64) -> Option<Self> {
        if year < 1998 {
            None
        } else if year < 2014 {
            Some(Self::Pre2014)
        } else if year < 2017 {
            Some(Self::Cxx14)
        } else if year == 2017 {
            Some(Self::Cxx17)
        } else {
            Some(Self::Cxx2a)
        }
    }

    /// Map a `__cplusplus` value onto its gate.
    ///
    /// Values below 199711 are not C++ at all and yield `None`.
    #[must_use]
    pub const fn from_cplusplus(value: u64) -> Option<Self> {
        if value < 199_711 {
            None
        } else if value <= 201_103 {
            Some(Self::Pre2014)
        } else if value <= 201_402 {
            Some(Self::Cxx14)
        } else if value <= 201_703 {
            Some(Self::Cxx17)
        } else {
            Some(Self::Cxx2a)
        }
    }

    /// Label used in diagnostics and generated tests.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pre2014 => "pre-c++14",
            Self::Cxx14 => "c++14",
            Self::Cxx17 => "c++17",
            Self::Cxx2a => "c++2a",
        }
    }

    /// Label used in the `[C++17]` annotations of generated constant tables.
    #[must_use]
    pub const fn upper_label(self) -> &'static str {
        match self {
            Self::Pre2014 => "C++11",
            Self::Cxx14 => "C++14",
            Self::Cxx17 => "C++17",
            Self::Cxx2a => "C++2a",
        }
    }

    /// Short tag used in dump file names (`tuple.17.macros`).
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Pre2014 => "pre14",
            Self::Cxx14 => "14",
            Self::Cxx17 => "17",
            Self::Cxx2a => "2a",
        }
    }

    /// Compiler flag selecting a representative revision for this gate.
    #[must_use]
    pub const fn compiler_flag(self) -> &'static str {
        match self {
            Self::Pre2014 => "-std=c++11",
            Self::Cxx14 => "-std=c++14",
            Self::Cxx17 => "-std=c++17",
            Self::Cxx2a => "-std=c++2a",
        }
    }

    /// Preprocessor condition selecting this gate in generated tests.
    #[must_use]
    pub const fn gate_condition(self) -> &'static str {
        match self {
            Self::Pre2014 => "TEST_STD_VER < 2014",
            Self::Cxx14 => "TEST_STD_VER == 2014",
            Self::Cxx17 => "TEST_STD_VER == 2017",
            Self::Cxx2a => "TEST_STD_VER > 2017",
        }
    }
}

impl fmt::Display for Standard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
