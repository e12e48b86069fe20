//! Checker configuration.
//!
//! Resolution order is explicit value, then environment, then default:
//! - `FEATUREMACRO_IMPLEMENTATION`: `auto` (default), `generic` or `libcudacxx`.
//! - `FEATUREMACRO_CXX`: compiler used for probing (default `c++`).
//! - `FEATUREMACRO_INCLUDE_PREFIX`: prefix for probed headers (default `cuda/std/`).

use std::path::PathBuf;

use crate::macro_table::MacroTable;
use crate::overrides::Implementation;
use crate::probe::ProbeCommand;
use crate::standard::Standard;

pub const ENV_IMPLEMENTATION: &str = "FEATUREMACRO_IMPLEMENTATION";
pub const ENV_CXX: &str = "FEATUREMACRO_CXX";
pub const ENV_INCLUDE_PREFIX: &str = "FEATUREMACRO_INCLUDE_PREFIX";

pub const DEFAULT_CXX: &str = "c++";
pub const DEFAULT_INCLUDE_PREFIX: &str = "cuda/std/";

/// How the implementation under test is chosen for each unit.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ImplementationChoice {
    /// Detect from the macro table (`_LIBCUDACXX_VERSION` and friends).
    #[default]
    Auto,
    Fixed(Implementation),
}

impl ImplementationChoice {
    #[must_use]
    pub fn from_str_loose(raw: &str) -> Option<Self> {
        if raw.trim().eq_ignore_ascii_case("auto") {
            return Some(Self::Auto);
        }
        Implementation::from_str_loose(raw).map(Self::Fixed)
    }

    /// Resolve against the table a unit produced.
    #[must_use]
    pub fn resolve(self, table: &MacroTable) -> Implementation {
        match self {
            Self::Auto => Implementation::detect(table),
            Self::Fixed(implementation) => implementation,
        }
    }

    /// Explicit value, else `FEATUREMACRO_IMPLEMENTATION`, else `Auto`.
    ///
    /// Unrecognized values fall back to `Auto`.
    #[must_use]
    pub fn resolve_setting(explicit: Option<&str>, lookup: impl Fn(&str) -> Option<String>) -> Self {
        explicit
            .map(str::to_string)
            .or_else(|| lookup(ENV_IMPLEMENTATION))
            .and_then(|raw| Self::from_str_loose(&raw))
            .unwrap_or_default()
    }
}

/// Settings for compiler probing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeConfig {
    pub compiler: String,
    pub include_prefix: String,
    pub include_dirs: Vec<PathBuf>,
    pub extra_args: Vec<String>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            compiler: DEFAULT_CXX.to_string(),
            include_prefix: DEFAULT_INCLUDE_PREFIX.to_string(),
            include_dirs: Vec::new(),
            extra_args: Vec::new(),
        }
    }
}

impl ProbeConfig {
    /// Defaults overlaid with the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with values from `lookup`; empty values are ignored.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(cxx) = lookup(ENV_CXX).filter(|v| !v.trim().is_empty()) {
            config.compiler = cxx;
        }
        if let Some(prefix) = lookup(ENV_INCLUDE_PREFIX) {
            config.include_prefix = prefix;
        }
        config
    }

    /// Probe invocation for one unit.
    #[must_use]
    pub fn command(&self, header: &str, standard: Standard) -> ProbeCommand {
        let mut probe = ProbeCommand::new(&self.compiler, standard, header)
            .with_include_prefix(&self.include_prefix)
            .with_extra_args(self.extra_args.iter().cloned());
        for dir in &self.include_dirs {
            probe = probe.with_include_dir(dir);
        }
        probe
    }
}
