//! Where macro tables come from.
//!
//! Each (header, standard) unit needs the macro table the compiler produced
//! for it. Tables are read from pre-recorded `-dM` dumps, probed from a live
//! compiler, or supplied in memory.

use std::collections::BTreeMap;
use std::path::PathBuf;

use thiserror::Error;

use featuremacro_core::config::ProbeConfig;
use featuremacro_core::macro_table::MacroTableError;
use featuremacro_core::probe::ProbeError;
use featuremacro_core::{MacroTable, Standard};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("no macro dump at {0}")]
    MissingDump(PathBuf),
    #[error("dump {path}: {source}")]
    Dump {
        path: PathBuf,
        source: MacroTableError,
    },
    #[error("probe: {0}")]
    Probe(#[from] ProbeError),
    #[error("no macro table for <{header}> under {standard}")]
    Unavailable { header: String, standard: Standard },
}

/// Provider of per-unit macro tables.
pub trait MacroSource {
    /// Short description for reports.
    fn describe(&self) -> String;

    fn macros(&self, header: &str, standard: Standard) -> Result<MacroTable, SourceError>;
}

/// Reads `<dir>/<header>.<tag>.macros`, e.g. `dumps/tuple.17.macros`.
#[derive(Debug, Clone)]
pub struct DumpDirSource {
    dir: PathBuf,
}

impl DumpDirSource {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// File name holding the dump for one unit.
    #[must_use]
    pub fn dump_file_name(header: &str, standard: Standard) -> String {
        format!("{}.{}.macros", header.replace('/', "_"), standard.tag())
    }

    #[must_use]
    pub fn dump_path(&self, header: &str, standard: Standard) -> PathBuf {
        self.dir.join(Self::dump_file_name(header, standard))
    }
}

impl MacroSource for DumpDirSource {
    fn describe(&self) -> String {
        format!("dumps:{}", self.dir.display())
    }

    fn macros(&self, header: &str, standard: Standard) -> Result<MacroTable, SourceError> {
        let path = self.dump_path(header, standard);
        if !path.is_file() {
            return Err(SourceError::MissingDump(path));
        }
        MacroTable::from_dump_file(&path).map_err(|source| SourceError::Dump { path, source })
    }
}

/// Runs the configured compiler for every unit.
#[derive(Debug, Clone)]
pub struct ProbeSource {
    config: ProbeConfig,
}

impl ProbeSource {
    #[must_use]
    pub const fn new(config: ProbeConfig) -> Self {
        Self { config }
    }
}

impl MacroSource for ProbeSource {
    fn describe(&self) -> String {
        format!("probe:{}", self.config.compiler)
    }

    fn macros(&self, header: &str, standard: Standard) -> Result<MacroTable, SourceError> {
        Ok(self.config.command(header, standard).run()?)
    }
}

/// In-memory tables keyed by unit.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    tables: BTreeMap<(String, Standard), MacroTable>,
}

impl StaticSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, header: impl Into<String>, standard: Standard, table: MacroTable) -> &mut Self {
        self.tables.insert((header.into(), standard), table);
        self
    }
}

impl MacroSource for StaticSource {
    fn describe(&self) -> String {
        format!("static:{} tables", self.tables.len())
    }

    fn macros(&self, header: &str, standard: Standard) -> Result<MacroTable, SourceError> {
        self.tables
            .get(&(header.to_string(), standard))
            .cloned()
            .ok_or_else(|| SourceError::Unavailable {
                header: header.to_string(),
                standard,
            })
    }
}
