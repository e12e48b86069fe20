//! Obtain a header's macro table from a real compiler.
//!
//! The probe preprocesses a one-line translation unit that includes the
//! header, with `-dM` so the compiler prints every macro it ends up with.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use thiserror::Error;

use crate::macro_table::{MacroTable, MacroTableError};
use crate::standard::Standard;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("failed to start compiler `{compiler}`: {source}")]
    Spawn {
        compiler: String,
        source: std::io::Error,
    },
    #[error("io while talking to compiler: {0}")]
    Io(#[from] std::io::Error),
    #[error("compiler exited with status {status:?}: {stderr}")]
    CompilerFailed { status: Option<i32>, stderr: String },
    #[error("compiler output: {0}")]
    Parse(#[from] MacroTableError),
}

/// A fully specified preprocessor invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeCommand {
    pub compiler: String,
    pub standard: Standard,
    pub header: String,
    /// Prepended to the header in the `#include` (e.g. `cuda/std/`).
    pub include_prefix: String,
    pub include_dirs: Vec<PathBuf>,
    pub extra_args: Vec<String>,
}

impl ProbeCommand {
    #[must_use]
    pub fn new(compiler: impl Into<String>, standard: Standard, header: impl Into<String>) -> Self {
        Self {
            compiler: compiler.into(),
            standard,
            header: header.into(),
            include_prefix: String::new(),
            include_dirs: Vec::new(),
            extra_args: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_include_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.include_prefix = prefix.into();
        self
    }

    #[must_use]
    pub fn with_include_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.include_dirs.push(dir.into());
        self
    }

    #[must_use]
    pub fn with_extra_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Translation unit fed on stdin.
    #[must_use]
    pub fn source(&self) -> String {
        format!("#include <{}{}>\n", self.include_prefix, self.header)
    }

    /// Arguments passed to the compiler, in order.
    #[must_use]
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            self.standard.compiler_flag().to_string(),
            "-dM".to_string(),
            "-E".to_string(),
            "-x".to_string(),
            "c++".to_string(),
        ];
        for dir in &self.include_dirs {
            args.push("-I".to_string());
            args.push(dir.display().to_string());
        }
        args.extend(self.extra_args.iter().cloned());
        args.push("-".to_string());
        args
    }

    /// Run the compiler and parse its macro dump.
    pub fn run(&self) -> Result<MacroTable, ProbeError> {
        let mut child = Command::new(&self.compiler)
            .args(self.args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ProbeError::Spawn {
                compiler: self.compiler.clone(),
                source,
            })?;

        // The compiler may exit without reading stdin; report its status first.
        let written = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(self.source().as_bytes()),
            None => Ok(()),
        };
        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(ProbeError::CompilerFailed {
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        if let Err(err) = written
            && err.kind() != std::io::ErrorKind::BrokenPipe
        {
            return Err(ProbeError::Io(err));
        }
        Ok(MacroTable::parse_dump(&String::from_utf8_lossy(&output.stdout))?)
    }
}
