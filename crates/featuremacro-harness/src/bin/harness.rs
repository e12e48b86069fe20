//! CLI entrypoint for the feature-test macro harness.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};

use featuremacro_core::config::{ImplementationChoice, ProbeConfig};
use featuremacro_core::overrides::Suppression;
use featuremacro_core::render::{render_version_test, version_test_file_name};
use featuremacro_core::{Catalog, Checker, Implementation, MacroTable, OverrideTable, Standard};
use featuremacro_harness::structured_log::{
    ArtifactIndex, LogEmitter, LogLevel, Outcome, now_utc, validate_log_file,
};
use featuremacro_harness::{
    DumpDirSource, MacroSource, MatrixReport, MatrixRunner, ProbeSource, VerificationSummary,
};

/// Feature-test macro compliance tooling.
#[derive(Debug, Parser)]
#[command(name = "featuremacro-harness")]
#[command(about = "Check __cpp_lib_* feature-test macros against the standard matrix")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

/// Catalog and override inputs shared by every subcommand.
#[derive(Debug, Args)]
struct CatalogArgs {
    /// Catalog JSON path (defaults to the builtin matrix).
    #[arg(long)]
    catalog: Option<PathBuf>,
    /// Suppression list JSON path (defaults to the builtin overrides).
    #[arg(long)]
    overrides: Option<PathBuf>,
}

impl CatalogArgs {
    fn load(&self) -> Result<(Catalog, OverrideTable), Box<dyn std::error::Error>> {
        let catalog = match &self.catalog {
            Some(path) => Catalog::from_file(path)?,
            None => Catalog::builtin(),
        };
        let overrides = match &self.overrides {
            Some(path) => {
                let list: Vec<Suppression> = serde_json::from_str(&std::fs::read_to_string(path)?)?;
                OverrideTable::from_suppressions(list)
            }
            None => OverrideTable::builtin(),
        };
        Ok((catalog, overrides))
    }
}

/// Compiler probe settings; unset values fall back to the environment.
#[derive(Debug, Args)]
struct ProbeArgs {
    /// Compiler to probe (`FEATUREMACRO_CXX`, default `c++`).
    #[arg(long)]
    cxx: Option<String>,
    /// Prefix prepended to probed headers (`FEATUREMACRO_INCLUDE_PREFIX`, default `cuda/std/`).
    #[arg(long)]
    include_prefix: Option<String>,
    /// Extra include directory passed as `-I`.
    #[arg(long = "include-dir")]
    include_dirs: Vec<PathBuf>,
}

impl ProbeArgs {
    fn config(&self) -> ProbeConfig {
        let mut config = ProbeConfig::from_env();
        if let Some(cxx) = &self.cxx {
            config.compiler.clone_from(cxx);
        }
        if let Some(prefix) = &self.include_prefix {
            config.include_prefix.clone_from(prefix);
        }
        config.include_dirs.extend(self.include_dirs.iter().cloned());
        config
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check one header under one standard.
    Check {
        /// Header name without angle brackets (e.g. `tuple`).
        #[arg(long)]
        header: String,
        /// Active standard (`c++11`, `c++14`, `c++17`, `c++2a`, or a `__cplusplus` value).
        #[arg(long, value_parser = parse_standard)]
        standard: Standard,
        /// Pre-recorded `-dM` dump; when omitted the compiler is probed.
        #[arg(long, conflicts_with_all = ["cxx", "include_prefix", "include_dirs"])]
        dump: Option<PathBuf>,
        #[command(flatten)]
        probe: ProbeArgs,
        /// Implementation under test (`auto`, `generic`, `libcudacxx`).
        #[arg(long)]
        implementation: Option<String>,
        #[command(flatten)]
        inputs: CatalogArgs,
    },
    /// Check every (header, standard) unit and write a report.
    Matrix {
        /// Directory of `<header>.<tag>.macros` dumps; when omitted the compiler is probed.
        #[arg(long, conflicts_with_all = ["cxx", "include_prefix", "include_dirs"])]
        dump_dir: Option<PathBuf>,
        #[command(flatten)]
        probe: ProbeArgs,
        /// Header to check (repeatable; defaults to every catalog header).
        #[arg(long = "header")]
        headers: Vec<String>,
        /// Standard to check (repeatable; defaults to all four).
        #[arg(long = "standard", value_parser = parse_standard)]
        standards: Vec<Standard>,
        /// Implementation under test (`auto`, `generic`, `libcudacxx`).
        #[arg(long)]
        implementation: Option<String>,
        #[command(flatten)]
        inputs: CatalogArgs,
        /// Output report path (markdown); JSON is written alongside.
        #[arg(long)]
        report: Option<PathBuf>,
        /// Structured JSONL log path; an artifact index is written alongside.
        #[arg(long)]
        log: Option<PathBuf>,
        /// Run identifier used in trace ids.
        #[arg(long, default_value = "matrix")]
        run_id: String,
        /// Optional fixed timestamp string for deterministic report generation.
        #[arg(long)]
        timestamp: Option<String>,
    },
    /// Write `<header>.version.pass.cpp` compile-time tests.
    Generate {
        /// Output directory.
        #[arg(long)]
        output_dir: PathBuf,
        /// Header to generate (repeatable; defaults to every catalog header).
        #[arg(long = "header")]
        headers: Vec<String>,
        /// Prefix used in the generated `#include`.
        #[arg(long, default_value = "")]
        include_prefix: String,
        #[command(flatten)]
        inputs: CatalogArgs,
    },
    /// Print or export the macro catalog.
    Catalog {
        /// Output format: `markdown` (default), `json`, or `index` (macros per header).
        #[arg(long, default_value = "markdown")]
        format: String,
        /// Output file path (if omitted, prints to stdout).
        #[arg(long)]
        output: Option<PathBuf>,
        #[command(flatten)]
        inputs: CatalogArgs,
    },
    /// Validate a structured JSONL log and, optionally, its artifact index.
    ValidateLog {
        #[arg(long)]
        log: PathBuf,
        #[arg(long)]
        artifact_index: Option<PathBuf>,
    },
}

fn parse_standard(raw: &str) -> Result<Standard, String> {
    Standard::from_str_loose(raw).ok_or_else(|| {
        format!("unknown standard '{raw}' (expected c++11, c++14, c++17, c++2a, a year or a __cplusplus value)")
    })
}

fn implementation_choice(raw: Option<&str>) -> Result<ImplementationChoice, String> {
    if let Some(raw) = raw
        && ImplementationChoice::from_str_loose(raw).is_none()
    {
        return Err(format!(
            "unknown implementation '{raw}' (expected auto, generic or libcudacxx)"
        ));
    }
    Ok(ImplementationChoice::resolve_setting(raw, |key| {
        std::env::var(key).ok()
    }))
}

fn write_output(path: Option<&Path>, content: &str) -> std::io::Result<()> {
    match path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, content)
        }
        None => {
            print!("{content}");
            Ok(())
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Check {
            header,
            standard,
            dump,
            probe,
            implementation,
            inputs,
        } => {
            let (catalog, overrides) = inputs.load()?;
            let choice = implementation_choice(implementation.as_deref())?;
            let table = match &dump {
                Some(path) => MacroTable::from_dump_file(path)?,
                None => {
                    let config = probe.config();
                    eprintln!("Probing <{}{header}> with {}", config.include_prefix, config.compiler);
                    config.command(&header, standard).run()?
                }
            };
            let implementation = choice.resolve(&table);
            let checker = Checker::new(catalog.resolve(&header, &overrides, implementation)?);
            match checker.check(standard, &table) {
                Ok(report) => {
                    eprintln!(
                        "PASS <{header}> under {standard} ({implementation}): {} macros checked",
                        report.verdicts.len()
                    );
                }
                Err(failure) => {
                    eprintln!("{failure}");
                    return Err("Feature-test macro check failed".into());
                }
            }
        }
        Command::Matrix {
            dump_dir,
            probe,
            headers,
            standards,
            implementation,
            inputs,
            report,
            log,
            run_id,
            timestamp,
        } => {
            let (catalog, overrides) = inputs.load()?;
            let choice = implementation_choice(implementation.as_deref())?;
            let headers = if headers.is_empty() {
                catalog.headers()
            } else {
                headers
            };
            let standards = if standards.is_empty() {
                Standard::ALL.to_vec()
            } else {
                standards
            };
            let source: Box<dyn MacroSource> = match dump_dir {
                Some(dir) => Box::new(DumpDirSource::new(dir)),
                None => Box::new(ProbeSource::new(probe.config())),
            };
            eprintln!(
                "Checking {} header(s) x {} standard(s) from {}",
                headers.len(),
                standards.len(),
                source.describe()
            );

            let mut emitter = match &log {
                Some(path) => LogEmitter::to_file(path, "featuremacro", &run_id)?,
                None => LogEmitter::sink(),
            };
            let runner = MatrixRunner::new(catalog, overrides, choice);
            let results = runner.run(source.as_ref(), &headers, &standards, &mut emitter)?;

            let summary = VerificationSummary::from_results(results);
            let report_doc = MatrixReport::new(
                "Feature-Test Macro Compliance Report",
                source.describe(),
                timestamp.unwrap_or_else(now_utc),
                summary,
            );
            eprintln!(
                "Matrix complete: total={}, passed={}, failed={}, errors={}, violations={}",
                report_doc.summary.total,
                report_doc.summary.passed,
                report_doc.summary.failed,
                report_doc.summary.errors,
                report_doc.summary.violation_count()
            );

            let mut artifacts = Vec::new();
            if let Some(report_path) = &report {
                eprintln!("Writing report to {}", report_path.display());
                write_output(Some(report_path), &report_doc.to_markdown())?;
                let json_path = report_path.with_extension("json");
                std::fs::write(&json_path, report_doc.to_json())?;
                artifacts.push((report_path.clone(), "report_markdown"));
                artifacts.push((json_path, "report_json"));
            }

            let end = emitter
                .entry(LogLevel::Info, "run_complete")
                .with_gate("matrix")
                .with_outcome(if report_doc.all_passed() {
                    Outcome::Pass
                } else {
                    Outcome::Fail
                })
                .with_exit_code(i32::from(!report_doc.all_passed()))
                .with_artifacts(
                    artifacts
                        .iter()
                        .map(|(path, _)| path.display().to_string())
                        .collect(),
                );
            emitter.emit_entry(end)?;
            emitter.flush()?;
            drop(emitter);

            if let Some(log_path) = &log {
                let mut index = ArtifactIndex::new(run_id.as_str());
                for (path, kind) in &artifacts {
                    index.add_file(path, *kind)?;
                }
                index.add_file(log_path, "structured_log")?;
                let index_path = log_path.with_extension("artifacts.json");
                std::fs::write(&index_path, index.to_json()?)?;
                eprintln!("Wrote artifact index to {}", index_path.display());
            }

            if !report_doc.all_passed() {
                return Err("Feature-test macro matrix failed".into());
            }
        }
        Command::Generate {
            output_dir,
            headers,
            include_prefix,
            inputs,
        } => {
            let (catalog, overrides) = inputs.load()?;
            let headers = if headers.is_empty() {
                catalog.headers()
            } else {
                headers
            };
            std::fs::create_dir_all(&output_dir)?;
            for header in &headers {
                let expectations = catalog.resolve(header, &overrides, Implementation::Libcudacxx)?;
                let path = output_dir.join(version_test_file_name(header));
                std::fs::write(&path, render_version_test(&expectations, &include_prefix))?;
                eprintln!("Wrote {}", path.display());
            }
        }
        Command::Catalog {
            format,
            output,
            inputs,
        } => {
            let (catalog, overrides) = inputs.load()?;
            let content = match format.as_str() {
                "markdown" | "md" => catalog.to_markdown(&overrides),
                "json" => format!("{}\n", catalog.to_json()?),
                "index" => catalog
                    .header_index()
                    .into_iter()
                    .map(|(header, names)| format!("<{header}>: {}\n", names.join(", ")))
                    .collect(),
                other => {
                    return Err(
                        format!("unknown format '{other}' (expected markdown, json or index)").into(),
                    );
                }
            };
            write_output(output.as_deref(), &content)?;
        }
        Command::ValidateLog {
            log,
            artifact_index,
        } => {
            let (lines, errors) = validate_log_file(&log)?;
            for error in &errors {
                eprintln!("{error}");
            }
            let mut stale = 0;
            if let Some(index_path) = &artifact_index {
                let index: ArtifactIndex =
                    serde_json::from_str(&std::fs::read_to_string(index_path)?)?;
                for entry in index.stale_entries() {
                    eprintln!("stale artifact: {} ({})", entry.path, entry.kind);
                    stale += 1;
                }
            }
            eprintln!(
                "Validated {}: lines={lines}, errors={}, stale_artifacts={stale}",
                log.display(),
                errors.len()
            );
            if !errors.is_empty() || stale > 0 {
                return Err("Structured log validation failed".into());
            }
        }
    }

    Ok(())
}
