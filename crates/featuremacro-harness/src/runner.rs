//! Matrix execution engine.

use std::time::Instant;

use featuremacro_core::config::ImplementationChoice;
use featuremacro_core::{Catalog, Checker, OverrideTable, Standard};

use crate::source::MacroSource;
use crate::structured_log::{LogEmitter, LogLevel, Outcome};
use crate::verify::{UnitResult, UnitStatus};

/// Checks (header × standard) units against a catalog.
pub struct MatrixRunner {
    catalog: Catalog,
    overrides: OverrideTable,
    implementation: ImplementationChoice,
}

impl MatrixRunner {
    #[must_use]
    pub const fn new(
        catalog: Catalog,
        overrides: OverrideTable,
        implementation: ImplementationChoice,
    ) -> Self {
        Self {
            catalog,
            overrides,
            implementation,
        }
    }

    /// Builtin catalog and overrides, implementation detected per unit.
    #[must_use]
    pub fn builtin() -> Self {
        Self::new(
            Catalog::builtin(),
            OverrideTable::builtin(),
            ImplementationChoice::Auto,
        )
    }

    /// Check one unit. Failures to obtain a table become `Error` results.
    pub fn check_unit(
        &self,
        source: &dyn MacroSource,
        header: &str,
        standard: Standard,
    ) -> UnitResult {
        let mut result = UnitResult {
            header: header.to_string(),
            standard,
            implementation: None,
            status: UnitStatus::Error,
            checked: 0,
            violations: Vec::new(),
            error: None,
        };

        let table = match source.macros(header, standard) {
            Ok(table) => table,
            Err(err) => {
                result.error = Some(err.to_string());
                return result;
            }
        };
        let implementation = self.implementation.resolve(&table);
        result.implementation = Some(implementation);

        let expectations = match self.catalog.resolve(header, &self.overrides, implementation) {
            Ok(expectations) => expectations,
            Err(err) => {
                result.error = Some(err.to_string());
                return result;
            }
        };
        let report = Checker::new(expectations).evaluate(standard, &table);
        result.checked = report.verdicts.len();
        result.violations = report.violations().cloned().collect();
        result.status = if result.violations.is_empty() {
            UnitStatus::Pass
        } else {
            UnitStatus::Fail
        };
        result
    }

    /// Check every unit in (header, standard) order and log each outcome.
    pub fn run(
        &self,
        source: &dyn MacroSource,
        headers: &[String],
        standards: &[Standard],
        log: &mut LogEmitter,
    ) -> std::io::Result<Vec<UnitResult>> {
        let mut headers = headers.to_vec();
        headers.sort();
        headers.dedup();
        let mut standards = standards.to_vec();
        standards.sort();
        standards.dedup();

        let start = log
            .entry(LogLevel::Info, "matrix_start")
            .with_gate("matrix")
            .with_details(serde_json::json!({
                "source": source.describe(),
                "headers": headers,
                "standards": standards,
            }));
        log.emit_entry(start)?;

        let mut results = Vec::with_capacity(headers.len() * standards.len());
        for header in &headers {
            for standard in &standards {
                let began = Instant::now();
                let result = self.check_unit(source, header, *standard);
                let elapsed = u64::try_from(began.elapsed().as_millis()).unwrap_or(u64::MAX);
                log_unit(log, &result, elapsed)?;
                results.push(result);
            }
        }

        let passed = results.iter().filter(|r| r.passed()).count();
        let end = log
            .entry(LogLevel::Info, "matrix_end")
            .with_gate("matrix")
            .with_outcome(if passed == results.len() {
                Outcome::Pass
            } else {
                Outcome::Fail
            })
            .with_details(serde_json::json!({"total": results.len(), "passed": passed}));
        log.emit_entry(end)?;
        log.flush()?;
        Ok(results)
    }
}

fn log_unit(log: &mut LogEmitter, result: &UnitResult, elapsed_ms: u64) -> std::io::Result<()> {
    for violation in &result.violations {
        let mut entry = log
            .entry(LogLevel::Error, "macro_violation")
            .with_gate("matrix")
            .with_unit(result.header.clone(), result.standard)
            .with_violation(violation.macro_name(), violation.kind().as_str())
            .with_outcome(Outcome::Fail)
            .with_details(serde_json::json!({ "diagnostic": violation.to_string() }));
        if let Some(implementation) = result.implementation {
            entry = entry.with_implementation(implementation);
        }
        log.emit_entry(entry)?;
    }

    let (level, outcome) = match result.status {
        UnitStatus::Pass => (LogLevel::Info, Outcome::Pass),
        UnitStatus::Fail => (LogLevel::Error, Outcome::Fail),
        UnitStatus::Error => (LogLevel::Error, Outcome::Error),
    };
    let mut entry = log
        .entry(level, "unit_result")
        .with_gate("matrix")
        .with_unit(result.header.clone(), result.standard)
        .with_outcome(outcome)
        .with_duration_ms(elapsed_ms)
        .with_details(serde_json::json!({
            "checked": result.checked,
            "violations": result.violations.len(),
            "error": result.error,
        }));
    if let Some(implementation) = result.implementation {
        entry = entry.with_implementation(implementation);
    }
    log.emit_entry(entry)
}
