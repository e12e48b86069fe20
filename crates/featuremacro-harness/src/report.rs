//! Report generation for matrix results.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::verify::{UnitStatus, VerificationSummary};

/// Header-level aggregate row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderMatrixRow {
    pub header: String,
    pub total: u64,
    pub passed: u64,
    pub failed: u64,
    pub errors: u64,
    pub pass_rate_percent: f64,
}

/// A matrix report combining the verification summary and per-header rollup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatrixReport {
    pub schema_version: String,
    pub title: String,
    /// Where the macro tables came from (`dumps:<dir>` or `probe:<cxx>`).
    pub source: String,
    /// Timestamp (UTC).
    pub timestamp: String,
    pub pass_rate_percent: f64,
    pub header_matrix: Vec<HeaderMatrixRow>,
    pub summary: VerificationSummary,
}

impl MatrixReport {
    /// Build a report, aggregating results per header.
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        source: impl Into<String>,
        timestamp: impl Into<String>,
        summary: VerificationSummary,
    ) -> Self {
        let mut buckets: BTreeMap<&str, (u64, u64, u64, u64)> = BTreeMap::new();
        for result in &summary.results {
            let bucket = buckets.entry(result.header.as_str()).or_insert((0, 0, 0, 0));
            bucket.0 = bucket.0.saturating_add(1);
            match result.status {
                UnitStatus::Pass => bucket.1 = bucket.1.saturating_add(1),
                UnitStatus::Fail => bucket.2 = bucket.2.saturating_add(1),
                UnitStatus::Error => bucket.3 = bucket.3.saturating_add(1),
            }
        }
        let header_matrix = buckets
            .into_iter()
            .map(|(header, (total, passed, failed, errors))| HeaderMatrixRow {
                header: header.to_string(),
                total,
                passed,
                failed,
                errors,
                pass_rate_percent: ratio_percent(passed, total),
            })
            .collect();

        let total = u64::try_from(summary.total).unwrap_or(u64::MAX);
        let passed = u64::try_from(summary.passed).unwrap_or(0);
        Self {
            schema_version: "v1".to_string(),
            title: title.into(),
            source: source.into(),
            timestamp: timestamp.into(),
            pass_rate_percent: ratio_percent(passed, total),
            header_matrix,
            summary,
        }
    }

    /// Returns true when no failures/errors are present.
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.summary.all_passed()
    }

    /// Render the report as markdown.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("# {}\n\n", self.title));
        out.push_str(&format!("- Source: {}\n", self.source));
        out.push_str(&format!("- Timestamp: {}\n", self.timestamp));
        out.push_str(&format!("- Total: {}\n", self.summary.total));
        out.push_str(&format!("- Passed: {}\n", self.summary.passed));
        out.push_str(&format!("- Failed: {}\n", self.summary.failed));
        out.push_str(&format!("- Errors: {}\n", self.summary.errors));
        out.push_str(&format!("- Violations: {}\n", self.summary.violation_count()));
        out.push_str(&format!("- Pass rate: {:.1}%\n\n", self.pass_rate_percent));

        out.push_str("## Headers\n\n");
        out.push_str("| Header | Total | Passed | Failed | Errors | Pass rate |\n");
        out.push_str("|--------|-------|--------|--------|--------|-----------|\n");
        for row in &self.header_matrix {
            out.push_str(&format!(
                "| <{}> | {} | {} | {} | {} | {:.1}% |\n",
                row.header, row.total, row.passed, row.failed, row.errors, row.pass_rate_percent
            ));
        }

        out.push_str("\n## Units\n\n");
        out.push_str("| Header | Standard | Implementation | Status | Checked | Violations |\n");
        out.push_str("|--------|----------|----------------|--------|---------|------------|\n");
        for r in &self.summary.results {
            out.push_str(&format!(
                "| <{}> | {} | {} | {} | {} | {} |\n",
                r.header,
                r.standard,
                r.implementation.map_or("-", |i| i.as_str()),
                r.status.as_str(),
                r.checked,
                r.violations.len()
            ));
        }

        let failing: Vec<_> = self.summary.results.iter().filter(|r| !r.passed()).collect();
        if !failing.is_empty() {
            out.push_str("\n## Diagnostics\n\n");
            for r in failing {
                for violation in &r.violations {
                    out.push_str(&format!("- <{}>: {violation}\n", r.header));
                }
                if let Some(error) = &r.error {
                    out.push_str(&format!("- <{}> ({}): {error}\n", r.header, r.standard));
                }
            }
        }
        out
    }

    /// Render the report as JSON.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
    }
}

#[allow(clippy::cast_precision_loss)]
fn ratio_percent(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    (numerator as f64 * 100.0) / denominator as f64
}
