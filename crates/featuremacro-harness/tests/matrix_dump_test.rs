//! Integration tests: matrix runner over on-disk `-dM` dumps.
//!
//! Validates:
//! 1. Conforming dumps for every builtin header pass under auto-detection.
//! 2. A libcu++ dump exposing a suppressed macro fails only that unit.
//! 3. Missing dumps become error units without aborting the run.
//! 4. Every logged line satisfies the structured-log schema.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use featuremacro_core::{Catalog, Implementation, OverrideTable, Requirement, Standard};
use featuremacro_harness::structured_log::{LogEmitter, validate_log_file};
use featuremacro_harness::{
    DumpDirSource, MatrixReport, MatrixRunner, UnitStatus, VerificationSummary,
};

fn unique_tmp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time should be after UNIX_EPOCH")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("{prefix}-{}-{nanos}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

/// Write a dump holding exactly what `implementation` must define.
fn write_conforming_dump(
    dir: &Path,
    header: &str,
    standard: Standard,
    implementation: Implementation,
    extra: &[(&str, &str)],
) {
    let expectations = Catalog::builtin()
        .resolve(header, &OverrideTable::builtin(), implementation)
        .expect("builtin header");
    let mut dump = String::from("#define __cplusplus 201703L\n#define __GNUC__ 12\n");
    if let Some(version) = implementation.version_macro() {
        dump.push_str(&format!("#define {version} 10000\n"));
    }
    for exp in &expectations.expectations {
        if let Requirement::Defined { value } = exp.requirement(standard, implementation) {
            dump.push_str(&format!("#define {} {value}L\n", exp.name));
        }
    }
    for (name, value) in extra {
        dump.push_str(&format!("#define {name} {value}\n"));
    }
    std::fs::write(dir.join(DumpDirSource::dump_file_name(header, standard)), dump)
        .expect("write dump");
}

#[test]
fn conforming_dumps_pass_for_every_header() {
    let dir = unique_tmp_dir("featuremacro-matrix-conforming");
    let headers = Catalog::builtin().headers();
    for header in &headers {
        for standard in Standard::ALL {
            write_conforming_dump(&dir, header, standard, Implementation::Libcudacxx, &[]);
        }
    }

    let results = MatrixRunner::builtin()
        .run(
            &DumpDirSource::new(&dir),
            &headers,
            &Standard::ALL,
            &mut LogEmitter::sink(),
        )
        .expect("run matrix");
    let summary = VerificationSummary::from_results(results);
    assert_eq!(summary.total, headers.len() * Standard::ALL.len());
    assert!(summary.all_passed(), "{:?}", summary.results);
    assert!(
        summary
            .results
            .iter()
            .all(|r| r.implementation == Some(Implementation::Libcudacxx))
    );

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn suppressed_macro_fails_single_unit() {
    let dir = unique_tmp_dir("featuremacro-matrix-suppressed");
    for standard in Standard::ALL {
        let extra: &[(&str, &str)] = if standard == Standard::Cxx2a {
            &[("__cpp_lib_to_chars", "201611L")]
        } else {
            &[]
        };
        write_conforming_dump(&dir, "utility", standard, Implementation::Libcudacxx, extra);
    }

    let log_path = dir.join("matrix.jsonl");
    let mut emitter = LogEmitter::to_file(&log_path, "featuremacro", "run-suppressed").unwrap();
    let results = MatrixRunner::builtin()
        .run(
            &DumpDirSource::new(&dir),
            &["utility".to_string()],
            &Standard::ALL,
            &mut emitter,
        )
        .expect("run matrix");
    drop(emitter);

    let failing: Vec<_> = results.iter().filter(|r| !r.passed()).collect();
    assert_eq!(failing.len(), 1);
    assert_eq!(failing[0].standard, Standard::Cxx2a);
    assert_eq!(failing[0].status, UnitStatus::Fail);
    assert_eq!(
        failing[0].violations[0].to_string(),
        "__cpp_lib_to_chars should not be defined because it is unimplemented in libcu++!, \
         but it is defined as `201611L` in c++2a"
    );

    let (lines, errors) = validate_log_file(&log_path).expect("read log");
    assert!(errors.is_empty(), "schema errors: {errors:?}");
    // start + 4 unit results + 1 violation + end
    assert_eq!(lines, 7);
    let log = std::fs::read_to_string(&log_path).unwrap();
    assert!(log.contains("\"violation\":\"UnexpectedMacro\""));
    assert!(log.contains("\"macro_name\":\"__cpp_lib_to_chars\""));

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn generic_dump_is_held_to_the_full_standard() {
    let dir = unique_tmp_dir("featuremacro-matrix-generic");
    write_conforming_dump(&dir, "utility", Standard::Cxx2a, Implementation::Generic, &[]);

    let results = MatrixRunner::builtin()
        .run(
            &DumpDirSource::new(&dir),
            &["utility".to_string()],
            &[Standard::Cxx2a],
            &mut LogEmitter::sink(),
        )
        .expect("run matrix");
    assert_eq!(results[0].implementation, Some(Implementation::Generic));
    assert!(results[0].passed(), "{:?}", results[0].violations);

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn missing_dumps_are_error_units() {
    let dir = unique_tmp_dir("featuremacro-matrix-missing");
    write_conforming_dump(&dir, "exception", Standard::Cxx17, Implementation::Libcudacxx, &[]);

    let results = MatrixRunner::builtin()
        .run(
            &DumpDirSource::new(&dir),
            &["exception".to_string()],
            &[Standard::Cxx14, Standard::Cxx17],
            &mut LogEmitter::sink(),
        )
        .expect("run matrix");
    assert_eq!(results[0].status, UnitStatus::Error);
    assert!(
        results[0]
            .error
            .as_deref()
            .is_some_and(|e| e.contains("exception.14.macros"))
    );
    assert_eq!(results[1].status, UnitStatus::Pass);

    let report = MatrixReport::new(
        "Feature-Test Macro Compliance Report",
        "dumps",
        "2026-01-01T00:00:00.000Z",
        VerificationSummary::from_results(results),
    );
    assert!(!report.all_passed());
    assert_eq!(report.header_matrix[0].errors, 1);
    assert!(report.to_markdown().contains("| <exception> | c++14 | - | ERROR | 0 | 0 |"));

    let _ = std::fs::remove_dir_all(dir);
}
