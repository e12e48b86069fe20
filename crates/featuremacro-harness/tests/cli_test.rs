//! Integration tests: `harness` binary subcommands.
//!
//! Validates:
//! 1. `generate` writes the checked-in compile-time tests byte for byte.
//! 2. `catalog --format json` output loads back through `--catalog`.
//! 3. `check` exits zero on a conforming dump and non-zero with diagnostics otherwise.
//! 4. `matrix` writes markdown/JSON reports, a schema-valid log and an artifact index
//!    that `validate-log` accepts.
//! 5. `check` and `matrix` without dumps run the `--cxx` compiler and surface its failures.
//! 6. `catalog --format index` lists macros per header.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

fn unique_tmp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time should be after UNIX_EPOCH")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("{prefix}-{}-{nanos}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn harness(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_harness"))
        .args(args)
        .env_remove("FEATUREMACRO_IMPLEMENTATION")
        .env_remove("FEATUREMACRO_CXX")
        .env_remove("FEATUREMACRO_INCLUDE_PREFIX")
        .output()
        .expect("harness binary should run")
}

fn path_arg(path: &Path) -> &str {
    path.to_str().expect("utf-8 temp path")
}

const TUPLE_17_CUDA: &str = "\
#define _LIBCUDACXX_VERSION 10000
#define __cplusplus 201703L
#define __cpp_lib_apply 201603L
#define __cpp_lib_make_from_tuple 201606L
#define __cpp_lib_tuple_element_t 201402L
#define __cpp_lib_tuples_by_type 201304L
";

/// Stand-in compiler: prints a `-dM` dump for c++14/c++17, rejects anything else.
#[cfg(unix)]
fn write_fake_cxx(dir: &Path) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("fake-cxx");
    let script = format!(
        "#!/bin/sh\n\
         case \"$1\" in\n\
         -std=c++17)\n\
         cat >/dev/null\n\
         cat <<'EOF'\n\
         {TUPLE_17_CUDA}EOF\n\
         ;;\n\
         -std=c++14)\n\
         cat >/dev/null\n\
         echo '#define _LIBCUDACXX_VERSION 10000'\n\
         echo '#define __cpp_lib_tuple_element_t 201402L'\n\
         echo '#define __cpp_lib_tuples_by_type 201304L'\n\
         ;;\n\
         *)\n\
         echo \"error: unsupported $1\" >&2\n\
         exit 1\n\
         ;;\n\
         esac\n"
    );
    std::fs::write(&path, script).expect("write fake compiler");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
        .expect("chmod fake compiler");

    // Wait out ETXTBSY from forks that raced the write.
    for _ in 0..50 {
        match Command::new(&path)
            .arg("-std=c++14")
            .stdin(std::process::Stdio::null())
            .output()
        {
            Ok(out) if out.status.success() => return path,
            Err(err) if err.raw_os_error() == Some(26) => {
                std::thread::sleep(std::time::Duration::from_millis(20));
            }
            other => panic!("fake compiler is not runnable: {other:?}"),
        }
    }
    panic!("fake compiler stayed busy");
}

#[test]
fn generate_matches_golden_tests() {
    let dir = unique_tmp_dir("featuremacro-cli-generate");
    let out = harness(&[
        "generate",
        "--output-dir",
        path_arg(&dir),
        "--header",
        "tuple",
        "--header",
        "utility",
        "--header",
        "exception",
    ]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let golden_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../featuremacro-core/tests/golden");
    for name in [
        "tuple.version.pass.cpp",
        "utility.version.pass.cpp",
        "exception.version.pass.cpp",
    ] {
        let generated = std::fs::read_to_string(dir.join(name)).expect("generated file");
        let golden = std::fs::read_to_string(golden_dir.join(name)).expect("golden file");
        assert_eq!(generated, golden, "{name} drifted");
    }

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn catalog_json_round_trips_through_cli() {
    let dir = unique_tmp_dir("featuremacro-cli-catalog");
    let catalog_path = dir.join("catalog.json");
    let out = harness(&[
        "catalog",
        "--format",
        "json",
        "--output",
        path_arg(&catalog_path),
    ]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let md = harness(&["catalog", "--catalog", path_arg(&catalog_path)]);
    assert!(md.status.success());
    let stdout = String::from_utf8_lossy(&md.stdout);
    assert!(stdout.starts_with("# Feature-Test Macro Catalog"));
    assert!(stdout.contains("| __cpp_lib_apply | 201603L | c++17 | tuple | - |"));

    let bad = harness(&["catalog", "--format", "yaml"]);
    assert!(!bad.status.success());
    assert!(String::from_utf8_lossy(&bad.stderr).contains("expected markdown, json or index"));

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn check_reports_pass_and_fail() {
    let dir = unique_tmp_dir("featuremacro-cli-check");
    let good = dir.join("tuple.17.macros");
    std::fs::write(&good, TUPLE_17_CUDA).unwrap();

    let out = harness(&[
        "check",
        "--header",
        "tuple",
        "--standard",
        "c++17",
        "--dump",
        path_arg(&good),
    ]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert!(String::from_utf8_lossy(&out.stderr).contains("PASS <tuple> under c++17 (libcudacxx)"));

    // The same dump under C++14 exposes two macros too early.
    let out = harness(&[
        "check",
        "--header",
        "tuple",
        "--standard",
        "201402",
        "--dump",
        path_arg(&good),
    ]);
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("2 violation(s)"), "{stderr}");
    assert!(stderr.contains(
        "__cpp_lib_apply should not be defined before c++17, but it is defined as `201603L` in c++14"
    ));

    // Forcing the generic implementation requires nothing extra at C++17.
    let out = harness(&[
        "check",
        "--header",
        "tuple",
        "--standard",
        "c++17",
        "--dump",
        path_arg(&good),
        "--implementation",
        "generic",
    ]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let unknown = harness(&[
        "check",
        "--header",
        "tuple",
        "--standard",
        "c++42",
        "--dump",
        path_arg(&good),
    ]);
    assert!(!unknown.status.success());

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn matrix_writes_reports_log_and_index() {
    let dir = unique_tmp_dir("featuremacro-cli-matrix");
    let dumps = dir.join("dumps");
    std::fs::create_dir_all(&dumps).unwrap();
    std::fs::write(dumps.join("tuple.17.macros"), TUPLE_17_CUDA).unwrap();
    std::fs::write(
        dumps.join("tuple.2a.macros"),
        format!("{TUPLE_17_CUDA}#define __cpp_lib_constexpr_misc 201811L\n"),
    )
    .unwrap();

    let report = dir.join("out/report.md");
    let log = dir.join("out/matrix.jsonl");
    let out = harness(&[
        "matrix",
        "--dump-dir",
        path_arg(&dumps),
        "--header",
        "tuple",
        "--standard",
        "c++17",
        "--standard",
        "c++2a",
        "--report",
        path_arg(&report),
        "--log",
        path_arg(&log),
        "--run-id",
        "cli-matrix",
        "--timestamp",
        "2026-01-01T00:00:00.000Z",
    ]);
    assert!(!out.status.success(), "constexpr_misc must fail under libcu++");

    let md = std::fs::read_to_string(&report).expect("markdown report");
    assert!(md.contains("- Timestamp: 2026-01-01T00:00:00.000Z"));
    assert!(md.contains("| <tuple> | 2 | 1 | 1 | 0 | 50.0% |"));
    assert!(md.contains("- Violations: 1\n"));
    assert!(String::from_utf8_lossy(&out.stderr).contains("errors=0, violations=1"));
    assert!(md.contains("__cpp_lib_constexpr_misc should not be defined because it is unimplemented"));

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.join("out/report.json")).unwrap())
            .expect("json report");
    assert_eq!(json["summary"]["total"], 2);
    assert_eq!(json["summary"]["failed"], 1);

    let index_path = dir.join("out/matrix.artifacts.json");
    let index: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&index_path).unwrap()).expect("index");
    assert_eq!(index["run_id"], "cli-matrix");
    let kinds: Vec<&str> = index["artifacts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["kind"].as_str().unwrap())
        .collect();
    assert_eq!(kinds, vec!["report_markdown", "report_json", "structured_log"]);

    let validated = harness(&[
        "validate-log",
        "--log",
        path_arg(&log),
        "--artifact-index",
        path_arg(&index_path),
    ]);
    assert!(
        validated.status.success(),
        "{}",
        String::from_utf8_lossy(&validated.stderr)
    );

    // Tampering with a report makes its index entry stale.
    std::fs::write(&report, "edited").unwrap();
    let stale = harness(&[
        "validate-log",
        "--log",
        path_arg(&log),
        "--artifact-index",
        path_arg(&index_path),
    ]);
    assert!(!stale.status.success());
    assert!(String::from_utf8_lossy(&stale.stderr).contains("stale artifact"));

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn validate_log_rejects_malformed_lines() {
    let dir = unique_tmp_dir("featuremacro-cli-badlog");
    let log = dir.join("bad.jsonl");
    std::fs::write(
        &log,
        "{\"timestamp\":\"t\",\"trace_id\":\"a::b::001\",\"level\":\"info\",\"event\":\"ok\"}\nnot json\n",
    )
    .unwrap();
    let out = harness(&["validate-log", "--log", path_arg(&log)]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("line 2"));

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn catalog_index_lists_macros_per_header() {
    let out = harness(&["catalog", "--format", "index"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains(
        "<tuple>: __cpp_lib_apply, __cpp_lib_constexpr_misc, __cpp_lib_make_from_tuple, \
         __cpp_lib_tuple_element_t, __cpp_lib_tuples_by_type\n"
    ));
    let memory = stdout
        .lines()
        .find(|line| line.starts_with("<memory>: "))
        .expect("memory row");
    assert!(memory.contains("__cpp_lib_transparent_operators"));
    assert!(memory.contains("__cpp_lib_make_unique"));
}

#[cfg(unix)]
#[test]
fn check_runs_the_configured_compiler() {
    let dir = unique_tmp_dir("featuremacro-cli-cxx-check");
    let cxx = write_fake_cxx(&dir);

    let out = harness(&[
        "check",
        "--header",
        "tuple",
        "--standard",
        "c++17",
        "--cxx",
        path_arg(&cxx),
    ]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert!(String::from_utf8_lossy(&out.stderr).contains("PASS <tuple> under c++17 (libcudacxx)"));

    // `2020` selects the c++2a gate, which the fake compiler rejects.
    let out = harness(&[
        "check",
        "--header",
        "tuple",
        "--standard",
        "2020",
        "--cxx",
        path_arg(&cxx),
    ]);
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("CompilerFailed"), "{stderr}");
    assert!(stderr.contains("error: unsupported -std=c++2a"), "{stderr}");

    let _ = std::fs::remove_dir_all(dir);
}

#[cfg(unix)]
#[test]
fn matrix_runs_the_configured_compiler_per_unit() {
    let dir = unique_tmp_dir("featuremacro-cli-cxx-matrix");
    let cxx = write_fake_cxx(&dir);
    let report = dir.join("report.md");

    let out = harness(&[
        "matrix",
        "--cxx",
        path_arg(&cxx),
        "--header",
        "tuple",
        "--standard",
        "c++14",
        "--standard",
        "201703L",
        "--standard",
        "2020",
        "--report",
        path_arg(&report),
    ]);
    assert!(!out.status.success(), "the c++2a unit must be an error");
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("total=3, passed=2, failed=0, errors=1, violations=0"), "{stderr}");

    let md = std::fs::read_to_string(&report).expect("markdown report");
    assert!(md.contains("| <tuple> | 3 | 2 | 0 | 1 | 66.7% |"), "{md}");
    assert!(md.contains("| <tuple> | c++14 | libcudacxx | PASS |"));
    assert!(md.contains("| <tuple> | c++17 | libcudacxx | PASS |"));
    assert!(md.contains("compiler exited with status Some(1): error: unsupported -std=c++2a"));

    let _ = std::fs::remove_dir_all(dir);
}
