//! Render the preprocessor test that enforces a header's expectations at
//! compile time (`<header>.version.pass.cpp`).
//!
//! The output is one `TEST_STD_VER` branch per [`Standard`] with an
//! `#error` for every way a macro can be wrong. Suppressed macros that the
//! standard would require are guarded on the implementation's version symbol
//! so the same file still holds other implementations to the standard.

use std::fmt::Write as _;

use crate::catalog::HeaderExpectations;
use crate::expectation::MacroExpectation;
use crate::overrides::Implementation;
use crate::standard::Standard;

const BANNER: &str = "\
//===----------------------------------------------------------------------===//
//
// Part of the LLVM Project, under the Apache License v2.0 with LLVM Exceptions.
// See https://llvm.org/LICENSE.txt for license information.
// SPDX-License-Identifier: Apache-2.0 WITH LLVM-exception
//
//===----------------------------------------------------------------------===//
//
// WARNING: This test was generated by generate_feature_test_macro_components.py
// and should not be edited manually.
";

/// File name of the generated test for `header`.
#[must_use]
pub fn version_test_file_name(header: &str) -> String {
    format!("{}.version.pass.cpp", header.replace('/', "_"))
}

/// Render the full test file.
#[must_use]
pub fn render_version_test(header: &HeaderExpectations, include_prefix: &str) -> String {
    let mut out = String::from(BANNER);
    let name = &header.header;
    let _ = write!(
        out,
        "\n// <{name}>\n\n// Test the feature test macros defined by <{name}>\n\n"
    );
    out.push_str(&render_constant_table(&header.expectations));
    let _ = write!(
        out,
        "\n#include <{include_prefix}{name}>\n#include \"test_macros.h\"\n\n"
    );

    for (idx, standard) in Standard::ALL.into_iter().enumerate() {
        let directive = if idx == 0 { "#if" } else { "#elif" };
        let _ = writeln!(out, "{directive} {}\n", standard.gate_condition());
        for exp in &header.expectations {
            out.push_str(&render_block(exp, standard, header.implementation));
            out.push('\n');
        }
    }
    if let Some(last) = Standard::ALL.last() {
        let _ = writeln!(out, "#endif // {}", last.gate_condition());
    }
    out.push_str("\nint main(int, char**) { return 0; }\n");
    out
}

fn render_constant_table(expectations: &[MacroExpectation]) -> String {
    let width = expectations
        .iter()
        .map(|e| e.name.len())
        .max()
        .unwrap_or(0)
        + 4;
    let mut out = format!("/*  {:<width$}Value\n", "Constant");
    for exp in expectations {
        let _ = writeln!(
            out,
            "    {:<width$}{}L [{}]",
            exp.name,
            exp.expected_value,
            exp.introduced_in.upper_label()
        );
        for rev in &exp.revisions {
            let _ = writeln!(
                out,
                "    {:<width$}{}L [{}]",
                "",
                rev.value,
                rev.standard.upper_label()
            );
        }
    }
    out.push_str("*/\n");
    out
}

fn render_block(exp: &MacroExpectation, standard: Standard, implementation: Implementation) -> String {
    if !exp.required_by_standard(standard) {
        return undefined_block(
            &exp.name,
            &format!("before {}", exp.introduced_in),
            "",
        );
    }
    let defined = defined_block(&exp.name, exp.value_at(standard), standard, "");
    if !exp.suppressed_by_implementation {
        return defined;
    }
    let reason = format!(
        "because it is unimplemented in {}!",
        implementation.upstream_name()
    );
    match implementation.version_macro() {
        None => undefined_block(&exp.name, &reason, ""),
        Some(symbol) => {
            let mut out = format!("# if !defined({symbol})\n");
            out.push_str(&defined_block(&exp.name, exp.value_at(standard), standard, "  "));
            let _ = writeln!(out, "# else // {symbol}");
            out.push_str(&undefined_block(&exp.name, &reason, "  "));
            out.push_str("# endif\n");
            out
        }
    }
}

fn undefined_block(name: &str, reason: &str, indent: &str) -> String {
    format!(
        "#{indent} ifdef {name}\n\
         #{indent}   error \"{name} should not be defined {reason}\"\n\
         #{indent} endif\n"
    )
}

fn defined_block(name: &str, value: i64, standard: Standard, indent: &str) -> String {
    format!(
        "#{indent} ifndef {name}\n\
         #{indent}   error \"{name} should be defined in {standard}\"\n\
         #{indent} endif\n\
         #{indent} if {name} != {value}L\n\
         #{indent}   error \"{name} should have the value {value}L in {standard}\"\n\
         #{indent} endif\n"
    )
}
