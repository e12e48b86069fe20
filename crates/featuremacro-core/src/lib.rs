//! # featuremacro-core
//!
//! Feature-test macro compliance checking for C++ standard library headers.
//!
//! This crate provides:
//! - The macro matrix: which header exposes which `__cpp_lib_*` macro, with
//!   which value, from which language standard on
//! - Implementation overrides: macros an implementation deliberately omits
//! - Macro tables parsed from compiler `-dM` output, or probed directly
//! - The checker: requirement per (macro, standard), violations per unit
//! - Rendering of the equivalent compile-time `*.version.pass.cpp` tests

#![forbid(unsafe_code)]

pub mod catalog;
pub mod check;
pub mod config;
pub mod expectation;
pub mod macro_table;
pub mod overrides;
pub mod probe;
pub mod render;
pub mod standard;

pub use catalog::{Catalog, CatalogError, HeaderExpectations, MacroDefinition};
pub use check::{CheckFailure, CheckReport, Checker, Violation, ViolationKind};
pub use expectation::{MacroExpectation, Requirement};
pub use macro_table::{MacroTable, MacroTableError, MacroValue};
pub use overrides::{Implementation, OverrideTable};
pub use standard::Standard;
