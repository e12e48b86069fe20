//! The feature-test macro matrix: which header exposes which macro, with
//! which value, from which standard on.
//!
//! Rows are macro-centric (one row per macro, listing every header that must
//! expose it); per-header views are derived on demand.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::expectation::{MacroExpectation, ValueRevision};
use crate::overrides::{Implementation, OverrideTable};
use crate::standard::Standard;

/// Prefix every library feature-test macro carries.
pub const FEATURE_MACRO_PREFIX: &str = "__cpp_lib_";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("header <{0}> is not in the catalog")]
    UnknownHeader(String),
    #[error("macro {0} is defined more than once")]
    Duplicate(String),
    #[error("macro {name}: {reason}")]
    Invalid { name: String, reason: String },
}

/// One row of the matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroDefinition {
    pub name: String,
    pub introduced_in: Standard,
    pub value: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub revisions: Vec<ValueRevision>,
    /// Headers (without angle brackets) that must expose the macro.
    pub headers: Vec<String>,
}

impl MacroDefinition {
    fn expectation(&self) -> MacroExpectation {
        MacroExpectation {
            name: self.name.clone(),
            introduced_in: self.introduced_in,
            expected_value: self.value,
            suppressed_by_implementation: false,
            revisions: self.revisions.clone(),
        }
    }

    fn validate(&self) -> Result<(), CatalogError> {
        let invalid = |reason: &str| CatalogError::Invalid {
            name: self.name.clone(),
            reason: reason.to_string(),
        };
        if !self.name.starts_with(FEATURE_MACRO_PREFIX) || self.name.len() == FEATURE_MACRO_PREFIX.len()
        {
            return Err(invalid("name must start with __cpp_lib_"));
        }
        if self.value <= 0 {
            return Err(invalid("value must be positive"));
        }
        if self.headers.is_empty() {
            return Err(invalid("at least one header is required"));
        }
        let mut previous = self.introduced_in;
        for rev in &self.revisions {
            if rev.value <= 0 {
                return Err(invalid("revision values must be positive"));
            }
            if rev.standard <= previous {
                return Err(invalid(
                    "revisions must come after introduced_in in increasing order",
                ));
            }
            previous = rev.standard;
        }
        Ok(())
    }
}

/// Expectations for a single header under one implementation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderExpectations {
    pub header: String,
    pub implementation: Implementation,
    /// Sorted by macro name.
    pub expectations: Vec<MacroExpectation>,
}

/// The full matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    definitions: Vec<MacroDefinition>,
}

impl Catalog {
    /// Build a catalog, rejecting malformed or duplicate rows.
    pub fn new(mut definitions: Vec<MacroDefinition>) -> Result<Self, CatalogError> {
        let mut seen = BTreeSet::new();
        for def in &definitions {
            def.validate()?;
            if !seen.insert(def.name.as_str()) {
                return Err(CatalogError::Duplicate(def.name.clone()));
            }
        }
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(Self { definitions })
    }

    /// Load a catalog from its JSON form.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let raw: Self = serde_json::from_str(json)?;
        Self::new(raw.definitions)
    }

    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    #[must_use]
    pub fn definitions(&self) -> &[MacroDefinition] {
        &self.definitions
    }

    /// Distinct headers, sorted.
    #[must_use]
    pub fn headers(&self) -> Vec<String> {
        let set: BTreeSet<&str> = self
            .definitions
            .iter()
            .flat_map(|def| def.headers.iter().map(String::as_str))
            .collect();
        set.into_iter().map(str::to_string).collect()
    }

    /// Rows exposed by `header`, sorted by macro name.
    pub fn for_header(&self, header: &str) -> Result<Vec<&MacroDefinition>, CatalogError> {
        let rows: Vec<&MacroDefinition> = self
            .definitions
            .iter()
            .filter(|def| def.headers.iter().any(|h| h == header))
            .collect();
        if rows.is_empty() {
            return Err(CatalogError::UnknownHeader(header.to_string()));
        }
        Ok(rows)
    }

    /// Layer `overrides` for `implementation` over the header's rows.
    pub fn resolve(
        &self,
        header: &str,
        overrides: &OverrideTable,
        implementation: Implementation,
    ) -> Result<HeaderExpectations, CatalogError> {
        let expectations = self
            .for_header(header)?
            .into_iter()
            .map(|def| {
                let mut exp = def.expectation();
                exp.suppressed_by_implementation = overrides.is_suppressed(implementation, &def.name);
                exp
            })
            .collect();
        Ok(HeaderExpectations {
            header: header.to_string(),
            implementation,
            expectations,
        })
    }

    /// Header → macro names, for listings.
    #[must_use]
    pub fn header_index(&self) -> BTreeMap<String, Vec<String>> {
        let mut index: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for def in &self.definitions {
            for header in &def.headers {
                index.entry(header.clone()).or_default().push(def.name.clone());
            }
        }
        index
    }

    /// Render the matrix as a markdown table.
    #[must_use]
    pub fn to_markdown(&self, overrides: &OverrideTable) -> String {
        let mut out = String::from("# Feature-Test Macro Catalog\n\n");
        out.push_str("| Macro | Value | Since | Headers | Suppressed by |\n");
        out.push_str("|-------|-------|-------|---------|---------------|\n");
        for def in &self.definitions {
            let mut value = format!("{}L", def.value);
            for rev in &def.revisions {
                value.push_str(&format!(", {}L ({})", rev.value, rev.standard));
            }
            let suppressed: Vec<&str> = Implementation::ALL
                .into_iter()
                .filter(|imp| overrides.is_suppressed(*imp, &def.name))
                .map(Implementation::as_str)
                .collect();
            out.push_str(&format!(
                "| {} | {} | {} | {} | {} |\n",
                def.name,
                value,
                def.introduced_in,
                def.headers.join(", "),
                if suppressed.is_empty() {
                    "-".to_string()
                } else {
                    suppressed.join(", ")
                }
            ));
        }

        let mut reasons = Vec::new();
        for def in &self.definitions {
            for imp in Implementation::ALL {
                if let Some(reason) = overrides.reason(imp, &def.name) {
                    reasons.push(format!("- `{}` ({}): {reason}\n", def.name, imp.as_str()));
                }
            }
        }
        if !reasons.is_empty() {
            out.push_str("\n## Suppressions\n\n");
            out.push_str(&reasons.concat());
        }
        out
    }

    /// The matrix shipped with the checker.
    #[must_use]
    pub fn builtin() -> Self {
        use Standard::{Cxx14, Cxx17, Cxx2a};

        let row = |suffix: &str, since: Standard, value: i64, headers: &[&str]| MacroDefinition {
            name: format!("{FEATURE_MACRO_PREFIX}{suffix}"),
            introduced_in: since,
            value,
            revisions: Vec::new(),
            headers: headers.iter().map(|h| (*h).to_string()).collect(),
        };

        let mut definitions = vec![
            row("addressof_constexpr", Cxx17, 201_603, &["memory"]),
            row("allocator_traits_is_always_equal", Cxx17, 201_411, &["memory"]),
            row("apply", Cxx17, 201_603, &["tuple"]),
            row("array_constexpr", Cxx17, 201_603, &["iterator"]),
            row("as_const", Cxx17, 201_510, &["utility"]),
            row("bind_front", Cxx2a, 201_811, &["functional"]),
            row("bool_constant", Cxx17, 201_505, &["type_traits"]),
            row("boyer_moore_searcher", Cxx17, 201_603, &["functional"]),
            row("chrono", Cxx17, 201_611, &["chrono"]),
            row("chrono_udls", Cxx14, 201_304, &["chrono"]),
            row(
                "constexpr_misc",
                Cxx2a,
                201_811,
                &["functional", "iterator", "tuple", "utility"],
            ),
            row("enable_shared_from_this", Cxx17, 201_603, &["memory"]),
            row("exchange_function", Cxx14, 201_304, &["utility"]),
            row(
                "has_unique_object_representations",
                Cxx17,
                201_606,
                &["type_traits"],
            ),
            row("integer_sequence", Cxx14, 201_304, &["utility"]),
            row("integral_constant_callable", Cxx14, 201_304, &["type_traits"]),
            row("invoke", Cxx17, 201_411, &["functional"]),
            row("is_aggregate", Cxx17, 201_703, &["type_traits"]),
            row("is_final", Cxx14, 201_402, &["type_traits"]),
            row("is_invocable", Cxx17, 201_703, &["type_traits"]),
            row("is_null_pointer", Cxx14, 201_309, &["type_traits"]),
            row("is_swappable", Cxx17, 201_603, &["type_traits"]),
            row("logical_traits", Cxx17, 201_510, &["type_traits"]),
            row("make_from_tuple", Cxx17, 201_606, &["tuple"]),
            row("make_reverse_iterator", Cxx14, 201_402, &["iterator"]),
            row("make_unique", Cxx14, 201_304, &["memory"]),
            row("nonmember_container_access", Cxx17, 201_411, &["iterator"]),
            row("not_fn", Cxx17, 201_603, &["functional"]),
            row("null_iterators", Cxx14, 201_304, &["iterator"]),
            row("raw_memory_algorithms", Cxx17, 201_606, &["memory"]),
            row(
                "result_of_sfinae",
                Cxx14,
                201_210,
                &["functional", "type_traits"],
            ),
            row("shared_ptr_arrays", Cxx17, 201_611, &["memory"]),
            row("shared_ptr_weak_type", Cxx17, 201_606, &["memory"]),
            row("to_chars", Cxx17, 201_611, &["utility"]),
            row(
                "transformation_trait_aliases",
                Cxx14,
                201_304,
                &["type_traits"],
            ),
            row(
                "transparent_operators",
                Cxx14,
                201_210,
                &["functional", "memory"],
            ),
            row("tuple_element_t", Cxx14, 201_402, &["tuple"]),
            row("tuples_by_type", Cxx14, 201_304, &["tuple", "utility"]),
            row(
                "type_trait_variable_templates",
                Cxx17,
                201_510,
                &["type_traits"],
            ),
            row("uncaught_exceptions", Cxx17, 201_411, &["exception"]),
            row("variant", Cxx17, 201_606, &["variant"]),
            row("void_t", Cxx17, 201_411, &["type_traits"]),
        ];
        for def in &mut definitions {
            if def.name == "__cpp_lib_transparent_operators" {
                def.revisions.push(ValueRevision {
                    standard: Cxx17,
                    value: 201_510,
                });
            }
        }
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        Self { definitions }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_is_valid() {
        let builtin = Catalog::builtin();
        let rebuilt = Catalog::new(builtin.definitions().to_vec()).unwrap();
        assert_eq!(rebuilt, builtin);
    }

    #[test]
    fn tuple_header_rows_are_sorted() {
        let catalog = Catalog::builtin();
        let names: Vec<&str> = catalog
            .for_header("tuple")
            .unwrap()
            .into_iter()
            .map(|def| def.name.as_str())
            .collect();
        assert_eq!(
            names,
            vec![
                "__cpp_lib_apply",
                "__cpp_lib_constexpr_misc",
                "__cpp_lib_make_from_tuple",
                "__cpp_lib_tuple_element_t",
                "__cpp_lib_tuples_by_type",
            ]
        );
    }

    #[test]
    fn unknown_header_is_an_error() {
        let err = Catalog::builtin().for_header("regex").unwrap_err();
        assert!(matches!(err, CatalogError::UnknownHeader(h) if h == "regex"));
    }

    #[test]
    fn resolve_applies_overrides_per_implementation() {
        let catalog = Catalog::builtin();
        let overrides = OverrideTable::builtin();
        let cuda = catalog
            .resolve("utility", &overrides, Implementation::Libcudacxx)
            .unwrap();
        let suppressed: Vec<&str> = cuda
            .expectations
            .iter()
            .filter(|e| e.suppressed_by_implementation)
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(suppressed, vec!["__cpp_lib_constexpr_misc", "__cpp_lib_to_chars"]);

        let generic = catalog
            .resolve("utility", &overrides, Implementation::Generic)
            .unwrap();
        assert!(generic.expectations.iter().all(|e| !e.suppressed_by_implementation));
    }

    #[test]
    fn headers_cover_generated_tests() {
        let headers = Catalog::builtin().headers();
        for header in ["exception", "tuple", "utility"] {
            assert!(headers.iter().any(|h| h == header), "missing <{header}>");
        }
        let mut sorted = headers.clone();
        sorted.sort();
        assert_eq!(sorted, headers);
    }

    #[test]
    fn validation_rejects_bad_rows() {
        let good = MacroDefinition {
            name: "__cpp_lib_demo".into(),
            introduced_in: Standard::Cxx17,
            value: 201_700,
            revisions: Vec::new(),
            headers: vec!["demo".into()],
        };

        let dup = Catalog::new(vec![good.clone(), good.clone()]).unwrap_err();
        assert!(matches!(dup, CatalogError::Duplicate(_)));

        let mut bad_name = good.clone();
        bad_name.name = "FEATURE_DEMO".into();
        assert!(matches!(
            Catalog::new(vec![bad_name]).unwrap_err(),
            CatalogError::Invalid { .. }
        ));

        let mut no_headers = good.clone();
        no_headers.headers.clear();
        assert!(Catalog::new(vec![no_headers]).is_err());

        let mut early_revision = good.clone();
        early_revision.revisions.push(ValueRevision {
            standard: Standard::Cxx14,
            value: 201_400,
        });
        assert!(Catalog::new(vec![early_revision]).is_err());

        let mut zero_revision = good.clone();
        zero_revision.revisions.push(ValueRevision {
            standard: Standard::Cxx2a,
            value: 0,
        });
        assert!(matches!(
            Catalog::new(vec![zero_revision]).unwrap_err(),
            CatalogError::Invalid { reason, .. } if reason.contains("revision values")
        ));

        let mut zero = good;
        zero.value = 0;
        assert!(Catalog::new(vec![zero]).is_err());
    }

    #[test]
    fn json_catalog_loads_and_validates() {
        let json = r#"{
            "definitions": [
                {"name": "__cpp_lib_apply", "introduced_in": "c++17", "value": 201603, "headers": ["tuple"]},
                {"name": "__cpp_lib_tuple_element_t", "introduced_in": "c++14", "value": 201402, "headers": ["tuple"]}
            ]
        }"#;
        let catalog = Catalog::from_json(json).unwrap();
        assert_eq!(catalog.headers(), vec!["tuple".to_string()]);
        assert_eq!(catalog.definitions()[0].name, "__cpp_lib_apply");

        let bad = r#"{"definitions": [{"name": "__cpp_lib_x", "introduced_in": "c++17", "value": 1, "headers": []}]}"#;
        assert!(matches!(
            Catalog::from_json(bad).unwrap_err(),
            CatalogError::Invalid { .. }
        ));
    }

    #[test]
    fn markdown_lists_suppressions_and_revisions() {
        let md = Catalog::builtin().to_markdown(&OverrideTable::builtin());
        assert!(md.contains("| __cpp_lib_to_chars | 201611L | c++17 | utility | libcudacxx |"));
        assert!(md.contains("201210L, 201510L (c++17)"));
        assert!(md.contains("\n## Suppressions\n"));
        assert!(md.contains("- `__cpp_lib_to_chars` (libcudacxx): <charconv> is not implemented\n"));
        assert!(md.contains("| __cpp_lib_transparent_operators | 201210L, 201510L (c++17) | c++14 | functional, memory | - |"));
    }

    #[test]
    fn header_index_lists_macros_per_header() {
        let index = Catalog::builtin().header_index();
        let memory = &index["memory"];
        assert!(memory.contains(&"__cpp_lib_transparent_operators".to_string()));
        assert!(memory.contains(&"__cpp_lib_make_unique".to_string()));
        assert_eq!(
            index["tuple"],
            vec![
                "__cpp_lib_apply",
                "__cpp_lib_constexpr_misc",
                "__cpp_lib_make_from_tuple",
                "__cpp_lib_tuple_element_t",
                "__cpp_lib_tuples_by_type",
            ]
        );
    }
}
