//! The set of macros a compiler reports after including a header.
//!
//! Input is the output of `-dM -E`: one `#define` per line. Only names and
//! replacement text are kept; evaluation is limited to the integer literals
//! feature-test macros expand to.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MacroTableError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: expected `#define NAME [VALUE]`, got: {text}")]
    Malformed { line: usize, text: String },
}

/// Replacement text of one macro.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroValue {
    /// Replacement list as printed by the preprocessor (may be empty).
    pub text: String,
    /// Parameter list for function-like macros, without parentheses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<String>,
}

impl MacroValue {
    #[must_use]
    pub fn object(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            params: None,
        }
    }

    #[must_use]
    pub const fn is_function_like(&self) -> bool {
        self.params.is_some()
    }

    /// Evaluate the replacement text as a C integer literal.
    ///
    /// Accepts decimal, hex and octal forms, `u`/`l`/`ll` suffixes in any
    /// case, digit separators and redundant parentheses. Anything else,
    /// including function-like macros, yields `None`.
    #[must_use]
    pub fn as_integer(&self) -> Option<i64> {
        if self.is_function_like() {
            return None;
        }
        parse_integer_literal(&self.text)
    }
}

fn parse_integer_literal(raw: &str) -> Option<i64> {
    let mut text = raw.trim();
    while let Some(inner) = text.strip_prefix('(').and_then(|t| t.strip_suffix(')')) {
        text = inner.trim();
    }
    let body = text.trim_end_matches(['u', 'U', 'l', 'L']);
    if body.is_empty() || !is_integer_suffix(&text[body.len()..]) {
        return None;
    }
    let digits: String = body.chars().filter(|c| *c != '\'').collect();
    let (radix, digits) = if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        (16, hex)
    } else if digits.len() > 1 && digits.starts_with('0') {
        (8, &digits[1..])
    } else {
        (10, digits.as_str())
    };
    // from_str_radix would also take a sign.
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    i64::from_str_radix(digits, radix).ok()
}

/// `u`, `l`, `ll` and their unsigned combinations in either order.
fn is_integer_suffix(suffix: &str) -> bool {
    let length = suffix
        .strip_prefix(['u', 'U'])
        .or_else(|| suffix.strip_suffix(['u', 'U']))
        .unwrap_or(suffix);
    matches!(length, "" | "l" | "L" | "ll" | "LL")
}

/// Macro name → value, ordered by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MacroTable {
    macros: BTreeMap<String, MacroValue>,
}

impl MacroTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table of object-like macros from `(name, text)` pairs.
    #[must_use]
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut table = Self::new();
        for (name, text) in pairs {
            table.define(name, MacroValue::object(text));
        }
        table
    }

    /// Parse preprocessor `-dM` output.
    pub fn parse_dump(dump: &str) -> Result<Self, MacroTableError> {
        let mut table = Self::new();
        for (idx, raw) in dump.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            let (name, value) = parse_define(line).ok_or_else(|| MacroTableError::Malformed {
                line: idx + 1,
                text: line.to_string(),
            })?;
            table.define(name, value);
        }
        Ok(table)
    }

    /// Parse a `-dM` dump stored on disk.
    pub fn from_dump_file(path: &Path) -> Result<Self, MacroTableError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse_dump(&content)
    }

    /// Define or redefine a macro. The last definition wins.
    pub fn define(&mut self, name: impl Into<String>, value: MacroValue) -> &mut Self {
        self.macros.insert(name.into(), value);
        self
    }

    pub fn undefine(&mut self, name: &str) -> Option<MacroValue> {
        self.macros.remove(name)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&MacroValue> {
        self.macros.get(name)
    }

    #[must_use]
    pub fn is_defined(&self, name: &str) -> bool {
        self.macros.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.macros.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }
}

fn parse_define(line: &str) -> Option<(String, MacroValue)> {
    let rest = line.strip_prefix('#')?.trim_start().strip_prefix("define")?;
    if !rest.starts_with([' ', '\t']) {
        return None;
    }
    let rest = rest.trim_start();
    let name_len = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(rest.len());
    let name = &rest[..name_len];
    if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    let after = &rest[name_len..];
    if let Some(params_and_body) = after.strip_prefix('(') {
        let close = params_and_body.find(')')?;
        let value = MacroValue {
            text: params_and_body[close + 1..].trim().to_string(),
            params: Some(params_and_body[..close].trim().to_string()),
        };
        return Some((name.to_string(), value));
    }
    if !after.is_empty() && !after.starts_with([' ', '\t']) {
        return None;
    }
    Some((name.to_string(), MacroValue::object(after.trim())))
}
