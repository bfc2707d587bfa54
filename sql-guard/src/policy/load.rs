//! Loading policies from TOML and JSON documents.
//!
//! Both formats use the same keys:
//!
//! | Key | Slot |
//! |-----|------|
//! | `tables` | table names |
//! | `qualifiers` | database/schema qualifiers |
//! | `columns` | column names |
//! | `functions` | function names |
//! | `function_idents` | function qualifiers |
//! | `max_depth` | recursion ceiling (integer) |
//!
//! A missing key (or JSON `null`) leaves the slot absent; `[]` configures it
//! as empty. The header-style keys `Allow-Table-Name`, `Allow-DataBase-Name`,
//! `Allow-Col-Name`, `Allow-Func-Name` and `Allow-Func-Ident` are accepted as
//! aliases.

use super::{Allowlist, DEFAULT_MAX_DEPTH, Policy};
use miniserde::json::{Number, Value as JsonValue};
use serde::Deserialize;
use thiserror::Error;

/// Error type for policy loading.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum PolicyError {
    /// Malformed TOML, or a TOML document with the wrong shape.
    #[error("invalid policy TOML: {0}")]
    Toml(String),
    /// Malformed JSON syntax or encoding.
    #[error("invalid policy JSON")]
    InvalidJson,
    /// The JSON document is not an object.
    #[error("policy must be a JSON object")]
    ExpectedObject,
    /// Key not recognized.
    #[error("unknown policy key '{0}'")]
    UnknownKey(String),
    /// A slot value is not a list of strings.
    #[error("policy key '{0}' expects a list of strings")]
    ExpectedStringList(String),
    /// `max_depth` is not a non-negative integer.
    #[error("policy key 'max_depth' expects a non-negative integer")]
    InvalidMaxDepth,
    /// The same slot was given twice (e.g. under its name and its alias).
    #[error("policy slot '{0}' is configured more than once")]
    DuplicateSlot(&'static str),
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PolicyDocument {
    #[serde(default, alias = "Allow-Table-Name")]
    tables: Option<Vec<String>>,
    #[serde(default, alias = "Allow-DataBase-Name")]
    qualifiers: Option<Vec<String>>,
    #[serde(default, alias = "Allow-Col-Name")]
    columns: Option<Vec<String>>,
    #[serde(default, alias = "Allow-Func-Name")]
    functions: Option<Vec<String>>,
    #[serde(default, alias = "Allow-Func-Ident")]
    function_idents: Option<Vec<String>>,
    #[serde(default)]
    max_depth: Option<usize>,
}

impl PolicyDocument {
    fn into_policy(self) -> Policy {
        let slot = |values: Option<Vec<String>>| values.map(|v| v.into_iter().collect::<Allowlist>());
        Policy::from_slots(
            slot(self.tables),
            slot(self.qualifiers),
            slot(self.columns),
            slot(self.functions),
            slot(self.function_idents),
        )
        .max_depth(self.max_depth.unwrap_or(DEFAULT_MAX_DEPTH))
    }
}

/// Map a key (canonical or alias) to its canonical slot name.
fn canonical_key(key: &str) -> Option<&'static str> {
    match key {
        "tables" | "Allow-Table-Name" => Some("tables"),
        "qualifiers" | "Allow-DataBase-Name" => Some("qualifiers"),
        "columns" | "Allow-Col-Name" => Some("columns"),
        "functions" | "Allow-Func-Name" => Some("functions"),
        "function_idents" | "Allow-Func-Ident" => Some("function_idents"),
        "max_depth" => Some("max_depth"),
        _ => None,
    }
}

fn string_list(key: &str, value: &JsonValue) -> Result<Option<Vec<String>>, PolicyError> {
    match value {
        JsonValue::Null => Ok(None),
        JsonValue::Array(items) => items
            .iter()
            .map(|item| match item {
                JsonValue::String(s) => Ok(s.clone()),
                _ => Err(PolicyError::ExpectedStringList(key.to_string())),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some),
        _ => Err(PolicyError::ExpectedStringList(key.to_string())),
    }
}

fn depth(value: &JsonValue) -> Result<Option<usize>, PolicyError> {
    match value {
        JsonValue::Null => Ok(None),
        JsonValue::Number(Number::U64(n)) => usize::try_from(*n)
            .map(Some)
            .map_err(|_| PolicyError::InvalidMaxDepth),
        JsonValue::Number(Number::I64(n)) => usize::try_from(*n)
            .map(Some)
            .map_err(|_| PolicyError::InvalidMaxDepth),
        _ => Err(PolicyError::InvalidMaxDepth),
    }
}

impl Policy {
    /// Load a policy from a TOML document.
    ///
    /// # Example
    ///
    /// ```
    /// use sql_guard::Policy;
    ///
    /// let policy = Policy::from_toml(r#"
    ///     tables = ["orders"]
    ///     qualifiers = []
    ///     functions = ["count"]
    /// "#).unwrap();
    ///
    /// assert!(policy.qualifiers.is_some_and(|q| q.is_empty()));
    /// assert!(policy.columns.is_none());
    /// ```
    pub fn from_toml(source: &str) -> Result<Self, PolicyError> {
        let document: PolicyDocument =
            toml::from_str(source).map_err(|e| PolicyError::Toml(e.to_string()))?;
        Ok(document.into_policy())
    }

    /// Load a policy from a JSON document.
    ///
    /// # Example
    ///
    /// ```
    /// use sql_guard::Policy;
    ///
    /// let policy = Policy::from_json(r#"{"tables": ["orders"], "columns": null}"#).unwrap();
    /// assert!(policy.tables.is_some());
    /// assert!(policy.columns.is_none());
    /// ```
    pub fn from_json(source: &str) -> Result<Self, PolicyError> {
        let json: JsonValue =
            miniserde::json::from_str(source).map_err(|_| PolicyError::InvalidJson)?;
        let JsonValue::Object(object) = json else {
            return Err(PolicyError::ExpectedObject);
        };

        let mut document = PolicyDocument::default();
        let mut seen: Vec<&'static str> = Vec::new();

        for (key, value) in object.iter() {
            let slot = canonical_key(key).ok_or_else(|| PolicyError::UnknownKey(key.clone()))?;
            if seen.contains(&slot) {
                return Err(PolicyError::DuplicateSlot(slot));
            }
            seen.push(slot);

            match slot {
                "tables" => document.tables = string_list(key, value)?,
                "qualifiers" => document.qualifiers = string_list(key, value)?,
                "columns" => document.columns = string_list(key, value)?,
                "functions" => document.functions = string_list(key, value)?,
                "function_idents" => document.function_idents = string_list(key, value)?,
                _ => document.max_depth = depth(value)?,
            }
        }

        Ok(document.into_policy())
    }
}
