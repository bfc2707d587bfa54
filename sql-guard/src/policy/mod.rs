//! Policy configuration: which identifiers a query may reference.
//!
//! A [`Policy`] carries five independent allowlist slots. Every slot is an
//! `Option`: `None` means the category is not configured, `Some` with an empty
//! list means it is configured and nothing is allowed. The two states behave
//! differently and are kept apart by every constructor and loader.
//!
//! # Example
//!
//! ```
//! use sql_guard::Policy;
//!
//! let policy = Policy::new()
//!     .allow_tables(&["orders", "customers"])
//!     .allow_columns(&["id", "total", "customer_id"])
//!     .allow_functions(&["count", "sum"])
//!     .max_depth(16);
//!
//! assert!(policy.tables.is_some());
//! assert!(policy.qualifiers.is_none());
//! ```

mod load;
pub(crate) mod rules;

use std::collections::BTreeSet;

pub use load::PolicyError;
pub use rules::{check_column_name, check_column_ref, check_function_name, check_table_name};

/// Default recursion ceiling for nested expressions, sources and subqueries.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Functions that only read and transform values.
///
/// Handy starting point for [`Policy::allow_safe_functions`].
pub const SAFE_FUNCTIONS: &[&str] = &[
    "SUM",
    "AVG",
    "MAX",
    "MIN",
    "COUNT",
    "CONCAT",
    "SUBSTRING",
    "CHAR_LENGTH",
    "LOWER",
    "UPPER",
    "NOW",
    "DATE_FORMAT",
    "DATE_ADD",
    "DATEDIFF",
    "ABS",
    "CEIL",
    "FLOOR",
    "EXP",
    "LOG",
    "AND",
    "OR",
    "NOT",
    "CAST",
    "CONVERT",
    "COALESCE",
    "NULLIF",
];

/// A set of permitted identifier values for one category.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Allowlist {
    entries: BTreeSet<String>,
}

impl Allowlist {
    /// An allowlist that permits nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Exact-match membership.
    #[inline]
    pub fn contains(&self, value: &str) -> bool {
        self.entries.contains(value)
    }

    /// Number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is permitted.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    /// Same entries, upper-cased. Used for the case-insensitive function slot.
    fn to_uppercase(&self) -> Self {
        self.iter().map(str::to_uppercase).collect()
    }
}

impl<S: Into<String>> FromIterator<S> for Allowlist {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<&[&str]> for Allowlist {
    fn from(values: &[&str]) -> Self {
        values.iter().copied().collect()
    }
}

/// Immutable allowlist bundle passed to every validation call.
///
/// `Policy` is read-only during validation and can be shared across threads.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct Policy {
    /// Allowed table names. Absent = any table.
    pub tables: Option<Allowlist>,
    /// Allowed database/schema qualifiers. Absent = no qualifier may be written.
    pub qualifiers: Option<Allowlist>,
    /// Allowed column names, bare or backquoted. Absent = any column.
    pub columns: Option<Allowlist>,
    /// Allowed function names, stored upper-case. Absent = no function may be called.
    pub functions: Option<Allowlist>,
    /// Allowed function qualifiers. Absent = any qualifier.
    pub function_idents: Option<Allowlist>,
    /// Recursion ceiling for the tree walk.
    pub max_depth: usize,
}

impl Policy {
    /// A policy with every slot absent.
    ///
    /// This is not "allow everything": qualifiers and function calls are
    /// denied until their slots are configured.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            tables: None,
            qualifiers: None,
            columns: None,
            functions: None,
            function_idents: None,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Set the table allowlist.
    #[must_use]
    pub fn allow_tables(mut self, tables: &[&str]) -> Self {
        self.tables = Some(Allowlist::from(tables));
        self
    }

    /// Set the database/schema qualifier allowlist.
    #[must_use]
    pub fn allow_qualifiers(mut self, qualifiers: &[&str]) -> Self {
        self.qualifiers = Some(Allowlist::from(qualifiers));
        self
    }

    /// Set the column allowlist.
    ///
    /// An entry written as `` `col` `` matches both `col` and `` `col` `` in queries.
    #[must_use]
    pub fn allow_columns(mut self, columns: &[&str]) -> Self {
        self.columns = Some(Allowlist::from(columns));
        self
    }

    /// Set the function name allowlist. Matching ignores case.
    #[must_use]
    pub fn allow_functions(mut self, functions: &[&str]) -> Self {
        self.functions = Some(Allowlist::from(functions).to_uppercase());
        self
    }

    /// Set the function name allowlist to [`SAFE_FUNCTIONS`].
    #[must_use]
    pub fn allow_safe_functions(self) -> Self {
        self.allow_functions(SAFE_FUNCTIONS)
    }

    /// Set the function qualifier allowlist.
    #[must_use]
    pub fn allow_function_idents(mut self, idents: &[&str]) -> Self {
        self.function_idents = Some(Allowlist::from(idents));
        self
    }

    /// Set the recursion ceiling.
    #[must_use]
    pub const fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Assemble a policy from already-built slots.
    ///
    /// Function entries are upper-cased here as well.
    #[must_use]
    pub fn from_slots(
        tables: Option<Allowlist>,
        qualifiers: Option<Allowlist>,
        columns: Option<Allowlist>,
        functions: Option<Allowlist>,
        function_idents: Option<Allowlist>,
    ) -> Self {
        Self {
            tables,
            qualifiers,
            columns,
            functions: functions.as_ref().map(Allowlist::to_uppercase),
            function_idents,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl Default for Policy {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_has_every_slot_absent() {
        let policy = Policy::new();
        assert!(policy.tables.is_none());
        assert!(policy.qualifiers.is_none());
        assert!(policy.columns.is_none());
        assert!(policy.functions.is_none());
        assert!(policy.function_idents.is_none());
        assert_eq!(policy.max_depth, DEFAULT_MAX_DEPTH);
    }

    #[test]
    fn test_empty_slot_is_not_absent() {
        let policy = Policy::new().allow_tables(&[]);
        assert_eq!(policy.tables, Some(Allowlist::empty()));
        assert_ne!(policy.tables, None);
    }

    #[test]
    fn test_builder() {
        let policy = Policy::new()
            .allow_tables(&["a", "b"])
            .allow_qualifiers(&["db"])
            .allow_columns(&["x"])
            .allow_function_idents(&["util"])
            .max_depth(3);

        assert_eq!(policy.tables.as_ref().map(Allowlist::len), Some(2));
        assert!(policy.qualifiers.as_ref().is_some_and(|q| q.contains("db")));
        assert!(policy.columns.as_ref().is_some_and(|c| c.contains("x")));
        assert!(policy.function_idents.as_ref().is_some_and(|f| f.contains("util")));
        assert_eq!(policy.max_depth, 3);
    }

    #[test]
    fn test_function_entries_are_uppercased() {
        let policy = Policy::new().allow_functions(&["count", "Date_Format"]);
        let functions = policy.functions.unwrap();
        assert!(functions.contains("COUNT"));
        assert!(functions.contains("DATE_FORMAT"));
        assert!(!functions.contains("count"));
    }

    #[test]
    fn test_from_slots_uppercases_functions() {
        let policy = Policy::from_slots(None, None, None, Some(["sum"].into_iter().collect()), None);
        assert!(policy.functions.unwrap().contains("SUM"));
    }

    #[test]
    fn test_safe_functions() {
        let policy = Policy::new().allow_safe_functions();
        let functions = policy.functions.unwrap();
        assert_eq!(functions.len(), SAFE_FUNCTIONS.len());
        assert!(functions.contains("COALESCE"));
        assert!(!functions.contains("SLEEP"));
    }

    #[test]
    fn test_allowlist_iter_sorted() {
        let list: Allowlist = ["b", "a", "c"].into_iter().collect();
        assert_eq!(list.iter().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }
}
