// =============================================================================
// CRATE-LEVEL QUALITY LINTS (following Tokio/Serde standards)
// =============================================================================
#![forbid(unsafe_code)]
#![deny(unused_must_use)]
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![warn(rust_2018_idioms)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
// =============================================================================
// CLIPPY CONFIGURATION
// =============================================================================
#![allow(clippy::doc_markdown)] // SQL keywords in docs
#![allow(clippy::return_self_not_must_use)] // Builder methods return Self by design
#![allow(clippy::match_same_arms)] // One arm per node kind reads better than merged arms
#![allow(clippy::option_if_let_else)] // Nested Option matches are clearer than map_or_else chains

//! # sql-guard - Allowlist Guard for Read-Only SQL
//!
//! Decides whether a single SQL statement is an acceptable read-only query:
//! it must be a plain `SELECT`, and every table, qualifier, column and
//! function it references (subqueries included) must be on the configured
//! allowlists.
//!
//! ## Quick Start
//!
//! ```
//! use sql_guard::{Policy, check};
//!
//! let policy = Policy::new()
//!     .allow_tables(&["orders"])
//!     .allow_columns(&["id", "total"])
//!     .allow_functions(&["sum"]);
//!
//! assert!(check("SELECT id, SUM(total) FROM orders GROUP BY id", &policy).allowed);
//!
//! let outcome = check("SELECT password FROM orders", &policy);
//! assert!(!outcome.allowed);
//! assert_eq!(outcome.message, "disallowed column name: password");
//! ```
//!
//! ## Absent vs. Empty Slots
//!
//! Each allowlist slot is an `Option`. The defaults differ per category:
//!
//! | Slot | Absent (`None`) |
//! |------|-----------------|
//! | `tables` | any table |
//! | `qualifiers` | no `db.` prefix may be written |
//! | `columns` | any column |
//! | `functions` | no function may be called |
//! | `function_idents` | any function qualifier |
//!
//! `Some` with an empty list always means "nothing allowed".
//!
//! ## Validating a Tree Directly
//!
//! The [`ast`] types are the validator's input contract; the [`parse`]
//! module is one way to produce them.
//!
//! ```
//! use sql_guard::ast::Statement;
//! use sql_guard::parse::{Dialect, parse_statement};
//! use sql_guard::{Policy, Violation, validate};
//!
//! let statement = parse_statement("UPDATE t SET a = 1", Dialect::MySql).unwrap();
//! assert_eq!(validate(&statement, &Policy::new()), Err(Violation::UnsupportedStatement));
//! ```

pub mod ast;
mod guard;
pub mod parse;
mod policy;
mod validate;

pub use guard::{CheckOutcome, Guard, check, check_with_dialect};
pub use parse::{Dialect, ParseError, parse_statement};
pub use policy::{
    Allowlist, DEFAULT_MAX_DEPTH, Policy, PolicyError, SAFE_FUNCTIONS, check_column_name,
    check_column_ref, check_function_name, check_table_name,
};
pub use validate::{
    ValidationResult, Violation, check_expr, check_select_item, check_table_source, validate,
    validate_optional,
};

/// Prelude module for convenient imports.
///
/// ```
/// use sql_guard::prelude::*;
///
/// let guard = Guard::new(Policy::new().allow_tables(&["t"]));
/// assert!(guard.check("SELECT a FROM t").allowed);
/// ```
pub mod prelude {
    pub use crate::{
        CheckOutcome, Dialect, Guard, ParseError, Policy, PolicyError, ValidationResult,
        Violation, check, check_with_dialect, validate,
    };
}

// ============================================================================
// API Contract Tests (compile-time assertions)
// ============================================================================
