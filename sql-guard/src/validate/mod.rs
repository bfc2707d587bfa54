//! Recursive policy validator.
//!
//! Walks a [`Statement`] in a fixed order and stops at the first violation:
//! projection, `FROM` sources, `WHERE`, `GROUP BY`, `HAVING`, `ORDER BY`,
//! `LIMIT` offset, `LIMIT` row count. Subqueries are walked with the same
//! policy wherever they appear.
//!
//! Each node kind is either recursed into, handed to the identifier
//! [rules](crate::policy), or rejected outright. A depth ceiling
//! ([`Policy::max_depth`]) bounds the recursion for untrusted input.
//!
//! # Example
//!
//! ```
//! use sql_guard::{Policy, Violation, validate};
//! use sql_guard::ast::{Expr, QualifiedName, Select, SelectItem, TableSource};
//!
//! let select = Select {
//!     items: vec![SelectItem::expr(Expr::column("id"))],
//!     from: vec![TableSource::table(QualifiedName::new("orders"))],
//!     ..Select::default()
//! };
//!
//! let policy = Policy::new().allow_tables(&["customers"]);
//! assert_eq!(
//!     validate(&select.into_statement(), &policy),
//!     Err(Violation::TableNotAllowed("orders".into()))
//! );
//! ```

mod expr;
mod statement;
mod violation;

pub use violation::{ValidationResult, Violation};

use crate::Policy;
use crate::ast::{Expr, SelectItem, Statement, TableSource};

/// Validate a statement against a policy.
///
/// Stateless: the same statement and policy always produce the same result.
pub fn validate(statement: &Statement, policy: &Policy) -> Result<(), Violation> {
    let result = Validator::new(policy).check_statement(statement);
    match &result {
        Ok(()) => tracing::debug!("statement accepted"),
        Err(violation) => tracing::debug!(%violation, "statement rejected"),
    }
    result
}

/// Validate a statement that may be absent. An absent statement passes.
pub fn validate_optional(statement: Option<&Statement>, policy: &Policy) -> Result<(), Violation> {
    statement.map_or(Ok(()), |s| validate(s, policy))
}

/// Validate a single expression in isolation.
pub fn check_expr(expr: &Expr, policy: &Policy) -> Result<(), Violation> {
    Validator::new(policy).check_expr(expr)
}

/// Validate a single `FROM` entry in isolation.
pub fn check_table_source(source: &TableSource, policy: &Policy) -> Result<(), Violation> {
    Validator::new(policy).check_table_source(source)
}

/// Validate a single projection entry in isolation.
pub fn check_select_item(item: &SelectItem, policy: &Policy) -> Result<(), Violation> {
    Validator::new(policy).check_select_item(item)
}

/// Walk state for one validation call.
///
/// Private to a single call; only the policy reference is shared.
struct Validator<'p> {
    policy: &'p Policy,
    depth: usize,
}

impl<'p> Validator<'p> {
    const fn new(policy: &'p Policy) -> Self {
        Self { policy, depth: 0 }
    }

    /// Run `f` one level deeper, failing once the ceiling is reached.
    fn nested<F>(&mut self, f: F) -> Result<(), Violation>
    where
        F: FnOnce(&mut Self) -> Result<(), Violation>,
    {
        if self.depth >= self.policy.max_depth {
            return Err(Violation::NestingTooDeep {
                max: self.policy.max_depth,
            });
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn check_opt_expr(&mut self, expr: Option<&Expr>) -> Result<(), Violation> {
        expr.map_or(Ok(()), |e| self.check_expr(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{QualifiedName, Select, StatementKind};

    fn select_from(table: &str) -> Statement {
        Select {
            items: vec![SelectItem::expr(Expr::column("a"))],
            from: vec![TableSource::table(QualifiedName::new(table))],
            ..Select::default()
        }
        .into_statement()
    }

    #[test]
    fn test_absent_statement_passes() {
        assert!(validate_optional(None, &Policy::new()).is_ok());
    }

    #[test]
    fn test_validate_is_idempotent() {
        let policy = Policy::new().allow_tables(&["t"]);
        let statement = select_from("u");
        let first = validate(&statement, &policy);
        let second = validate(&statement, &policy);
        assert_eq!(first, second);
        assert_eq!(first, Err(Violation::TableNotAllowed("u".into())));
    }

    #[test]
    fn test_unsupported_statement_ignores_policy() {
        let statement = Statement::Unsupported(StatementKind::Delete);
        let permissive = Policy::new()
            .allow_tables(&["t"])
            .allow_qualifiers(&["db"])
            .allow_safe_functions();
        assert_eq!(
            validate(&statement, &permissive),
            Err(Violation::UnsupportedStatement)
        );
    }

    #[test]
    fn test_depth_ceiling() {
        let mut expr = Expr::column("a");
        for _ in 0..10 {
            expr = Expr::Paren(Box::new(expr));
        }

        let shallow = Policy::new().max_depth(4);
        assert_eq!(
            check_expr(&expr, &shallow),
            Err(Violation::NestingTooDeep { max: 4 })
        );

        let deep_enough = Policy::new().max_depth(11);
        assert!(check_expr(&expr, &deep_enough).is_ok());
    }

    #[test]
    fn test_depth_ceiling_counts_subqueries() {
        let mut statement = select_from("t");
        for _ in 0..5 {
            statement = Select {
                items: vec![SelectItem::expr(Expr::Subquery(Box::new(statement)))],
                ..Select::default()
            }
            .into_statement();
        }
        // Innermost: statement, column, table (3). Each wrapper: statement, subquery (2).
        assert!(validate(&statement, &Policy::new().max_depth(13)).is_ok());
        assert!(validate(&statement, &Policy::new().max_depth(12)).is_err());
        assert!(validate(&statement, &Policy::new().max_depth(8)).is_err());
    }
}
