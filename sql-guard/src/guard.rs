//! Text-in, decision-out entry point.

use crate::parse::{Dialect, ParseError, parse_statement};
use crate::{Policy, ValidationResult, validate};

/// Decision for one SQL text.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct CheckOutcome {
    /// True when the text parsed and satisfied the policy.
    pub allowed: bool,
    /// Empty when allowed. Otherwise the parser's error text or the
    /// violation diagnostic (which may itself be empty).
    pub message: String,
    /// Set only when the text did not parse.
    pub parse_error: Option<ParseError>,
}

impl CheckOutcome {
    fn allowed() -> Self {
        Self {
            allowed: true,
            message: String::new(),
            parse_error: None,
        }
    }

    fn parse_failure(err: ParseError) -> Self {
        Self {
            allowed: false,
            message: err.message(),
            parse_error: Some(err),
        }
    }
}

impl From<ValidationResult> for CheckOutcome {
    fn from(result: ValidationResult) -> Self {
        Self {
            allowed: result.passed,
            message: result.message,
            parse_error: None,
        }
    }
}

/// Parse `sql` as MySQL and validate it against `policy`.
///
/// # Example
///
/// ```
/// use sql_guard::{Policy, check};
///
/// let policy = Policy::new().allow_tables(&["orders"]);
///
/// let outcome = check("SELECT id FROM customers", &policy);
/// assert!(!outcome.allowed);
/// assert_eq!(outcome.message, "disallowed table name: customers");
///
/// let outcome = check("SELECT id FROM orders", &policy);
/// assert!(outcome.allowed);
/// ```
pub fn check(sql: &str, policy: &Policy) -> CheckOutcome {
    check_with_dialect(sql, policy, Dialect::MySql)
}

/// [`check`] with an explicit dialect.
pub fn check_with_dialect(sql: &str, policy: &Policy, dialect: Dialect) -> CheckOutcome {
    let statement = match parse_statement(sql, dialect) {
        Ok(statement) => statement,
        Err(err) => {
            tracing::debug!(error = %err, %dialect, "statement did not parse");
            return CheckOutcome::parse_failure(err);
        },
    };

    ValidationResult::from(validate(&statement, policy)).into()
}

/// A policy and dialect bundled for repeated checks.
///
/// # Example
///
/// ```
/// use sql_guard::{Guard, Policy};
/// use sql_guard::parse::Dialect;
///
/// let guard = Guard::new(Policy::new().allow_safe_functions())
///     .dialect(Dialect::PostgreSql);
///
/// assert!(guard.check("SELECT COUNT(*) FROM events").allowed);
/// assert!(!guard.check("DELETE FROM events").allowed);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Guard {
    policy: Policy,
    dialect: Dialect,
}

impl Guard {
    /// Guard with the default (MySQL) dialect.
    pub fn new(policy: Policy) -> Self {
        Self {
            policy,
            dialect: Dialect::MySql,
        }
    }

    /// Use another dialect.
    #[must_use]
    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// The policy in use.
    pub const fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Check one SQL text.
    pub fn check(&self, sql: &str) -> CheckOutcome {
        check_with_dialect(sql, &self.policy, self.dialect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlparser::dialect::MySqlDialect;
    use sqlparser::parser::Parser;

    #[test]
    fn test_parse_failure_outcome() {
        let outcome = check("SELEC 1", &Policy::new());
        assert!(!outcome.allowed);
        assert!(matches!(outcome.parse_error, Some(ParseError::Syntax(_))));
        assert!(!outcome.message.is_empty());
    }

    #[test]
    fn test_parse_failure_message_is_parser_text() {
        let parser_text = Parser::parse_sql(&MySqlDialect {}, "SELEC 1")
            .unwrap_err()
            .to_string();
        let outcome = check("SELEC 1", &Policy::new());
        assert_eq!(outcome.message, parser_text);
        assert_eq!(
            outcome.parse_error.map(|e| e.to_string()),
            Some(format!("SQL syntax error: {parser_text}"))
        );
    }

    #[test]
    fn test_empty_input_is_a_parse_failure() {
        let outcome = check("", &Policy::new());
        assert_eq!(outcome.parse_error, Some(ParseError::Empty));
    }

    #[test]
    fn test_violation_outcome_has_no_parse_error() {
        let outcome = check("DELETE FROM t", &Policy::new());
        assert!(!outcome.allowed);
        assert_eq!(outcome.message, "unsupported statement");
        assert!(outcome.parse_error.is_none());
    }

    #[test]
    fn test_allowed_outcome() {
        let outcome = check("SELECT a FROM t", &Policy::new());
        assert_eq!(outcome, CheckOutcome::allowed());
    }

    #[test]
    fn test_guard_reuse() {
        let guard = Guard::new(Policy::new().allow_tables(&["t"]));
        assert!(guard.check("SELECT * FROM t").allowed);
        assert!(!guard.check("SELECT * FROM u").allowed);
        assert!(guard.policy().tables.is_some());
    }
}
