//! Policy violations reported by the validator.

use thiserror::Error;

/// The first rule a statement broke.
///
/// `Display` always renders a descriptive text for logs. The caller-facing
/// diagnostic is [`Violation::message`], which is intentionally empty for
/// unrecognized expression shapes and anonymous function calls.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum Violation {
    /// Top-level or nested statement is not a plain `SELECT`.
    #[error("unsupported statement")]
    UnsupportedStatement,
    /// A `FROM` entry of a shape the guard does not admit.
    #[error("unsupported table expression")]
    UnsupportedTableExpr,
    /// A projection entry of a shape the guard does not admit.
    #[error("unsupported select item")]
    UnsupportedSelectItem,
    /// Table name missing from the table allowlist.
    #[error("disallowed table name: {0}")]
    TableNotAllowed(String),
    /// Database/schema qualifier missing from (or without) a qualifier allowlist.
    #[error("disallowed table qualifier: {0}")]
    QualifierNotAllowed(String),
    /// Column name missing from the column allowlist.
    #[error("disallowed column name: {0}")]
    ColumnNotAllowed(String),
    /// Function name missing from (or without) a function allowlist.
    #[error("disallowed function name: {0}")]
    FunctionNotAllowed(String),
    /// Function qualifier missing from the function ident allowlist.
    #[error("disallowed function qualifier: {0}")]
    FunctionIdentNotAllowed(String),
    /// `VALUES(col)` only exists to serve writes.
    #[error("VALUES() is not allowed in a read-only query")]
    ValuesFunction,
    /// Expression shape with no allow/deny rule.
    #[error("unrecognized expression: {0}")]
    UnrecognizedExpression(String),
    /// Function call with neither name nor qualifier.
    #[error("function call without a name")]
    AnonymousFunction,
    /// Statement nests deeper than the configured ceiling.
    #[error("statement nesting exceeds maximum depth {max}")]
    NestingTooDeep {
        /// The configured ceiling.
        max: usize,
    },
}

impl Violation {
    /// Diagnostic handed back to callers.
    pub fn message(&self) -> String {
        if self.is_silent() {
            String::new()
        } else {
            self.to_string()
        }
    }

    /// True for violations that carry no caller-facing diagnostic.
    #[inline]
    pub const fn is_silent(&self) -> bool {
        matches!(self, Self::UnrecognizedExpression(_) | Self::AnonymousFunction)
    }
}

/// Outcome of one validation call: `(passed, message)`.
///
/// `message` is empty when `passed` is true, and also for the silent
/// violations described on [`Violation`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[non_exhaustive]
pub struct ValidationResult {
    /// Whether the statement satisfied the policy.
    pub passed: bool,
    /// Diagnostic for the first violation.
    pub message: String,
}

impl ValidationResult {
    /// A passing result.
    pub const fn pass() -> Self {
        Self {
            passed: true,
            message: String::new(),
        }
    }
}

impl From<Result<(), Violation>> for ValidationResult {
    fn from(result: Result<(), Violation>) -> Self {
        match result {
            Ok(()) => Self::pass(),
            Err(violation) => Self {
                passed: false,
                message: violation.message(),
            },
        }
    }
}
