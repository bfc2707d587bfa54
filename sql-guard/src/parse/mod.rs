//! SQL text to [`Statement`](crate::ast::Statement).
//!
//! Text is parsed with `sqlparser` and then lowered into the guard's own tree.
//! Shapes with no counterpart in that tree become `Unsupported` /
//! `Unrecognized` nodes, which the validator rejects.

mod lower;

use std::fmt;
use std::str::FromStr;

use sqlparser::dialect::{
    Dialect as SqlDialect, GenericDialect, MySqlDialect, PostgreSqlDialect, SQLiteDialect,
};
use sqlparser::parser::Parser;
use thiserror::Error;

use crate::ast::Statement;

/// SQL dialect used to read the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum Dialect {
    /// MySQL (default).
    #[default]
    MySql,
    /// ANSI-ish generic dialect.
    Generic,
    /// PostgreSQL.
    PostgreSql,
    /// SQLite.
    Sqlite,
}

impl Dialect {
    /// All dialects, in CLI listing order.
    pub const ALL: [Self; 4] = [Self::MySql, Self::Generic, Self::PostgreSql, Self::Sqlite];

    /// Lower-case name as accepted by [`FromStr`].
    pub const fn name(self) -> &'static str {
        match self {
            Self::MySql => "mysql",
            Self::Generic => "generic",
            Self::PostgreSql => "postgres",
            Self::Sqlite => "sqlite",
        }
    }

    fn sql_dialect(self) -> Box<dyn SqlDialect> {
        match self {
            Self::MySql => Box::new(MySqlDialect {}),
            Self::Generic => Box::new(GenericDialect {}),
            Self::PostgreSql => Box::new(PostgreSqlDialect {}),
            Self::Sqlite => Box::new(SQLiteDialect {}),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dialect {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mysql" => Ok(Self::MySql),
            "generic" | "ansi" => Ok(Self::Generic),
            "postgres" | "postgresql" => Ok(Self::PostgreSql),
            "sqlite" => Ok(Self::Sqlite),
            _ => Err(ParseError::UnknownDialect(s.to_string())),
        }
    }
}

/// Failure to turn text into exactly one statement.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// The parser rejected the input.
    #[error("SQL syntax error: {0}")]
    Syntax(String),
    /// The input holds no statement.
    #[error("empty SQL statement")]
    Empty,
    /// The input holds more than one statement.
    #[error("expected a single statement, found {0}")]
    MultipleStatements(usize),
    /// Dialect name not recognized.
    #[error("unknown SQL dialect '{0}'")]
    UnknownDialect(String),
}

impl ParseError {
    /// Caller-facing text: the parser's own message for syntax errors.
    pub fn message(&self) -> String {
        match self {
            Self::Syntax(text) => text.clone(),
            other => other.to_string(),
        }
    }
}

impl From<sqlparser::parser::ParserError> for ParseError {
    fn from(err: sqlparser::parser::ParserError) -> Self {
        Self::Syntax(err.to_string())
    }
}

/// Parse exactly one statement and lower it.
///
/// # Example
///
/// ```
/// use sql_guard::ast::Statement;
/// use sql_guard::parse::{Dialect, parse_statement};
///
/// let statement = parse_statement("SELECT id FROM users", Dialect::MySql).unwrap();
/// assert!(matches!(statement, Statement::Select(_)));
/// ```
pub fn parse_statement(sql: &str, dialect: Dialect) -> Result<Statement, ParseError> {
    let parsed = Parser::parse_sql(dialect.sql_dialect().as_ref(), sql)?;

    match parsed.as_slice() {
        [] => Err(ParseError::Empty),
        [statement] => Ok(lower::statement(statement)),
        many => Err(ParseError::MultipleStatements(many.len())),
    }
}
