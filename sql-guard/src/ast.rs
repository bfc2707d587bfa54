//! Statement tree consumed by the validator.
//!
//! These types are the fixed input contract of the guard. The [`parse`](crate::parse)
//! module lowers the `sqlparser` tree into them, and callers holding a tree from
//! another parser can build them directly.
//!
//! Identifier slots use the empty string for "not supplied", matching how the
//! policy rules treat a missing qualifier or name.

// Plain data carriers: callers build these with struct literals.
#![allow(clippy::exhaustive_structs)]

use std::fmt;

/// A parsed statement. Only `Select` is ever accepted.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Statement {
    /// A single `SELECT` query block.
    Select(Box<Select>),
    /// Any other statement shape. Its contents are never inspected.
    Unsupported(StatementKind),
}

/// What kind of non-`SELECT` statement was seen (diagnostics only).
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StatementKind {
    /// `INSERT` / `REPLACE`
    Insert,
    /// `UPDATE`
    Update,
    /// `DELETE`
    Delete,
    /// `UNION`, `INTERSECT`, `EXCEPT`
    SetOperation,
    /// A bare `VALUES (...)` row constructor.
    Values,
    /// A query carrying a `WITH` clause.
    With,
    /// `SELECT ... INTO ...`
    SelectInto,
    /// A parenthesized query block, `(SELECT ...)`.
    Parenthesized,
    /// Anything else, labelled by its leading keyword.
    Other(String),
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Insert => f.write_str("INSERT"),
            Self::Update => f.write_str("UPDATE"),
            Self::Delete => f.write_str("DELETE"),
            Self::SetOperation => f.write_str("set operation"),
            Self::Values => f.write_str("VALUES"),
            Self::With => f.write_str("WITH"),
            Self::SelectInto => f.write_str("SELECT INTO"),
            Self::Parenthesized => f.write_str("parenthesized query"),
            Self::Other(keyword) => f.write_str(keyword),
        }
    }
}

/// A `SELECT` query block.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Select {
    /// Projection list.
    pub items: Vec<SelectItem>,
    /// `FROM` list.
    pub from: Vec<TableSource>,
    /// `WHERE` condition.
    pub selection: Option<Expr>,
    /// `GROUP BY` expressions.
    pub group_by: Vec<Expr>,
    /// `HAVING` condition.
    pub having: Option<Expr>,
    /// `ORDER BY` entries.
    pub order_by: Vec<OrderBy>,
    /// `LIMIT [offset,] row_count`.
    pub limit: Option<Limit>,
}

impl Select {
    /// Wrap into a [`Statement`].
    pub fn into_statement(self) -> Statement {
        Statement::Select(Box::new(self))
    }
}

/// One `ORDER BY` entry.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    /// Sort key.
    pub expr: Expr,
    /// `Some(true)` for `ASC`, `Some(false)` for `DESC`.
    pub asc: Option<bool>,
}

/// `LIMIT` clause.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Limit {
    /// Offset expression.
    pub offset: Option<Expr>,
    /// Row count expression.
    pub row_count: Option<Expr>,
}

/// A `(qualifier, name)` pair: `db.table` for tables, `schema.func` for functions.
#[derive(Debug, Clone, PartialEq, Eq, Default, Hash)]
pub struct QualifiedName {
    /// Database / schema prefix, empty when absent.
    pub qualifier: String,
    /// Object name, empty when absent.
    pub name: String,
}

impl QualifiedName {
    /// An unqualified name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            qualifier: String::new(),
            name: name.into(),
        }
    }

    /// A qualified name.
    pub fn qualified(qualifier: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            qualifier: qualifier.into(),
            name: name.into(),
        }
    }

    /// True when no name is present.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.qualifier.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}.{}", self.qualifier, self.name)
        }
    }
}

/// A column reference, `[[db.]table.]column`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ColumnRef {
    /// Table qualifier, empty when the column is bare.
    pub table: QualifiedName,
    /// Column name.
    pub name: String,
}

impl ColumnRef {
    /// A bare column.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            table: QualifiedName::default(),
            name: name.into(),
        }
    }

    /// A table-qualified column.
    pub fn with_table(table: QualifiedName, name: impl Into<String>) -> Self {
        Self {
            table,
            name: name.into(),
        }
    }
}

/// An entry of the `FROM` list.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum TableSource {
    /// A table or derived table with an optional alias.
    Aliased {
        /// The underlying table.
        table: SimpleTable,
        /// Alias, never policy-checked.
        alias: Option<String>,
    },
    /// `( source, ... )`
    Parenthesized(Vec<TableSource>),
    /// `left JOIN right ON condition`
    Join {
        /// Left side.
        left: Box<TableSource>,
        /// Right side.
        right: Box<TableSource>,
        /// Join flavour (not policy-relevant).
        kind: JoinKind,
        /// `ON` condition.
        on: Option<Expr>,
    },
    /// A source shape the guard does not admit (table functions, `UNNEST`, ...).
    Unsupported(String),
}

impl TableSource {
    /// An unaliased table reference.
    pub fn table(name: QualifiedName) -> Self {
        Self::Aliased {
            table: SimpleTable::Name(name),
            alias: None,
        }
    }
}

/// The table behind an aliased source.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum SimpleTable {
    /// A named table.
    Name(QualifiedName),
    /// A derived table, `(SELECT ...)`.
    Subquery(Box<Statement>),
}

/// Join flavours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum JoinKind {
    /// `[INNER] JOIN`
    Inner,
    /// `LEFT [OUTER] JOIN`
    Left,
    /// `RIGHT [OUTER] JOIN`
    Right,
    /// `FULL [OUTER] JOIN`
    Full,
    /// `CROSS JOIN`
    Cross,
    /// `NATURAL` and vendor joins.
    Other,
}

/// A projection entry, also used for function arguments.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum SelectItem {
    /// `*` or `table.*`; the qualifier name is empty for a bare star.
    Star(QualifiedName),
    /// `expr [AS alias]`
    Expr {
        /// The projected expression.
        expr: Expr,
        /// Alias, never policy-checked.
        alias: Option<String>,
    },
    /// `NEXT value VALUES` sequence read. The `sqlparser` front end has no
    /// such projection form, so only hand-built trees carry it.
    NextValue(Expr),
    /// An item shape the guard does not admit.
    Unsupported(String),
}

impl SelectItem {
    /// An unaliased expression item.
    pub fn expr(expr: Expr) -> Self {
        Self::Expr { expr, alias: None }
    }
}

impl From<Expr> for SelectItem {
    fn from(expr: Expr) -> Self {
        Self::expr(expr)
    }
}

/// Comparison operators, including membership and pattern tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ComparisonOp {
    /// `=`
    Eq,
    /// `<>` / `!=`
    NotEq,
    /// `<`
    Lt,
    /// `<=`
    LtEq,
    /// `>`
    Gt,
    /// `>=`
    GtEq,
    /// `<=>`
    NullSafeEq,
    /// `IN`
    In,
    /// `NOT IN`
    NotIn,
    /// `LIKE`
    Like,
    /// `NOT LIKE`
    NotLike,
    /// `REGEXP`
    Regexp,
    /// `NOT REGEXP`
    NotRegexp,
}

/// `IS ...` tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum IsTest {
    /// `IS NULL`
    Null,
    /// `IS NOT NULL`
    NotNull,
    /// `IS TRUE`
    True,
    /// `IS NOT TRUE`
    NotTrue,
    /// `IS FALSE`
    False,
    /// `IS NOT FALSE`
    NotFalse,
    /// `IS UNKNOWN`
    Unknown,
    /// `IS NOT UNKNOWN`
    NotUnknown,
}

/// A function call, `[ident.]name([DISTINCT] args...)`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FunctionCall {
    /// Schema qualifier, empty when absent.
    pub ident: String,
    /// Function name as written.
    pub name: String,
    /// `DISTINCT` modifier.
    pub distinct: bool,
    /// Arguments; they may be stars or carry aliases.
    pub args: Vec<SelectItem>,
}

impl FunctionCall {
    /// An unqualified call.
    pub fn new(name: impl Into<String>, args: Vec<SelectItem>) -> Self {
        Self {
            ident: String::new(),
            name: name.into(),
            distinct: false,
            args,
        }
    }
}

/// One `WHEN cond THEN value` arm.
#[derive(Debug, Clone, PartialEq)]
pub struct When {
    /// Condition.
    pub cond: Expr,
    /// Result.
    pub value: Expr,
}

/// Expression tree.
///
/// The validator matches this enum without a wildcard arm, so every variant
/// carries an explicit allow, recurse, or reject decision.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Expr {
    /// `a AND b`
    And(Box<Expr>, Box<Expr>),
    /// `a OR b`
    Or(Box<Expr>, Box<Expr>),
    /// `NOT a`
    Not(Box<Expr>),
    /// `(a)`
    Paren(Box<Expr>),
    /// `left op right [ESCAPE escape]`
    Comparison {
        /// Operator.
        op: ComparisonOp,
        /// Left operand.
        left: Box<Expr>,
        /// Right operand.
        right: Box<Expr>,
        /// `ESCAPE` operand of a pattern match.
        escape: Option<Box<Expr>>,
    },
    /// `subject [NOT] BETWEEN from AND to`
    Range {
        /// Tested value.
        subject: Box<Expr>,
        /// Lower bound.
        from: Box<Expr>,
        /// Upper bound.
        to: Box<Expr>,
        /// `NOT BETWEEN`
        negated: bool,
    },
    /// `expr IS [NOT] NULL/TRUE/FALSE/UNKNOWN`
    Is {
        /// Tested expression.
        expr: Box<Expr>,
        /// Which test.
        test: IsTest,
    },
    /// `EXISTS (subquery)`
    Exists(Box<Statement>),
    /// A number, string, hex or placeholder literal, kept as source text.
    Literal(String),
    /// `NULL`
    Null,
    /// `TRUE` / `FALSE`
    Bool(bool),
    /// A bound list placeholder, `::name`.
    ListArg(String),
    /// A column reference.
    Column(ColumnRef),
    /// `(a, b, ...)`
    Tuple(Vec<Expr>),
    /// `(SELECT ...)` in expression position.
    Subquery(Box<Statement>),
    /// Binary arithmetic / bitwise operation.
    Binary {
        /// Operator text.
        op: String,
        /// Left operand.
        left: Box<Expr>,
        /// Right operand.
        right: Box<Expr>,
    },
    /// Unary arithmetic / bitwise operation.
    Unary {
        /// Operator text.
        op: String,
        /// Operand.
        expr: Box<Expr>,
    },
    /// `INTERVAL expr unit`
    Interval {
        /// Amount.
        expr: Box<Expr>,
        /// Unit keyword, possibly empty.
        unit: String,
    },
    /// `expr COLLATE collation`
    Collate {
        /// Operand.
        expr: Box<Expr>,
        /// Collation name.
        collation: String,
    },
    /// Function call.
    Function(FunctionCall),
    /// `CASE [operand] WHEN ... THEN ... [ELSE ...] END`
    Case {
        /// Simple-case subject.
        operand: Option<Box<Expr>>,
        /// Arms.
        whens: Vec<When>,
        /// `ELSE` branch.
        else_result: Option<Box<Expr>>,
    },
    /// `VALUES(column)`, only meaningful inside `INSERT ... ON DUPLICATE KEY UPDATE`.
    ValuesFunc(ColumnRef),
    /// `CONVERT(expr, type)` / `CAST(expr AS type)`
    Convert {
        /// Operand.
        expr: Box<Expr>,
        /// Target type text.
        target: String,
    },
    /// `CONVERT(expr USING charset)`
    ConvertUsing {
        /// Operand.
        expr: Box<Expr>,
        /// Character set.
        charset: String,
    },
    /// `SUBSTRING(column FROM from [FOR to])`
    Substr {
        /// Subject column.
        column: ColumnRef,
        /// Start position.
        from: Box<Expr>,
        /// Length.
        to: Option<Box<Expr>>,
    },
    /// `MATCH (columns) AGAINST (expr [modifier])`
    Match {
        /// Searched columns.
        columns: Vec<SelectItem>,
        /// Search expression.
        expr: Box<Expr>,
    },
    /// `GROUP_CONCAT([DISTINCT] args [ORDER BY ...] [SEPARATOR s])`
    GroupConcat {
        /// `DISTINCT` modifier.
        distinct: bool,
        /// Concatenated values.
        args: Vec<SelectItem>,
        /// Ordering of the concatenation.
        order_by: Vec<OrderBy>,
        /// Separator literal.
        separator: Option<String>,
    },
    /// `DEFAULT(column)`
    Default(String),
    /// A parser shape with no counterpart above, kept as source text.
    Unrecognized(String),
}

impl Expr {
    /// A bare column reference.
    pub fn column(name: impl Into<String>) -> Self {
        Self::Column(ColumnRef::new(name))
    }

    /// A table-qualified column reference.
    pub fn qualified_column(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Column(ColumnRef::with_table(QualifiedName::new(table), name))
    }

    /// A literal kept as source text.
    pub fn literal(text: impl Into<String>) -> Self {
        Self::Literal(text.into())
    }

    /// `left = right`
    pub fn equals(left: Self, right: Self) -> Self {
        Self::compare(ComparisonOp::Eq, left, right)
    }

    /// `left op right`
    pub fn compare(op: ComparisonOp, left: Self, right: Self) -> Self {
        Self::Comparison {
            op,
            left: Box::new(left),
            right: Box::new(right),
            escape: None,
        }
    }

    /// `left AND right`
    pub fn and(left: Self, right: Self) -> Self {
        Self::And(Box::new(left), Box::new(right))
    }

    /// A function call.
    pub fn call(name: impl Into<String>, args: Vec<SelectItem>) -> Self {
        Self::Function(FunctionCall::new(name, args))
    }

    /// A scalar subquery.
    pub fn subquery(select: Select) -> Self {
        Self::Subquery(Box::new(select.into_statement()))
    }
}
