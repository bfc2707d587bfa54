//! Lowering from the `sqlparser` tree.
//!
//! Every function here is total: a node that cannot be represented becomes an
//! `Unsupported` or `Unrecognized` node instead of an error, so the decision
//! to reject stays with the validator.

use sqlparser::ast as sp;

use crate::ast::{
    ColumnRef, ComparisonOp, Expr, FunctionCall, IsTest, JoinKind, Limit, OrderBy,
    QualifiedName, Select, SelectItem, SimpleTable, Statement, StatementKind, TableSource, When,
};

pub(super) fn statement(statement: &sp::Statement) -> Statement {
    match statement {
        sp::Statement::Query(query) => self::query(query),
        sp::Statement::Insert(_) => Statement::Unsupported(StatementKind::Insert),
        sp::Statement::Update { .. } => Statement::Unsupported(StatementKind::Update),
        sp::Statement::Delete(_) => Statement::Unsupported(StatementKind::Delete),
        other => Statement::Unsupported(StatementKind::Other(leading_keyword(other))),
    }
}

fn leading_keyword(statement: &sp::Statement) -> String {
    statement
        .to_string()
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase()
}

fn query(query: &sp::Query) -> Statement {
    if query.with.is_some() {
        return Statement::Unsupported(StatementKind::With);
    }

    let select = match query.body.as_ref() {
        sp::SetExpr::Select(select) => select,
        sp::SetExpr::Query(_) => return Statement::Unsupported(StatementKind::Parenthesized),
        sp::SetExpr::SetOperation { .. } => {
            return Statement::Unsupported(StatementKind::SetOperation);
        },
        sp::SetExpr::Values(_) => return Statement::Unsupported(StatementKind::Values),
        sp::SetExpr::Insert(_) => return Statement::Unsupported(StatementKind::Insert),
        sp::SetExpr::Update(_) => return Statement::Unsupported(StatementKind::Update),
        _ => return Statement::Unsupported(StatementKind::Other("TABLE".into())),
    };
    if select.into.is_some() {
        return Statement::Unsupported(StatementKind::SelectInto);
    }
    if let Some(clause) = unmodelled_query_clause(query).or_else(|| unmodelled_select_clause(select))
    {
        return Statement::Unsupported(StatementKind::Other(clause.into()));
    }

    let group_by = match &select.group_by {
        sp::GroupByExpr::Expressions(exprs, _) => exprs.iter().map(expr).collect(),
        sp::GroupByExpr::All(_) => Vec::new(),
    };

    let order_by = query
        .order_by
        .as_ref()
        .map(|o| o.exprs.iter().map(order_by_expr).collect())
        .unwrap_or_default();

    let offset = query.offset.as_ref().map(|o| expr(&o.value));
    let row_count = query.limit.as_ref().map(expr);
    let limit = (offset.is_some() || row_count.is_some()).then_some(Limit { offset, row_count });

    Select {
        items: select.projection.iter().map(select_item).collect(),
        from: select.from.iter().map(table_with_joins).collect(),
        selection: select.selection.as_ref().map(expr),
        group_by,
        having: select.having.as_ref().map(expr),
        order_by,
        limit,
    }
    .into_statement()
}

/// First query-level clause the tree has no place for.
fn unmodelled_query_clause(query: &sp::Query) -> Option<&'static str> {
    if query.order_by.as_ref().is_some_and(|o| o.interpolate.is_some()) {
        Some("INTERPOLATE")
    } else if !query.limit_by.is_empty() {
        Some("LIMIT BY")
    } else if query.fetch.is_some() {
        Some("FETCH")
    } else if !query.locks.is_empty() {
        Some("FOR UPDATE")
    } else if query.for_clause.is_some() {
        Some("FOR")
    } else if query.settings.is_some() {
        Some("SETTINGS")
    } else if query.format_clause.is_some() {
        Some("FORMAT")
    } else {
        None
    }
}

/// First SELECT-level clause the tree has no place for.
fn unmodelled_select_clause(select: &sp::Select) -> Option<&'static str> {
    if matches!(select.distinct, Some(sp::Distinct::On(_))) {
        Some("DISTINCT ON")
    } else if select.top.is_some() {
        Some("TOP")
    } else if !select.lateral_views.is_empty() {
        Some("LATERAL VIEW")
    } else if select.prewhere.is_some() {
        Some("PREWHERE")
    } else if !select.cluster_by.is_empty() {
        Some("CLUSTER BY")
    } else if !select.distribute_by.is_empty() {
        Some("DISTRIBUTE BY")
    } else if !select.sort_by.is_empty() {
        Some("SORT BY")
    } else if !select.named_window.is_empty() {
        Some("WINDOW")
    } else if select.qualify.is_some() {
        Some("QUALIFY")
    } else if select.connect_by.is_some() {
        Some("CONNECT BY")
    } else if select.value_table_mode.is_some() {
        Some("AS VALUE")
    } else {
        None
    }
}

fn order_by_expr(order: &sp::OrderByExpr) -> OrderBy {
    // WITH FILL carries its own expressions.
    let expr = if order.with_fill.is_some() {
        Expr::Unrecognized(order.to_string())
    } else {
        expr(&order.expr)
    };
    OrderBy {
        expr,
        asc: order.asc,
    }
}

// =============================================================================
// NAMES
// =============================================================================

/// `name` or `qualifier.name`; longer paths have no counterpart.
fn qualified_name(name: &sp::ObjectName) -> Option<QualifiedName> {
    match name.0.as_slice() {
        [name] => Some(QualifiedName::new(name.value.clone())),
        [qualifier, name] => Some(QualifiedName::qualified(
            qualifier.value.clone(),
            name.value.clone(),
        )),
        _ => None,
    }
}

fn column(parts: &[sp::Ident]) -> Option<ColumnRef> {
    match parts {
        [name] => Some(ColumnRef::new(name.value.clone())),
        [table, name] => Some(ColumnRef::with_table(
            QualifiedName::new(table.value.clone()),
            name.value.clone(),
        )),
        [db, table, name] => Some(ColumnRef::with_table(
            QualifiedName::qualified(db.value.clone(), table.value.clone()),
            name.value.clone(),
        )),
        _ => None,
    }
}

// =============================================================================
// FROM
// =============================================================================

/// Joins fold left: `a JOIN b JOIN c` becomes `(a JOIN b) JOIN c`.
fn table_with_joins(source: &sp::TableWithJoins) -> TableSource {
    source
        .joins
        .iter()
        .fold(table_factor(&source.relation), |left, join| {
            let Some((kind, constraint)) = join_operator(&join.join_operator) else {
                return TableSource::Unsupported(join.to_string());
            };
            TableSource::Join {
                left: Box::new(left),
                right: Box::new(table_factor(&join.relation)),
                kind,
                on: constraint.map(expr),
            }
        })
}

/// Kind and `ON` condition of a join. `None` for operators carrying
/// expressions outside an `ON` clause.
fn join_operator(operator: &sp::JoinOperator) -> Option<(JoinKind, Option<&sp::Expr>)> {
    let (kind, constraint) = match operator {
        sp::JoinOperator::Inner(c) => (JoinKind::Inner, Some(c)),
        sp::JoinOperator::LeftOuter(c) => (JoinKind::Left, Some(c)),
        sp::JoinOperator::RightOuter(c) => (JoinKind::Right, Some(c)),
        sp::JoinOperator::FullOuter(c) => (JoinKind::Full, Some(c)),
        sp::JoinOperator::Semi(c)
        | sp::JoinOperator::LeftSemi(c)
        | sp::JoinOperator::RightSemi(c)
        | sp::JoinOperator::Anti(c)
        | sp::JoinOperator::LeftAnti(c)
        | sp::JoinOperator::RightAnti(c) => (JoinKind::Other, Some(c)),
        sp::JoinOperator::CrossJoin => (JoinKind::Cross, None),
        sp::JoinOperator::CrossApply | sp::JoinOperator::OuterApply => (JoinKind::Other, None),
        _ => return None,
    };
    let on = match constraint {
        Some(sp::JoinConstraint::On(on)) => Some(on),
        _ => None,
    };
    Some((kind, on))
}

fn table_factor(factor: &sp::TableFactor) -> TableSource {
    match factor {
        // Table-valued calls, hints, time travel and partitions are not admitted.
        sp::TableFactor::Table {
            name,
            alias,
            args: None,
            with_hints,
            version: None,
            partitions,
            json_path: None,
            ..
        } if with_hints.is_empty() && partitions.is_empty() => match qualified_name(name) {
            Some(name) => TableSource::Aliased {
                table: SimpleTable::Name(name),
                alias: alias.as_ref().map(|a| a.name.value.clone()),
            },
            None => TableSource::Unsupported(factor.to_string()),
        },
        sp::TableFactor::Derived {
            subquery, alias, ..
        } => TableSource::Aliased {
            table: SimpleTable::Subquery(Box::new(query(subquery))),
            alias: alias.as_ref().map(|a| a.name.value.clone()),
        },
        sp::TableFactor::NestedJoin {
            table_with_joins: inner,
            ..
        } => TableSource::Parenthesized(vec![table_with_joins(inner)]),
        other => TableSource::Unsupported(other.to_string()),
    }
}

// =============================================================================
// SELECT ITEMS
// =============================================================================

fn select_item(item: &sp::SelectItem) -> SelectItem {
    match item {
        sp::SelectItem::UnnamedExpr(e) => SelectItem::expr(expr(e)),
        sp::SelectItem::ExprWithAlias { expr: e, alias } => SelectItem::Expr {
            expr: expr(e),
            alias: Some(alias.value.clone()),
        },
        sp::SelectItem::QualifiedWildcard(_, options) | sp::SelectItem::Wildcard(options)
            if has_wildcard_options(options) =>
        {
            SelectItem::Unsupported(item.to_string())
        },
        sp::SelectItem::QualifiedWildcard(name, _) => star(name),
        sp::SelectItem::Wildcard(_) => SelectItem::Star(QualifiedName::default()),
    }
}

/// `* ILIKE`, `EXCLUDE`, `EXCEPT`, `REPLACE` and `RENAME` modifiers.
fn has_wildcard_options(options: &sp::WildcardAdditionalOptions) -> bool {
    options.opt_ilike.is_some()
        || options.opt_exclude.is_some()
        || options.opt_except.is_some()
        || options.opt_replace.is_some()
        || options.opt_rename.is_some()
}

fn star(table: &sp::ObjectName) -> SelectItem {
    qualified_name(table).map_or_else(
        || SelectItem::Unsupported(format!("{table}.*")),
        SelectItem::Star,
    )
}

// =============================================================================
// EXPRESSIONS
// =============================================================================

fn boxed(e: &sp::Expr) -> Box<Expr> {
    Box::new(expr(e))
}

fn comparison(op: ComparisonOp, left: &sp::Expr, right: Expr) -> Expr {
    Expr::Comparison {
        op,
        left: boxed(left),
        right: Box::new(right),
        escape: None,
    }
}

fn is(e: &sp::Expr, test: IsTest) -> Expr {
    Expr::Is {
        expr: boxed(e),
        test,
    }
}

fn subquery(q: &sp::Query) -> Box<Statement> {
    Box::new(query(q))
}

pub(super) fn expr(e: &sp::Expr) -> Expr {
    match e {
        sp::Expr::Identifier(ident) => Expr::column(ident.value.clone()),
        sp::Expr::CompoundIdentifier(parts) => {
            column(parts).map_or_else(|| Expr::Unrecognized(e.to_string()), Expr::Column)
        },
        sp::Expr::Value(value) => self::value(value),
        sp::Expr::TypedString { .. } => Expr::Literal(e.to_string()),
        sp::Expr::Nested(inner) => Expr::Paren(boxed(inner)),
        sp::Expr::Tuple(items) => Expr::Tuple(items.iter().map(expr).collect()),

        sp::Expr::BinaryOp { left, op, right } => binary(left, op, right),
        sp::Expr::UnaryOp { op, expr: inner } => match op {
            sp::UnaryOperator::Not => Expr::Not(boxed(inner)),
            other => Expr::Unary {
                op: other.to_string(),
                expr: boxed(inner),
            },
        },

        sp::Expr::InList {
            expr: subject,
            list,
            negated,
        } => comparison(
            if *negated { ComparisonOp::NotIn } else { ComparisonOp::In },
            subject,
            Expr::Tuple(list.iter().map(expr).collect()),
        ),
        sp::Expr::InSubquery {
            expr: subject,
            subquery: q,
            negated,
        } => comparison(
            if *negated { ComparisonOp::NotIn } else { ComparisonOp::In },
            subject,
            Expr::Subquery(subquery(q)),
        ),
        sp::Expr::Like {
            negated,
            expr: subject,
            pattern,
            ..
        }
        | sp::Expr::ILike {
            negated,
            expr: subject,
            pattern,
            ..
        } => comparison(
            if *negated { ComparisonOp::NotLike } else { ComparisonOp::Like },
            subject,
            expr(pattern),
        ),
        sp::Expr::RLike {
            negated,
            expr: subject,
            pattern,
            ..
        } => comparison(
            if *negated { ComparisonOp::NotRegexp } else { ComparisonOp::Regexp },
            subject,
            expr(pattern),
        ),
        sp::Expr::Between {
            expr: subject,
            negated,
            low,
            high,
        } => Expr::Range {
            subject: boxed(subject),
            from: boxed(low),
            to: boxed(high),
            negated: *negated,
        },

        sp::Expr::IsNull(inner) => is(inner, IsTest::Null),
        sp::Expr::IsNotNull(inner) => is(inner, IsTest::NotNull),
        sp::Expr::IsTrue(inner) => is(inner, IsTest::True),
        sp::Expr::IsNotTrue(inner) => is(inner, IsTest::NotTrue),
        sp::Expr::IsFalse(inner) => is(inner, IsTest::False),
        sp::Expr::IsNotFalse(inner) => is(inner, IsTest::NotFalse),
        sp::Expr::IsUnknown(inner) => is(inner, IsTest::Unknown),
        sp::Expr::IsNotUnknown(inner) => is(inner, IsTest::NotUnknown),

        sp::Expr::Exists {
            subquery: q,
            negated,
        } => {
            let exists = Expr::Exists(subquery(q));
            if *negated {
                Expr::Not(Box::new(exists))
            } else {
                exists
            }
        },
        sp::Expr::Subquery(q) => Expr::Subquery(subquery(q)),

        sp::Expr::Cast {
            expr: inner,
            data_type,
            ..
        } => Expr::Convert {
            expr: boxed(inner),
            target: data_type.to_string(),
        },
        sp::Expr::Convert { styles, .. } if !styles.is_empty() => Expr::Unrecognized(e.to_string()),
        sp::Expr::Convert {
            expr: inner,
            data_type,
            charset,
            ..
        } => match (data_type, charset) {
            (Some(data_type), _) => Expr::Convert {
                expr: boxed(inner),
                target: data_type.to_string(),
            },
            (None, Some(charset)) => Expr::ConvertUsing {
                expr: boxed(inner),
                charset: charset.to_string(),
            },
            (None, None) => Expr::Unrecognized(e.to_string()),
        },
        sp::Expr::Collate {
            expr: inner,
            collation,
        } => Expr::Collate {
            expr: boxed(inner),
            collation: collation.to_string(),
        },
        sp::Expr::Interval(interval) => Expr::Interval {
            expr: boxed(&interval.value),
            unit: interval
                .leading_field
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
        },

        sp::Expr::Case {
            operand,
            conditions,
            results,
            else_result,
        } => Expr::Case {
            operand: operand.as_deref().map(boxed),
            whens: conditions
                .iter()
                .zip(results)
                .map(|(cond, value)| When {
                    cond: expr(cond),
                    value: expr(value),
                })
                .collect(),
            else_result: else_result.as_deref().map(boxed),
        },

        sp::Expr::Function(function) => self::function(function, e),
        sp::Expr::Substring {
            expr: subject,
            substring_from,
            substring_for,
            ..
        } => substring(e, subject, substring_from.as_deref(), substring_for.as_deref()),
        sp::Expr::MatchAgainst {
            columns,
            match_value,
            ..
        } => Expr::Match {
            columns: columns
                .iter()
                .map(|c| SelectItem::expr(Expr::column(c.value.clone())))
                .collect(),
            expr: Box::new(Expr::Literal(match_value.to_string())),
        },

        sp::Expr::Ceil { expr: inner, .. } => builtin("CEIL", [inner.as_ref()]),
        sp::Expr::Floor { expr: inner, .. } => builtin("FLOOR", [inner.as_ref()]),
        sp::Expr::Position { expr: needle, r#in } => {
            builtin("POSITION", [needle.as_ref(), r#in.as_ref()])
        },
        sp::Expr::Extract { expr: inner, .. } => builtin("EXTRACT", [inner.as_ref()]),
        sp::Expr::Trim {
            expr: inner,
            trim_what,
            trim_characters,
            ..
        } => {
            let args = std::iter::once(inner.as_ref())
                .chain(trim_what.as_deref())
                .chain(trim_characters.iter().flatten());
            builtin("TRIM", args)
        },

        _ => Expr::Unrecognized(e.to_string()),
    }
}

fn value(value: &sp::Value) -> Expr {
    match value {
        sp::Value::Null => Expr::Null,
        sp::Value::Boolean(b) => Expr::Bool(*b),
        sp::Value::Placeholder(p) if p.starts_with("::") => Expr::ListArg(p.clone()),
        other => Expr::Literal(other.to_string()),
    }
}

fn binary(left: &sp::Expr, op: &sp::BinaryOperator, right: &sp::Expr) -> Expr {
    let comparison_op = match op {
        sp::BinaryOperator::And => return Expr::And(boxed(left), boxed(right)),
        sp::BinaryOperator::Or => return Expr::Or(boxed(left), boxed(right)),
        sp::BinaryOperator::Eq => ComparisonOp::Eq,
        sp::BinaryOperator::NotEq => ComparisonOp::NotEq,
        sp::BinaryOperator::Lt => ComparisonOp::Lt,
        sp::BinaryOperator::LtEq => ComparisonOp::LtEq,
        sp::BinaryOperator::Gt => ComparisonOp::Gt,
        sp::BinaryOperator::GtEq => ComparisonOp::GtEq,
        sp::BinaryOperator::Spaceship => ComparisonOp::NullSafeEq,
        other => {
            return Expr::Binary {
                op: other.to_string(),
                left: boxed(left),
                right: boxed(right),
            };
        },
    };
    comparison(comparison_op, left, expr(right))
}

/// Built-in syntax forms are checked as calls to the same-named function.
fn builtin<'a>(name: &str, args: impl IntoIterator<Item = &'a sp::Expr>) -> Expr {
    Expr::call(name, args.into_iter().map(|a| SelectItem::expr(expr(a))).collect())
}

fn substring(
    whole: &sp::Expr,
    subject: &sp::Expr,
    from: Option<&sp::Expr>,
    length: Option<&sp::Expr>,
) -> Expr {
    let subject_column = match subject {
        sp::Expr::Identifier(ident) => Some(ColumnRef::new(ident.value.clone())),
        sp::Expr::CompoundIdentifier(parts) => column(parts),
        _ => None,
    };

    match (subject_column, from) {
        (Some(column), Some(from)) => Expr::Substr {
            column,
            from: boxed(from),
            to: length.map(boxed),
        },
        (_, None) if length.is_none() => Expr::Unrecognized(whole.to_string()),
        _ => builtin(
            "SUBSTRING",
            std::iter::once(subject).chain(from).chain(length),
        ),
    }
}

// =============================================================================
// FUNCTIONS
// =============================================================================

/// Arguments of a call, split into the parts the tree keeps.
#[derive(Default)]
struct Arguments {
    distinct: bool,
    items: Vec<SelectItem>,
    order_by: Vec<OrderBy>,
    separator: Option<String>,
}

fn arguments(args: &sp::FunctionArguments) -> Arguments {
    match args {
        sp::FunctionArguments::None => Arguments::default(),
        sp::FunctionArguments::Subquery(q) => Arguments {
            items: vec![SelectItem::expr(Expr::Subquery(subquery(q)))],
            ..Arguments::default()
        },
        sp::FunctionArguments::List(list) => {
            let mut lowered = Arguments {
                distinct: matches!(
                    list.duplicate_treatment,
                    Some(sp::DuplicateTreatment::Distinct)
                ),
                items: list.args.iter().map(function_arg).collect(),
                ..Arguments::default()
            };
            for clause in &list.clauses {
                match clause {
                    sp::FunctionArgumentClause::OrderBy(exprs) => {
                        lowered.order_by.extend(exprs.iter().map(order_by_expr));
                    },
                    sp::FunctionArgumentClause::Separator(value) => {
                        lowered.separator = Some(value.to_string());
                    },
                    // LIMIT / HAVING / ON OVERFLOW carry expressions we do not walk.
                    _ => lowered
                        .items
                        .push(SelectItem::Unsupported(clause.to_string())),
                }
            }
            lowered
        },
    }
}

fn function_arg(arg: &sp::FunctionArg) -> SelectItem {
    let arg_expr = match arg {
        sp::FunctionArg::Unnamed(arg) | sp::FunctionArg::Named { arg, .. } => arg,
        _ => return SelectItem::Unsupported(arg.to_string()),
    };
    match arg_expr {
        sp::FunctionArgExpr::Expr(e) => SelectItem::expr(expr(e)),
        sp::FunctionArgExpr::QualifiedWildcard(name) => star(name),
        sp::FunctionArgExpr::Wildcard => SelectItem::Star(QualifiedName::default()),
    }
}

/// The argument list when it is exactly one plain column.
fn single_column(items: &[SelectItem]) -> Option<ColumnRef> {
    match items {
        [SelectItem::Expr {
            expr: Expr::Column(column),
            ..
        }] => Some(column.clone()),
        _ => None,
    }
}

fn function(function: &sp::Function, whole: &sp::Expr) -> Expr {
    // These clauses reference columns outside the argument list.
    if function.over.is_some()
        || function.filter.is_some()
        || !function.within_group.is_empty()
        || !matches!(function.parameters, sp::FunctionArguments::None)
    {
        return Expr::Unrecognized(whole.to_string());
    }

    let (ident, name) = match function.name.0.as_slice() {
        [name] => (String::new(), name.value.clone()),
        [ident, name] => (ident.value.clone(), name.value.clone()),
        _ => return Expr::Unrecognized(whole.to_string()),
    };
    let args = arguments(&function.args);

    if ident.is_empty() {
        match name.to_ascii_uppercase().as_str() {
            "VALUES" => {
                return single_column(&args.items)
                    .map_or_else(|| Expr::Unrecognized(whole.to_string()), Expr::ValuesFunc);
            },
            "DEFAULT" => {
                return single_column(&args.items)
                    .filter(|column| column.table.is_empty())
                    .map_or_else(
                        || Expr::Unrecognized(whole.to_string()),
                        |column| Expr::Default(column.name),
                    );
            },
            "GROUP_CONCAT" => {
                return Expr::GroupConcat {
                    distinct: args.distinct,
                    args: args.items,
                    order_by: args.order_by,
                    separator: args.separator,
                };
            },
            _ => {},
        }
    }

    let mut items = args.items;
    // ORDER BY inside ordinary aggregates is walked as extra arguments.
    items.extend(args.order_by.into_iter().map(|o| SelectItem::expr(o.expr)));

    Expr::Function(FunctionCall {
        ident,
        name,
        distinct: args.distinct,
        args: items,
    })
}
