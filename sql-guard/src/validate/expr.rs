//! Expression walker.

use super::{Validator, Violation};
use crate::ast::{Expr, FunctionCall};
use crate::policy::rules;

impl Validator<'_> {
    pub(super) fn check_expr(&mut self, expr: &Expr) -> Result<(), Violation> {
        self.nested(|v| v.walk_expr(expr))
    }

    fn walk_expr(&mut self, expr: &Expr) -> Result<(), Violation> {
        match expr {
            Expr::And(left, right) | Expr::Or(left, right) => {
                self.check_expr(left)?;
                self.check_expr(right)
            },
            Expr::Not(inner) | Expr::Paren(inner) => self.check_expr(inner),
            Expr::Comparison {
                left,
                right,
                escape,
                ..
            } => {
                self.check_expr(left)?;
                self.check_expr(right)?;
                self.check_opt_expr(escape.as_deref())
            },
            Expr::Range {
                subject, from, to, ..
            } => {
                self.check_expr(subject)?;
                self.check_expr(from)?;
                self.check_expr(to)
            },
            Expr::Is { expr, .. }
            | Expr::Unary { expr, .. }
            | Expr::Interval { expr, .. }
            | Expr::Collate { expr, .. }
            | Expr::Convert { expr, .. }
            | Expr::ConvertUsing { expr, .. } => self.check_expr(expr),
            Expr::Binary { left, right, .. } => {
                self.check_expr(left)?;
                self.check_expr(right)
            },
            Expr::Exists(statement) | Expr::Subquery(statement) => self.check_statement(statement),
            Expr::Literal(_) | Expr::Null | Expr::Bool(_) | Expr::ListArg(_) => Ok(()),
            Expr::Column(column) => rules::check_column_ref(self.policy, column),
            Expr::Tuple(items) => items.iter().try_for_each(|e| self.check_expr(e)),
            Expr::Function(call) => self.check_function(call),
            Expr::Case {
                operand,
                whens,
                else_result,
            } => {
                self.check_opt_expr(operand.as_deref())?;
                self.check_opt_expr(else_result.as_deref())?;
                whens.iter().try_for_each(|when| {
                    self.check_expr(&when.cond)?;
                    self.check_expr(&when.value)
                })
            },
            Expr::ValuesFunc(_) => Err(Violation::ValuesFunction),
            Expr::Substr { column, from, to } => {
                self.check_expr(from)?;
                self.check_opt_expr(to.as_deref())?;
                rules::check_column_ref(self.policy, column)
            },
            Expr::Match { columns, expr } => {
                self.check_expr(expr)?;
                columns.iter().try_for_each(|c| self.check_select_item(c))
            },
            Expr::GroupConcat { args, order_by, .. } => {
                for arg in args {
                    self.check_select_item(arg)?;
                }
                order_by.iter().try_for_each(|o| self.check_expr(&o.expr))
            },
            Expr::Default(column) => rules::check_column_name(self.policy, column),
            Expr::Unrecognized(text) => {
                tracing::trace!(expr = %text, "unrecognized expression");
                Err(Violation::UnrecognizedExpression(text.clone()))
            },
        }
    }

    /// Name first, then every argument as a projection entry.
    fn check_function(&mut self, call: &FunctionCall) -> Result<(), Violation> {
        rules::check_function_name(self.policy, &call.ident, &call.name)?;
        call.args.iter().try_for_each(|arg| self.check_select_item(arg))
    }
}

#[cfg(test)]
mod tests {
    use super::super::check_expr;
    use crate::Policy;
    use crate::Violation;
    use crate::ast::{
        ColumnRef, ComparisonOp, Expr, FunctionCall, IsTest, OrderBy, QualifiedName, Select,
        SelectItem, StatementKind, Statement, TableSource, When,
    };

    fn boxed(expr: Expr) -> Box<Expr> {
        Box::new(expr)
    }

    fn columns_only(allowed: &[&str]) -> Policy {
        Policy::new().allow_columns(allowed)
    }

    // =========================================================================
    // LEAVES
    // =========================================================================

    #[test]
    fn test_literals_always_pass() {
        let strict = Policy::new()
            .allow_tables(&[])
            .allow_columns(&[])
            .allow_functions(&[]);
        for expr in [
            Expr::literal("42"),
            Expr::literal("'x'"),
            Expr::Null,
            Expr::Bool(true),
            Expr::ListArg("::ids".into()),
        ] {
            assert!(check_expr(&expr, &strict).is_ok());
        }
    }

    #[test]
    fn test_column_delegates_to_rules() {
        let policy = Policy::new().allow_tables(&["t"]).allow_columns(&["a"]);
        assert!(check_expr(&Expr::qualified_column("t", "a"), &policy).is_ok());
        assert_eq!(
            check_expr(&Expr::qualified_column("u", "a"), &policy),
            Err(Violation::TableNotAllowed("u".into()))
        );
        assert_eq!(
            check_expr(&Expr::column("b"), &policy),
            Err(Violation::ColumnNotAllowed("b".into()))
        );
    }

    #[test]
    fn test_column_with_database_qualifier() {
        let column = Expr::Column(ColumnRef::with_table(QualifiedName::qualified("db", "t"), "a"));
        assert_eq!(
            check_expr(&column, &Policy::new()),
            Err(Violation::QualifierNotAllowed("db".into()))
        );
        assert!(check_expr(&column, &Policy::new().allow_qualifiers(&["db"])).is_ok());
    }

    // =========================================================================
    // COMPOSITES
    // =========================================================================

    #[test]
    fn test_boolean_operators_recurse() {
        let policy = columns_only(&["a"]);
        let expr = Expr::Or(
            boxed(Expr::equals(Expr::column("a"), Expr::literal("1"))),
            boxed(Expr::Not(boxed(Expr::Paren(boxed(Expr::column("b")))))),
        );
        assert_eq!(
            check_expr(&expr, &policy),
            Err(Violation::ColumnNotAllowed("b".into()))
        );
    }

    #[test]
    fn test_comparison_checks_escape() {
        let policy = columns_only(&["a"]);
        let expr = Expr::Comparison {
            op: ComparisonOp::Like,
            left: boxed(Expr::column("a")),
            right: boxed(Expr::literal("'%x%'")),
            escape: Some(boxed(Expr::column("esc"))),
        };
        assert_eq!(
            check_expr(&expr, &policy),
            Err(Violation::ColumnNotAllowed("esc".into()))
        );
    }

    #[test]
    fn test_range_checks_all_three() {
        let policy = columns_only(&["a", "lo"]);
        let expr = Expr::Range {
            subject: boxed(Expr::column("a")),
            from: boxed(Expr::column("lo")),
            to: boxed(Expr::column("hi")),
            negated: true,
        };
        assert_eq!(
            check_expr(&expr, &policy),
            Err(Violation::ColumnNotAllowed("hi".into()))
        );
    }

    #[test]
    fn test_unary_shapes_recurse() {
        let policy = columns_only(&[]);
        let inner = || boxed(Expr::column("x"));
        for expr in [
            Expr::Is {
                expr: inner(),
                test: IsTest::NotNull,
            },
            Expr::Unary {
                op: "-".into(),
                expr: inner(),
            },
            Expr::Interval {
                expr: inner(),
                unit: "DAY".into(),
            },
            Expr::Collate {
                expr: inner(),
                collation: "utf8mb4_bin".into(),
            },
            Expr::Convert {
                expr: inner(),
                target: "CHAR".into(),
            },
            Expr::ConvertUsing {
                expr: inner(),
                charset: "utf8mb4".into(),
            },
            Expr::Binary {
                op: "+".into(),
                left: boxed(Expr::literal("1")),
                right: inner(),
            },
            Expr::Tuple(vec![Expr::literal("1"), Expr::column("x")]),
        ] {
            assert_eq!(
                check_expr(&expr, &policy),
                Err(Violation::ColumnNotAllowed("x".into()))
            );
        }
    }

    #[test]
    fn test_case_checks_every_branch() {
        let policy = columns_only(&["a", "b"]);
        let case = |else_col: &str| Expr::Case {
            operand: Some(boxed(Expr::column("a"))),
            whens: vec![When {
                cond: Expr::literal("1"),
                value: Expr::column("b"),
            }],
            else_result: Some(boxed(Expr::column(else_col))),
        };
        assert!(check_expr(&case("a"), &policy).is_ok());
        assert_eq!(
            check_expr(&case("z"), &policy),
            Err(Violation::ColumnNotAllowed("z".into()))
        );
    }

    #[test]
    fn test_case_else_is_checked_before_whens() {
        let policy = columns_only(&["a"]);
        let case = Expr::Case {
            operand: None,
            whens: vec![When {
                cond: Expr::equals(Expr::column("b"), Expr::literal("1")),
                value: Expr::literal("1"),
            }],
            else_result: Some(boxed(Expr::column("c"))),
        };
        assert_eq!(
            check_expr(&case, &policy),
            Err(Violation::ColumnNotAllowed("c".into()))
        );
    }

    // =========================================================================
    // SUBQUERIES
    // =========================================================================

    #[test]
    fn test_subquery_uses_same_policy() {
        let policy = Policy::new().allow_tables(&["t"]);
        let inner = Select {
            items: vec![SelectItem::expr(Expr::column("a"))],
            from: vec![TableSource::table(QualifiedName::new("u"))],
            ..Select::default()
        };
        let expr = Expr::compare(ComparisonOp::In, Expr::column("a"), Expr::subquery(inner.clone()));

        assert_eq!(
            check_expr(&expr, &policy),
            Err(Violation::TableNotAllowed("u".into()))
        );
        assert_eq!(
            check_expr(&Expr::Exists(Box::new(inner.into_statement())), &policy),
            Err(Violation::TableNotAllowed("u".into()))
        );
    }

    #[test]
    fn test_non_select_subquery_rejected() {
        let expr = Expr::Subquery(Box::new(Statement::Unsupported(StatementKind::SetOperation)));
        assert_eq!(
            check_expr(&expr, &Policy::new()),
            Err(Violation::UnsupportedStatement)
        );
    }

    // =========================================================================
    // FUNCTIONS
    // =========================================================================

    #[test]
    fn test_function_name_then_args() {
        let policy = Policy::new().allow_functions(&["count"]).allow_columns(&["a"]);
        assert!(check_expr(&Expr::call("COUNT", vec![Expr::column("a").into()]), &policy).is_ok());
        assert!(
            check_expr(
                &Expr::call("count", vec![SelectItem::Star(QualifiedName::default())]),
                &policy
            )
            .is_ok()
        );
        assert_eq!(
            check_expr(&Expr::call("COUNT", vec![Expr::column("b").into()]), &policy),
            Err(Violation::ColumnNotAllowed("b".into()))
        );
        assert_eq!(
            check_expr(&Expr::call("SLEEP", vec![Expr::literal("5").into()]), &policy),
            Err(Violation::FunctionNotAllowed("SLEEP".into()))
        );
    }

    #[test]
    fn test_functions_denied_without_slot() {
        let expr = Expr::call("COUNT", vec![SelectItem::Star(QualifiedName::default())]);
        assert_eq!(
            check_expr(&expr, &Policy::new()),
            Err(Violation::FunctionNotAllowed("COUNT".into()))
        );
    }

    #[test]
    fn test_function_ident() {
        let call = Expr::Function(FunctionCall {
            ident: "sys".into(),
            ..FunctionCall::new("now", vec![])
        });
        let policy = Policy::new().allow_functions(&["NOW"]).allow_function_idents(&["util"]);
        assert_eq!(
            check_expr(&call, &policy),
            Err(Violation::FunctionIdentNotAllowed("sys".into()))
        );
    }

    #[test]
    fn test_anonymous_function_is_silent() {
        let call = Expr::call("", vec![]);
        let err = check_expr(&call, &Policy::new().allow_safe_functions()).unwrap_err();
        assert_eq!(err, Violation::AnonymousFunction);
        assert_eq!(err.message(), "");
    }

    #[test]
    fn test_values_function_always_rejected() {
        let permissive = Policy::new().allow_functions(&["VALUES"]);
        assert_eq!(
            check_expr(&Expr::ValuesFunc(ColumnRef::new("a")), &permissive),
            Err(Violation::ValuesFunction)
        );
    }

    #[test]
    fn test_substr_checks_bounds_and_column() {
        let policy = columns_only(&["name"]);
        let substr = |column: &str, from: Expr| Expr::Substr {
            column: ColumnRef::new(column),
            from: boxed(from),
            to: Some(boxed(Expr::literal("3"))),
        };
        assert!(check_expr(&substr("name", Expr::literal("1")), &policy).is_ok());
        assert_eq!(
            check_expr(&substr("name", Expr::column("pos")), &policy),
            Err(Violation::ColumnNotAllowed("pos".into()))
        );
        assert_eq!(
            check_expr(&substr("secret", Expr::literal("1")), &policy),
            Err(Violation::ColumnNotAllowed("secret".into()))
        );
    }

    #[test]
    fn test_match_against() {
        let policy = columns_only(&["body"]);
        let matcher = |column: &str| Expr::Match {
            columns: vec![Expr::column(column).into()],
            expr: boxed(Expr::literal("'rust'")),
        };
        assert!(check_expr(&matcher("body"), &policy).is_ok());
        assert_eq!(
            check_expr(&matcher("title"), &policy),
            Err(Violation::ColumnNotAllowed("title".into()))
        );
    }

    #[test]
    fn test_group_concat_args_and_order() {
        let policy = columns_only(&["a"]);
        let concat = |order_col: &str| Expr::GroupConcat {
            distinct: true,
            args: vec![Expr::column("a").into()],
            order_by: vec![OrderBy {
                expr: Expr::column(order_col),
                asc: None,
            }],
            separator: Some(",".into()),
        };
        assert!(check_expr(&concat("a"), &policy).is_ok());
        assert_eq!(
            check_expr(&concat("b"), &policy),
            Err(Violation::ColumnNotAllowed("b".into()))
        );
    }

    #[test]
    fn test_default_checks_column_name() {
        let policy = columns_only(&["a"]);
        assert!(check_expr(&Expr::Default("a".into()), &policy).is_ok());
        assert_eq!(
            check_expr(&Expr::Default("b".into()), &policy),
            Err(Violation::ColumnNotAllowed("b".into()))
        );
    }

    #[test]
    fn test_unrecognized_expression_fails_closed() {
        let err = check_expr(&Expr::Unrecognized("ARRAY[1]".into()), &Policy::new()).unwrap_err();
        assert_eq!(err, Violation::UnrecognizedExpression("ARRAY[1]".into()));
        assert!(err.message().is_empty());
    }
}
