//! Statement, `FROM` source and projection walkers.

use super::{Validator, Violation};
use crate::ast::{Select, SelectItem, SimpleTable, Statement, TableSource};
use crate::policy::rules;

impl Validator<'_> {
    /// Only a plain `SELECT` is accepted; other statements are never looked into.
    pub(super) fn check_statement(&mut self, statement: &Statement) -> Result<(), Violation> {
        self.nested(|v| match statement {
            Statement::Select(select) => v.check_select(select),
            Statement::Unsupported(kind) => {
                tracing::debug!(%kind, "unsupported statement kind");
                Err(Violation::UnsupportedStatement)
            },
        })
    }

    fn check_select(&mut self, select: &Select) -> Result<(), Violation> {
        for item in &select.items {
            self.check_select_item(item)?;
        }
        for source in &select.from {
            self.check_table_source(source)?;
        }
        self.check_opt_expr(select.selection.as_ref())?;
        for expr in &select.group_by {
            self.check_expr(expr)?;
        }
        self.check_opt_expr(select.having.as_ref())?;
        for order in &select.order_by {
            self.check_expr(&order.expr)?;
        }
        if let Some(limit) = &select.limit {
            self.check_opt_expr(limit.offset.as_ref())?;
            self.check_opt_expr(limit.row_count.as_ref())?;
        }
        Ok(())
    }

    /// Join kind is not policy-relevant; only the `ON` condition is checked.
    pub(super) fn check_table_source(&mut self, source: &TableSource) -> Result<(), Violation> {
        self.nested(|v| match source {
            TableSource::Aliased { table, .. } => match table {
                SimpleTable::Name(name) => rules::check_table_name(v.policy, name),
                SimpleTable::Subquery(statement) => v.check_statement(statement),
            },
            TableSource::Parenthesized(sources) => {
                sources.iter().try_for_each(|s| v.check_table_source(s))
            },
            TableSource::Join {
                left, right, on, ..
            } => {
                v.check_table_source(left)?;
                v.check_table_source(right)?;
                v.check_opt_expr(on.as_ref())
            },
            TableSource::Unsupported(_) => Err(Violation::UnsupportedTableExpr),
        })
    }

    /// Aliases are never policy-checked.
    pub(super) fn check_select_item(&mut self, item: &SelectItem) -> Result<(), Violation> {
        match item {
            SelectItem::Star(table) => rules::check_table_name(self.policy, table),
            SelectItem::Expr { expr, .. } | SelectItem::NextValue(expr) => self.check_expr(expr),
            SelectItem::Unsupported(_) => Err(Violation::UnsupportedSelectItem),
        }
    }
}
