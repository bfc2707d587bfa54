//! Identifier rules: one name against one allowlist slot.
//!
//! Each category has its own behavior when its slot is not configured:
//!
//! | Category | Slot absent | Slot present |
//! |----------|-------------|--------------|
//! | Table name | pass | must match an entry |
//! | Table qualifier | fail if a qualifier is written | must match an entry |
//! | Column name | pass | bare or backquoted form must match |
//! | Function name | always fail | upper-cased name must match |
//! | Function ident | pass | must match an entry |
//!
//! Empty names always pass their own rule.

use super::Policy;
use crate::ast::{ColumnRef, QualifiedName};
use crate::validate::Violation;

/// Check a table reference against the table and qualifier slots.
///
/// A reference with an empty name passes without looking at its qualifier.
pub fn check_table_name(policy: &Policy, table: &QualifiedName) -> Result<(), Violation> {
    if table.is_empty() {
        return Ok(());
    }

    if let Some(allowed) = &policy.tables
        && !allowed.contains(&table.name)
    {
        return Err(Violation::TableNotAllowed(table.name.clone()));
    }

    if table.qualifier.is_empty() {
        return Ok(());
    }
    match &policy.qualifiers {
        Some(allowed) if allowed.contains(&table.qualifier) => Ok(()),
        _ => Err(Violation::QualifierNotAllowed(table.qualifier.clone())),
    }
}

/// Check a column reference: its table qualifier first, then its name.
pub fn check_column_ref(policy: &Policy, column: &ColumnRef) -> Result<(), Violation> {
    check_table_name(policy, &column.table)?;
    check_column_name(policy, &column.name)
}

/// Check a bare column name against the column slot.
pub fn check_column_name(policy: &Policy, column: &str) -> Result<(), Violation> {
    if column.is_empty() {
        return Ok(());
    }

    match &policy.columns {
        Some(allowed) if !allowed.contains(column) && !allowed.contains(&quoted(column)) => {
            Err(Violation::ColumnNotAllowed(column.to_string()))
        },
        _ => Ok(()),
    }
}

/// Check a function's qualifier and name.
///
/// Function names are default-deny: without a configured function slot every
/// call fails, common aggregates included.
pub fn check_function_name(policy: &Policy, ident: &str, name: &str) -> Result<(), Violation> {
    if name.is_empty() && ident.is_empty() {
        return Err(Violation::AnonymousFunction);
    }

    if !ident.is_empty()
        && let Some(allowed) = &policy.function_idents
        && !allowed.contains(ident)
    {
        return Err(Violation::FunctionIdentNotAllowed(ident.to_string()));
    }

    match &policy.functions {
        Some(allowed) if allowed.contains(&name.to_uppercase()) => Ok(()),
        _ => Err(Violation::FunctionNotAllowed(name.to_string())),
    }
}

/// MySQL identifier quoting.
#[inline]
fn quoted(ident: &str) -> String {
    format!("`{ident}`")
}
