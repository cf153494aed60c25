//! Literal T-SQL statement rendering.

use crate::model::SortDirection;
use crate::policy::EmissionOptions;

/// Longest identifier the target platform accepts.
pub const MAX_IDENTIFIER_LENGTH: usize = 128;

/// Quote an identifier as `[name]`, doubling any closing bracket.
pub fn quote_identifier(name: &str) -> String {
    format!("[{}]", name.replace(']', "]]"))
}

/// `[schema].[table]`, or `[table]` when bare table names are requested.
pub fn table_reference(schema: &str, table: &str, emission: &EmissionOptions) -> String {
    if emission.emit_bare_table_only {
        quote_identifier(table)
    } else {
        format!("{}.{}", quote_identifier(schema), quote_identifier(table))
    }
}

fn column_list<S: AsRef<str>>(columns: &[S]) -> String {
    columns
        .iter()
        .map(|c| quote_identifier(c.as_ref()))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn alter_column_not_null(table: &str, column: &str, sql_type: &str) -> String {
    format!(
        "ALTER TABLE {} ALTER COLUMN {} {} NOT NULL;",
        table,
        quote_identifier(column),
        sql_type
    )
}

pub fn create_unique_index(index: &str, table: &str, columns: &[(&str, SortDirection)]) -> String {
    let keys = columns
        .iter()
        .map(|(column, direction)| format!("{} {}", quote_identifier(column), direction.keyword()))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "CREATE UNIQUE NONCLUSTERED INDEX {} ON {} ({});",
        quote_identifier(index),
        table,
        keys
    )
}

pub fn add_foreign_key<S: AsRef<str>, T: AsRef<str>>(
    table: &str,
    constraint: &str,
    columns: &[S],
    target_table: &str,
    target_columns: &[T],
    no_check: bool,
) -> String {
    format!(
        "ALTER TABLE {} {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({});",
        table,
        if no_check { "WITH NOCHECK" } else { "WITH CHECK" },
        quote_identifier(constraint),
        column_list(columns),
        target_table,
        column_list(target_columns)
    )
}

pub fn check_constraint(table: &str, constraint: &str) -> String {
    format!(
        "ALTER TABLE {} CHECK CONSTRAINT {};",
        table,
        quote_identifier(constraint)
    )
}

pub fn backfill_nulls(table: &str, column: &str, literal: &str) -> String {
    let column = quote_identifier(column);
    format!(
        "UPDATE {} SET {} = {} WHERE {} IS NULL;",
        table, column, literal, column
    )
}

/// A commented query listing duplicate key tuples.
pub fn duplicate_probe<S: AsRef<str>>(table: &str, columns: &[S]) -> String {
    let keys = column_list(columns);
    format!(
        "-- Resolve duplicates: SELECT {}, COUNT(*) FROM {} GROUP BY {} HAVING COUNT(*) > 1;",
        keys, table, keys
    )
}

/// `FK_<table>_<column>`, plus `_<target>` unless the column name already
/// mentions the target table. Truncated to the platform identifier limit.
pub fn foreign_key_name(source_table: &str, column: &str, target_table: &str) -> String {
    let mut name = format!("FK_{}_{}", source_table, column);
    if !column.to_lowercase().contains(&target_table.to_lowercase()) {
        name.push('_');
        name.push_str(target_table);
    }
    if name.chars().count() > MAX_IDENTIFIER_LENGTH {
        name = name.chars().take(MAX_IDENTIFIER_LENGTH).collect();
    }
    name
}

/// Booleans in evidence strings render as `True` / `False`.
pub fn bool_literal(value: bool) -> &'static str {
    if value { "True" } else { "False" }
}
