//! SQL statement assembly from table schemas and records.
//!
//! Write statements bind data through named parameters (`:column`); the
//! WHERE clauses come pre-rendered from [`SqlCondition`].

use cmdforge_core::{COLUMN_ID, FieldDescriptor, Record, TableSchema};

use crate::condition::{SortOrder, SqlCondition, quote};

fn create_column(field: &FieldDescriptor) -> String {
    if field.name == COLUMN_ID {
        return format!("{COLUMN_ID} INTEGER PRIMARY KEY");
    }
    let mut column = format!("{} {}", field.name, field.dtype.storage_type());
    if field.required {
        column.push_str(" NOT NULL");
    }
    if let Some(default) = &field.default_value {
        column.push_str(&format!(" DEFAULT {}", quote(default)));
    }
    column
}

pub fn create_table(schema: &TableSchema) -> String {
    let mut lines: Vec<String> = schema.columns.values().map(create_column).collect();
    lines.extend(
        schema
            .constraints
            .iter()
            .map(|constraint| constraint.trim().to_string())
            .filter(|constraint| !constraint.is_empty()),
    );
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n{}\n)",
        schema.name(),
        lines.join(",\n")
    )
}

/// INSERT with named parameters for every non-id field of `data`.
pub fn insert(table: &str, data: &Record) -> String {
    let columns: Vec<&str> = data
        .keys()
        .map(String::as_str)
        .filter(|column| *column != COLUMN_ID)
        .collect();
    let placeholders: Vec<String> = columns.iter().map(|column| format!(":{column}")).collect();
    format!(
        "INSERT INTO {table} ({}) VALUES ({})",
        columns.join(", "),
        placeholders.join(", ")
    )
}

/// UPDATE setting every non-id field of `data`; without a condition the
/// statement targets the `:id` named parameter.
pub fn update(table: &str, data: &Record, condition: Option<&SqlCondition>) -> String {
    let assignments: Vec<String> = data
        .keys()
        .filter(|column| column.as_str() != COLUMN_ID)
        .map(|column| format!("{column} = :{column}"))
        .collect();
    let condition = condition
        .map(SqlCondition::build)
        .unwrap_or_else(|| SqlCondition::with_id(None).build());
    format!(
        "UPDATE {table} SET {} WHERE {condition}",
        assignments.join(", ")
    )
}

pub fn delete(table: &str, condition: Option<&SqlCondition>) -> String {
    match condition {
        Some(condition) => format!("DELETE FROM {table} WHERE {}", condition.build()),
        None => format!("DELETE FROM {table}"),
    }
}

pub fn select(
    table: &str,
    columns: &[String],
    condition: Option<&SqlCondition>,
    order_by: &[(String, SortOrder)],
    limit: Option<i64>,
    offset: Option<i64>,
) -> String {
    let columns = if columns.is_empty() {
        "*".to_string()
    } else {
        columns.join(", ")
    };
    let mut sql = format!("SELECT {columns} FROM {table}");
    if let Some(condition) = condition {
        sql.push_str(&format!(" WHERE {}", condition.build()));
    }
    if !order_by.is_empty() {
        let orders: Vec<String> = order_by
            .iter()
            .map(|(column, direction)| format!("{column} {}", direction.keyword()))
            .collect();
        sql.push_str(&format!(" ORDER BY {}", orders.join(", ")));
    }
    if let Some(limit) = limit {
        sql.push_str(&format!(" LIMIT {limit}"));
    }
    if let Some(offset) = offset {
        sql.push_str(&format!(" OFFSET {offset}"));
    }
    sql
}
