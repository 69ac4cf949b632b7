//! SQL WHERE-clause builder.
//!
//! Conditions chain with `and`/`or`, group with `and_group`/`or_group`, and
//! render to a clause string with [`SqlCondition::build`]. Values are
//! inlined: numbers stay bare, text is single-quoted (with embedded quotes
//! doubled), and strings starting with `:` pass through as named parameters.

use cmdforge_core::{COLUMN_ID, Value};

/// Comparison operators supported by the builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlOp {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
    Like,
    In,
    Between,
    IsNull,
    IsNotNull,
}

impl SqlOp {
    pub fn symbol(self) -> &'static str {
        match self {
            SqlOp::Eq => "=",
            SqlOp::Ne => "<>",
            SqlOp::Gt => ">",
            SqlOp::Lt => "<",
            SqlOp::Ge => ">=",
            SqlOp::Le => "<=",
            SqlOp::Like => "LIKE",
            SqlOp::In => "IN",
            SqlOp::Between => "BETWEEN",
            SqlOp::IsNull => "IS NULL",
            SqlOp::IsNotNull => "IS NOT NULL",
        }
    }
}

/// Sort direction for ORDER BY clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn keyword(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Renders a value for inlining into a clause.
pub(crate) fn quote(value: &Value) -> String {
    match value {
        Value::Int(_) | Value::Float(_) => value.to_string(),
        Value::Bool(b) => if *b { "1" } else { "0" }.to_string(),
        Value::Str(s) if s.starts_with(':') => s.clone(),
        other => format!("'{}'", other.to_string().replace('\'', "''")),
    }
}

fn clause(column: &str, op: SqlOp, value: &Value) -> String {
    match op {
        SqlOp::IsNull | SqlOp::IsNotNull => format!("{column} {}", op.symbol()),
        SqlOp::In => {
            let items = match value {
                Value::Array(items) => items.iter().map(quote).collect::<Vec<_>>(),
                other => vec![quote(other)],
            };
            format!("{column} IN ({})", items.join(", "))
        }
        SqlOp::Between => match value {
            Value::Array(items) if items.len() == 2 => format!(
                "{column} BETWEEN {} AND {}",
                quote(&items[0]),
                quote(&items[1])
            ),
            other => format!("{column} BETWEEN {}", quote(other)),
        },
        _ => format!("{column} {} {}", op.symbol(), quote(value)),
    }
}

/// A chainable WHERE clause.
#[derive(Debug, Clone)]
pub struct SqlCondition {
    parts: Vec<String>,
}

impl SqlCondition {
    pub fn new(column: &str, op: SqlOp, value: impl Into<Value>) -> SqlCondition {
        SqlCondition {
            parts: vec![clause(column, op, &value.into())],
        }
    }

    /// A condition with NOT prepended to its first clause.
    pub fn negated(column: &str, op: SqlOp, value: impl Into<Value>) -> SqlCondition {
        SqlCondition {
            parts: vec![format!("NOT {}", clause(column, op, &value.into()))],
        }
    }

    pub fn null(column: &str) -> SqlCondition {
        SqlCondition::new(column, SqlOp::IsNull, Value::Null)
    }

    pub fn not_null(column: &str) -> SqlCondition {
        SqlCondition::new(column, SqlOp::IsNotNull, Value::Null)
    }

    /// Matches the id column; without a value it binds the `:id` named
    /// parameter.
    pub fn with_id(value: Option<i64>) -> SqlCondition {
        match value {
            Some(id) => SqlCondition::new(COLUMN_ID, SqlOp::Eq, Value::Int(id)),
            None => SqlCondition::new(COLUMN_ID, SqlOp::Eq, format!(":{COLUMN_ID}")),
        }
    }

    pub fn and(mut self, column: &str, op: SqlOp, value: impl Into<Value>) -> Self {
        self.parts.push("AND".to_string());
        self.parts.push(clause(column, op, &value.into()));
        self
    }

    pub fn or(mut self, column: &str, op: SqlOp, value: impl Into<Value>) -> Self {
        self.parts.push("OR".to_string());
        self.parts.push(clause(column, op, &value.into()));
        self
    }

    pub fn and_group(mut self, other: SqlCondition) -> Self {
        self.parts.push(format!("AND ( {} )", other.build()));
        self
    }

    pub fn or_group(mut self, other: SqlCondition) -> Self {
        self.parts.push(format!("OR ( {} )", other.build()));
        self
    }

    pub fn build(&self) -> String {
        self.parts.join(" ")
    }
}

impl std::fmt::Display for SqlCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.build())
    }
}
