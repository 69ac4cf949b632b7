//! Schema-driven table access.
//!
//! A [`Table`] wraps one [`TableSchema`] and a shared connection. Operations
//! return affected-row counts or record lists instead of raising: failures
//! are logged as [`StorageEntry`] items and the log is cleared at the start
//! of every operation, so after a call it describes exactly that call.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, ToSql};
use tracing::debug;

use cmdforge_core::{COLUMN_DELETED, COLUMN_ID, DType, Record, TableSchema, Value};

use crate::condition::{SortOrder, SqlCondition, SqlOp};
use crate::convert::{from_storage, to_storage};
use crate::error::StorageEntry;
use crate::sql;

/// Short kind tag for a logged error.
fn error_kind(err: &rusqlite::Error) -> String {
    match err {
        rusqlite::Error::SqliteFailure(failure, _) => format!("{:?}", failure.code),
        other => {
            let rendered = format!("{other:?}");
            rendered
                .split(['(', '{', ' '])
                .next()
                .map(str::to_string)
                .unwrap_or_else(|| "Error".to_string())
        }
    }
}

fn named_params(data: &Record, skip_id: bool) -> Vec<(String, SqlValue)> {
    data.iter()
        .filter(|(name, _)| !(skip_id && name.as_str() == COLUMN_ID))
        .map(|(name, value)| (format!(":{name}"), to_storage(value)))
        .collect()
}

#[derive(Debug)]
pub struct Table {
    conn: Rc<Connection>,
    pub schema: TableSchema,
    errors: RefCell<Vec<StorageEntry>>,
}

impl Table {
    pub fn new(conn: Rc<Connection>, schema: TableSchema) -> Table {
        Table {
            conn,
            schema,
            errors: RefCell::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        self.schema.name()
    }

    /// Errors logged by the most recent operation.
    pub fn errors(&self) -> Vec<StorageEntry> {
        self.errors.borrow().clone()
    }

    fn refresh(&self) {
        self.errors.borrow_mut().clear();
    }

    fn log(&self, err: &rusqlite::Error, sql: Option<&str>, data: Option<&Record>) {
        self.errors.borrow_mut().push(StorageEntry {
            table: self.schema.name().to_string(),
            kind: error_kind(err),
            message: err.to_string(),
            sql: sql.map(str::to_string),
            data: data.and_then(|record| serde_json::to_string(record).ok()),
        });
    }

    fn log_misuse(&self, message: &str) {
        self.errors.borrow_mut().push(StorageEntry {
            table: self.schema.name().to_string(),
            kind: "InvalidInput".to_string(),
            message: message.to_string(),
            sql: None,
            data: None,
        });
    }

    fn execute(&self, sql: &str, params: &[(String, SqlValue)], data: Option<&Record>) -> usize {
        debug!(table = self.schema.name(), sql, "executing");
        let refs: Vec<(&str, &dyn ToSql)> = params
            .iter()
            .map(|(name, value)| (name.as_str(), value as &dyn ToSql))
            .collect();
        match self.conn.execute(sql, refs.as_slice()) {
            Ok(count) => count,
            Err(err) => {
                self.log(&err, Some(sql), data);
                0
            }
        }
    }

    fn rows(&self, sql: &str) -> Vec<Record> {
        debug!(table = self.schema.name(), sql, "querying");
        let mut stmt = match self.conn.prepare(sql) {
            Ok(stmt) => stmt,
            Err(err) => {
                self.log(&err, Some(sql), None);
                return Vec::new();
            }
        };
        let names: Vec<String> = stmt
            .column_names()
            .iter()
            .map(|name| name.to_string())
            .collect();
        let mapped = stmt.query_map([], |row| {
            let mut record = Record::new();
            for (index, name) in names.iter().enumerate() {
                let raw = SqlValue::from(row.get_ref(index)?);
                let dtype = self
                    .schema
                    .get(name)
                    .map(|field| field.dtype)
                    .unwrap_or(DType::Str);
                record.insert(name.clone(), from_storage(raw, dtype));
            }
            Ok(record)
        });
        match mapped {
            Ok(records) => records.filter_map(|record| record.ok()).collect(),
            Err(err) => {
                self.log(&err, Some(sql), None);
                Vec::new()
            }
        }
    }

    /// Creates the backing table if missing. Returns whether the table is
    /// usable afterwards.
    pub fn prepare(&self) -> bool {
        self.refresh();
        let sql = sql::create_table(&self.schema);
        match self.conn.execute_batch(&sql) {
            Ok(()) => true,
            Err(err) => {
                self.log(&err, Some(&sql), None);
                false
            }
        }
    }

    fn insert_inner(&self, record: &Record) -> Option<i64> {
        let mut data = self.schema.sanitize_record(record);
        data.shift_remove(COLUMN_ID);
        if data.is_empty() {
            self.log_misuse("nothing to insert");
            return None;
        }
        for (column, stamp) in self.schema.meta_value("create") {
            data.entry(column).or_insert(stamp);
        }
        let sql = sql::insert(self.schema.name(), &data);
        if self.execute(&sql, &named_params(&data, true), Some(&data)) > 0 {
            Some(self.conn.last_insert_rowid())
        } else {
            None
        }
    }

    /// Inserts one record, returning its new id. Unknown fields and cast
    /// failures are dropped before the write.
    pub fn insert(&self, record: &Record) -> Option<i64> {
        self.refresh();
        self.insert_inner(record)
    }

    /// Inserts many records; the result holds one id slot per input.
    pub fn insert_all(&self, records: &[Record]) -> Vec<Option<i64>> {
        self.refresh();
        records
            .iter()
            .map(|record| self.insert_inner(record))
            .collect()
    }

    /// Updates the fields present in `record`. Explicit nulls clear their
    /// columns. Without a condition the record's own id selects the row.
    pub fn update(&self, record: &Record, condition: Option<&SqlCondition>) -> usize {
        self.refresh();
        let nulls: Vec<String> = record
            .iter()
            .filter(|(name, value)| **value == Value::Null && self.schema.contains(name))
            .map(|(name, _)| name.clone())
            .collect();
        let mut data = self.schema.sanitize_record(record);
        for name in nulls {
            data.insert(name, Value::Null);
        }

        let id = data.shift_remove(COLUMN_ID);
        if data.is_empty() {
            self.log_misuse("no columns to update");
            return 0;
        }
        if condition.is_none() && id.is_none() {
            self.log_misuse("update needs an id or a condition");
            return 0;
        }
        data.extend(self.schema.meta_value("update"));

        let sql = sql::update(self.schema.name(), &data, condition);
        let mut params = named_params(&data, true);
        if condition.is_none() {
            if let Some(id) = id {
                params.push((format!(":{COLUMN_ID}"), to_storage(&id)));
            }
        }
        self.execute(&sql, &params, Some(&data))
    }

    /// Deletes matching rows. Tables with a `deleted_at` column soft-delete
    /// by stamping it unless `permanent` is set.
    pub fn delete(&self, condition: Option<&SqlCondition>, permanent: bool) -> usize {
        self.refresh();
        let Some(condition) = condition else {
            self.log_misuse("delete requires a condition");
            return 0;
        };
        if !permanent && self.schema.contains(COLUMN_DELETED) {
            let stamp = self.schema.meta_value("delete");
            let sql = sql::update(self.schema.name(), &stamp, Some(condition));
            self.execute(&sql, &named_params(&stamp, true), Some(&stamp))
        } else {
            let sql = sql::delete(self.schema.name(), Some(condition));
            self.execute(&sql, &[], None)
        }
    }

    pub fn delete_by_id(&self, ids: &[i64], permanent: bool) -> usize {
        let values = Value::Array(ids.iter().map(|id| Value::Int(*id)).collect());
        let condition = SqlCondition::new(COLUMN_ID, SqlOp::In, values);
        self.delete(Some(&condition), permanent)
    }

    pub fn get(&self, id: i64) -> Option<Record> {
        self.refresh();
        let condition = SqlCondition::with_id(Some(id));
        let sql = sql::select(
            self.schema.name(),
            &[],
            Some(&condition),
            &[],
            Some(1),
            None,
        );
        self.rows(&sql).into_iter().next()
    }

    /// Returns the subset of `ids` that exist; soft-deleted rows count as
    /// missing unless `with_deleted` is set.
    pub fn which_exists(&self, ids: &[i64], with_deleted: bool) -> Vec<i64> {
        self.refresh();
        let values = Value::Array(ids.iter().map(|id| Value::Int(*id)).collect());
        let mut condition = SqlCondition::new(COLUMN_ID, SqlOp::In, values);
        if !with_deleted && self.schema.contains(COLUMN_DELETED) {
            condition = condition.and(COLUMN_DELETED, SqlOp::IsNull, Value::Null);
        }
        let sql = sql::select(
            self.schema.name(),
            &[COLUMN_ID.to_string()],
            Some(&condition),
            &[],
            None,
            None,
        );
        self.rows(&sql)
            .into_iter()
            .filter_map(|record| match record.get(COLUMN_ID) {
                Some(Value::Int(id)) => Some(*id),
                _ => None,
            })
            .collect()
    }

    /// Queries records with a column selection, condition, ordering and
    /// pagination. `page_size <= 0` disables pagination; pages are 1-based.
    pub fn query(
        &self,
        columns: Option<&[String]>,
        condition: Option<&SqlCondition>,
        order_by: &[(String, SortOrder)],
        page_size: i64,
        page: i64,
    ) -> Vec<Record> {
        self.refresh();
        let columns = self.schema.filter_columns(columns);
        let (limit, offset) = if page_size > 0 {
            (Some(page_size), Some(page_size * (page - 1).max(0)))
        } else {
            (None, None)
        };
        let sql = sql::select(
            self.schema.name(),
            &columns,
            condition,
            order_by,
            limit,
            offset,
        );
        self.rows(&sql)
    }

    pub fn count(&self, condition: Option<&SqlCondition>) -> usize {
        self.refresh();
        let sql = sql::select(
            self.schema.name(),
            &["COUNT(*) AS total".to_string()],
            condition,
            &[],
            None,
            None,
        );
        match self.conn.query_row(&sql, [], |row| row.get::<_, i64>(0)) {
            Ok(total) => total.max(0) as usize,
            Err(err) => {
                self.log(&err, Some(&sql), None);
                0
            }
        }
    }

    /// Maps each matching value of `column` to the row's id, or to the whole
    /// record when `full_record` is set. Keys are the values' display text.
    pub fn translate(
        &self,
        column: &str,
        values: &[Value],
        full_record: bool,
    ) -> IndexMap<String, Value> {
        self.refresh();
        let condition = SqlCondition::new(column, SqlOp::In, Value::Array(values.to_vec()));
        let columns = if full_record {
            Vec::new()
        } else {
            vec![COLUMN_ID.to_string(), column.to_string()]
        };
        let sql = sql::select(
            self.schema.name(),
            &columns,
            Some(&condition),
            &[],
            None,
            None,
        );
        let mut translated = IndexMap::new();
        for record in self.rows(&sql) {
            let Some(key) = record.get(column) else {
                continue;
            };
            let key = key.to_string();
            let entry = if full_record {
                Value::Object(record.clone())
            } else {
                record.get(COLUMN_ID).cloned().unwrap_or(Value::Null)
            };
            translated.insert(key, entry);
        }
        translated
    }
}
