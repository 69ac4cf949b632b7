//! The built-in CRUD command set.
//!
//! One prototype declares `create`, `update`, `delete`, `list` and `export`
//! against the `"table"` context kind; compilation fans each command out per
//! configured table. Argument sets are derived from the table's columns, and
//! the words `record`/`records` in help text are replaced with the table's
//! human names.

use std::any::Any;
use std::path::PathBuf;
use std::sync::Arc;

use indexmap::IndexMap;

use cmdforge_core::{
    COLUMN_DELETED, COLUMN_ID, Arity, CommandArgs, CommandDescriptor, Context, ContextDependency,
    ContextHandle, ContextRegistry, ContextStore, FieldDecl, FieldDescriptor, FieldSpec,
    HandlerError, MetaError, Prototype, Result as MetaResult, TableSchema, Value, translate_words,
};
use cmdforge_render::{Channel, FileOptions, Response, ResponseFormatter, TableStyle, TemplateArgs};
use cmdforge_sqlite::{Database, SqlCondition, StorageEntry, Table};

use crate::shell::Shell;

pub const TABLE_KIND: &str = "table";

/// One configured table as a command context.
pub struct TableContext {
    pub schema: TableSchema,
}

impl Context for TableContext {
    fn identifier(&self) -> &str {
        self.schema.name()
    }

    fn kind(&self) -> &str {
        TABLE_KIND
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Builds the context registry with one table context per database table.
pub fn table_contexts(database: &Database) -> ContextRegistry {
    let mut store = ContextStore::new(TABLE_KIND);
    for table in database.tables() {
        store.insert(Arc::new(TableContext {
            schema: table.schema.clone(),
        }));
    }
    let mut registry = ContextRegistry::new();
    registry.add_store(store);
    registry
}

fn context_schema(context: &dyn Context) -> MetaResult<&TableSchema> {
    context
        .as_any()
        .downcast_ref::<TableContext>()
        .map(|table| &table.schema)
        .ok_or_else(|| MetaError::ContextArguments {
            context: context.identifier().to_string(),
            message: "not a table context".to_string(),
        })
}

/// Derives one argument spec from a column descriptor.
fn column_spec(field: &FieldDescriptor, required: bool) -> FieldSpec {
    let mut spec = FieldSpec::default()
        .with_dtype(field.dtype.name())
        .with_required(required);
    if let Some(default) = &field.default_value {
        spec = spec.with_default(default.clone());
    }
    if let Some(comment) = &field.comment {
        spec = spec.with_comment(comment);
    }
    spec.flags = field.flags.clone();
    spec.choices = field.choices.clone();
    spec
}

fn data_columns(schema: &TableSchema) -> impl Iterator<Item = (&String, &FieldDescriptor)> {
    schema
        .columns
        .iter()
        .filter(|(name, _)| name.as_str() != COLUMN_ID && !schema.meta_columns.contains(name))
}

fn create_arguments(context: &dyn Context) -> MetaResult<IndexMap<String, FieldDecl>> {
    let schema = context_schema(context)?;
    let mut arguments = IndexMap::new();
    for (name, field) in data_columns(schema) {
        arguments.insert(name.clone(), column_spec(field, field.required).into());
    }
    Ok(arguments)
}

fn update_arguments(context: &dyn Context) -> MetaResult<IndexMap<String, FieldDecl>> {
    let schema = context_schema(context)?;
    let mut arguments = IndexMap::new();
    arguments.insert(
        COLUMN_ID.to_string(),
        FieldSpec::default()
            .with_dtype("int")
            .positional()
            .with_comment("id of the record to update")
            .into(),
    );
    for (name, field) in data_columns(schema) {
        arguments.insert(name.clone(), column_spec(field, false).into());
    }
    Ok(arguments)
}

fn delete_arguments(context: &dyn Context) -> MetaResult<IndexMap<String, FieldDecl>> {
    context_schema(context)?;
    let mut arguments = IndexMap::new();
    arguments.insert(
        COLUMN_ID.to_string(),
        FieldSpec::default()
            .with_dtype("int")
            .positional()
            .with_nargs(Arity::OneOrMore)
            .with_comment("ids of the records to delete")
            .into(),
    );
    Ok(arguments)
}

/// Replaces `record`/`records` in help text with the table's human names.
fn table_text(context: &dyn Context, text: &str) -> String {
    match context.as_any().downcast_ref::<TableContext>() {
        Some(table) => translate_words(
            text,
            &[
                ("record", &table.schema.singular),
                ("records", &table.schema.plural),
            ],
        ),
        None => text.to_string(),
    }
}

fn resolve_table<'a>(
    shell: &'a Shell,
    context: Option<&ContextHandle>,
) -> Result<&'a Table, HandlerError> {
    let context = context.ok_or("command requires a table context")?;
    shell
        .database
        .get(context.identifier())
        .ok_or_else(|| format!("unknown table [{}]", context.identifier()).into())
}

/// Renders the table's per-operation error log as exception messages.
fn storage_report(
    formatter: &ResponseFormatter,
    debug: bool,
    entries: &[StorageEntry],
) -> Response {
    let mut response = Response::new().on(Channel::Error);
    for entry in entries {
        let mut args = TemplateArgs::new()
            .with("type", entry.kind.clone())
            .with("message", entry.message.clone());
        if debug {
            if let Some(sql) = &entry.sql {
                args = args.with("command", sql.clone());
            }
            if let Some(data) = &entry.data {
                args = args.with("argument", data.clone());
            }
        }
        response = response.message(formatter, "exception", &args);
        if debug {
            response = response.push("-".repeat(80));
        }
    }
    response
}

fn handle_create(
    shell: &mut Shell,
    context: Option<&ContextHandle>,
    args: &CommandArgs,
) -> Result<(), HandlerError> {
    let response = {
        let table = resolve_table(shell, context)?;
        let inserted = table.insert(&args.record());
        let mut response = Response::new();
        if let Some(id) = inserted {
            response = response.message(
                &shell.formatter,
                "success",
                &TemplateArgs::new()
                    .with("action", "create")
                    .with("what", format!("1 {}", table.schema.human_name(1)))
                    .with("result", id),
            );
        }
        response.concat(storage_report(&shell.formatter, shell.debug, &table.errors()))
    };
    response.send(shell);
    Ok(())
}

fn handle_update(
    shell: &mut Shell,
    context: Option<&ContextHandle>,
    args: &CommandArgs,
) -> Result<(), HandlerError> {
    let response = {
        let table = resolve_table(shell, context)?;
        let mut record = args.record();
        let mut response = Response::new();

        // --no-<column> tokens null the column; anything else is ignored
        // with a warning.
        for token in &args.unknown {
            let column = token.strip_prefix("--no-").unwrap_or("");
            if !column.is_empty() && table.schema.contains(column) {
                record.insert(column.to_string(), Value::Null);
            } else {
                response = response.on(Channel::Error).message(
                    &shell.formatter,
                    "argument_warning",
                    &TemplateArgs::new()
                        .with("argument", token.clone())
                        .with("status", "ignored")
                        .with("reason", "it matches no column"),
                );
            }
        }

        let count = table.update(&record, None);
        if count > 0 {
            response = response.on(Channel::Output).message(
                &shell.formatter,
                "success",
                &TemplateArgs::new()
                    .with("action", "update")
                    .with("what", format!("{count} {}", table.schema.human_name(count))),
            );
        }
        response.concat(storage_report(&shell.formatter, shell.debug, &table.errors()))
    };
    response.send(shell);
    Ok(())
}

fn handle_delete(
    shell: &mut Shell,
    context: Option<&ContextHandle>,
    args: &CommandArgs,
) -> Result<(), HandlerError> {
    let response = {
        let table = resolve_table(shell, context)?;
        let permanent = args.get_bool("permanent");
        let ids: Vec<i64> = args
            .get_array(COLUMN_ID)
            .iter()
            .filter_map(Value::as_int)
            .collect();

        let existing = table.which_exists(&ids, permanent);
        let missing: Vec<String> = ids
            .iter()
            .filter(|id| !existing.contains(id))
            .map(|id| id.to_string())
            .collect();

        let mut response = Response::new();
        if !missing.is_empty() {
            response = response.on(Channel::Error).message(
                &shell.formatter,
                "found_info",
                &TemplateArgs::new()
                    .with("negative", true)
                    .with("what", table.schema.human_name(missing.len()).to_string())
                    .with("items", missing.join(", ")),
            );
        }

        if !existing.is_empty() {
            let count = table.delete_by_id(&existing, permanent);
            if count > 0 {
                response = response.on(Channel::Output).message(
                    &shell.formatter,
                    "success",
                    &TemplateArgs::new()
                        .with("action", "delete")
                        .with("what", format!("{count} {}", table.schema.human_name(count))),
                );
            }
            response = response
                .concat(storage_report(&shell.formatter, shell.debug, &table.errors()));
        }
        response
    };
    response.send(shell);
    Ok(())
}

/// Deleted-row filter for read commands, unless `--all` asked for them.
fn visibility_condition(table: &Table, all: bool) -> Option<SqlCondition> {
    (!all && table.schema.contains(COLUMN_DELETED)).then(|| SqlCondition::null(COLUMN_DELETED))
}

fn handle_list(
    shell: &mut Shell,
    context: Option<&ContextHandle>,
    args: &CommandArgs,
) -> Result<(), HandlerError> {
    let response = {
        let table = resolve_table(shell, context)?;
        let columns: Vec<String> = args
            .get_array("columns")
            .iter()
            .map(Value::to_string)
            .collect();
        let condition = visibility_condition(table, args.get_bool("all"));
        let size = args.get_int("size").unwrap_or(20);
        let page = args.get_int("page").unwrap_or(1);

        let total = table.count(condition.as_ref());
        let records = table.query(Some(&columns), condition.as_ref(), &[], size, page);
        let style = TableStyle::from_value(args.get("format").as_ref());
        let widths: Vec<usize> = args
            .get_array("widths")
            .iter()
            .filter_map(Value::as_int)
            .map(|width| width.max(0) as usize)
            .collect();

        let mut response = Response::new();
        if records.is_empty() {
            response = response.message(
                &shell.formatter,
                "found_info",
                &TemplateArgs::new()
                    .with("negative", true)
                    .with("what", table.schema.plural.clone()),
            );
        } else {
            response = response
                .on(Channel::Paged)
                .table(&shell.formatter, &records, style, &widths, None)
                .on(Channel::Output)
                .message(
                    &shell.formatter,
                    "found_info",
                    &TemplateArgs::new()
                        .with("count", records.len() as i64)
                        .with("total", total as i64)
                        .with("what", table.schema.human_name(records.len()).to_string()),
                );
        }
        response.concat(storage_report(&shell.formatter, shell.debug, &table.errors()))
    };
    response.send(shell);
    Ok(())
}

fn handle_export(
    shell: &mut Shell,
    context: Option<&ContextHandle>,
    args: &CommandArgs,
) -> Result<(), HandlerError> {
    let response = {
        let table = resolve_table(shell, context)?;
        let columns: Vec<String> = args
            .get_array("columns")
            .iter()
            .map(Value::to_string)
            .collect();
        let condition = visibility_condition(table, args.get_bool("all"));
        let records = table.query(Some(&columns), condition.as_ref(), &[], 0, 0);

        let format = args.get_str("format").unwrap_or_default();
        let path = args.get_str("path").map(PathBuf::from);
        let append = args.get_bool("append");
        let options = FileOptions::from_record(&args.record());

        let mut response = Response::new();
        match shell
            .formatter
            .export(&format, &records, path.as_deref(), append, &options)
        {
            Ok(Some(rendered)) => {
                response = response.on(Channel::Paged).push(rendered);
            }
            Ok(None) => {
                let mut message_args = TemplateArgs::new()
                    .with("action", "export")
                    .with(
                        "what",
                        format!("{} {}", records.len(), table.schema.human_name(records.len())),
                    );
                if let Some(path) = &path {
                    message_args = message_args.with("result", path.display().to_string());
                }
                response = response.message(&shell.formatter, "success", &message_args);
            }
            Err(error) => {
                response = response.on(Channel::Error).message(
                    &shell.formatter,
                    "exception",
                    &TemplateArgs::new()
                        .with("type", "ExportError")
                        .with("message", error.to_string()),
                );
            }
        }
        response.concat(storage_report(&shell.formatter, shell.debug, &table.errors()))
    };
    response.send(shell);
    Ok(())
}

/// Declares the CRUD command set.
pub fn base_prototype() -> Prototype<Shell> {
    let mut prototype = Prototype::new("base").with_category("Record Commands");

    prototype.command(
        "create",
        CommandDescriptor::new("create a new record").with_dependency(
            ContextDependency::on(TABLE_KIND)
                .with_arguments_for(create_arguments)
                .with_text_parser(table_text),
        ),
        handle_create,
    );

    prototype.command(
        "update",
        CommandDescriptor::new("update an existing record")
            .with_epilog("use --no-<column> to clear a column")
            .accepting_unknown()
            .with_dependency(
                ContextDependency::on(TABLE_KIND)
                    .with_arguments_for(update_arguments)
                    .with_text_parser(table_text),
            ),
        handle_update,
    );

    prototype.command(
        "delete",
        CommandDescriptor::new("delete records by id")
            .with_argument("permanent", "p (bool = 0): remove rows instead of marking them")
            .with_dependency(
                ContextDependency::on(TABLE_KIND)
                    .with_arguments_for(delete_arguments)
                    .with_text_parser(table_text),
            ),
        handle_delete,
    );

    prototype.command(
        "list",
        CommandDescriptor::new("list records page by page")
            .with_argument(
                "columns",
                FieldSpec::default()
                    .with_dtype("str")
                    .positional()
                    .with_nargs(Arity::ZeroOrMore)
                    .with_comment("columns to show (*, meta, names, ^exclusions)"),
            )
            .with_argument("format", "f (int: [0, 1, 2] = 1): table style")
            .with_argument("widths", "w (array[int]): relative column widths")
            .with_argument("size", "s (int = 20): records per page")
            .with_argument("page", "p (int = 1): page to show")
            .with_argument("all", "a (bool = 0): include deleted records")
            .with_dependency(ContextDependency::on(TABLE_KIND).with_text_parser(table_text)),
        handle_list,
    );

    prototype.command(
        "export",
        CommandDescriptor::new("export records to a file")
            .with_argument(
                "columns",
                FieldSpec::default()
                    .with_dtype("str")
                    .positional()
                    .with_nargs(Arity::ZeroOrMore)
                    .with_comment("columns to export (*, meta, names, ^exclusions)"),
            )
            .with_argument("format", "f (*str): output format")
            .with_argument("path", "o (str): output file, prints without one")
            .with_argument("append", "(bool = 0): append instead of overwriting")
            .with_argument("headers", "(bool = 1): include a header row")
            .with_argument("delimiter", "d (str): field separator")
            .with_argument("indent", "i (int): indent level for nested formats")
            .with_argument("sort_keys", "(bool = 0): sort keys before writing")
            .with_argument("all", "a (bool = 0): include deleted records")
            .with_dependency(ContextDependency::on(TABLE_KIND).with_text_parser(table_text)),
        handle_export,
    );

    prototype
}
