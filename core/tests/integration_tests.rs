//! Integration tests for the cmdforge-core crate.

use std::any::Any;
use std::cell::RefCell;
use std::sync::Arc;

use cmdforge_core::{
    CommandArgs, CommandDescriptor, CommandRegistry, Context, ContextDependency, ContextHandle,
    ContextRegistry, ContextStore, FieldDecl, Outcome, Prototype, RunError, TableConfig,
    TableSchema, Value,
};
use indexmap::IndexMap;

/// A context wrapping a table schema, the way a storage-backed shell would.
struct TableContext {
    schema: TableSchema,
}

impl Context for TableContext {
    fn identifier(&self) -> &str {
        self.schema.name()
    }

    fn kind(&self) -> &str {
        "table"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn table_context(config: &str) -> TableContext {
    let config: TableConfig = serde_json::from_str(config).unwrap();
    TableContext {
        schema: TableSchema::from_config(&config).unwrap(),
    }
}

fn contexts() -> ContextRegistry {
    let mut store = ContextStore::new("table");
    store.insert(Arc::new(table_context(
        r#"{"singular": "person", "plural": "people",
            "columns": {"name": "n (*str): full name", "age": "a (int): age"},
            "meta-columns": ["created_at", "deleted_at"]}"#,
    )));
    store.insert(Arc::new(table_context(
        r#"{"singular": "task",
            "columns": {"title": "t (*str): title", "done": "d (bool = 0): completed"}}"#,
    )));
    let mut registry = ContextRegistry::new();
    registry.add_store(store);
    registry
}

/// Derives per-table arguments from the context's schema columns.
fn column_arguments(context: &dyn Context) -> cmdforge_core::Result<IndexMap<String, FieldDecl>> {
    let table = context
        .as_any()
        .downcast_ref::<TableContext>()
        .ok_or_else(|| cmdforge_core::MetaError::ContextArguments {
            context: context.identifier().to_string(),
            message: "not a table context".to_string(),
        })?;
    let mut arguments = IndexMap::new();
    for (name, field) in &table.schema.columns {
        if name == "id" || table.schema.meta_columns.contains(name) {
            continue;
        }
        let mut spec = cmdforge_core::FieldSpec::default()
            .with_dtype(field.dtype.name())
            .with_required(field.required);
        if let Some(comment) = &field.comment {
            spec = spec.with_comment(comment);
        }
        arguments.insert(name.clone(), FieldDecl::from(spec));
    }
    Ok(arguments)
}

#[derive(Default)]
struct App {
    created: RefCell<Vec<(String, Vec<String>)>>,
}

fn create_prototype() -> Prototype<App> {
    let mut prototype: Prototype<App> = Prototype::new("base");
    prototype.command(
        "create",
        CommandDescriptor::new("create a new record")
            .with_dependency(
                ContextDependency::on("table")
                    .with_arguments_for(column_arguments)
                    .with_text_parser(|context, text| {
                        let table = context
                            .as_any()
                            .downcast_ref::<TableContext>()
                            .unwrap();
                        text.replace("record", &table.schema.singular)
                    }),
            ),
        |app: &mut App, context: Option<&ContextHandle>, args: &CommandArgs| {
            let table = context.unwrap().identifier().to_string();
            let fields = args.record().keys().cloned().collect();
            app.created.borrow_mut().push((table, fields));
            Ok(())
        },
    );
    prototype
}

fn tokens(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|part| part.to_string()).collect()
}

#[test]
fn test_context_dependency_fans_out_per_table() {
    let mut registry = CommandRegistry::new();
    create_prototype().apply_to(&mut registry, &contexts()).unwrap();

    assert!(registry.get("create").is_some());
    assert!(registry.get("create_people").is_some());
    assert!(registry.get("create_tasks").is_some());
    // Only the placeholder shows up in the catalog.
    let catalog = registry.catalog();
    let listed: Vec<&str> = catalog["base Commands"].iter().map(|(name, _)| *name).collect();
    assert_eq!(listed, ["create"]);
}

#[test]
fn test_dispatch_routes_through_placeholder_with_typed_arguments() {
    let mut registry = CommandRegistry::new();
    create_prototype().apply_to(&mut registry, &contexts()).unwrap();

    let mut app = App::default();
    registry
        .dispatch(&mut app, &tokens(&["create", "people", "--name", "An", "--age", "30"]))
        .unwrap();
    registry
        .dispatch(&mut app, &tokens(&["create", "tasks", "--title", "ship it"]))
        .unwrap();

    let created = app.created.borrow();
    assert_eq!(created[0].0, "people");
    assert_eq!(created[0].1, ["name", "age"]);
    assert_eq!(created[1].0, "tasks");
    // The bool column's declared default fills in.
    assert_eq!(created[1].1, ["title", "done"]);
}

#[test]
fn test_placeholder_help_lists_generated_commands() {
    let mut registry = CommandRegistry::new();
    create_prototype().apply_to(&mut registry, &contexts()).unwrap();

    let mut app = App::default();
    let outcome = registry
        .dispatch(&mut app, &tokens(&["create", "--help"]))
        .unwrap();
    let Outcome::Help(text) = outcome else {
        panic!("expected help text");
    };
    assert!(text.contains("[create people]"));
    assert!(text.contains("[create tasks]"));
}

#[test]
fn test_context_text_parameterizes_descriptions() {
    let mut registry = CommandRegistry::new();
    create_prototype().apply_to(&mut registry, &contexts()).unwrap();

    let help = registry.help("create_people").unwrap();
    assert!(help.contains("create a new person"));
}

#[test]
fn test_usage_error_reports_missing_required_argument() {
    let mut registry = CommandRegistry::new();
    create_prototype().apply_to(&mut registry, &contexts()).unwrap();

    let mut app = App::default();
    let error = registry
        .dispatch(&mut app, &tokens(&["create", "people", "--age", "30"]))
        .unwrap_err();
    assert!(matches!(error, RunError::Usage { .. }));
}

#[test]
fn test_typed_record_survives_round_trip() {
    let schema = table_context(
        r#"{"singular": "person",
            "columns": {"name": "n (*str)", "age": "a (int)", "tags": "t (array[str])"}}"#,
    )
    .schema;

    let mut record = cmdforge_core::Record::new();
    record.insert("name".to_string(), Value::Str("An".into()));
    record.insert("age".to_string(), Value::Str("not a number".into()));
    record.insert(
        "tags".to_string(),
        Value::Array(vec![Value::Str("a".into()), Value::Str("b".into())]),
    );

    let sanitized = schema.sanitize_record(&record);
    assert_eq!(sanitized.get("name"), Some(&Value::Str("An".into())));
    // Cast failure drops the field rather than erroring.
    assert!(!sanitized.contains_key("age"));
    assert!(matches!(sanitized.get("tags"), Some(Value::Array(items)) if items.len() == 2));
}
