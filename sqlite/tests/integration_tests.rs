//! End-to-end storage tests: schema file in, CRUD lifecycle out.

use std::io::Write;

use cmdforge_core::{Record, Value};
use cmdforge_sqlite::{Database, DatabaseConfig, SortOrder, SqlCondition, SqlOp};

const SCHEMA: &str = r#"{
    "tables": {
        "person": {
            "plural": "people",
            "columns": {
                "name": "n (*str): full name",
                "age": "a (int): age in years",
                "email": "e (str): email address"
            },
            "meta-columns": ["created_at", "updated_at", "deleted_at"]
        },
        "task": {
            "columns": {
                "title": "t (*str): what to do",
                "done": "d (bool = 0): completion flag"
            },
            "meta-columns": ["created_at"]
        }
    },
    "aliases": {"todo": "tasks"}
}"#;

fn database() -> Database {
    let config: DatabaseConfig = serde_json::from_str(SCHEMA).unwrap();
    let db = Database::open(None, &config).unwrap();
    assert!(db.prepare());
    db
}

fn person(name: &str, age: i64) -> Record {
    let mut record = Record::new();
    record.insert("name".to_string(), Value::Str(name.to_string()));
    record.insert("age".to_string(), Value::Int(age));
    record
}

#[test]
fn test_full_lifecycle_with_soft_delete() {
    let db = database();
    let people = db.get("people").unwrap();

    let ids: Vec<i64> = people
        .insert_all(&[person("An", 30), person("Bo", 40), person("Cy", 50)])
        .into_iter()
        .flatten()
        .collect();
    assert_eq!(ids.len(), 3);

    // Update one record through its own id.
    let mut changes = Record::new();
    changes.insert("id".to_string(), Value::Int(ids[0]));
    changes.insert("age".to_string(), Value::Int(31));
    assert_eq!(people.update(&changes, None), 1);
    let updated = people.get(ids[0]).unwrap();
    assert_eq!(updated.get("age"), Some(&Value::Int(31)));
    assert!(matches!(updated.get("updated_at"), Some(Value::DateTime(_))));

    // Soft delete keeps the row but marks it gone.
    assert_eq!(people.delete_by_id(&[ids[1]], false), 1);
    assert_eq!(people.which_exists(&ids, false), vec![ids[0], ids[2]]);
    assert_eq!(people.count(None), 3);
    assert_eq!(
        people.count(Some(&SqlCondition::null("deleted_at"))),
        2
    );

    // Permanent delete removes it.
    assert_eq!(people.delete_by_id(&[ids[1]], true), 1);
    assert_eq!(people.count(None), 2);
}

#[test]
fn test_query_with_conditions_ordering_and_pages() {
    let db = database();
    let people = db.get("people").unwrap();
    for index in 0..10 {
        people.insert(&person(&format!("p{index}"), 20 + index));
    }

    let adults = people.query(
        Some(&["name".to_string(), "age".to_string()]),
        Some(&SqlCondition::new("age", SqlOp::Ge, 25i64)),
        &[("age".to_string(), SortOrder::Asc)],
        3,
        1,
    );
    assert_eq!(adults.len(), 3);
    assert_eq!(adults[0].get("age"), Some(&Value::Int(25)));
    // Only the selected columns come back.
    assert!(adults[0].get("id").is_none());

    let second_page = people.query(
        None,
        Some(&SqlCondition::new("age", SqlOp::Ge, 25i64)),
        &[("age".to_string(), SortOrder::Asc)],
        3,
        2,
    );
    assert_eq!(second_page[0].get("age"), Some(&Value::Int(28)));
}

#[test]
fn test_bool_columns_round_trip_through_storage() {
    let db = database();
    let tasks = db.get("todo").unwrap();

    let mut record = Record::new();
    record.insert("title".to_string(), Value::Str("ship it".into()));
    record.insert("done".to_string(), Value::Bool(true));
    let id = tasks.insert(&record).unwrap();

    let stored = tasks.get(id).unwrap();
    assert_eq!(stored.get("done"), Some(&Value::Bool(true)));
    assert_eq!(stored.get("title"), Some(&Value::Str("ship it".into())));
}

#[test]
fn test_database_errors_aggregate_across_tables() {
    let db = database();
    let people = db.get("people").unwrap();
    let tasks = db.get("tasks").unwrap();

    let mut missing_name = Record::new();
    missing_name.insert("age".to_string(), Value::Int(1));
    assert_eq!(people.insert(&missing_name), None);

    let mut missing_title = Record::new();
    missing_title.insert("done".to_string(), Value::Bool(false));
    assert_eq!(tasks.insert(&missing_title), None);

    let errors = db.errors();
    assert_eq!(errors.len(), 2);
    let tables: Vec<&str> = errors.iter().map(|entry| entry.table.as_str()).collect();
    assert_eq!(tables, ["people", "tasks"]);
}

#[test]
fn test_file_backed_database_persists() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("app.db");
    let schema_path = dir.path().join("schema.json");
    let mut file = std::fs::File::create(&schema_path).unwrap();
    write!(file, "{SCHEMA}").unwrap();

    let id = {
        let db = Database::from_schema_file(Some(&db_path), &schema_path).unwrap();
        assert!(db.prepare());
        db.get("people").unwrap().insert(&person("An", 30)).unwrap()
    };

    let db = Database::from_schema_file(Some(&db_path), &schema_path).unwrap();
    assert!(db.prepare());
    let record = db.get("people").unwrap().get(id).unwrap();
    assert_eq!(record.get("name"), Some(&Value::Str("An".into())));
}
