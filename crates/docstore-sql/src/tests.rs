use serde_json::json;
use tempfile::TempDir;
use uuid::Uuid;

use crate::{
    Adapter, AdapterConfig, AdapterError, AttributeDef, AttributeType, Authorization, Collection,
    Cursor, Document, FindOptions, IndexDef, IndexType, Operator, OrderType, Query, SqliteConnection,
};

/// The "tasks" collection used by most tests.
fn tasks() -> Collection {
    Collection::new("tasks")
        .with_attribute(AttributeDef::new("title", AttributeType::String, 100))
        .with_attribute(AttributeDef::new("done", AttributeType::Boolean, 0))
        .with_attribute(AttributeDef::new("price", AttributeType::Double, 0))
        .with_attribute(AttributeDef::new("tags", AttributeType::String, 32).array())
        .with_attribute(AttributeDef::new("meta", AttributeType::String, 0).array())
        .with_index(IndexDef::new("by_title", IndexType::Key, ["title"]))
}

fn setup() -> (Adapter<SqliteConnection>, Collection) {
    let mut adapter = Adapter::open_in_memory().unwrap();
    let collection = tasks();
    adapter.create_collection(&collection).unwrap();
    (adapter, collection)
}

fn task(id: &str, title: &str, role: &str) -> Document {
    Document::new(id).with_read([role]).with_attribute("title", title)
}

fn ids(documents: &[Document]) -> Vec<&str> {
    documents.iter().map(|d| d.id.as_str()).collect()
}

fn row_count(adapter: &Adapter<SqliteConnection>, table: &str) -> i64 {
    adapter
        .connection()
        .inner()
        .query_row(&format!("SELECT COUNT(*) FROM `{table}`"), [], |r| r.get(0))
        .unwrap()
}

// -----------------------------------------------------------------------
// 1. test_create_collection_tables_and_indexes
// -----------------------------------------------------------------------
#[test]
fn test_create_collection_tables_and_indexes() {
    let (adapter, _) = setup();
    let conn = adapter.connection().inner();

    let mut stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type = 'index' AND tbl_name = 'tasks' ORDER BY name")
        .unwrap();
    let indexes: Vec<String> = stmt.query_map([], |r| r.get(0)).unwrap().map(|r| r.unwrap()).collect();
    assert_eq!(indexes, vec!["tasks__index1", "tasks__index2", "tasks_by_title"]);

    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info('tasks') ORDER BY cid").unwrap();
    let columns: Vec<String> = stmt.query_map([], |r| r.get(0)).unwrap().map(|r| r.unwrap()).collect();
    assert_eq!(columns, vec!["_id", "_uid", "_read", "_write", "title", "done", "price", "tags", "meta"]);
}

// -----------------------------------------------------------------------
// 2. test_both_creation_paths_are_equivalent
// -----------------------------------------------------------------------
#[test]
fn test_both_creation_paths_are_equivalent() {
    let collection = Collection::new("notes")
        .with_attribute(AttributeDef::new("title", AttributeType::String, 64))
        .with_attribute(AttributeDef::new("views", AttributeType::Integer, 0).unsigned())
        .with_index(IndexDef::new("uniq_title", IndexType::Unique, ["title"]))
        .with_index(
            IndexDef::new("by_views", IndexType::Key, ["views"]).with_orders(vec![Some(OrderType::Desc)]),
        );

    let mut combined = Adapter::open_in_memory().unwrap();
    combined.create_collection(&collection).unwrap();

    let mut stepwise = Adapter::open_in_memory().unwrap();
    stepwise.create_collection(&Collection::new("notes")).unwrap();
    for attribute in &collection.attributes {
        stepwise.create_attribute("notes", attribute).unwrap();
    }
    for index in &collection.indexes {
        stepwise.create_index("notes", index).unwrap();
    }

    let describe = |adapter: &Adapter<SqliteConnection>| {
        let conn = adapter.connection().inner();
        let mut stmt = conn
            .prepare("SELECT name, type, \"notnull\", pk FROM pragma_table_info('notes') ORDER BY cid")
            .unwrap();
        let columns: Vec<(String, String, i64, i64)> = stmt
            .query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)))
            .unwrap()
            .map(|r| r.unwrap())
            .collect();
        let mut stmt = conn
            .prepare("SELECT name, \"unique\" FROM pragma_index_list('notes') ORDER BY name")
            .unwrap();
        let indexes: Vec<(String, i64)> = stmt
            .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))
            .unwrap()
            .map(|r| r.unwrap())
            .collect();
        (columns, indexes)
    };

    let (columns, indexes) = describe(&combined);
    assert_eq!((columns.clone(), indexes.clone()), describe(&stepwise));
    assert!(indexes.contains(&("notes__index1".to_string(), 1)));
    assert!(indexes.contains(&("notes__index2".to_string(), 0)));
    assert!(indexes.contains(&("notes_uniq_title".to_string(), 1)));
    assert_eq!(columns[5], ("views".to_string(), "INT UNSIGNED".to_string(), 0, 0));
}

// -----------------------------------------------------------------------
// 3. test_document_round_trip
// -----------------------------------------------------------------------
#[test]
fn test_document_round_trip() {
    let (mut adapter, collection) = setup();
    let doc = Document::new("d1")
        .with_read(["role:all", "user:7"])
        .with_write(["user:7"])
        .with_attribute("title", "write docs")
        .with_attribute("done", true)
        .with_attribute("price", 9.5)
        .with_attribute("tags", json!(["a", "b"]))
        .with_attribute("meta", json!([{"k": 1}, {"k": [2, 3]}]));

    let created = adapter.create_document(&collection, &doc).unwrap();
    assert_eq!(created.internal_id, Some(1));

    let fetched = adapter.get_document(&collection, "d1").unwrap();
    assert_eq!(fetched.id, "d1");
    assert_eq!(fetched.internal_id, Some(1));
    assert_eq!(fetched.read, doc.read);
    assert_eq!(fetched.write, doc.write);
    assert_eq!(fetched.attributes, doc.attributes);
}

// -----------------------------------------------------------------------
// 4. test_get_missing_returns_empty
// -----------------------------------------------------------------------
#[test]
fn test_get_missing_returns_empty() {
    let (mut adapter, collection) = setup();
    let doc = adapter.get_document(&collection, "nope").unwrap();
    assert!(doc.is_empty());
    assert_eq!(doc, Document::empty());
}

// -----------------------------------------------------------------------
// 5. test_duplicate_id_rejected
// -----------------------------------------------------------------------
#[test]
fn test_duplicate_id_rejected() {
    let (mut adapter, collection) = setup();
    adapter.create_document(&collection, &task("d1", "a", "role:x")).unwrap();

    let err = adapter.create_document(&collection, &task("d1", "b", "role:x")).unwrap_err();
    assert!(matches!(err, AdapterError::Duplicate(_)), "got {err:?}");
    assert_eq!(row_count(&adapter, "tasks"), 1);
    assert_eq!(adapter.get_document(&collection, "d1").unwrap().get("title"), Some(&json!("a")));

    // The failed insert was rolled back, so the connection is usable again.
    assert!(adapter.connection().inner().is_autocommit());
    adapter.create_document(&collection, &task("d2", "b", "role:x")).unwrap();
}

// -----------------------------------------------------------------------
// 6. test_internal_ids_increase_and_are_not_reused
// -----------------------------------------------------------------------
#[test]
fn test_internal_ids_increase_and_are_not_reused() {
    let (mut adapter, collection) = setup();
    let a = adapter.create_document(&collection, &task("a", "a", "r")).unwrap();
    let b = adapter.create_document(&collection, &task("b", "b", "r")).unwrap();
    assert!(b.internal_id > a.internal_id);

    assert!(adapter.delete_document("tasks", "b").unwrap());
    let c = adapter.create_document(&collection, &task("c", "c", "r")).unwrap();
    assert!(c.internal_id > b.internal_id);
}

// -----------------------------------------------------------------------
// 7. test_update_and_delete
// -----------------------------------------------------------------------
#[test]
fn test_update_and_delete() {
    let (mut adapter, collection) = setup();
    let created = adapter.create_document(&collection, &task("d1", "a", "role:x")).unwrap();

    let changed = created.clone().with_read(["role:y"]).with_attribute("title", "z");
    adapter.update_document(&collection, &changed).unwrap();

    let fetched = adapter.get_document(&collection, "d1").unwrap();
    assert_eq!(fetched.get("title"), Some(&json!("z")));
    assert_eq!(fetched.read, vec!["role:y"]);
    assert_eq!(fetched.internal_id, created.internal_id);

    assert!(adapter.delete_document("tasks", "d1").unwrap());
    assert!(!adapter.delete_document("tasks", "d1").unwrap());
    assert!(adapter.get_document(&collection, "d1").unwrap().is_empty());
}

// -----------------------------------------------------------------------
// 8. test_tasks_scenario
// -----------------------------------------------------------------------
#[test]
fn test_tasks_scenario() {
    let mut adapter = Adapter::open_in_memory().unwrap();
    let collection =
        Collection::new("tasks").with_attribute(AttributeDef::new("title", AttributeType::String, 100));
    adapter.create_collection(&collection).unwrap();

    let d1 = adapter.create_document(&collection, &task("d1", "a", "role:x")).unwrap();
    adapter.create_document(&collection, &task("d2", "b", "role:y")).unwrap();

    let as_x = Authorization::roles(["role:x"]);
    let found = adapter.find(&collection, &as_x, &adapter.find_options()).unwrap();
    assert_eq!(ids(&found), vec!["d1"]);

    let first = adapter.find_options().limit(1).order("title", OrderType::Asc);
    let page = adapter.find(&collection, &Authorization::Disabled, &first).unwrap();
    assert_eq!(ids(&page), vec!["d1"]);

    let next = first.after(Cursor::from_document(&d1).unwrap());
    let page = adapter.find(&collection, &Authorization::Disabled, &next).unwrap();
    assert_eq!(ids(&page), vec!["d2"]);
}

// -----------------------------------------------------------------------
// 9. test_permission_filtering
// -----------------------------------------------------------------------
#[test]
fn test_permission_filtering() {
    let (mut adapter, collection) = setup();
    for (id, role, price) in [("d1", "role:x", 1.0), ("d2", "role:y", 2.0), ("d3", "role:x", 4.0)] {
        let doc = task(id, id, role).with_attribute("price", price);
        adapter.create_document(&collection, &doc).unwrap();
    }
    let options = adapter.find_options();

    let none = Authorization::roles(["role:z"]);
    assert!(adapter.find(&collection, &none, &options).unwrap().is_empty());
    assert_eq!(adapter.count("tasks", &none, &[], None).unwrap(), 0);
    assert_eq!(adapter.sum("tasks", "price", &none, &[], None).unwrap(), 0.0);

    let x = Authorization::roles(["role:z", "role:x"]);
    assert_eq!(ids(&adapter.find(&collection, &x, &options).unwrap()), vec!["d1", "d3"]);
    assert_eq!(adapter.count("tasks", &x, &[], None).unwrap(), 2);
    assert_eq!(adapter.sum("tasks", "price", &x, &[], None).unwrap(), 5.0);

    // Exact membership: a role that is a substring of a stored one does not match.
    let partial = Authorization::roles(["role"]);
    assert_eq!(adapter.count("tasks", &partial, &[], None).unwrap(), 0);

    let empty = Authorization::Roles(vec![]);
    assert_eq!(adapter.count("tasks", &empty, &[], None).unwrap(), 0);
    assert_eq!(adapter.count("tasks", &Authorization::Disabled, &[], None).unwrap(), 3);
}

// -----------------------------------------------------------------------
// 10. test_queries_and_aggregate_cap
// -----------------------------------------------------------------------
#[test]
fn test_queries_and_aggregate_cap() {
    let (mut adapter, collection) = setup();
    for i in 0..10 {
        let doc = task(&format!("d{i}"), &format!("t{}", i % 3), "r")
            .with_attribute("price", i as f64)
            .with_attribute("done", i % 2 == 0);
        adapter.create_document(&collection, &doc).unwrap();
    }
    let all = Authorization::Disabled;

    let titled = vec![Query::new("title", Operator::Equal, ["t0", "t1"])];
    assert_eq!(adapter.count("tasks", &all, &titled, None).unwrap(), 7);

    let cheap_and_done = vec![
        Query::new("price", Operator::Lesser, [5]),
        Query::equal("done", true),
    ];
    let options = FindOptions { queries: cheap_and_done, ..adapter.find_options() };
    let found = adapter.find(&collection, &all, &options).unwrap();
    assert_eq!(ids(&found), vec!["d0", "d2", "d4"]);
    assert!(found.iter().all(|d| d.get("done") == Some(&json!(true))));

    assert_eq!(adapter.count("tasks", &all, &[], Some(4)).unwrap(), 4);
    assert_eq!(adapter.count("tasks", &all, &[], Some(40)).unwrap(), 10);
    assert_eq!(adapter.sum("tasks", "price", &all, &[], Some(3)).unwrap(), 3.0);
    assert_eq!(adapter.sum("tasks", "price", &all, &[], None).unwrap(), 45.0);
}

// -----------------------------------------------------------------------
// 11. test_search_unsupported_on_sqlite
// -----------------------------------------------------------------------
#[test]
fn test_search_unsupported_on_sqlite() {
    let (mut adapter, collection) = setup();
    let options = adapter.find_options().query(Query::search("title", "docs"));
    let err = adapter.find(&collection, &Authorization::Disabled, &options).unwrap_err();
    assert!(matches!(err, AdapterError::Validation(_)));

    let fulltext = IndexDef::new("ft", IndexType::Fulltext, ["title"]);
    assert!(matches!(adapter.create_index("tasks", &fulltext), Err(AdapterError::Validation(_))));
}

// -----------------------------------------------------------------------
// 12. test_attribute_and_index_lifecycle
// -----------------------------------------------------------------------
#[test]
fn test_attribute_and_index_lifecycle() {
    let (mut adapter, collection) = setup();
    adapter
        .create_attribute("tasks", &AttributeDef::new("score", AttributeType::Integer, 0))
        .unwrap();
    let collection = collection.with_attribute(AttributeDef::new("score", AttributeType::Integer, 0));

    let doc = task("d1", "a", "r").with_attribute("score", 12);
    adapter.create_document(&collection, &doc).unwrap();
    assert_eq!(adapter.get_document(&collection, "d1").unwrap().get("score"), Some(&json!(12)));

    adapter.delete_index("tasks", "by_title").unwrap();
    adapter.delete_attribute("tasks", "score").unwrap();
    let fetched = adapter.get_document(&collection, "d1").unwrap();
    assert!(fetched.get("score").is_none());

    adapter.delete_collection("tasks").unwrap();
    let err = adapter.get_document(&collection, "d1").unwrap_err();
    assert!(err.is_retryable(), "missing table is an execution error: {err:?}");
}

// -----------------------------------------------------------------------
// 13. test_attached_namespace
// -----------------------------------------------------------------------
#[test]
fn test_attached_namespace() {
    let mut adapter = Adapter::open_in_memory().unwrap();
    let namespace = format!("ns_{}", Uuid::new_v4().simple());
    adapter.set_namespace(&namespace).unwrap();

    assert!(!adapter.namespace_exists().unwrap());
    adapter.create_namespace().unwrap();
    assert!(adapter.namespace_exists().unwrap());

    let collection = tasks();
    adapter.create_collection(&collection).unwrap();
    adapter.create_document(&collection, &task("d1", "a", "r")).unwrap();
    assert_eq!(adapter.count("tasks", &Authorization::Disabled, &[], None).unwrap(), 1);

    // The main namespace has no such table.
    adapter.set_namespace("main").unwrap();
    assert!(adapter.count("tasks", &Authorization::Disabled, &[], None).is_err());

    adapter.set_namespace(&namespace).unwrap();
    adapter.delete_namespace().unwrap();
    assert!(!adapter.namespace_exists().unwrap());
}

// -----------------------------------------------------------------------
// 14. test_open_from_file_config
// -----------------------------------------------------------------------
#[test]
fn test_open_from_file_config() {
    let dir = TempDir::new().unwrap();
    let config = AdapterConfig {
        db_path: dir.path().join("store.db").display().to_string(),
        namespace: "tenant".to_string(),
        attach_dir: Some(dir.path().to_path_buf()),
        ..AdapterConfig::default()
    };

    {
        let mut adapter = Adapter::open(&config).unwrap();
        adapter.create_namespace().unwrap();
        adapter.create_collection(&tasks()).unwrap();
        adapter.create_document(&tasks(), &task("d1", "a", "r")).unwrap();
    }
    assert!(dir.path().join("tenant.db").exists());

    // A new adapter re-attaches the same file and sees the document.
    let mut adapter = Adapter::open(&config).unwrap();
    adapter.create_namespace().unwrap();
    let fetched = adapter.get_document(&tasks(), "d1").unwrap();
    assert_eq!(fetched.get("title"), Some(&json!("a")));
}
