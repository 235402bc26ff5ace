use bson::{Bson, doc, oid::ObjectId};
use docrepo::{memory::InMemoryStore, prelude::*};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Exam {
    name: String,
    score: Option<i32>,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn exam_schema() -> DocumentSchema {
    DocumentSchema::new(
        "ExamDocument",
        vec![
            FieldDef::required("name", FieldType::String),
            FieldDef::optional("score", FieldType::Int)
                .with_min(0.0)
                .with_max(100.0)
                .with_default(0),
        ],
    )
}

fn store() -> DocumentStore<InMemoryStore> {
    init_tracing();
    DocumentStore::new(InMemoryStore::new())
}

fn scores(records: &[Record]) -> Vec<i32> {
    records
        .iter()
        .map(|record| match record.get("score").as_bson() {
            Some(Bson::Int32(score)) => *score,
            other => panic!("unexpected score {:?}", other),
        })
        .collect()
}

async fn seed(exams: &DocumentRepository<'_, InMemoryStore>) -> Vec<Record> {
    let mut created = Vec::new();

    for (name, score) in [("Midterm", 20), ("Final", 30), ("Pop Quiz", 10)] {
        created.push(exams.create(doc! { "name": name, "score": score }).await.unwrap());
    }

    created
}

#[tokio::test]
async fn test_create_then_get() {
    let store = store();
    let exams = store.repository("Exam", exam_schema(), "exams");

    let created = exams.create(doc! { "name": "Pop Quiz", "score": 99 }).await.unwrap();
    let fetched = exams.get(created.id(), false).await.unwrap();

    assert_eq!(fetched.id(), created.id());
    assert_eq!(fetched.get("name"), FieldValue::Set(&Bson::String("Pop Quiz".into())));
    assert_eq!(fetched.get("score"), FieldValue::Set(&Bson::Int32(99)));
    assert!(!fetched.is_deleted());
}

#[tokio::test]
async fn test_create_fills_defaults() {
    let store = store();
    let exams = store.repository("Exam", exam_schema(), "exams");

    let created = exams.create(doc! { "name": "Ungraded" }).await.unwrap();
    let fetched = exams.get(created.id(), false).await.unwrap();

    assert_eq!(fetched.get("score"), FieldValue::Set(&Bson::Int32(0)));
}

#[tokio::test]
async fn test_get_accepts_hex_identifiers() {
    let store = store();
    let exams = store.repository("Exam", exam_schema(), "exams");

    let created = exams.create(doc! { "name": "Pop Quiz" }).await.unwrap();
    let hex = created.id().to_hex();

    assert_eq!(exams.get(hex.as_str(), false).await.unwrap().id(), created.id());
    assert_eq!(exams.get(&hex, false).await.unwrap().id(), created.id());
}

#[tokio::test]
async fn test_get_rejects_malformed_identifiers() {
    let store = store();
    let exams = store.repository("Exam", exam_schema(), "exams");

    let err = exams.get("not-an-object-id", false).await.unwrap_err();
    assert!(matches!(err, RepositoryError::InvalidIdentifier(_)));
}

#[tokio::test]
async fn test_missing_records_are_not_found() {
    let store = store();
    let exams = store.repository("Exam", exam_schema(), "exams");
    let id = ObjectId::new();

    assert!(exams.get(id, false).await.unwrap_err().is_not_found());
    assert!(exams.get(id, true).await.unwrap_err().is_not_found());
    assert!(exams.update(id, doc! { "score": 1 }, false).await.unwrap_err().is_not_found());
    assert!(exams.delete(id, false).await.unwrap_err().is_not_found());
    assert!(exams.delete(id, true).await.unwrap_err().is_not_found());

    let err = exams.get(id, false).await.unwrap_err();
    assert_eq!(err.to_string(), format!("Exam record {} not found", id));
}

#[tokio::test]
async fn test_soft_delete_hides_record() {
    let store = store();
    let exams = store.repository("Exam", exam_schema(), "exams");
    let created = seed(&exams).await;
    let target = created[0].id();

    assert!(exams.delete(target, false).await.unwrap());

    assert!(exams.get(target, false).await.unwrap_err().is_not_found());

    let hidden = exams.get(target, true).await.unwrap();
    assert!(hidden.is_deleted());
    assert!(matches!(hidden.get("deleted_at"), FieldValue::Set(Bson::DateTime(_))));

    let live = exams.query(&QueryOptions::default(), false).await.unwrap();
    assert_eq!(live.len(), 2);
    assert!(live.iter().all(|record| record.id() != target));

    let all = exams.query(&QueryOptions::default(), true).await.unwrap();
    assert_eq!(all.len(), 3);
}

#[tokio::test]
async fn test_soft_delete_stamps_current_time() {
    let store = store();
    let exams = store.repository("Exam", exam_schema(), "exams");
    let created = exams.create(doc! { "name": "Pop Quiz" }).await.unwrap();

    let before = chrono::Utc::now() - chrono::Duration::seconds(1);
    exams.delete(created.id(), false).await.unwrap();
    let after = chrono::Utc::now() + chrono::Duration::seconds(1);

    let deleted_at = exams
        .get(created.id(), true)
        .await
        .unwrap()
        .deleted_at()
        .unwrap();
    assert!(deleted_at >= before && deleted_at <= after);
}

#[tokio::test]
async fn test_deleting_twice_is_not_found() {
    let store = store();
    let exams = store.repository("Exam", exam_schema(), "exams");
    let created = exams.create(doc! { "name": "Pop Quiz" }).await.unwrap();

    exams.delete(created.id(), false).await.unwrap();

    assert!(exams.delete(created.id(), false).await.unwrap_err().is_not_found());
    assert!(exams.delete(created.id(), true).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_hard_delete_removes_record() {
    let store = store();
    let exams = store.repository("Exam", exam_schema(), "exams");
    let created = exams.create(doc! { "name": "Pop Quiz" }).await.unwrap();

    assert!(exams.delete(created.id(), true).await.unwrap());

    assert!(exams.get(created.id(), true).await.unwrap_err().is_not_found());
    assert_eq!(store.backend().count("exams").await, 0);
}

#[tokio::test]
async fn test_null_deleted_at_is_live() {
    let store = store();
    let exams = store.repository("Exam", exam_schema(), "exams");

    let created = exams
        .create(doc! { "name": "Pop Quiz", "deleted_at": Bson::Null })
        .await
        .unwrap();

    assert!(!exams.get(created.id(), false).await.unwrap().is_deleted());
}

#[tokio::test]
async fn test_restore_brings_record_back() {
    let store = store();
    let exams = store.repository("Exam", exam_schema(), "exams");
    let created = exams.create(doc! { "name": "Pop Quiz", "score": 40 }).await.unwrap();

    assert!(exams.restore(created.id()).await.unwrap_err().is_not_found());

    exams.delete(created.id(), false).await.unwrap();
    let restored = exams.restore(created.id()).await.unwrap();

    assert!(!restored.is_deleted());
    assert_eq!(restored.get("score"), FieldValue::Set(&Bson::Int32(40)));
    assert!(exams.get(created.id(), false).await.is_ok());
}

#[tokio::test]
async fn test_update_changes_only_listed_fields() {
    let store = store();
    let exams = store.repository("Exam", exam_schema(), "exams");
    let created = exams.create(doc! { "name": "Pop Quiz", "score": 99 }).await.unwrap();

    let updated = exams.update(created.id(), doc! { "score": 22 }, false).await.unwrap();
    assert_eq!(updated.get("score"), FieldValue::Set(&Bson::Int32(22)));
    assert_eq!(updated.get("name"), FieldValue::Set(&Bson::String("Pop Quiz".into())));

    let fetched = exams.get(created.id(), false).await.unwrap();
    assert_eq!(fetched, updated);
}

#[tokio::test]
async fn test_update_with_no_fields_returns_record() {
    let store = store();
    let exams = store.repository("Exam", exam_schema(), "exams");
    let created = exams.create(doc! { "name": "Pop Quiz", "score": 99 }).await.unwrap();

    let unchanged = exams.update(created.id(), doc! {}, false).await.unwrap();
    assert_eq!(unchanged.get("score"), FieldValue::Set(&Bson::Int32(99)));
}

#[tokio::test]
async fn test_update_respects_visibility() {
    let store = store();
    let exams = store.repository("Exam", exam_schema(), "exams");
    let created = exams.create(doc! { "name": "Pop Quiz", "score": 99 }).await.unwrap();
    exams.delete(created.id(), false).await.unwrap();

    let err = exams.update(created.id(), doc! { "score": 1 }, false).await.unwrap_err();
    assert!(err.is_not_found());

    let updated = exams.update(created.id(), doc! { "score": 1 }, true).await.unwrap();
    assert_eq!(updated.get("score"), FieldValue::Set(&Bson::Int32(1)));
    assert!(updated.is_deleted());
}

#[tokio::test]
async fn test_validation_errors() {
    let store = store();
    let exams = store.repository("Exam", exam_schema(), "exams");

    assert!(exams.create(doc! { "score": 10 }).await.unwrap_err().is_validation());
    assert!(exams.create(doc! { "name": "Quiz", "score": 101 }).await.unwrap_err().is_validation());
    assert!(exams.create(doc! { "name": "Quiz", "score": "high" }).await.unwrap_err().is_validation());
    assert!(
        exams
            .create(doc! { "_id": ObjectId::new(), "name": "Quiz" })
            .await
            .unwrap_err()
            .is_validation()
    );

    let created = exams.create(doc! { "name": "Quiz", "score": 50 }).await.unwrap();
    assert!(exams.update(created.id(), doc! { "score": -1 }, false).await.unwrap_err().is_validation());
    assert!(
        exams
            .update(created.id(), doc! { "_id": ObjectId::new() }, false)
            .await
            .unwrap_err()
            .is_validation()
    );

    assert_eq!(store.backend().count("exams").await, 1);
}

#[tokio::test]
async fn test_strict_schema_rejects_undeclared_fields() {
    let store = store();
    let exams = store.repository("Exam", exam_schema().strict(true), "exams");

    let err = exams.create(doc! { "name": "Quiz", "grade": "A" }).await.unwrap_err();
    assert!(err.is_validation());

    let created = exams.create(doc! { "name": "Quiz" }).await.unwrap();
    assert!(exams.update(created.id(), doc! { "grade": "A" }, false).await.unwrap_err().is_validation());
    assert!(exams.delete(created.id(), false).await.unwrap());
}

#[tokio::test]
async fn test_query_projection_leaves_other_fields_unset() {
    let store = store();
    let exams = store.repository("Exam", exam_schema(), "exams");
    seed(&exams).await;

    let mut options = QueryOptions::default();
    options.set_projection(None, Some(vec!["score".to_string()]));

    let records = exams.query(&options, false).await.unwrap();
    assert_eq!(records.len(), 3);

    for record in &records {
        assert!(record.get("score").is_set());
        assert!(record.get("name").is_not_set());
    }
}

#[tokio::test]
async fn test_query_sorts_by_score() {
    let store = store();
    let exams = store.repository("Exam", exam_schema(), "exams");
    seed(&exams).await;

    let mut options = QueryOptions::default();
    options.set_sort(Some(vec![Sort::asc("score")]), None);
    assert_eq!(scores(&exams.query(&options, false).await.unwrap()), vec![10, 20, 30]);

    options.set_sort(None, Some(vec![SortDescriptor::new("score", "dsc")]));
    assert_eq!(scores(&exams.query(&options, false).await.unwrap()), vec![30, 20, 10]);
}

#[tokio::test]
async fn test_query_sorts_by_multiple_keys() {
    let store = store();
    let exams = store.repository("Exam", exam_schema(), "exams");

    for (name, score) in [("b", 10), ("a", 20), ("a", 10)] {
        exams.create(doc! { "name": name, "score": score }).await.unwrap();
    }

    let mut options = QueryOptions::default();
    options.set_sort(Some(vec![("name", 1_i32).into(), ("score", -1_i32).into()]), None);

    let records = exams.query(&options, false).await.unwrap();
    let keys = records
        .iter()
        .map(|record| (record.get("name").as_bson().cloned(), scores(std::slice::from_ref(record))[0]))
        .collect::<Vec<_>>();

    assert_eq!(
        keys,
        vec![
            (Some(Bson::String("a".into())), 20),
            (Some(Bson::String("a".into())), 10),
            (Some(Bson::String("b".into())), 10),
        ]
    );
}

#[tokio::test]
async fn test_query_skip_and_limit() {
    let store = store();
    let exams = store.repository("Exam", exam_schema(), "exams");
    seed(&exams).await;

    let mut options = QueryOptions::default();
    options.set_sort(Some(vec![Sort::asc("score")]), None);

    options.limit = 0;
    assert_eq!(exams.query(&options, false).await.unwrap().len(), 3);

    options.limit = 2;
    assert_eq!(scores(&exams.query(&options, false).await.unwrap()), vec![10, 20]);

    options.skip = 2;
    assert_eq!(scores(&exams.query(&options, false).await.unwrap()), vec![30]);

    options.skip = 5;
    assert!(exams.query(&options, false).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_query_with_querystring_filters() {
    let store = store();
    let exams = store.repository("Exam", exam_schema(), "exams");
    seed(&exams).await;

    let mut options = QueryOptions::default();
    options.set_sort(Some(vec![Sort::asc("score")]), None);

    options.set_filters(None, Some(vec![FilterDescriptor::new("score", "ge", 20)]));
    assert_eq!(scores(&exams.query(&options, false).await.unwrap()), vec![20, 30]);

    options.set_filters(
        None,
        Some(vec![FilterDescriptor::new("name", "in_", vec!["Final", "Pop Quiz"])]),
    );
    assert_eq!(scores(&exams.query(&options, false).await.unwrap()), vec![10, 30]);

    options.set_filters(
        None,
        Some(vec![
            FilterDescriptor::new("score", "gt", 10),
            FilterDescriptor::new("name", "ne", "Final"),
        ]),
    );
    assert_eq!(scores(&exams.query(&options, false).await.unwrap()), vec![20]);

    options.set_filters(None, Some(vec![FilterDescriptor::new("score", "lt", 0)]));
    assert!(exams.query(&options, false).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unsupported_operators_fall_back_to_equality() {
    let store = store();
    let exams = store.repository("Exam", exam_schema(), "exams");
    seed(&exams).await;

    let mut options = QueryOptions::default();
    options.set_filters(None, Some(vec![FilterDescriptor::new("name", "like", "Final")]));

    let records = exams.query(&options, false).await.unwrap();
    assert_eq!(scores(&records), vec![30]);

    let err = options
        .try_set_filters(None, Some(vec![FilterDescriptor::new("name", "like", "Fin%")]))
        .unwrap_err();
    assert!(matches!(err, RepositoryError::UnsupportedOperator(_)));
}

#[tokio::test]
async fn test_query_does_not_modify_options() {
    let store = store();
    let exams = store.repository("Exam", exam_schema(), "exams");
    seed(&exams).await;

    let mut options = QueryOptions::default();
    options.set_filters(Some(doc! { "score": { "$gte": 10 } }), None);
    let before = options.clone();

    exams.query(&options, false).await.unwrap();
    exams.query(&options, true).await.unwrap();

    assert_eq!(options, before);
}

#[tokio::test]
async fn test_caller_deleted_at_filter_keeps_visibility() {
    let store = store();
    let exams = store.repository("Exam", exam_schema(), "exams");
    let created = seed(&exams).await;
    exams.delete(created[1].id(), false).await.unwrap();

    let mut options = QueryOptions::default();
    options.set_filters(Some(doc! { "deleted_at": { "$exists": true } }), None);

    assert!(exams.query(&options, false).await.unwrap().is_empty());

    let deleted = exams.query(&options, true).await.unwrap();
    assert_eq!(deleted.len(), 1);
    assert_eq!(deleted[0].id(), created[1].id());
}

#[tokio::test]
async fn test_typed_create_and_decode() {
    let store = store();
    let exams = store.repository("Exam", exam_schema(), "exams");
    let exam = Exam { name: "Pop Quiz".to_string(), score: Some(75) };

    let created = exams.create_from(&exam).await.unwrap();
    let decoded = exams
        .get(created.id(), false)
        .await
        .unwrap()
        .decode::<Exam>()
        .unwrap();

    assert_eq!(decoded, exam);
}

#[tokio::test]
async fn test_normalized_json_exposes_string_identifier() {
    let store = store();
    let exams = store.repository("Exam", exam_schema(), "exams");
    let created = exams.create(doc! { "name": "Pop Quiz", "score": 99 }).await.unwrap();
    exams.delete(created.id(), false).await.unwrap();

    let json = exams.get(created.id(), true).await.unwrap().to_json();

    assert_eq!(json["id"], serde_json::json!(created.id().to_hex()));
    assert_eq!(json["name"], serde_json::json!("Pop Quiz"));
    assert!(json["deleted_at"].as_str().unwrap().ends_with("+00:00"));
    assert!(json.get("_id").is_none());
}

#[tokio::test]
async fn test_repositories_share_a_store() {
    let store = store();
    let exams = store.repository("Exam", exam_schema(), "exams");
    let notes = store.repository("Note", DocumentSchema::permissive("NoteDocument"), "notes");

    exams.create(doc! { "name": "Pop Quiz" }).await.unwrap();
    notes.create(doc! { "body": "bring a pencil" }).await.unwrap();

    assert_eq!(exams.query(&QueryOptions::default(), false).await.unwrap().len(), 1);
    assert_eq!(notes.query(&QueryOptions::default(), false).await.unwrap().len(), 1);

    store.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_connect_through_builder() {
    init_tracing();
    let store = DocumentStore::connect(InMemoryStore::builder()).await.unwrap();
    let exams = store.repository("Exam", exam_schema(), "exams");

    assert!(exams.query(&QueryOptions::default(), false).await.unwrap().is_empty());
}
