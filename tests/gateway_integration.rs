//! Gateway tests against the in-memory engine.
//!
//! The same scenarios run against a live cluster in
//! `opensearch_integration.rs`.

// Integration tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used)]

mod common;

use serde_json::json;
use std::sync::Arc;
use std::thread;
use vectorgate::filter::{ConjunctionPolicy, FilterCompiler};
use vectorgate::models::{IndexSpec, SearchOptions, VectorRecord};
use vectorgate::{Error, FilterSpec, InMemoryEngine, SearchEngine, VectorClient};

fn client() -> VectorClient<InMemoryEngine> {
    VectorClient::new(InMemoryEngine::new())
}

// ============================================================================
// Index Lifecycle
// ============================================================================

#[test]
fn test_create_existing_index() {
    let client = client();
    common::create_index(&client, "test");
    let err = client
        .create_index(&IndexSpec::new("test", common::DIMENSION))
        .unwrap_err();
    assert!(matches!(err, Error::ResourceAlreadyExists { index } if index == "test"));
}

#[test]
fn test_delete_then_recreate_index() {
    let client = client();
    common::create_index(&client, "test");
    client
        .upsert("test", &[VectorRecord::new("a", vec![0.0; common::DIMENSION])])
        .unwrap();
    client.delete_index("test").unwrap();
    common::create_index(&client, "test");

    let hits = client
        .search(
            "test",
            &[0.0; common::DIMENSION],
            &FilterSpec::new(),
            SearchOptions::default(),
        )
        .unwrap();
    assert!(hits.is_empty());
}

// ============================================================================
// Documents
// ============================================================================

#[test]
fn test_round_trip() {
    common::round_trip(&client(), "test");
}

#[test]
fn test_upsert_replaces_document() {
    let client = client();
    common::create_index(&client, "test");
    let first = VectorRecord::new("a", vec![0.0; 4]).with_field("v", 1);
    let second = VectorRecord::new("a", vec![1.0; 4]).with_field("v", 2);
    client.upsert("test", &[first]).unwrap();
    client.upsert("test", &[second]).unwrap();

    let document = client.fetch("test", &"a".into()).unwrap();
    assert_eq!(document["v"], json!(2));
}

#[test]
fn test_upsert_is_searchable_on_return() {
    let engine = Arc::new(InMemoryEngine::new());
    let client = VectorClient::new(Arc::clone(&engine))
        .with_batch_size(2)
        .unwrap();
    common::create_index(&client, "test");

    let records: Vec<VectorRecord> = (0..7)
        .map(|i| VectorRecord::new(format!("id:{i}"), vec![0.5; 4]))
        .collect();
    assert_eq!(client.upsert("test", &records).unwrap(), 7);
    assert_eq!(engine.searchable_count("test").unwrap(), 7);
}

#[test]
fn test_upsert_into_missing_index() {
    let err = client()
        .upsert("nope", &[VectorRecord::new("a", vec![0.0; 4])])
        .unwrap_err();
    assert!(matches!(err, Error::NotFound { .. }));
}

// ============================================================================
// Search
// ============================================================================

#[test]
fn test_tag_search() {
    common::tag_search(&client(), "test");
}

#[test]
fn test_in_filter_returns_first_and_third_in_score_order() {
    let client = client();
    common::create_index(&client, "test");
    client.upsert("test", &common::tagged_records()).unwrap();

    let ids = common::search_ids(&client, "test", &json!({"tags": {"$in": ["p1"]}}));
    assert_eq!(ids, ["id:1", "id:3"]);
}

#[test]
fn test_strict_conjunction_policy() {
    let policy = ConjunctionPolicy::MultiValuedOnly(["tags".to_string()].into());
    let client = client().with_compiler(FilterCompiler::new().with_policy(policy));
    common::create_index(&client, "test");
    client.upsert("test", &common::tagged_records()).unwrap();

    let ids = common::search_ids(
        &client,
        "test",
        &json!({"$and": [{"tags": "p1"}, {"tags": "p2"}]}),
    );
    assert_eq!(ids, ["id:3"]);

    let filter: FilterSpec = r#"{"$and": [{"genre": "a"}, {"genre": "b"}]}"#.parse().unwrap();
    let err = client
        .search("test", &[1.0, 0.0, 0.0, 0.0], &filter, SearchOptions::default())
        .unwrap_err();
    assert!(matches!(err, Error::MalformedFilter(_)));
}

#[test]
fn test_metadata_is_opt_in() {
    let client = client();
    common::create_index(&client, "test");
    client.upsert("test", &common::tagged_records()).unwrap();

    let query = [1.0, 0.0, 0.0, 0.0];
    let bare = client
        .search("test", &query, &FilterSpec::new(), SearchOptions::new(1))
        .unwrap();
    assert_eq!(bare.len(), 1);
    assert!(bare[0].source.is_none());
    assert!(bare[0].score.is_some());

    let full = client
        .search(
            "test",
            &query,
            &FilterSpec::new(),
            SearchOptions::new(1).with_metadata(true),
        )
        .unwrap();
    assert_eq!(full[0].source.as_ref().unwrap()["tags"], json!(["p1"]));
}

#[test]
fn test_shared_client_across_threads() {
    let engine: Arc<dyn SearchEngine> = Arc::new(InMemoryEngine::new());
    let client = Arc::new(VectorClient::new(engine));
    common::create_index(&*client, "test");

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let client = Arc::clone(&client);
            thread::spawn(move || {
                let records: Vec<VectorRecord> = (0..5)
                    .map(|i| VectorRecord::new(format!("t{t}-{i}"), vec![0.25; 4]))
                    .collect();
                client.upsert("test", &records).unwrap()
            })
        })
        .collect();
    let written: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(written, 20);

    let hits = client
        .search("test", &[0.25; 4], &FilterSpec::new(), SearchOptions::new(50))
        .unwrap();
    assert_eq!(hits.len(), 20);
}
