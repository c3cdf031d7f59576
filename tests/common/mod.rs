//! Scenarios shared by the in-memory and live engine tests.

#![allow(clippy::expect_used, clippy::unwrap_used, dead_code)]

use serde_json::{Value, json};
use vectorgate::models::{DocumentId, IndexSpec, SearchOptions, VectorRecord};
use vectorgate::{Error, FilterSpec, SearchEngine, VectorClient};

/// Dimension used by every scenario.
pub const DIMENSION: usize = 4;

/// Creates `index` with the scenario dimension.
pub fn create_index<E: SearchEngine>(client: &VectorClient<E>, index: &str) {
    client
        .create_index(&IndexSpec::new(index, DIMENSION))
        .expect("create index");
}

/// Upsert, fetch, delete, then fetch again.
pub fn round_trip<E: SearchEngine>(client: &VectorClient<E>, index: &str) {
    create_index(client, index);

    let record = VectorRecord::new("id:1", vec![0.1, 0.2, 0.3, 0.4])
        .with_field("genre", "drama")
        .with_field("year", 1999);
    assert_eq!(client.upsert(index, &[record]).unwrap(), 1);

    let id = DocumentId::new("id:1");
    let document = client.fetch(index, &id).unwrap();
    assert_eq!(document["genre"], json!("drama"));
    assert_eq!(document["year"], json!(1999));
    assert_eq!(document["id"], json!("id:1"));
    let embedding: Vec<f64> = document["embedding"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_f64().unwrap())
        .collect();
    assert_eq!(embedding.len(), DIMENSION);
    assert!((embedding[3] - 0.4).abs() < 1e-6);

    client.delete(index, &id).unwrap();
    assert!(matches!(
        client.fetch(index, &id).unwrap_err(),
        Error::NotFound { .. }
    ));
}

/// Records tagged `[p1]`, `[p2]` and `[p1, p2]`.
pub fn tagged_records() -> Vec<VectorRecord> {
    vec![
        VectorRecord::new("id:1", vec![1.0, 0.0, 0.0, 0.0]).with_field("tags", json!(["p1"])),
        VectorRecord::new("id:2", vec![0.9, 0.1, 0.0, 0.0]).with_field("tags", json!(["p2"])),
        VectorRecord::new("id:3", vec![0.8, 0.2, 0.0, 0.0])
            .with_field("tags", json!(["p1", "p2"])),
    ]
}

/// Runs a search and returns the hit ids, best first.
pub fn search_ids<E: SearchEngine>(
    client: &VectorClient<E>,
    index: &str,
    filter: &Value,
) -> Vec<String> {
    let filter = FilterSpec::from_json(filter).unwrap();
    client
        .search(index, &[1.0, 0.0, 0.0, 0.0], &filter, SearchOptions::new(10))
        .unwrap()
        .into_iter()
        .map(|hit| hit.id.as_str().to_string())
        .collect()
}

/// Tag filters over multi-valued fields.
pub fn tag_search<E: SearchEngine>(client: &VectorClient<E>, index: &str) {
    create_index(client, index);
    assert_eq!(client.upsert(index, &tagged_records()).unwrap(), 3);

    let mut ids = search_ids(client, index, &json!({"tags": {"$in": ["p1"]}}));
    ids.sort();
    assert_eq!(ids, ["id:1", "id:3"]);

    let ids = search_ids(
        client,
        index,
        &json!({"$and": [{"tags": "p1"}, {"tags": "p2"}]}),
    );
    assert_eq!(ids, ["id:3"]);

    let ids = search_ids(client, index, &json!({"tags": {"$nin": ["p1"]}}));
    assert_eq!(ids, ["id:2"]);

    let mut ids = search_ids(client, index, &json!({}));
    ids.sort();
    assert_eq!(ids, ["id:1", "id:2", "id:3"]);
}
