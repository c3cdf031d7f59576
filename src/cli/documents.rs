//! Document commands.

use crate::models::{DocumentId, VectorRecord};
use crate::{Error, Result, SearchEngine, VectorClient};
use serde_json::{Value, json};
use std::path::Path;

/// Reads records from a JSON file holding
/// `[{"id": .., "embedding": [..], "metadata": {..}}, ..]`.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] if the file cannot be read or parsed.
pub fn read_records(path: &Path) -> Result<Vec<VectorRecord>> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| Error::InvalidInput(format!("cannot read {}: {e}", path.display())))?;
    serde_json::from_str(&contents)
        .map_err(|e| Error::InvalidInput(format!("invalid records in {}: {e}", path.display())))
}

/// Upserts the records in `path`.
///
/// # Errors
///
/// Returns an error if the file is invalid or the upsert fails.
pub fn upsert_file<E: SearchEngine>(
    client: &VectorClient<E>,
    index: &str,
    path: &Path,
) -> Result<Value> {
    let records = read_records(path)?;
    let written = client.upsert(index, &records)?;
    Ok(json!({ "index": index, "written": written }))
}

/// Fetches a stored document.
///
/// # Errors
///
/// Returns [`Error::NotFound`] if the document does not exist.
pub fn fetch_document<E: SearchEngine>(
    client: &VectorClient<E>,
    index: &str,
    id: &str,
) -> Result<Value> {
    client
        .fetch(index, &DocumentId::new(id))
        .map(Value::Object)
}

/// Deletes a document.
///
/// # Errors
///
/// Returns [`Error::NotFound`] if the document does not exist.
pub fn delete_document<E: SearchEngine>(
    client: &VectorClient<E>,
    index: &str,
    id: &str,
) -> Result<Value> {
    client.delete(index, &DocumentId::new(id))?;
    Ok(json!({ "index": index, "id": id, "deleted": true }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryEngine;
    use crate::models::IndexSpec;
    use std::io::Write;

    #[test]
    fn test_upsert_file_then_fetch() {
        let client = VectorClient::new(InMemoryEngine::new());
        client.create_index(&IndexSpec::new("test", 2)).unwrap();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{"id": "a", "embedding": [1.0, 0.0], "metadata": {{"genre": "drama"}}}},
                {{"id": "b", "embedding": [0.0, 1.0]}}
            ]"#
        )
        .unwrap();

        let summary = upsert_file(&client, "test", file.path()).unwrap();
        assert_eq!(summary, json!({"index": "test", "written": 2}));

        let doc = fetch_document(&client, "test", "a").unwrap();
        assert_eq!(doc["genre"], json!("drama"));
        assert_eq!(doc["id"], json!("a"));

        delete_document(&client, "test", "b").unwrap();
        assert!(matches!(
            fetch_document(&client, "test", "b").unwrap_err(),
            Error::NotFound { .. }
        ));
    }

    #[test]
    fn test_read_records_rejects_bad_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"id": "a"}}]"#).unwrap();
        assert!(matches!(
            read_records(file.path()).unwrap_err(),
            Error::InvalidInput(_)
        ));
    }
}
