//! Index lifecycle commands.

use crate::models::IndexSpec;
use crate::{Error, Result, SearchEngine, VectorClient};
use serde_json::{Value, json};

/// Arguments of `create-index`.
#[derive(Debug, Clone)]
pub struct CreateIndexArgs {
    /// Index definition.
    pub spec: IndexSpec,
    /// Delete an existing index of the same name first.
    pub recreate: bool,
}

/// Creates an index.
///
/// With `recreate`, an existing index is deleted and created again.
///
/// # Errors
///
/// Returns [`Error::ResourceAlreadyExists`] if the index exists and
/// `recreate` is not set, or any engine error.
pub fn create_index<E: SearchEngine>(
    client: &VectorClient<E>,
    args: &CreateIndexArgs,
) -> Result<Value> {
    let mut recreated = false;
    match client.create_index(&args.spec) {
        Ok(()) => {},
        Err(Error::ResourceAlreadyExists { index }) if args.recreate => {
            tracing::info!(index = %index, "Index exists, recreating");
            client.delete_index(&index)?;
            client.create_index(&args.spec)?;
            recreated = true;
        },
        Err(e) => return Err(e),
    }

    Ok(json!({
        "index": args.spec.name,
        "dimension": args.spec.dimension,
        "engine": args.spec.engine,
        "method": args.spec.method,
        "space_type": args.spec.space_type,
        "recreated": recreated,
    }))
}

/// Deletes an index.
///
/// # Errors
///
/// Returns [`Error::NotFound`] if the index does not exist.
pub fn delete_index<E: SearchEngine>(client: &VectorClient<E>, index: &str) -> Result<Value> {
    client.delete_index(index)?;
    Ok(json!({ "index": index, "deleted": true }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryEngine;

    fn args(recreate: bool) -> CreateIndexArgs {
        CreateIndexArgs {
            spec: IndexSpec::new("test", 4),
            recreate,
        }
    }

    #[test]
    fn test_create_twice_fails_without_recreate() {
        let client = VectorClient::new(InMemoryEngine::new());
        create_index(&client, &args(false)).unwrap();
        let err = create_index(&client, &args(false)).unwrap_err();
        assert!(matches!(err, Error::ResourceAlreadyExists { .. }));
    }

    #[test]
    fn test_recreate_replaces_index() {
        let client = VectorClient::new(InMemoryEngine::new());
        let first = create_index(&client, &args(true)).unwrap();
        assert_eq!(first["recreated"], json!(false));

        let second = create_index(&client, &args(true)).unwrap();
        assert_eq!(second["recreated"], json!(true));
        assert_eq!(second["space_type"], json!("innerproduct"));
    }

    #[test]
    fn test_delete_missing_index() {
        let client = VectorClient::new(InMemoryEngine::new());
        assert!(matches!(
            delete_index(&client, "nope").unwrap_err(),
            Error::NotFound { .. }
        ));
    }
}
