//! OpenSearch engine over HTTP.
//!
//! Talks to the REST API with a blocking `reqwest` client:
//!
//! | Operation | Request |
//! |-----------|---------|
//! | create index | `PUT /{index}` |
//! | delete index | `DELETE /{index}` |
//! | refresh | `POST /{index}/_refresh` |
//! | bulk | `POST /{index}/_bulk` (NDJSON) |
//! | get | `GET /{index}/_doc/{id}` |
//! | delete | `DELETE /{index}/_doc/{id}` |
//! | search | `POST /{index}/_search` |

use super::{IndexOp, SearchEngine};
use crate::config::EngineConfig;
use crate::models::{DocumentId, SearchHit};
use crate::query::SearchRequest;
use crate::{Error, Result};
use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::CONTENT_TYPE;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::time::Duration;

/// Error type the engine reports when creating an index that exists.
const ALREADY_EXISTS_ERROR: &str = "resource_already_exists_exception";

/// OpenSearch engine client.
pub struct OpenSearchEngine {
    /// Base URL of the cluster.
    base_url: reqwest::Url,
    /// Basic auth username.
    username: Option<String>,
    /// Basic auth password.
    password: Option<SecretString>,
    /// HTTP client.
    client: Client,
}

impl OpenSearchEngine {
    /// Creates a client for the configured cluster.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the URL is invalid, or
    /// [`Error::Transport`] if the HTTP client cannot be built.
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let base_url = reqwest::Url::parse(&config.url)
            .map_err(|e| Error::InvalidInput(format!("invalid engine url '{}': {e}", config.url)))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::InvalidInput(format!(
                "invalid engine url '{}': not a base url",
                config.url
            )));
        }

        Ok(Self {
            base_url,
            username: config.username.clone(),
            password: config.password.clone(),
            client: build_http_client(config)?,
        })
    }

    /// Returns the cluster URL.
    #[must_use]
    pub const fn base_url(&self) -> &reqwest::Url {
        &self.base_url
    }

    /// Builds `{base}/{segments...}`, percent-encoding each segment.
    fn url(&self, segments: &[&str]) -> reqwest::Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Attaches credentials when configured.
    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.username {
            Some(username) => request.basic_auth(
                username,
                self.password.as_ref().map(|p| p.expose_secret().to_string()),
            ),
            None => request,
        }
    }

    /// Sends a request and maps the response status.
    fn send(&self, operation: &str, resource: &str, request: RequestBuilder) -> Result<Response> {
        let response = self.authorize(request).send().map_err(|e| {
            tracing::error!(
                engine = "opensearch",
                operation = operation,
                resource = resource,
                error = %e,
                is_timeout = e.is_timeout(),
                is_connect = e.is_connect(),
                "engine request failed"
            );
            Error::transport(operation, format!("request failed: {e}"))
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().unwrap_or_default();
        tracing::debug!(
            engine = "opensearch",
            operation = operation,
            resource = resource,
            status = status.as_u16(),
            "engine returned error status"
        );
        Err(status_error(operation, resource, status, &body))
    }

    fn send_json<T: for<'de> Deserialize<'de>>(
        &self,
        operation: &str,
        resource: &str,
        request: RequestBuilder,
    ) -> Result<T> {
        self.send(operation, resource, request)?
            .json()
            .map_err(|e| Error::transport(operation, format!("invalid response: {e}")))
    }
}

impl SearchEngine for OpenSearchEngine {
    fn name(&self) -> &'static str {
        "opensearch"
    }

    fn create_index(&self, index: &str, body: &Value) -> Result<()> {
        let request = self.client.put(self.url(&[index])).json(body);
        self.send("create_index", index, request).map(drop)
    }

    fn delete_index(&self, index: &str) -> Result<()> {
        let request = self.client.delete(self.url(&[index]));
        self.send("delete_index", index, request).map(drop)
    }

    fn refresh(&self, index: &str) -> Result<()> {
        let request = self.client.post(self.url(&[index, "_refresh"]));
        self.send("refresh", index, request).map(drop)
    }

    fn bulk(&self, index: &str, ops: &[IndexOp]) -> Result<usize> {
        if ops.is_empty() {
            return Ok(0);
        }

        let body = bulk_body(ops)?;
        let request = self
            .client
            .post(self.url(&[index, "_bulk"]))
            .header(CONTENT_TYPE, "application/x-ndjson")
            .body(body);
        let response: BulkResponse = self.send_json("bulk", index, request)?;
        response.check(ops.len())
    }

    fn get(&self, index: &str, id: &DocumentId) -> Result<Map<String, Value>> {
        let resource = format!("{index}/{id}");
        let request = self.client.get(self.url(&[index, "_doc", id.as_str()]));
        let response: GetResponse = self.send_json("get", &resource, request)?;
        match response.source {
            Some(source) if response.found => Ok(source),
            _ => Err(Error::NotFound { resource }),
        }
    }

    fn delete(&self, index: &str, id: &DocumentId) -> Result<()> {
        let resource = format!("{index}/{id}");
        let request = self.client.delete(self.url(&[index, "_doc", id.as_str()]));
        self.send("delete", &resource, request).map(drop)
    }

    fn search(&self, index: &str, request: &SearchRequest) -> Result<Vec<SearchHit>> {
        let http = self
            .client
            .post(self.url(&[index, "_search"]))
            .json(request);
        let response: SearchResponse = self.send_json("search", index, http)?;
        Ok(response.hits.hits)
    }
}

/// Builds the HTTP client with the configured timeouts.
fn build_http_client(config: &EngineConfig) -> Result<Client> {
    let mut builder = Client::builder().danger_accept_invalid_certs(config.accept_invalid_certs);
    if config.timeout_ms > 0 {
        builder = builder.timeout(Duration::from_millis(config.timeout_ms));
    }
    if config.connect_timeout_ms > 0 {
        builder = builder.connect_timeout(Duration::from_millis(config.connect_timeout_ms));
    }
    if config.accept_invalid_certs {
        tracing::warn!(url = %config.url, "TLS certificate verification is disabled");
    }

    builder
        .build()
        .map_err(|e| Error::transport("build_http_client", e))
}

/// Maps a non-success status to an error.
fn status_error(operation: &str, resource: &str, status: StatusCode, body: &str) -> Error {
    match status {
        StatusCode::NOT_FOUND => Error::NotFound {
            resource: resource.to_string(),
        },
        StatusCode::BAD_REQUEST if body.contains(ALREADY_EXISTS_ERROR) => {
            Error::ResourceAlreadyExists {
                index: resource.to_string(),
            }
        },
        _ => Error::transport(operation, format!("HTTP {status}: {body}")),
    }
}

/// Encodes bulk `index` actions as NDJSON.
fn bulk_body(ops: &[IndexOp]) -> Result<String> {
    let mut body = String::new();
    for op in ops {
        let action = json!({ "index": { "_id": op.id } });
        for line in [action, Value::Object(op.document.clone())] {
            let encoded = serde_json::to_string(&line)
                .map_err(|e| Error::transport("bulk", format!("cannot encode document: {e}")))?;
            body.push_str(&encoded);
            body.push('\n');
        }
    }
    Ok(body)
}

#[derive(Debug, Deserialize)]
struct BulkResponse {
    #[serde(default)]
    errors: bool,
    #[serde(default)]
    items: Vec<Map<String, Value>>,
}

impl BulkResponse {
    /// Returns the number of items written, or the first item failure.
    fn check(&self, expected: usize) -> Result<usize> {
        if !self.errors {
            return Ok(expected);
        }

        let failures: Vec<String> = self
            .items
            .iter()
            .filter_map(|item| item.values().next())
            .filter_map(|result| {
                let error = result.get("error")?;
                let id = result.get("_id").and_then(Value::as_str).unwrap_or("?");
                let reason = error
                    .get("reason")
                    .and_then(Value::as_str)
                    .map_or_else(|| error.to_string(), str::to_string);
                Some(format!("{id}: {reason}"))
            })
            .collect();

        tracing::error!(
            engine = "opensearch",
            failed = failures.len(),
            total = expected,
            "bulk request had item failures"
        );
        Err(Error::transport(
            "bulk",
            format!(
                "{} of {expected} items failed: {}",
                failures.len(),
                failures.join("; ")
            ),
        ))
    }
}

#[derive(Debug, Deserialize)]
struct GetResponse {
    #[serde(default)]
    found: bool,
    #[serde(rename = "_source")]
    source: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: SearchHits,
}

#[derive(Debug, Deserialize)]
struct SearchHits {
    #[serde(default)]
    hits: Vec<SearchHit>,
}
