//! Index and document gateway.
//!
//! [`VectorClient`] is the entry point: it validates arguments, compiles
//! filters, assembles requests and hands them to a [`SearchEngine`].
//! Engine errors propagate unchanged; nothing is retried.

use crate::config::VectorGateConfig;
use crate::engine::{IndexOp, OpenSearchEngine, SearchEngine};
use crate::filter::{FilterCompiler, FilterSpec, PredicateTree};
use crate::models::{DocumentId, IndexSpec, SearchHit, SearchOptions, VectorRecord};
use crate::observability::metrics::{DOCUMENTS_UPSERTED_TOTAL, record_request};
use crate::query::SearchRequest;
use crate::{Error, Result};
use serde_json::{Map, Value};
use std::time::Instant;
use tracing::instrument;

/// Client for k-NN vector indexes.
pub struct VectorClient<E: SearchEngine> {
    engine: E,
    compiler: FilterCompiler,
    batch_size: usize,
}

impl<E: SearchEngine> VectorClient<E> {
    /// Default number of documents per bulk request.
    pub const DEFAULT_BATCH_SIZE: usize = 100;

    /// Creates a client with the default compiler and batch size.
    #[must_use]
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            compiler: FilterCompiler::new(),
            batch_size: Self::DEFAULT_BATCH_SIZE,
        }
    }

    /// Sets the filter compiler.
    #[must_use]
    pub fn with_compiler(mut self, compiler: FilterCompiler) -> Self {
        self.compiler = compiler;
        self
    }

    /// Sets the number of documents per bulk request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `batch_size` is zero.
    pub fn with_batch_size(mut self, batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(Error::InvalidInput(
                "batch size must be at least 1".to_string(),
            ));
        }
        self.batch_size = batch_size;
        Ok(self)
    }

    /// Returns the engine.
    #[must_use]
    pub const fn engine(&self) -> &E {
        &self.engine
    }

    /// Returns the bulk batch size.
    #[must_use]
    pub const fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Creates a k-NN index.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for an invalid spec, or
    /// [`Error::ResourceAlreadyExists`] if the index exists.
    #[instrument(skip(self, spec), fields(index = %spec.name, dimension = spec.dimension))]
    pub fn create_index(&self, spec: &IndexSpec) -> Result<()> {
        let start = Instant::now();
        let result = spec
            .validate()
            .and_then(|()| self.engine.create_index(&spec.name, &spec.to_body()));
        record_request("create_index", start, &result);

        if result.is_ok() {
            tracing::info!(
                engine = self.engine.name(),
                space_type = %spec.space_type,
                "Created index"
            );
        }
        result
    }

    /// Deletes an index.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the index does not exist.
    #[instrument(skip(self))]
    pub fn delete_index(&self, index: &str) -> Result<()> {
        let start = Instant::now();
        let result = self.engine.delete_index(index);
        record_request("delete_index", start, &result);

        if result.is_ok() {
            tracing::info!(engine = self.engine.name(), "Deleted index");
        }
        result
    }

    /// Writes records in batches, then refreshes the index so they are
    /// searchable when this returns.
    ///
    /// Each document holds the record metadata plus `embedding` and `id`.
    /// Returns the number of documents written. An empty slice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if a batch or the refresh fails. Batches
    /// sent before the failure stay written.
    #[instrument(skip(self, records), fields(records = records.len()))]
    pub fn upsert(&self, index: &str, records: &[VectorRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let start = Instant::now();
        let result = (|| -> Result<usize> {
            let mut written = 0;
            for (batch, chunk) in records.chunks(self.batch_size).enumerate() {
                let ops: Vec<IndexOp> = chunk
                    .iter()
                    .map(|record| IndexOp {
                        id: record.id.clone(),
                        document: record.to_document(),
                    })
                    .collect();
                written += self.engine.bulk(index, &ops)?;
                tracing::debug!(batch, documents = ops.len(), "Wrote bulk batch");
            }
            self.engine.refresh(index)?;
            Ok(written)
        })();
        record_request("upsert", start, &result);

        if let Ok(written) = &result {
            metrics::counter!(DOCUMENTS_UPSERTED_TOTAL)
                .increment(u64::try_from(*written).unwrap_or(u64::MAX));
            tracing::info!(
                engine = self.engine.name(),
                written,
                duration_ms = start.elapsed().as_millis(),
                "Upserted documents"
            );
        }
        result
    }

    /// Returns the stored document (metadata, `embedding` and `id`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the document does not exist.
    #[instrument(skip(self, id), fields(id = %id))]
    pub fn fetch(&self, index: &str, id: &DocumentId) -> Result<Map<String, Value>> {
        let start = Instant::now();
        let result = self.engine.get(index, id);
        record_request("fetch", start, &result);
        result
    }

    /// Deletes a document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the document does not exist.
    #[instrument(skip(self, id), fields(id = %id))]
    pub fn delete(&self, index: &str, id: &DocumentId) -> Result<()> {
        let start = Instant::now();
        let result = self.engine.delete(index, id);
        record_request("delete", start, &result);
        result
    }

    /// Compiles a filter with this client's compiler.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedFilter`] on a conjunction policy violation.
    pub fn compile(&self, filter: &FilterSpec) -> Result<PredicateTree> {
        self.compiler.compile(filter)
    }

    /// Runs a filtered nearest-neighbor search and returns the raw hits,
    /// best first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedFilter`] for a rejected filter,
    /// [`Error::InvalidInput`] for a zero limit or empty vector, or the
    /// engine's error.
    #[instrument(skip(self, vector, filter), fields(limit = options.limit))]
    pub fn search(
        &self,
        index: &str,
        vector: &[f32],
        filter: &FilterSpec,
        options: SearchOptions,
    ) -> Result<Vec<SearchHit>> {
        let start = Instant::now();
        let result = self
            .compile(filter)
            .and_then(|tree| SearchRequest::knn(vector, tree, options))
            .and_then(|request| self.engine.search(index, &request));
        record_request("search", start, &result);

        if let Ok(hits) = &result {
            tracing::debug!(
                engine = self.engine.name(),
                hits = hits.len(),
                duration_ms = start.elapsed().as_millis(),
                "Search completed"
            );
        }
        result
    }
}

impl VectorClient<OpenSearchEngine> {
    /// Creates an OpenSearch client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine URL or batch size is invalid.
    pub fn from_config(config: &VectorGateConfig) -> Result<Self> {
        Self::new(OpenSearchEngine::new(&config.engine)?)
            .with_compiler(config.filter.compiler())
            .with_batch_size(config.batch_size)
    }
}
