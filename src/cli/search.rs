//! Search and filter commands.

use crate::filter::{FilterCompiler, FilterSpec};
use crate::models::SearchOptions;
use crate::{Error, Result, SearchEngine, VectorClient};
use serde_json::{Value, json};

/// Parses a vector given as a JSON array of numbers.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] if the text is not a numeric array.
pub fn parse_vector(text: &str) -> Result<Vec<f32>> {
    serde_json::from_str(text)
        .map_err(|e| Error::InvalidInput(format!("vector must be a JSON array of numbers: {e}")))
}

/// Parses an optional filter; no filter means match everything.
///
/// # Errors
///
/// Returns [`Error::MalformedFilter`] if the filter is invalid.
pub fn parse_filter(text: Option<&str>) -> Result<FilterSpec> {
    text.map_or_else(|| Ok(FilterSpec::new()), str::parse)
}

/// Runs a search and returns the hits as a JSON array.
///
/// # Errors
///
/// Returns an error if the input is invalid or the search fails.
pub fn search<E: SearchEngine>(
    client: &VectorClient<E>,
    index: &str,
    vector: &str,
    filter: Option<&str>,
    options: SearchOptions,
) -> Result<Value> {
    let vector = parse_vector(vector)?;
    let filter = parse_filter(filter)?;
    let hits = client.search(index, &vector, &filter, options)?;
    serde_json::to_value(hits).map_err(|e| Error::transport("search", e))
}

/// Compiles a filter without contacting an engine.
///
/// # Errors
///
/// Returns [`Error::MalformedFilter`] if the filter is invalid.
pub fn compile_filter(compiler: &FilterCompiler, filter: &str) -> Result<Value> {
    let spec: FilterSpec = filter.parse()?;
    let tree = compiler.compile(&spec)?;
    Ok(json!({ "bool": tree }))
}
