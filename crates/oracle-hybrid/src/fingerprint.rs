//! Request options and the cache key derived from them.

use serde::Serialize;
use std::fmt;

use oracle_core::error::{Error, Result};
use oracle_core::text::normalize;
use oracle_core::types::MetadataFilter;

/// Per-request knobs of `HybridRetrieval::retrieve_knowledge`.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalOptions {
    pub max_sources: usize,
    pub include_graph: bool,
    pub include_vector: bool,
    /// Overrides the configured vector similarity threshold.
    pub similarity_threshold: Option<f32>,
    /// Metadata equality filter forwarded to the vector backend.
    pub filter: Option<MetadataFilter>,
}

impl Default for RetrievalOptions {
    fn default() -> Self {
        Self { max_sources: 5, include_graph: true, include_vector: true, similarity_threshold: None, filter: None }
    }
}

impl RetrievalOptions {
    pub fn with_max_sources(mut self, max_sources: usize) -> Self { self.max_sources = max_sources; self }
    pub fn with_graph(mut self, include: bool) -> Self { self.include_graph = include; self }
    pub fn with_vector(mut self, include: bool) -> Self { self.include_vector = include; self }
    pub fn with_similarity_threshold(mut self, threshold: f32) -> Self { self.similarity_threshold = Some(threshold); self }
    pub fn with_filter(mut self, filter: MetadataFilter) -> Self { self.filter = Some(filter); self }

    /// The filter, unless absent or empty.
    pub fn active_filter(&self) -> Option<&MetadataFilter> { self.filter.as_ref().filter(|f| !f.is_empty()) }
}

/// Hex-encoded blake3 digest identifying one logical request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

// Field order is the canonical key order; the filter is a BTreeMap.
#[derive(Serialize)]
struct CanonicalRequest<'a> {
    query: String,
    max_sources: usize,
    include_graph: bool,
    include_vector: bool,
    similarity_threshold: f32,
    filter: Option<&'a MetadataFilter>,
}

/// Derive the cache key for `query` under `options`, with `threshold` being the
/// effective similarity threshold (request override or configured default).
pub fn fingerprint(query: &str, options: &RetrievalOptions, threshold: f32) -> Result<Fingerprint> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(Error::InvalidOptions(format!("similarity_threshold must be within [0, 1], got {}", threshold)));
    }
    let canonical = CanonicalRequest {
        query: normalize(query),
        max_sources: options.max_sources,
        include_graph: options.include_graph,
        include_vector: options.include_vector,
        similarity_threshold: threshold,
        filter: options.active_filter(),
    };
    let bytes = serde_json::to_vec(&canonical).map_err(|e| Error::InvalidOptions(format!("unserializable options: {}", e)))?;
    Ok(Fingerprint(blake3::hash(&bytes).to_hex().to_string()))
}
