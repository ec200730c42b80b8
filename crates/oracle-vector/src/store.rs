//! In-memory vector store backed by `HashingEmbedder`.
//!
//! `distance = 1 - cosine` and `similarity_score = 1 - distance`, clamped to
//! `[0, 1]`. Filters are metadata equality on every listed key.
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;
use tracing::debug;

use oracle_core::traits::VectorBackend;
use oracle_core::types::{Metadata, MetadataFilter, VectorHealth, VectorHit};

use crate::embed::{cosine, HashingEmbedder};

#[derive(Debug, Clone)]
struct StoredChunk {
    id: String,
    document: String,
    metadata: Metadata,
    vector: Vec<f32>,
}

pub struct MemoryVectorStore {
    embedder: HashingEmbedder,
    chunks: RwLock<Vec<StoredChunk>>,
    healthy: AtomicBool,
}

impl Default for MemoryVectorStore {
    fn default() -> Self { Self::new(HashingEmbedder::default()) }
}

impl MemoryVectorStore {
    pub fn new(embedder: HashingEmbedder) -> Self {
        Self { embedder, chunks: RwLock::new(Vec::new()), healthy: AtomicBool::new(true) }
    }

    /// Insert or replace the chunk with this `id`.
    pub fn add_document(&self, id: impl Into<String>, document: impl Into<String>, metadata: Metadata) -> Result<()> {
        let (id, document) = (id.into(), document.into());
        let vector = self.embedder.embed(&document);
        let mut chunks = self.chunks.write().map_err(|_| anyhow!("vector store lock poisoned"))?;
        chunks.retain(|c| c.id != id);
        chunks.push(StoredChunk { id, document, metadata, vector });
        Ok(())
    }

    pub fn set_healthy(&self, healthy: bool) { self.healthy.store(healthy, Ordering::SeqCst); }

    pub fn len(&self) -> usize { self.chunks.read().map(|c| c.len()).unwrap_or(0) }

    pub fn is_empty(&self) -> bool { self.len() == 0 }
}

fn matches_filter(metadata: &Metadata, filter: Option<&MetadataFilter>) -> bool {
    filter.map_or(true, |f| f.iter().all(|(k, v)| metadata.get(k) == Some(v)))
}

#[async_trait]
impl VectorBackend for MemoryVectorStore {
    async fn health_check(&self) -> VectorHealth {
        if !self.healthy.load(Ordering::SeqCst) { return VectorHealth::unhealthy("marked unavailable"); }
        if self.chunks.is_poisoned() { return VectorHealth::unhealthy("lock poisoned"); }
        VectorHealth::healthy()
    }

    async fn similarity_search(&self, query_text: &str, n_results: usize, filter: Option<&MetadataFilter>) -> Result<Vec<VectorHit>> {
        let q = self.embedder.embed(query_text);
        let chunks = self.chunks.read().map_err(|_| anyhow!("vector store lock poisoned"))?;
        let mut hits: Vec<VectorHit> = chunks
            .iter()
            .filter(|c| matches_filter(&c.metadata, filter))
            .map(|c| {
                let distance = 1.0 - cosine(&q, &c.vector);
                VectorHit {
                    id: c.id.clone(),
                    document: c.document.clone(),
                    metadata: c.metadata.clone(),
                    distance,
                    similarity_score: (1.0 - distance).clamp(0.0, 1.0),
                }
            })
            .collect();
        hits.sort_by(|a, b| b.similarity_score.total_cmp(&a.similarity_score));
        hits.truncate(n_results);
        debug!(results_count = hits.len(), query_length = query_text.len(), "Vector store search completed");
        Ok(hits)
    }
}
