//! Backend adapter seams consumed by the hybrid engine.
//!
//! Adapters report failures as `anyhow::Error`; the engine maps them to a
//! per-backend `BackendError` and never lets them reach its own caller.

use async_trait::async_trait;

use crate::types::{GraphQueryResult, MetadataFilter, VectorHealth, VectorHit};

#[async_trait]
pub trait GraphBackend: Send + Sync {
    async fn health_check(&self) -> bool;

    /// Entities matching `query_text` (at most `limit`) plus the relationships
    /// touching them.
    async fn query_knowledge(&self, query_text: &str, limit: usize) -> anyhow::Result<GraphQueryResult>;
}

#[async_trait]
pub trait VectorBackend: Send + Sync {
    async fn health_check(&self) -> VectorHealth;

    async fn similarity_search(
        &self,
        query_text: &str,
        n_results: usize,
        filter: Option<&MetadataFilter>,
    ) -> anyhow::Result<Vec<VectorHit>>;
}
