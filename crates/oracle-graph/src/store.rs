//! In-memory graph store.
//!
//! Matches entities whose name or description contains any query keyword,
//! ordered by name, then attaches every relationship touching a match and the
//! entities on the far side of those relationships.
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;
use tracing::debug;

use oracle_core::traits::GraphBackend;
use oracle_core::types::{GraphEntity, GraphQueryResult, GraphRelationship};

pub struct MemoryGraphStore {
    data: RwLock<GraphQueryResult>,
    healthy: AtomicBool,
}

impl Default for MemoryGraphStore {
    fn default() -> Self { Self::with_data(Vec::new(), Vec::new()) }
}

impl MemoryGraphStore {
    pub fn new() -> Self { Self::default() }

    pub fn with_data(entities: Vec<GraphEntity>, relationships: Vec<GraphRelationship>) -> Self {
        Self { data: RwLock::new(GraphQueryResult { entities, relationships }), healthy: AtomicBool::new(true) }
    }

    pub fn add_entity(&self, entity: GraphEntity) -> Result<()> {
        let mut data = self.data.write().map_err(|_| anyhow!("graph store lock poisoned"))?;
        data.entities.retain(|e| e.id != entity.id);
        data.entities.push(entity);
        Ok(())
    }

    pub fn add_relationship(&self, relationship: GraphRelationship) -> Result<()> {
        let mut data = self.data.write().map_err(|_| anyhow!("graph store lock poisoned"))?;
        data.relationships.retain(|r| r.id != relationship.id);
        data.relationships.push(relationship);
        Ok(())
    }

    /// Simulate an outage (or recovery) for health checks.
    pub fn set_healthy(&self, healthy: bool) { self.healthy.store(healthy, Ordering::SeqCst); }

    pub fn entity_count(&self) -> usize { self.data.read().map(|d| d.entities.len()).unwrap_or(0) }

    fn search(data: &GraphQueryResult, query_text: &str, limit: usize) -> GraphQueryResult {
        let keywords: Vec<String> = query_text.to_lowercase().split_whitespace().map(str::to_string).collect();
        let mut matched: Vec<&GraphEntity> = data
            .entities
            .iter()
            .filter(|e| {
                let name = e.name.to_lowercase();
                let description = e.description.as_deref().unwrap_or("").to_lowercase();
                keywords.iter().any(|k| name.contains(k.as_str()) || description.contains(k.as_str()))
            })
            .collect();
        matched.sort_by(|a, b| a.name.cmp(&b.name));
        matched.truncate(limit);

        let matched_ids: HashSet<&str> = matched.iter().map(|e| e.id.as_str()).collect();
        let relationships: Vec<GraphRelationship> = data
            .relationships
            .iter()
            .filter(|r| matched_ids.contains(r.source_id.as_str()) || matched_ids.contains(r.target_id.as_str()))
            .cloned()
            .collect();

        let mut entities: Vec<GraphEntity> = matched.into_iter().cloned().collect();
        for rel in &relationships {
            for id in [&rel.source_id, &rel.target_id] {
                if entities.iter().any(|e| &e.id == id) { continue; }
                if let Some(neighbour) = data.entities.iter().find(|e| &e.id == id) {
                    entities.push(neighbour.clone());
                }
            }
        }
        GraphQueryResult { entities, relationships }
    }
}

#[async_trait]
impl GraphBackend for MemoryGraphStore {
    async fn health_check(&self) -> bool { self.healthy.load(Ordering::SeqCst) && !self.data.is_poisoned() }

    async fn query_knowledge(&self, query_text: &str, limit: usize) -> Result<GraphQueryResult> {
        let data = self.data.read().map_err(|_| anyhow!("graph store lock poisoned"))?;
        let result = Self::search(&data, query_text, limit);
        debug!(entities_found = result.entities.len(), relationships_found = result.relationships.len(), "Graph store query completed");
        Ok(result)
    }
}
