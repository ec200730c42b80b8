//! JSON seed data for the in-memory reference stores.
//!
//! Every `*.json` file under the seed directory may carry any of
//! `entities`, `relationships` and `documents`; files are merged in path order.
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

use oracle_core::types::{GraphEntity, GraphRelationship, Metadata};
use oracle_graph::MemoryGraphStore;
use oracle_vector::MemoryVectorStore;

#[derive(Debug, Default, Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub entities: Vec<GraphEntity>,
    #[serde(default)]
    pub relationships: Vec<GraphRelationship>,
    #[serde(default)]
    pub documents: Vec<SeedDocument>,
}

#[derive(Debug, Deserialize)]
pub struct SeedDocument {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl SeedFile {
    fn extend(&mut self, other: SeedFile) {
        self.entities.extend(other.entities);
        self.relationships.extend(other.relationships);
        self.documents.extend(other.documents);
    }

    /// Loads every store; later ids replace earlier ones.
    pub fn populate(&self, graph: &MemoryGraphStore, vector: &MemoryVectorStore) -> Result<()> {
        for e in &self.entities { graph.add_entity(e.clone())?; }
        for r in &self.relationships { graph.add_relationship(r.clone())?; }
        for d in &self.documents { vector.add_document(d.id.clone(), d.text.clone(), d.metadata.clone())?; }
        Ok(())
    }
}

pub fn load_seed_dir(dir: &Path) -> Result<SeedFile> {
    let mut seed = SeedFile::default();
    if !dir.exists() {
        warn!(dir = %dir.display(), "Seed directory not found; starting with empty stores");
        return Ok(seed);
    }
    for entry in WalkDir::new(dir).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("json") { continue; }
        let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let file: SeedFile = serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
        debug!(
            file = %path.display(),
            entities = file.entities.len(),
            relationships = file.relationships.len(),
            documents = file.documents.len(),
            "Loaded seed file"
        );
        seed.extend(file);
    }
    Ok(seed)
}
