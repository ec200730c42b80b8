use std::collections::HashSet;

use oracle_core::config::RetrievalConfig;
use oracle_core::text::{keywords, overlap_ratio};
use oracle_core::types::{keys, GraphEntity, GraphQueryResult, MetaValue, Metadata, Source, SourceType};

const NAME_WEIGHT: f32 = 0.5;
const DESCRIPTION_WEIGHT: f32 = 0.3;
const PROPERTIES_WEIGHT: f32 = 0.2;
const MAX_RELATED_NAMES: usize = 3;
const MAX_RELATED_IDS: usize = 5;

/// Turns graph query results into `Source`s with a provisional score of
/// `entity_relevance * weight`.
#[derive(Debug, Clone)]
pub struct GraphConverter {
    weight: f32,
    min_relevance: f32,
}

impl GraphConverter {
    pub fn new(weight: f32, min_relevance: f32) -> Self { Self { weight, min_relevance } }

    pub fn from_config(config: &RetrievalConfig) -> Self { Self::new(config.graph_weight, config.min_graph_relevance) }

    pub fn convert(&self, result: &GraphQueryResult, query: &str) -> Vec<Source> {
        let query_keywords = keywords(query);
        let mut sources = Vec::new();
        for entity in &result.entities {
            let relevance = entity_relevance(entity, &query_keywords);
            if relevance <= self.min_relevance { continue; }

            let related = related_entity_ids(entity, result);
            let content = entity_content(entity, &related, result);

            let mut metadata = Metadata::new();
            metadata.insert(keys::ENTITY_ID.into(), entity.id.clone().into());
            metadata.insert(keys::ENTITY_TYPE.into(), entity.entity_type.clone().into());
            metadata.insert(keys::ENTITY_NAME.into(), entity.name.clone().into());
            let related_ids: Vec<MetaValue> = related.iter().take(MAX_RELATED_IDS).map(|id| MetaValue::from(id.as_str())).collect();
            metadata.insert(keys::RELATED_ENTITIES.into(), MetaValue::List(related_ids));
            metadata.insert(keys::SOURCE_TYPE.into(), keys::GRAPH_STORE.into());
            metadata.insert(keys::PROPERTIES.into(), MetaValue::Map(entity.properties.clone()));

            if let Some(source) = Source::new(SourceType::Graph, content, relevance * self.weight, metadata) {
                sources.push(source);
            }
        }
        sources
    }
}

/// Keyword overlap between the query and an entity's name (0.5), description
/// (0.3) and property values (0.2), capped at 1.0.
pub fn entity_relevance(entity: &GraphEntity, query_keywords: &HashSet<String>) -> f32 {
    let mut score = NAME_WEIGHT * overlap_ratio(query_keywords, &keywords(&entity.name));
    if let Some(description) = &entity.description {
        score += DESCRIPTION_WEIGHT * overlap_ratio(query_keywords, &keywords(description));
    }
    if !entity.properties.is_empty() {
        let text: Vec<String> = entity.properties.values().map(ToString::to_string).collect();
        score += PROPERTIES_WEIGHT * overlap_ratio(query_keywords, &keywords(&text.join(" ")));
    }
    score.min(1.0)
}

/// Ids on the other end of every relationship touching `entity`, first-seen order.
fn related_entity_ids(entity: &GraphEntity, result: &GraphQueryResult) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for rel in &result.relationships {
        let other = if rel.source_id == entity.id { &rel.target_id } else if rel.target_id == entity.id { &rel.source_id } else { continue };
        if !ids.contains(other) { ids.push(other.clone()); }
    }
    ids
}

fn entity_content(entity: &GraphEntity, related: &[String], result: &GraphQueryResult) -> String {
    let mut parts = vec![format!("Entity: {}", entity.name)];
    if let Some(description) = entity.description.as_deref().filter(|d| !d.trim().is_empty()) {
        parts.push(format!("Description: {}", description));
    }
    let names: Vec<&str> = related
        .iter()
        .take(MAX_RELATED_NAMES)
        .filter_map(|id| result.entities.iter().find(|e| &e.id == id).map(|e| e.name.as_str()))
        .collect();
    if !names.is_empty() {
        parts.push(format!("Related to: {}", names.join(", ")));
    }
    parts.join(". ")
}
