//! Additive multi-factor scorer.
//!
//! Final score = base (from the converter) + content boost + type boost +
//! metadata boost, clamped to `[0, 1]`. Each boost is capped by its own
//! `RankingConfig` limit.

use std::collections::HashSet;
use tracing::debug;

use oracle_core::config::RankingConfig;
use oracle_core::text::{keywords, overlap_ratio};
use oracle_core::types::{keys, Metadata, Source, SourceType};

#[derive(Debug, Clone, Default)]
pub struct Ranker {
    config: RankingConfig,
}

impl Ranker {
    pub fn new(config: RankingConfig) -> Self { Self { config } }

    /// Rescores every source and sorts descending. The sort is stable, so
    /// equal scores keep their input order.
    pub fn rank(&self, mut sources: Vec<Source>, query: &str) -> Vec<Source> {
        let query_keywords = keywords(query);
        for source in sources.iter_mut() {
            let score = source.relevance_score()
                + self.content_boost(source.content(), &query_keywords)
                + self.type_boost(source.kind())
                + self.metadata_boost(&source.metadata);
            source.set_relevance_score(score);
        }
        sources.sort_by(|a, b| b.relevance_score().total_cmp(&a.relevance_score()));
        debug!(
            total_sources = sources.len(),
            top_score = sources.first().map_or(0.0, Source::relevance_score),
            "Ranked sources"
        );
        sources
    }

    /// Keyword density plus a length sweet spot.
    pub fn content_boost(&self, content: &str, query_keywords: &HashSet<String>) -> f32 {
        let c = &self.config;
        let mut boost = c.keyword_boost * overlap_ratio(query_keywords, &keywords(content));
        let len = content.chars().count();
        if (c.preferred_min_chars..=c.preferred_max_chars).contains(&len) {
            boost += c.preferred_length_boost;
        } else if (c.acceptable_min_chars..=c.acceptable_max_chars).contains(&len) {
            boost += c.acceptable_length_boost;
        }
        boost.min(c.content_boost_cap)
    }

    pub fn type_boost(&self, kind: SourceType) -> f32 {
        let boost = match kind {
            SourceType::Graph => self.config.graph_type_boost,
            SourceType::Vector => self.config.vector_type_boost,
        };
        boost.min(self.config.type_boost_cap)
    }

    /// One marker boost each for: more than `rich_metadata_keys` keys, an
    /// entity or document type, a cross-reference field, a known store tag.
    pub fn metadata_boost(&self, metadata: &Metadata) -> f32 {
        let truthy = |key: &str| metadata.get(key).is_some_and(|v| v.is_truthy());
        let known_store = metadata
            .get(keys::SOURCE_TYPE)
            .and_then(|v| v.as_str())
            .is_some_and(|s| s == keys::GRAPH_STORE || s == keys::VECTOR_STORE);

        let markers = [
            metadata.len() > self.config.rich_metadata_keys,
            truthy(keys::ENTITY_TYPE) || truthy(keys::DOCUMENT_TYPE),
            truthy(keys::RELATED_ENTITIES) || truthy(keys::PARENT_DOCUMENT_ID),
            known_store,
        ];
        let hits = markers.iter().filter(|&&m| m).count() as f32;
        (hits * self.config.metadata_marker_boost).min(self.config.metadata_boost_cap)
    }
}
