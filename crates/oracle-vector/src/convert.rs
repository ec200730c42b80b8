use oracle_core::config::RetrievalConfig;
use oracle_core::types::{keys, Source, SourceType, VectorHit};

/// Turns similarity hits into `Source`s scored `similarity_score * weight`.
#[derive(Debug, Clone)]
pub struct VectorConverter {
    weight: f32,
}

impl VectorConverter {
    pub fn new(weight: f32) -> Self { Self { weight } }

    pub fn from_config(config: &RetrievalConfig) -> Self { Self::new(config.vector_weight) }

    /// Hits with blank documents are skipped.
    pub fn convert(&self, hits: &[VectorHit]) -> Vec<Source> {
        hits.iter()
            .filter_map(|hit| {
                let mut metadata = hit.metadata.clone();
                metadata.insert(keys::DOCUMENT_ID.into(), hit.id.clone().into());
                metadata.insert(keys::SIMILARITY_SCORE.into(), hit.similarity_score.into());
                metadata.insert(keys::DISTANCE.into(), hit.distance.into());
                metadata.insert(keys::SOURCE_TYPE.into(), keys::VECTOR_STORE.into());
                Source::new(SourceType::Vector, hit.document.clone(), hit.similarity_score * self.weight, metadata)
            })
            .collect()
    }
}

/// Keeps hits whose similarity is at least `threshold`.
pub fn above_threshold(hits: Vec<VectorHit>, threshold: f32) -> Vec<VectorHit> {
    hits.into_iter().filter(|h| h.similarity_score >= threshold).collect()
}
