use chrono::Utc;

use oracle_core::types::{keys, MetaValue, Source, SourceType};

const MAX_RELATED_DOCUMENTS: usize = 3;

/// Cross-links graph sources to vector sources mentioning the entity name,
/// then stamps every source with a timestamp and the retrieval method.
/// Scores and order are left untouched.
pub fn aggregate_context(sources: &mut [Source]) { aggregate_context_at(sources, Utc::now().timestamp_millis()) }

pub fn aggregate_context_at(sources: &mut [Source], timestamp_millis: i64) {
    let links: Vec<(usize, Vec<MetaValue>)> = sources
        .iter()
        .enumerate()
        .filter(|(_, s)| s.kind() == SourceType::Graph)
        .filter_map(|(idx, graph)| {
            let name = graph.metadata.get(keys::ENTITY_NAME).and_then(MetaValue::as_str)?.to_lowercase();
            if name.is_empty() { return None; }
            let docs: Vec<MetaValue> = sources
                .iter()
                .filter(|s| s.kind() == SourceType::Vector && s.content().to_lowercase().contains(&name))
                .filter_map(|s| s.metadata.get(keys::DOCUMENT_ID).cloned())
                .take(MAX_RELATED_DOCUMENTS)
                .collect();
            (!docs.is_empty()).then_some((idx, docs))
        })
        .collect();

    for (idx, docs) in links {
        sources[idx].metadata.insert(keys::RELATED_DOCUMENTS.into(), MetaValue::List(docs));
    }
    for source in sources.iter_mut() {
        source.metadata.insert(keys::RETRIEVAL_TIMESTAMP.into(), MetaValue::Int(timestamp_millis));
        source.metadata.insert(keys::RETRIEVAL_METHOD.into(), keys::HYBRID.into());
    }
}
