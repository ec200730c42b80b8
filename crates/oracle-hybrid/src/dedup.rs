use std::collections::HashMap;
use tracing::debug;

use oracle_core::text::normalize;
use oracle_core::types::Source;

/// blake3 digest of the trimmed, lowercased content.
pub fn content_hash(content: &str) -> [u8; 32] { *blake3::hash(normalize(content).as_bytes()).as_bytes() }

/// Collapses sources with equal normalized content.
///
/// The first-seen source per hash is kept unless a later one has a strictly
/// higher score, in which case it takes the kept slot.
pub fn deduplicate(sources: Vec<Source>) -> Vec<Source> {
    let before = sources.len();
    let mut slots: HashMap<[u8; 32], usize> = HashMap::with_capacity(before);
    let mut kept: Vec<Source> = Vec::with_capacity(before);
    for source in sources {
        let hash = content_hash(source.content());
        match slots.get(&hash) {
            Some(&idx) => {
                if source.relevance_score() > kept[idx].relevance_score() {
                    kept[idx] = source;
                }
            }
            None => {
                slots.insert(hash, kept.len());
                kept.push(source);
            }
        }
    }
    debug!(before, after = kept.len(), "Deduplicated sources");
    kept
}
