use std::hash::{Hash, Hasher};
use twox_hash::XxHash64;

pub const DEFAULT_DIM: usize = 256;

/// Feature-hashing embedder: every lowercased token is hashed into one of
/// `dim` buckets. Output is L2-normalized, so cosine similarity is a dot product.
#[derive(Debug, Clone)]
pub struct HashingEmbedder { dim: usize }

impl Default for HashingEmbedder {
    fn default() -> Self { Self::new(DEFAULT_DIM) }
}

impl HashingEmbedder {
    pub fn new(dim: usize) -> Self { Self { dim: dim.max(1) } }

    pub fn dim(&self) -> usize { self.dim }

    pub fn embed(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        for token in tokens(text) {
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h % self.dim as u64) as usize;
            // high bit picks the sign so unrelated tokens tend to cancel out
            let sign = if h >> 63 == 0 { 1.0 } else { -1.0 };
            v[idx] += sign;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 { for x in &mut v { *x /= norm; } }
        v
    }
}

/// Cosine similarity of two L2-normalized vectors.
pub fn cosine(a: &[f32], b: &[f32]) -> f32 { a.iter().zip(b).map(|(x, y)| x * y).sum() }

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}
