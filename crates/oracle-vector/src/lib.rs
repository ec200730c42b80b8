//! oracle-vector
//!
//! Vector-side pieces of the hybrid engine: the converter from similarity hits
//! to `Source`s, a deterministic hashing embedder and an in-memory store that
//! serves as a reference vector backend.
pub mod convert;
pub mod embed;
pub mod store;

pub use convert::{above_threshold, VectorConverter};
pub use embed::HashingEmbedder;
pub use store::MemoryVectorStore;
