//! oracle-graph
//!
//! Conversion of graph backend results into ranked-pipeline `Source`s, and an
//! in-memory graph store usable as a reference backend.
pub mod convert;
pub mod store;

pub use convert::{entity_relevance, GraphConverter};
pub use store::MemoryGraphStore;
