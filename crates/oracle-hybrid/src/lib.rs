//! oracle-hybrid
//!
//! The hybrid knowledge retrieval engine: a cached, concurrent fan-out over a
//! graph backend and a vector backend, followed by deduplication, weighted
//! ranking and context aggregation.
//!
//! ```text
//! query -> cache? -> graph || vector -> convert -> dedup -> rank -> aggregate -> cache -> top-N
//! ```
pub mod aggregate;
pub mod cache;
pub mod dedup;
pub mod engine;
pub mod fingerprint;
pub mod health;
pub mod rank;

pub use cache::{CacheStats, SourceCache};
pub use engine::{BackendOutcome, HybridRetrieval, RetrievalResult};
pub use fingerprint::{fingerprint, Fingerprint, RetrievalOptions};
pub use health::{BackendStatus, HealthReport};
pub use rank::Ranker;
