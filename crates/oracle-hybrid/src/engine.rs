use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use oracle_core::config::RetrievalConfig;
use oracle_core::error::{BackendError, Result};
use oracle_core::traits::{GraphBackend, VectorBackend};
use oracle_core::types::{GraphQueryResult, Source, SourceType, VectorHit};
use oracle_graph::GraphConverter;
use oracle_vector::{above_threshold, VectorConverter};

use crate::aggregate::aggregate_context;
use crate::cache::{CacheStats, SourceCache};
use crate::dedup::deduplicate;
use crate::fingerprint::{fingerprint, RetrievalOptions};
use crate::health::{BackendStatus, HealthReport};
use crate::rank::Ranker;

/// What one backend contributed to a retrieval.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendOutcome {
    /// Excluded by the request, not configured, or answered from cache.
    Skipped,
    /// Number of native hits (entities or chunks) before filtering.
    Returned { hits: usize },
    Failed(BackendError),
}

impl fmt::Display for BackendOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skipped => f.write_str("skipped"),
            Self::Returned { hits } => write!(f, "returned {}", hits),
            Self::Failed(e) => write!(f, "failed: {}", e),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetrievalResult {
    pub sources: Vec<Source>,
    pub query_time: Duration,
    pub cache_hit: bool,
    pub graph: BackendOutcome,
    pub vector: BackendOutcome,
}

impl RetrievalResult {
    fn skipped(sources: Vec<Source>, started: Instant, cache_hit: bool) -> Self {
        Self { sources, query_time: started.elapsed(), cache_hit, graph: BackendOutcome::Skipped, vector: BackendOutcome::Skipped }
    }
}

/// Cached, concurrent retrieval over an optional graph backend and an
/// optional vector backend.
pub struct HybridRetrieval {
    graph: Option<Arc<dyn GraphBackend>>,
    vector: Option<Arc<dyn VectorBackend>>,
    config: RetrievalConfig,
    cache: SourceCache,
    ranker: Ranker,
    graph_converter: GraphConverter,
    vector_converter: VectorConverter,
}

impl HybridRetrieval {
    pub fn new(config: RetrievalConfig) -> Result<Self> {
        config.validate()?;
        info!(
            cache_enabled = config.cache_enabled,
            cache_ttl_secs = config.cache_ttl_secs,
            max_cache_size = config.max_cache_size,
            graph_weight = config.graph_weight,
            vector_weight = config.vector_weight,
            "Hybrid retrieval initialized"
        );
        Ok(Self {
            graph: None,
            vector: None,
            cache: SourceCache::from_config(&config),
            ranker: Ranker::new(config.ranking.clone()),
            graph_converter: GraphConverter::from_config(&config),
            vector_converter: VectorConverter::from_config(&config),
            config,
        })
    }

    pub fn with_graph(mut self, backend: Arc<dyn GraphBackend>) -> Self { self.graph = Some(backend); self }

    pub fn with_vector(mut self, backend: Arc<dyn VectorBackend>) -> Self { self.vector = Some(backend); self }

    pub fn config(&self) -> &RetrievalConfig { &self.config }

    /// Fails only on a similarity threshold outside `[0, 1]` when at least one
    /// backend is included; backend and cache faults shrink the result instead.
    pub async fn retrieve_knowledge(&self, query: &str, options: &RetrievalOptions) -> Result<RetrievalResult> {
        let started = Instant::now();
        if !options.include_graph && !options.include_vector {
            debug!("Both backends excluded; nothing to retrieve");
            return Ok(RetrievalResult::skipped(Vec::new(), started, false));
        }

        let threshold = options.similarity_threshold.unwrap_or(self.config.similarity_threshold);
        let key = fingerprint(query, options, threshold)?;

        if let Some(mut sources) = self.cache.lookup(&key) {
            sources.truncate(options.max_sources);
            debug!(cache_key = %key, sources = sources.len(), "Returning cached sources");
            return Ok(RetrievalResult::skipped(sources, started, true));
        }

        let graph_call = async {
            match (&self.graph, options.include_graph) {
                (Some(backend), true) => Some(self.fetch_graph(backend.as_ref(), query).await),
                _ => None,
            }
        };
        let vector_call = async {
            match (&self.vector, options.include_vector) {
                (Some(backend), true) => Some(self.fetch_vector(backend.as_ref(), query, options).await),
                _ => None,
            }
        };
        let (graph_result, vector_result) = tokio::join!(graph_call, vector_call);

        let graph = outcome(&graph_result, |r| r.entities.len());
        let vector = outcome(&vector_result, Vec::len);

        let mut sources = Vec::new();
        if let Some(Ok(result)) = &graph_result {
            sources.extend(self.graph_converter.convert(result, query));
        }
        if let Some(Ok(hits)) = vector_result {
            let kept = above_threshold(hits, threshold);
            sources.extend(self.vector_converter.convert(&kept));
        }

        let mut sources = self.ranker.rank(deduplicate(sources), query);
        aggregate_context(&mut sources);
        sources.truncate(options.max_sources);
        if !sources.is_empty() {
            self.cache.store(key, sources.clone());
        }

        let query_time = started.elapsed();
        info!(
            query_length = query.len(),
            sources_returned = sources.len(),
            graph = %graph,
            vector = %vector,
            elapsed_ms = query_time.as_millis() as u64,
            "Hybrid retrieval completed"
        );
        Ok(RetrievalResult { sources, query_time, cache_hit: false, graph, vector })
    }

    async fn fetch_graph(&self, backend: &dyn GraphBackend, query: &str) -> std::result::Result<GraphQueryResult, BackendError> {
        let kind = SourceType::Graph;
        let limit = self.config.max_graph_results;
        let result = self
            .bounded(kind, async {
                if !backend.health_check().await {
                    return Err(BackendError::Unhealthy(kind));
                }
                backend.query_knowledge(query, limit).await.map_err(|e| BackendError::Query(kind, format!("{:#}", e)))
            })
            .await;
        if let Ok(r) = &result {
            debug!(entities = r.entities.len(), relationships = r.relationships.len(), "Graph retrieval completed");
        }
        result
    }

    async fn fetch_vector(
        &self,
        backend: &dyn VectorBackend,
        query: &str,
        options: &RetrievalOptions,
    ) -> std::result::Result<Vec<VectorHit>, BackendError> {
        let kind = SourceType::Vector;
        let limit = self.config.max_vector_results;
        let result = self
            .bounded(kind, async {
                let health = backend.health_check().await;
                if !health.is_healthy() {
                    return Err(BackendError::Unhealthy(kind));
                }
                backend
                    .similarity_search(query, limit, options.active_filter())
                    .await
                    .map_err(|e| BackendError::Query(kind, format!("{:#}", e)))
            })
            .await;
        if let Ok(hits) = &result {
            debug!(hits = hits.len(), "Vector retrieval completed");
        }
        result
    }

    /// Runs a health check plus query under the per-backend timeout and logs failures.
    async fn bounded<T, F>(&self, kind: SourceType, call: F) -> std::result::Result<T, BackendError>
    where
        F: Future<Output = std::result::Result<T, BackendError>>,
    {
        let limit = self.config.backend_timeout();
        let result = tokio::time::timeout(limit, call).await.unwrap_or_else(|_| Err(BackendError::Timeout(kind, limit)));
        match &result {
            Err(e @ BackendError::Query(..)) => error!(backend = %kind, error = %e, "Backend query failed"),
            Err(e) => warn!(backend = %kind, error = %e, "Backend unavailable; continuing without it"),
            Ok(_) => {}
        }
        result
    }

    pub fn get_cache_stats(&self) -> CacheStats { self.cache.stats() }

    pub fn clear_cache(&self) -> usize { self.cache.clear() }

    /// Probes both backends concurrently, each under the backend timeout.
    pub async fn health_check(&self) -> HealthReport {
        let limit = self.config.backend_timeout();
        let graph = async {
            let Some(backend) = &self.graph else { return BackendStatus::NotConfigured };
            match tokio::time::timeout(limit, backend.health_check()).await {
                Ok(true) => BackendStatus::Healthy,
                Ok(false) => BackendStatus::Unhealthy,
                Err(_) => BackendStatus::Error(format!("timed out after {:?}", limit)),
            }
        };
        let vector = async {
            let Some(backend) = &self.vector else { return BackendStatus::NotConfigured };
            match tokio::time::timeout(limit, backend.health_check()).await {
                Ok(h) if h.is_healthy() => BackendStatus::Healthy,
                Ok(_) => BackendStatus::Unhealthy,
                Err(_) => BackendStatus::Error(format!("timed out after {:?}", limit)),
            }
        };
        let (graph, vector) = tokio::join!(graph, vector);
        HealthReport {
            service: "healthy".to_string(),
            cache_enabled: self.cache.is_enabled(),
            cache_size: self.cache.len(),
            graph,
            vector,
        }
    }
}

fn outcome<T>(result: &Option<std::result::Result<T, BackendError>>, count: impl Fn(&T) -> usize) -> BackendOutcome {
    match result {
        None => BackendOutcome::Skipped,
        Some(Ok(native)) => BackendOutcome::Returned { hits: count(native) },
        Some(Err(e)) => BackendOutcome::Failed(e.clone()),
    }
}
