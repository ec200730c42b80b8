use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use oracle_core::config::RetrievalConfig;
use oracle_core::error::{BackendError, Error};
use oracle_core::traits::{GraphBackend, VectorBackend};
use oracle_core::types::{
    keys, GraphEntity, GraphQueryResult, GraphRelationship, MetaValue, Metadata, MetadataFilter, SourceType, VectorHealth,
    VectorHit,
};
use oracle_graph::MemoryGraphStore;
use oracle_hybrid::{BackendOutcome, BackendStatus, HybridRetrieval, RetrievalOptions};
use oracle_vector::MemoryVectorStore;

struct MockGraph {
    healthy: AtomicBool,
    result: GraphQueryResult,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockGraph {
    fn new(result: GraphQueryResult) -> Self {
        Self { healthy: AtomicBool::new(true), result, delay: None, calls: AtomicUsize::new(0) }
    }
}

#[async_trait]
impl GraphBackend for MockGraph {
    async fn health_check(&self) -> bool { self.healthy.load(Ordering::SeqCst) }

    async fn query_knowledge(&self, _query_text: &str, _limit: usize) -> Result<GraphQueryResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }
        Ok(self.result.clone())
    }
}

struct MockVector {
    healthy: AtomicBool,
    hits: Vec<VectorHit>,
    fail: bool,
    calls: AtomicUsize,
    last_filter: std::sync::Mutex<Option<MetadataFilter>>,
}

impl MockVector {
    fn new(hits: Vec<VectorHit>) -> Self {
        Self {
            healthy: AtomicBool::new(true),
            hits,
            fail: false,
            calls: AtomicUsize::new(0),
            last_filter: std::sync::Mutex::new(None),
        }
    }
}

#[async_trait]
impl VectorBackend for MockVector {
    async fn health_check(&self) -> VectorHealth {
        if self.healthy.load(Ordering::SeqCst) { VectorHealth::healthy() } else { VectorHealth::unhealthy("down") }
    }

    async fn similarity_search(&self, _query_text: &str, n_results: usize, filter: Option<&MetadataFilter>) -> Result<Vec<VectorHit>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_filter.lock() {
            *last = filter.cloned();
        }
        if self.fail {
            return Err(anyhow!("collection not found"));
        }
        Ok(self.hits.iter().take(n_results).cloned().collect())
    }
}

fn entity(id: &str, name: &str, description: &str) -> GraphEntity {
    GraphEntity {
        id: id.into(),
        name: name.into(),
        entity_type: "Concept".into(),
        description: Some(description.into()),
        properties: Metadata::new(),
    }
}

fn database_graph() -> GraphQueryResult {
    GraphQueryResult {
        entities: vec![
            entity("e1", "Database Connection", "Link between an application and a database server"),
            entity("e2", "SQL Query", "A statement sent over a database connection"),
        ],
        relationships: vec![GraphRelationship {
            id: "r1".into(),
            rel_type: "USES".into(),
            source_id: "e2".into(),
            target_id: "e1".into(),
            properties: Metadata::new(),
        }],
    }
}

fn hit(id: &str, document: &str, similarity: f32) -> VectorHit {
    let mut metadata = Metadata::new();
    metadata.insert(keys::DOCUMENT_TYPE.into(), "manual".into());
    VectorHit { id: id.into(), document: document.into(), metadata, distance: 1.0 - similarity, similarity_score: similarity }
}

fn database_hits() -> Vec<VectorHit> {
    vec![
        hit("d1", "Open a database connection with the pool before running queries.", 0.8),
        hit("d2", "Connection strings include host, port and credentials.", 0.7),
    ]
}

fn engine(config: RetrievalConfig, graph: Option<Arc<MockGraph>>, vector: Option<Arc<MockVector>>) -> Result<HybridRetrieval> {
    let mut engine = HybridRetrieval::new(config)?;
    if let Some(g) = graph {
        engine = engine.with_graph(g);
    }
    if let Some(v) = vector {
        engine = engine.with_vector(v);
    }
    Ok(engine)
}

fn scenario_options() -> RetrievalOptions { RetrievalOptions::default().with_max_sources(5).with_similarity_threshold(0.6) }

#[tokio::test]
async fn database_connection_scenario_then_cache_hit() -> Result<()> {
    let graph = Arc::new(MockGraph::new(database_graph()));
    let vector = Arc::new(MockVector::new(database_hits()));
    let engine = engine(RetrievalConfig::default(), Some(graph.clone()), Some(vector.clone()))?;

    let first = engine.retrieve_knowledge("database connection", &scenario_options()).await?;
    assert!(!first.cache_hit);
    assert!(first.sources.len() <= 5);
    assert!(first.sources.iter().any(|s| s.kind() == SourceType::Graph));
    assert!(first.sources.iter().any(|s| s.kind() == SourceType::Vector));
    assert!(first.sources.windows(2).all(|w| w[0].relevance_score() >= w[1].relevance_score()));
    let mut contents: Vec<String> = first.sources.iter().map(|s| s.content().to_lowercase()).collect();
    contents.sort();
    contents.dedup();
    assert_eq!(contents.len(), first.sources.len(), "no duplicate content");
    assert_eq!(first.graph, BackendOutcome::Returned { hits: 2 });
    assert_eq!(first.vector, BackendOutcome::Returned { hits: 2 });

    let db = first
        .sources
        .iter()
        .find(|s| s.metadata.get(keys::ENTITY_NAME) == Some(&MetaValue::from("Database Connection")))
        .ok_or_else(|| anyhow!("graph source missing"))?;
    assert_eq!(db.metadata.get(keys::RELATED_DOCUMENTS), Some(&MetaValue::from(vec!["d1"])));
    assert!(first.sources.iter().all(|s| s.metadata.get(keys::RETRIEVAL_METHOD) == Some(&MetaValue::from("hybrid"))));

    let second = engine.retrieve_knowledge("  Database Connection ", &scenario_options()).await?;
    assert!(second.cache_hit);
    assert_eq!(second.sources, first.sources);
    assert_eq!(second.graph, BackendOutcome::Skipped);
    assert_eq!(graph.calls.load(Ordering::SeqCst), 1);
    assert_eq!(vector.calls.load(Ordering::SeqCst), 1);
    assert_eq!(engine.get_cache_stats().total_access_count, 1);
    Ok(())
}

#[tokio::test]
async fn unhealthy_graph_yields_only_vector_sources() -> Result<()> {
    let graph = Arc::new(MockGraph::new(database_graph()));
    graph.healthy.store(false, Ordering::SeqCst);
    let vector = Arc::new(MockVector::new(database_hits()));
    let engine = engine(RetrievalConfig::default(), Some(graph.clone()), Some(vector))?;

    let result = engine.retrieve_knowledge("database connection", &scenario_options()).await?;
    assert!(!result.sources.is_empty());
    assert!(result.sources.iter().all(|s| s.kind() == SourceType::Vector));
    assert_eq!(result.graph, BackendOutcome::Failed(BackendError::Unhealthy(SourceType::Graph)));
    assert_eq!(graph.calls.load(Ordering::SeqCst), 0, "unhealthy backend is not queried");
    Ok(())
}

#[tokio::test]
async fn failing_vector_yields_only_graph_sources() -> Result<()> {
    let graph = Arc::new(MockGraph::new(database_graph()));
    let mut vector = MockVector::new(database_hits());
    vector.fail = true;
    let engine = engine(RetrievalConfig::default(), Some(graph), Some(Arc::new(vector)))?;

    let result = engine.retrieve_knowledge("database connection", &scenario_options()).await?;
    assert!(!result.sources.is_empty());
    assert!(result.sources.iter().all(|s| s.kind() == SourceType::Graph));
    assert!(matches!(result.vector, BackendOutcome::Failed(BackendError::Query(SourceType::Vector, _))));
    Ok(())
}

#[tokio::test]
async fn unhealthy_vector_yields_only_graph_sources() -> Result<()> {
    let graph = Arc::new(MockGraph::new(database_graph()));
    let vector = Arc::new(MockVector::new(database_hits()));
    vector.healthy.store(false, Ordering::SeqCst);
    let engine = engine(RetrievalConfig::default(), Some(graph), Some(vector.clone()))?;

    let result = engine.retrieve_knowledge("database connection", &scenario_options()).await?;
    assert!(!result.sources.is_empty());
    assert!(result.sources.iter().all(|s| s.kind() == SourceType::Graph));
    assert_eq!(result.graph, BackendOutcome::Returned { hits: 2 });
    assert_eq!(result.vector, BackendOutcome::Failed(BackendError::Unhealthy(SourceType::Vector)));
    assert_eq!(vector.calls.load(Ordering::SeqCst), 0, "unhealthy backend is not queried");
    Ok(())
}

#[tokio::test]
async fn slow_backend_times_out_without_failing_the_request() -> Result<()> {
    let mut graph = MockGraph::new(database_graph());
    graph.delay = Some(Duration::from_millis(500));
    let vector = Arc::new(MockVector::new(database_hits()));
    let config = RetrievalConfig { backend_timeout_ms: 50, ..RetrievalConfig::default() };
    let engine = engine(config, Some(Arc::new(graph)), Some(vector))?;

    let result = engine.retrieve_knowledge("database connection", &scenario_options()).await?;
    assert!(matches!(result.graph, BackendOutcome::Failed(BackendError::Timeout(SourceType::Graph, _))));
    assert!(result.sources.iter().all(|s| s.kind() == SourceType::Vector));
    assert!(result.query_time < Duration::from_millis(500));
    Ok(())
}

#[tokio::test]
async fn excluding_both_backends_returns_empty() -> Result<()> {
    let graph = Arc::new(MockGraph::new(database_graph()));
    let vector = Arc::new(MockVector::new(database_hits()));
    let engine = engine(RetrievalConfig::default(), Some(graph.clone()), Some(vector.clone()))?;

    let options = RetrievalOptions::default().with_graph(false).with_vector(false);
    let result = engine.retrieve_knowledge("database connection", &options).await?;
    assert!(result.sources.is_empty());
    assert!(!result.cache_hit);
    assert_eq!(graph.calls.load(Ordering::SeqCst) + vector.calls.load(Ordering::SeqCst), 0);

    // nothing is retrieved, so an out-of-range threshold is never checked
    let odd = options.with_similarity_threshold(1.5);
    assert!(engine.retrieve_knowledge("database connection", &odd).await?.sources.is_empty());
    Ok(())
}

#[tokio::test]
async fn no_backends_configured_returns_empty_and_caches_nothing() -> Result<()> {
    let engine = engine(RetrievalConfig::default(), None, None)?;
    let result = engine.retrieve_knowledge("anything", &RetrievalOptions::default()).await?;
    assert!(result.sources.is_empty());
    assert_eq!(result.graph, BackendOutcome::Skipped);
    assert_eq!(engine.get_cache_stats().cache_size, 0);
    Ok(())
}

#[tokio::test]
async fn empty_results_are_not_cached_so_recovery_is_seen() -> Result<()> {
    let vector = Arc::new(MockVector::new(database_hits()));
    vector.healthy.store(false, Ordering::SeqCst);
    let engine = engine(RetrievalConfig::default(), None, Some(vector.clone()))?;

    let down = engine.retrieve_knowledge("database connection", &scenario_options()).await?;
    assert!(down.sources.is_empty());

    vector.healthy.store(true, Ordering::SeqCst);
    let up = engine.retrieve_knowledge("database connection", &scenario_options()).await?;
    assert!(!up.cache_hit);
    assert_eq!(up.sources.len(), 2);
    Ok(())
}

#[tokio::test]
async fn identical_vector_content_is_collapsed_to_the_higher_score() -> Result<()> {
    let same = "Pool connections are recycled after sixty seconds of idle time.";
    let vector = Arc::new(MockVector::new(vec![hit("d1", same, 0.8), hit("d2", same, 0.7)]));
    let engine = engine(RetrievalConfig::default(), None, Some(vector))?;

    let result = engine.retrieve_knowledge("pool idle", &scenario_options()).await?;
    assert_eq!(result.sources.len(), 1);
    assert_eq!(result.sources[0].metadata.get(keys::DOCUMENT_ID), Some(&MetaValue::from("d1")));
    assert_eq!(result.sources[0].metadata.get(keys::SIMILARITY_SCORE), Some(&MetaValue::from(0.8f32)));
    Ok(())
}

#[tokio::test]
async fn threshold_and_max_sources_bound_the_result() -> Result<()> {
    let hits: Vec<VectorHit> = (0..8).map(|i| hit(&format!("d{}", i), &format!("chunk number {}", i), 0.95 - i as f32 * 0.05)).collect();
    let vector = Arc::new(MockVector::new(hits));
    let engine = engine(RetrievalConfig::default(), None, Some(vector))?;

    let top3 = engine.retrieve_knowledge("chunk", &RetrievalOptions::default().with_max_sources(3)).await?;
    assert_eq!(top3.sources.len(), 3);

    // 0.95, 0.90 and 0.85 clear 0.83
    let strict = engine.retrieve_knowledge("chunk", &RetrievalOptions::default().with_similarity_threshold(0.83)).await?;
    assert_eq!(strict.sources.len(), 3);
    Ok(())
}

#[tokio::test]
async fn metadata_filter_reaches_the_vector_backend() -> Result<()> {
    let vector = Arc::new(MockVector::new(database_hits()));
    let engine = engine(RetrievalConfig::default(), None, Some(vector.clone()))?;

    let mut filter = MetadataFilter::new();
    filter.insert(keys::DOCUMENT_TYPE.into(), "manual".into());
    engine.retrieve_knowledge("database", &scenario_options().with_filter(filter.clone())).await?;
    let seen = vector.last_filter.lock().map_err(|_| anyhow!("poisoned"))?.clone();
    assert_eq!(seen, Some(filter));
    Ok(())
}

#[tokio::test]
async fn concurrent_identical_requests_all_succeed() -> Result<()> {
    let graph = Arc::new(MockGraph::new(database_graph()));
    let vector = Arc::new(MockVector::new(database_hits()));
    let engine = engine(RetrievalConfig::default(), Some(graph), Some(vector))?;

    let options = scenario_options();
    let calls = (0..8).map(|_| engine.retrieve_knowledge("database connection", &options));
    let results = futures::future::join_all(calls).await;
    assert_eq!(results.len(), 8);
    for r in results {
        let r = r?;
        assert!(!r.sources.is_empty());
    }
    assert_eq!(engine.get_cache_stats().cache_size, 1, "same key is overwritten, not duplicated");
    Ok(())
}

#[tokio::test]
async fn invalid_threshold_is_the_only_error() -> Result<()> {
    let engine = engine(RetrievalConfig::default(), None, None)?;
    let err = engine.retrieve_knowledge("q", &RetrievalOptions::default().with_similarity_threshold(1.5)).await;
    assert!(matches!(err, Err(Error::InvalidOptions(_))));
    Ok(())
}

#[tokio::test]
async fn invalid_config_is_rejected() {
    let config = RetrievalConfig { graph_weight: 1.5, ..RetrievalConfig::default() };
    assert!(matches!(HybridRetrieval::new(config), Err(Error::InvalidConfig(_))));
}

#[tokio::test]
async fn disabled_cache_always_retrieves() -> Result<()> {
    let vector = Arc::new(MockVector::new(database_hits()));
    let config = RetrievalConfig { cache_enabled: false, ..RetrievalConfig::default() };
    let engine = engine(config, None, Some(vector.clone()))?;

    for _ in 0..2 {
        let r = engine.retrieve_knowledge("database", &scenario_options()).await?;
        assert!(!r.cache_hit);
    }
    assert_eq!(vector.calls.load(Ordering::SeqCst), 2);
    assert!(!engine.get_cache_stats().cache_enabled);
    Ok(())
}

#[tokio::test]
async fn health_stats_and_clear() -> Result<()> {
    let graph = Arc::new(MockGraph::new(database_graph()));
    let engine = engine(RetrievalConfig::default(), Some(graph.clone()), None)?;

    engine.retrieve_knowledge("database connection", &scenario_options()).await?;
    let report = engine.health_check().await;
    assert_eq!(report.service, "healthy");
    assert_eq!(report.graph, BackendStatus::Healthy);
    assert_eq!(report.vector, BackendStatus::NotConfigured);
    assert_eq!(report.cache_size, 1);

    graph.healthy.store(false, Ordering::SeqCst);
    assert_eq!(engine.health_check().await.graph, BackendStatus::Unhealthy);

    assert_eq!(engine.clear_cache(), 1);
    assert_eq!(engine.get_cache_stats().cache_size, 0);
    Ok(())
}

#[tokio::test]
async fn reference_stores_end_to_end() -> Result<()> {
    let graph = MemoryGraphStore::with_data(database_graph().entities, database_graph().relationships);
    let vector = MemoryVectorStore::default();
    vector.add_document("d1", "database connection pooling keeps sockets open", Metadata::new())?;
    vector.add_document("d2", "tomatoes need full sun", Metadata::new())?;

    let engine = HybridRetrieval::new(RetrievalConfig::default())?
        .with_graph(Arc::new(graph))
        .with_vector(Arc::new(vector));
    let options = RetrievalOptions::default().with_similarity_threshold(0.3);
    let result = engine.retrieve_knowledge("database connection", &options).await?;

    assert!(result.sources.iter().any(|s| s.kind() == SourceType::Graph));
    assert!(result.sources.iter().all(|s| !s.content().contains("tomatoes")));
    assert!(result.sources.iter().all(|s| (0.0..=1.0).contains(&s.relevance_score())));
    Ok(())
}
