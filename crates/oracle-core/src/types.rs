//! Domain types shared by the graph and vector backends and the hybrid engine.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::text::truncate_chars;

/// Upper bound on `Source::content`, in characters.
pub const MAX_CONTENT_CHARS: usize = 2000;

pub type Metadata = BTreeMap<String, MetaValue>;

/// Equality constraints on vector metadata (`key == value` for every entry).
pub type MetadataFilter = BTreeMap<String, MetaValue>;

/// Metadata keys written by the converters, the ranker and the aggregator.
pub mod keys {
    pub const SOURCE_TYPE: &str = "source_type";
    pub const ENTITY_ID: &str = "entity_id";
    pub const ENTITY_TYPE: &str = "entity_type";
    pub const ENTITY_NAME: &str = "entity_name";
    pub const RELATED_ENTITIES: &str = "related_entities";
    pub const PROPERTIES: &str = "properties";
    pub const DOCUMENT_ID: &str = "document_id";
    pub const DOCUMENT_TYPE: &str = "document_type";
    pub const PARENT_DOCUMENT_ID: &str = "parent_document_id";
    pub const SIMILARITY_SCORE: &str = "similarity_score";
    pub const DISTANCE: &str = "distance";
    pub const RELATED_DOCUMENTS: &str = "related_documents";
    pub const RETRIEVAL_TIMESTAMP: &str = "retrieval_timestamp";
    pub const RETRIEVAL_METHOD: &str = "retrieval_method";

    /// Values stored under `SOURCE_TYPE`.
    pub const GRAPH_STORE: &str = "knowledge_graph";
    pub const VECTOR_STORE: &str = "vector_store";

    /// Value stored under `RETRIEVAL_METHOD`.
    pub const HYBRID: &str = "hybrid";
}

/// Which backend produced a source.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Graph,
    Vector,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Graph => "graph",
            Self::Vector => "vector",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// An open metadata value: scalars, lists and nested maps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<MetaValue>),
    Map(BTreeMap<String, MetaValue>),
}

impl MetaValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Empty strings, empty collections, zero, `false` and null are not truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::Float(f) => *f != 0.0,
            Self::Text(s) => !s.is_empty(),
            Self::List(l) => !l.is_empty(),
            Self::Map(m) => !m.is_empty(),
        }
    }
}

impl fmt::Display for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => f.write_str(s),
            Self::List(items) => {
                let parts: Vec<String> = items.iter().map(ToString::to_string).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            Self::Map(map) => {
                let parts: Vec<String> = map.iter().map(|(k, v)| format!("{k}: {v}")).collect();
                write!(f, "{{{}}}", parts.join(", "))
            }
        }
    }
}

impl From<&str> for MetaValue { fn from(v: &str) -> Self { Self::Text(v.to_string()) } }
impl From<String> for MetaValue { fn from(v: String) -> Self { Self::Text(v) } }
impl From<bool> for MetaValue { fn from(v: bool) -> Self { Self::Bool(v) } }
impl From<i64> for MetaValue { fn from(v: i64) -> Self { Self::Int(v) } }
impl From<f64> for MetaValue { fn from(v: f64) -> Self { Self::Float(v) } }
impl From<f32> for MetaValue { fn from(v: f32) -> Self { Self::Float(f64::from(v)) } }
impl From<Metadata> for MetaValue { fn from(v: Metadata) -> Self { Self::Map(v) } }

impl<T: Into<MetaValue>> From<Vec<T>> for MetaValue {
    fn from(v: Vec<T>) -> Self { Self::List(v.into_iter().map(Into::into).collect()) }
}

/// The canonical unit of retrieved knowledge.
///
/// - `kind` is fixed at creation
/// - `content` is never empty and at most `MAX_CONTENT_CHARS` characters
/// - `relevance_score` always lies in `[0.0, 1.0]`
/// - `metadata` only ever grows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Source {
    #[serde(rename = "type")]
    kind: SourceType,
    content: String,
    relevance_score: f32,
    pub metadata: Metadata,
}

impl Source {
    /// Returns `None` when `content` is blank.
    pub fn new(kind: SourceType, content: impl Into<String>, relevance_score: f32, metadata: Metadata) -> Option<Self> {
        let content = content.into();
        if content.trim().is_empty() { return None; }
        let content = truncate_chars(&content, MAX_CONTENT_CHARS).to_string();
        Some(Self { kind, content, relevance_score: clamp_score(relevance_score), metadata })
    }

    pub fn kind(&self) -> SourceType { self.kind }
    pub fn content(&self) -> &str { &self.content }
    pub fn relevance_score(&self) -> f32 { self.relevance_score }

    /// Clamps into `[0.0, 1.0]`; NaN becomes `0.0`.
    pub fn set_relevance_score(&mut self, score: f32) { self.relevance_score = clamp_score(score); }
}

fn clamp_score(score: f32) -> f32 {
    if score.is_nan() { 0.0 } else { score.clamp(0.0, 1.0) }
}

/// An entity node as returned by the graph backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEntity {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub properties: Metadata,
}

/// A typed edge between two entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphRelationship {
    pub id: String,
    #[serde(rename = "type")]
    pub rel_type: String,
    pub source_id: String,
    pub target_id: String,
    #[serde(default)]
    pub properties: Metadata,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphQueryResult {
    #[serde(default)]
    pub entities: Vec<GraphEntity>,
    #[serde(default)]
    pub relationships: Vec<GraphRelationship>,
}

/// A single similarity-search hit from the vector backend.
///
/// `similarity_score` is `1 - distance`; higher is better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorHit {
    pub id: String,
    pub document: String,
    #[serde(default)]
    pub metadata: Metadata,
    pub distance: f32,
    pub similarity_score: f32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorHealth {
    pub status: String,
    #[serde(default)]
    pub detail: Option<String>,
}

impl VectorHealth {
    pub const HEALTHY: &'static str = "healthy";

    pub fn healthy() -> Self { Self { status: Self::HEALTHY.to_string(), detail: None } }

    pub fn unhealthy(detail: impl Into<String>) -> Self {
        Self { status: "unhealthy".to_string(), detail: Some(detail.into()) }
    }

    pub fn is_healthy(&self) -> bool { self.status == Self::HEALTHY }
}
