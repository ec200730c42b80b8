//! Configuration loader, typed retrieval settings and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars.
//! Nested keys are addressed with a double underscore in the environment,
//! e.g. `APP_RETRIEVAL__CACHE_TTL_SECS=60`.
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

pub struct Config {
    figment: Figment,
    dir: PathBuf,
}

impl Config {
    /// Load from `APP_CONFIG_DIR` (default: the working directory), picking the
    /// env from `RUST_ENV` (default `dev`).
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        let dir = env::var("APP_CONFIG_DIR").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from("."));
        Self::load_from(&dir, &env_name)
    }

    pub fn load_from(dir: &Path, env_name: &str) -> Result<Self> {
        let mut figment = Figment::new().merge(Toml::file(dir.join("config.toml")));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file(dir.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(dir.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(dir.join("config.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));
        Ok(Self { figment, dir: dir.to_path_buf() })
    }

    /// Relative paths resolve against the working directory.
    pub fn from_figment(figment: Figment) -> Self { Self { figment, dir: PathBuf::from(".") } }

    /// Directory the config files were read from.
    pub fn dir(&self) -> &Path { &self.dir }

    /// The path stored under `key` (or `default`), expanded and resolved
    /// against `dir()` when relative.
    pub fn path(&self, key: &str, default: &str) -> PathBuf {
        let raw = self.get::<String>(key).unwrap_or_else(|_| default.to_string());
        resolve_with_base(&self.dir, raw)
    }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::InvalidConfig(format!("Failed to get '{}': {}", key, e)))
    }

    /// The `[retrieval]` table, with defaults for anything not set. Validated.
    pub fn retrieval(&self) -> Result<RetrievalConfig> {
        let config = if self.figment.find_value("retrieval").is_ok() {
            self.get::<RetrievalConfig>("retrieval")?
        } else {
            RetrievalConfig::default()
        };
        config.validate()?;
        Ok(config)
    }
}

/// Tunables of the hybrid retrieval engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Over-fetch bound passed to the graph backend.
    pub max_graph_results: usize,
    /// Over-fetch bound passed to the vector backend.
    pub max_vector_results: usize,
    /// Vector hits below this similarity are discarded unless a request overrides it.
    pub similarity_threshold: f32,
    pub graph_weight: f32,
    pub vector_weight: f32,
    /// Graph entities scoring below this (before weighting) are discarded.
    pub min_graph_relevance: f32,
    pub cache_enabled: bool,
    pub cache_ttl_secs: u64,
    pub max_cache_size: usize,
    /// Bounds each backend's health check plus query.
    pub backend_timeout_ms: u64,
    pub ranking: RankingConfig,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            max_graph_results: 10,
            max_vector_results: 10,
            similarity_threshold: 0.7,
            graph_weight: 0.6,
            vector_weight: 0.4,
            min_graph_relevance: 0.1,
            cache_enabled: true,
            cache_ttl_secs: 300,
            max_cache_size: 1000,
            backend_timeout_ms: 5000,
            ranking: RankingConfig::default(),
        }
    }
}

impl RetrievalConfig {
    pub fn cache_ttl(&self) -> Duration { Duration::from_secs(self.cache_ttl_secs) }
    pub fn backend_timeout(&self) -> Duration { Duration::from_millis(self.backend_timeout_ms) }

    pub fn validate(&self) -> Result<()> {
        check_unit("similarity_threshold", self.similarity_threshold)?;
        check_unit("graph_weight", self.graph_weight)?;
        check_unit("vector_weight", self.vector_weight)?;
        check_unit("min_graph_relevance", self.min_graph_relevance)?;
        if self.max_cache_size == 0 {
            return Err(Error::InvalidConfig("max_cache_size must be at least 1".into()));
        }
        if self.backend_timeout_ms == 0 {
            return Err(Error::InvalidConfig("backend_timeout_ms must be positive".into()));
        }
        self.ranking.validate()
    }
}

/// Boost constants applied by the ranker on top of a converter's base score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    /// Scaled by the fraction of query keywords present in the content.
    pub keyword_boost: f32,
    pub preferred_min_chars: usize,
    pub preferred_max_chars: usize,
    pub preferred_length_boost: f32,
    pub acceptable_min_chars: usize,
    pub acceptable_max_chars: usize,
    pub acceptable_length_boost: f32,
    pub content_boost_cap: f32,
    pub graph_type_boost: f32,
    pub vector_type_boost: f32,
    pub type_boost_cap: f32,
    /// Metadata with more keys than this counts as rich.
    pub rich_metadata_keys: usize,
    pub metadata_marker_boost: f32,
    pub metadata_boost_cap: f32,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            keyword_boost: 0.1,
            preferred_min_chars: 100,
            preferred_max_chars: 500,
            preferred_length_boost: 0.05,
            acceptable_min_chars: 50,
            acceptable_max_chars: 1000,
            acceptable_length_boost: 0.02,
            content_boost_cap: 0.2,
            graph_type_boost: 0.05,
            vector_type_boost: 0.03,
            type_boost_cap: 0.1,
            rich_metadata_keys: 3,
            metadata_marker_boost: 0.02,
            metadata_boost_cap: 0.1,
        }
    }
}

impl RankingConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, v) in [
            ("keyword_boost", self.keyword_boost),
            ("preferred_length_boost", self.preferred_length_boost),
            ("acceptable_length_boost", self.acceptable_length_boost),
            ("content_boost_cap", self.content_boost_cap),
            ("graph_type_boost", self.graph_type_boost),
            ("vector_type_boost", self.vector_type_boost),
            ("type_boost_cap", self.type_boost_cap),
            ("metadata_marker_boost", self.metadata_marker_boost),
            ("metadata_boost_cap", self.metadata_boost_cap),
        ] {
            check_unit(name, v)?;
        }
        if self.preferred_min_chars > self.preferred_max_chars || self.acceptable_min_chars > self.acceptable_max_chars {
            return Err(Error::InvalidConfig("length band minimum exceeds its maximum".into()));
        }
        Ok(())
    }
}

fn check_unit(name: &str, v: f32) -> Result<()> {
    if (0.0..=1.0).contains(&v) { Ok(()) } else { Err(Error::InvalidConfig(format!("{} must be within [0, 1], got {}", name, v))) }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    // Expand env vars first
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
