use serde::{Serialize, Serializer};
use std::fmt;

/// Probe result for a single backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendStatus {
    Healthy,
    Unhealthy,
    Error(String),
    NotConfigured,
}

impl fmt::Display for BackendStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Healthy => f.write_str("healthy"),
            Self::Unhealthy => f.write_str("unhealthy"),
            Self::Error(msg) => write!(f, "error: {}", msg),
            Self::NotConfigured => f.write_str("not_configured"),
        }
    }
}

impl Serialize for BackendStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> { serializer.collect_str(self) }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub service: String,
    pub cache_enabled: bool,
    pub cache_size: usize,
    pub graph: BackendStatus,
    pub vector: BackendStatus,
}
