use std::time::Duration;

use thiserror::Error;

use crate::types::SourceType;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid retrieval options: {0}")]
    InvalidOptions(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Why a single backend contributed nothing to a retrieval.
///
/// These never reach the caller of the engine; they are logged and
/// reported per backend alongside the (possibly empty) result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("{0} backend reported unhealthy")]
    Unhealthy(SourceType),

    #[error("{0} backend timed out after {1:?}")]
    Timeout(SourceType, Duration),

    #[error("{0} backend query failed: {1}")]
    Query(SourceType, String),
}

impl BackendError {
    pub fn backend(&self) -> SourceType {
        match self {
            Self::Unhealthy(b) | Self::Timeout(b, _) | Self::Query(b, _) => *b,
        }
    }
}
