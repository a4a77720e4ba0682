//! Shared error taxonomy for the core domain.

use thiserror::Error;

/// Errors raised by the item and collection stores.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("item {0} not found")]
    NotFound(String),
    #[error("item {0} already exists")]
    Duplicate(String),
    #[error("store backend unavailable: {0}")]
    Backend(#[from] anyhow::Error),
}

/// Errors raised by the progress registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("registry backend unavailable: {0}")]
    Backend(#[from] anyhow::Error),
}

/// Errors raised by the work queue.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("unknown queue: {0}")]
    UnknownQueue(String),
    #[error("queue backend unavailable: {0}")]
    Backend(#[from] anyhow::Error),
}

/// Classified provider errors driving the retry envelope's policy (§7).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("request to provider timed out")]
    Timeout,
    #[error("provider rate limit exceeded")]
    RateLimit,
    #[error("provider returned a server error: {0}")]
    ServerError(String),
    #[error("provider rejected the request: {0}")]
    ClientError(String),
    #[error("provider response could not be parsed: {0}")]
    ContentMalformed(String),
    #[error("provider does not implement this capability")]
    NotImplemented,
    #[error("unclassified provider failure: {0}")]
    Unknown(String),
}

impl ProviderError {
    /// Transient errors are worth retrying; permanent ones are not.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProviderError::Timeout | ProviderError::RateLimit | ProviderError::ServerError(_)
        )
    }
}
