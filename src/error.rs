//! Error types for ownership resolution
//!
//! Only `ResolveError::InvalidQuery` ever reaches a caller of
//! `resolve_ownership`. `ProviderError` stays inside the engine: the walker
//! and aggregator degrade it to an empty contribution.

use thiserror::Error;

/// Caller-visible errors
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Invalid query: {reason}")]
    InvalidQuery { reason: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ResolveError {
    pub fn invalid_query(reason: impl Into<String>) -> Self {
        Self::InvalidQuery {
            reason: reason.into(),
        }
    }
}

/// Failure of a single provider call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Provider '{provider}' unavailable: {message}")]
    Unavailable { provider: String, message: String },

    #[error("Provider '{provider}' timed out")]
    Timeout { provider: String },

    #[error("Provider '{provider}' returned malformed data: {message}")]
    Malformed { provider: String, message: String },
}

impl ProviderError {
    /// Wrap a transport-level failure, keeping the full context chain
    pub fn unavailable(provider: &str, err: anyhow::Error) -> Self {
        Self::Unavailable {
            provider: provider.to_string(),
            message: format!("{:#}", err),
        }
    }

    pub fn malformed(provider: &str, message: impl Into<String>) -> Self {
        Self::Malformed {
            provider: provider.to_string(),
            message: message.into(),
        }
    }

    pub fn timeout(provider: &str) -> Self {
        Self::Timeout {
            provider: provider.to_string(),
        }
    }

    pub fn provider(&self) -> &str {
        match self {
            Self::Unavailable { provider, .. }
            | Self::Timeout { provider }
            | Self::Malformed { provider, .. } => provider,
        }
    }
}

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;
