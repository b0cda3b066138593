// src/error.rs
//! Failure taxonomy for the external capabilities (text generation, embeddings, NER).
//!
//! These errors never escape the orchestrator: every call site turns them into a
//! documented default and tags the sub-result with `Method::Fallback`.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExternalError {
    /// Capability switched off in config (or no provider configured).
    #[error("capability disabled")]
    Disabled,

    #[error("call timed out after {0:?}")]
    Timeout(Duration),

    /// Transport-level failure (connect, TLS, body decode).
    #[error("http error: {0}")]
    Http(String),

    #[error("provider returned status {0}")]
    Status(u16),

    #[error("provider returned an empty response")]
    EmptyResponse,

    /// Response arrived but could not be turned into the expected shape.
    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("daily call limit reached")]
    LimitReached,
}

impl From<reqwest::Error> for ExternalError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return ExternalError::Http(format!("timeout: {err}"));
        }
        ExternalError::Http(err.to_string())
    }
}

impl ExternalError {
    /// Short stable label for logs and metric tags.
    pub fn kind(&self) -> &'static str {
        match self {
            ExternalError::Disabled => "disabled",
            ExternalError::Timeout(_) => "timeout",
            ExternalError::Http(_) => "http",
            ExternalError::Status(_) => "status",
            ExternalError::EmptyResponse => "empty",
            ExternalError::Malformed(_) => "malformed",
            ExternalError::LimitReached => "limit",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_stable() {
        assert_eq!(ExternalError::Disabled.kind(), "disabled");
        assert_eq!(ExternalError::Timeout(Duration::from_secs(1)).kind(), "timeout");
        assert_eq!(ExternalError::Status(503).to_string(), "provider returned status 503");
    }
}
