// src/capability/mod.rs
//! External capabilities consumed by the engine: text generation, embeddings, NER.
//!
//! Providers:
//! - `ChatCompletionsGenerator` / `HttpEmbedder`: OpenAI-compatible HTTP APIs
//! - `MockGenerator` / `MockEmbedder`: deterministic offline stand-ins (`AI_TEST_MODE=mock`)
//! - `DisabledGenerator` / `DisabledEmbedder`: always `ExternalError::Disabled`
//! - `CachingGenerator<G>`: file cache + daily call limit around any generator
//!
//! The factories below pick one from config and never fail: a misconfigured
//! provider degrades to the disabled variant (logged), so analysis still runs.

mod cache;
mod mock;
mod openai;

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::{mock_mode, EmbeddingsConfig, GeneratorConfig};
use crate::error::ExternalError;

pub use cache::CachingGenerator;
pub use mock::{DisabledEmbedder, DisabledGenerator, MockEmbedder, MockGenerator, MOCK_EMBEDDING_DIM};
pub use openai::{ChatCompletionsGenerator, HttpEmbedder, LEGAL_SYSTEM_PROMPT};

#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Free-form completion for `prompt`, bounded by `max_tokens`.
    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String, ExternalError>;
    /// Provider name for diagnostics.
    fn name(&self) -> &'static str;
}

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Fixed-dimension vector for `text` (callers truncate the input).
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ExternalError>;
    fn name(&self) -> &'static str;
}

/// An entity as reported by an external NER model.
/// Offsets are byte offsets into the text that was sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalEntity {
    pub text: String,
    pub label: String,
    pub start: usize,
    pub end: usize,
    pub confidence: f32,
}

#[async_trait]
pub trait NerCapability: Send + Sync {
    async fn extract(&self, text: &str) -> Result<Vec<ExternalEntity>, ExternalError>;
}

pub type DynGenerator = Arc<dyn TextGenerator>;
pub type DynEmbedder = Arc<dyn Embedder>;
pub type DynNer = Arc<dyn NerCapability>;

/// Await `fut` for at most `limit`; running out of time is `ExternalError::Timeout(limit)`.
pub async fn with_timeout<T, F>(limit: Duration, fut: F) -> Result<T, ExternalError>
where
    F: Future<Output = Result<T, ExternalError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(ExternalError::Timeout(limit)),
    }
}

/// Build the text generator described by `cfg`.
///
/// * `AI_TEST_MODE=mock` or provider "mock" → uncached mock generator (offline, deterministic)
/// * `enabled == false` → disabled
/// * otherwise the HTTP provider, wrapped with cache + daily limit when `cache_enabled`
pub fn build_generator(cfg: &GeneratorConfig) -> DynGenerator {
    if mock_mode() || cfg.provider == "mock" {
        info!(provider = "mock", "text generator in mock mode");
        return Arc::new(MockGenerator::default());
    }
    if !cfg.enabled {
        info!("text generator disabled");
        return Arc::new(DisabledGenerator);
    }

    let Some(api_key) = cfg.resolved_api_key() else {
        warn!(provider = %cfg.provider, "no API key for text generator; disabling");
        return Arc::new(DisabledGenerator);
    };

    let http = match ChatCompletionsGenerator::new(cfg.base_url(), cfg.model(), api_key, cfg.timeout()) {
        Ok(g) => g,
        Err(e) => {
            warn!(error = %e, "failed to build HTTP client; disabling text generator");
            return Arc::new(DisabledGenerator);
        }
    };
    info!(provider = %cfg.provider, model = %cfg.model(), "text generator enabled");

    if cfg.cache_enabled {
        Arc::new(CachingGenerator::new(
            http,
            PathBuf::from(&cfg.cache_dir),
            cfg.daily_limit,
        ))
    } else {
        Arc::new(http)
    }
}

/// Build the embedder described by `cfg` (same selection rules as the generator).
pub fn build_embedder(cfg: &EmbeddingsConfig) -> DynEmbedder {
    if mock_mode() {
        info!(provider = "mock", "embedder in mock mode");
        return Arc::new(MockEmbedder);
    }
    if !cfg.enabled {
        info!("embedder disabled");
        return Arc::new(DisabledEmbedder);
    }
    let Some(api_key) = cfg.resolved_api_key() else {
        warn!("no API key for embedder; disabling");
        return Arc::new(DisabledEmbedder);
    };
    match HttpEmbedder::new(cfg.base_url(), cfg.model(), api_key, cfg.timeout()) {
        Ok(e) => {
            info!(model = %cfg.model(), "embedder enabled");
            Arc::new(e)
        }
        Err(e) => {
            warn!(error = %e, "failed to build HTTP client; disabling embedder");
            Arc::new(DisabledEmbedder)
        }
    }
}
