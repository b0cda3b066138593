// src/config/capability.rs
//! Settings for the two remote capabilities: text generation and embeddings.

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

fn default_timeout_ms() -> u64 {
    30_000
}
fn default_daily_limit() -> u32 {
    200
}
fn default_env_key() -> String {
    "ENV".to_string()
}
fn default_generator_cache_dir() -> String {
    "cache/generator".to_string()
}
fn default_max_input_chars() -> usize {
    512
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    pub enabled: bool,
    /// "groq" | "openai" | "mock" (case-insensitive)
    pub provider: String,
    /// OpenAI-compatible API root; provider default when absent.
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    /// "ENV" means: read from GENERATOR_API_KEY, then the provider's own variable.
    #[serde(default = "default_env_key")]
    pub api_key: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_daily_limit")]
    pub daily_limit: u32,
    #[serde(default = "default_true")]
    pub cache_enabled: bool,
    #[serde(default = "default_generator_cache_dir")]
    pub cache_dir: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: "groq".to_string(),
            base_url: None,
            model: None,
            api_key: default_env_key(),
            timeout_ms: default_timeout_ms(),
            daily_limit: default_daily_limit(),
            cache_enabled: true,
            cache_dir: default_generator_cache_dir(),
        }
    }
}

impl GeneratorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn base_url(&self) -> String {
        if let Some(url) = &self.base_url {
            return url.trim_end_matches('/').to_string();
        }
        match self.provider.as_str() {
            "openai" => "https://api.openai.com/v1".to_string(),
            _ => "https://api.groq.com/openai/v1".to_string(),
        }
    }

    pub fn model(&self) -> String {
        if let Some(m) = &self.model {
            return m.clone();
        }
        match self.provider.as_str() {
            "openai" => "gpt-4o-mini".to_string(),
            _ => "llama-3.3-70b-versatile".to_string(),
        }
    }

    /// Resolve the API key. `None` when the key is "ENV" and no variable is set.
    pub fn resolved_api_key(&self) -> Option<String> {
        if !self.api_key.trim().eq_ignore_ascii_case("env") {
            return non_empty(self.api_key.clone());
        }
        let provider_var = match self.provider.as_str() {
            "openai" => "OPENAI_API_KEY",
            _ => "GROQ_API_KEY",
        };
        env::var("GENERATOR_API_KEY")
            .ok()
            .and_then(non_empty)
            .or_else(|| env::var(provider_var).ok().and_then(non_empty))
    }

    pub(crate) fn sanitize(&mut self) {
        self.provider = self.provider.trim().to_lowercase();
        if self.timeout_ms == 0 {
            self.timeout_ms = default_timeout_ms();
        }
        if self.cache_dir.trim().is_empty() {
            self.cache_dir = default_generator_cache_dir();
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingsConfig {
    pub enabled: bool,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    /// "ENV" means: read from EMBEDDINGS_API_KEY, then OPENAI_API_KEY.
    #[serde(default = "default_env_key")]
    pub api_key: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Clause text is cut to this many characters before embedding.
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: None,
            model: None,
            api_key: default_env_key(),
            timeout_ms: default_timeout_ms(),
            max_input_chars: default_max_input_chars(),
        }
    }
}

impl EmbeddingsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn base_url(&self) -> String {
        self.base_url
            .as_deref()
            .unwrap_or("https://api.openai.com/v1")
            .trim_end_matches('/')
            .to_string()
    }

    pub fn model(&self) -> String {
        self.model
            .clone()
            .unwrap_or_else(|| "text-embedding-3-small".to_string())
    }

    pub fn resolved_api_key(&self) -> Option<String> {
        if !self.api_key.trim().eq_ignore_ascii_case("env") {
            return non_empty(self.api_key.clone());
        }
        env::var("EMBEDDINGS_API_KEY")
            .ok()
            .and_then(non_empty)
            .or_else(|| env::var("OPENAI_API_KEY").ok().and_then(non_empty))
    }

    pub(crate) fn sanitize(&mut self) {
        if self.timeout_ms == 0 {
            self.timeout_ms = default_timeout_ms();
        }
        if self.max_input_chars == 0 {
            self.max_input_chars = default_max_input_chars();
        }
    }
}

fn non_empty(s: String) -> Option<String> {
    let t = s.trim();
    if t.is_empty() {
        None
    } else {
        Some(t.to_string())
    }
}
