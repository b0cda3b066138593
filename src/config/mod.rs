// src/config/mod.rs
//! Engine configuration loaded from TOML with env overrides.
//!
//! Resolution:
//! 1) `$ENGINE_CONFIG_PATH` (must exist)
//! 2) `config/engine.toml` (optional; built-in defaults when missing)
//!
//! Env overrides applied after parsing:
//! - `AI_TEST_MODE=mock`     → generator + embeddings use offline mock providers
//! - `GENERATOR_ENABLED=0|1` → toggle text generation
//! - `EMBEDDINGS_ENABLED=0|1`→ toggle embeddings

pub mod capability;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub use capability::{EmbeddingsConfig, GeneratorConfig};

pub const DEFAULT_ENGINE_CONFIG_PATH: &str = "config/engine.toml";
pub const ENV_ENGINE_CONFIG_PATH: &str = "ENGINE_CONFIG_PATH";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub segmenter: SegmenterConfig,
    pub classifier: ClassifierConfig,
    pub scoring: ScoringConfig,
    pub grouping: GroupingConfig,
    pub generator: GeneratorConfig,
    pub embeddings: EmbeddingsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmenterConfig {
    pub max_spans: usize,
    pub min_clause_chars: usize,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            max_spans: 50,
            min_clause_chars: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub default_confidence: f32,
    /// Replace the embedded taxonomy with this TOML file.
    pub taxonomy_path: Option<PathBuf>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            default_confidence: 0.8,
            taxonomy_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub max_risk_factors: usize,
    pub max_recommendations: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            max_risk_factors: 15,
            max_recommendations: 8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupingConfig {
    /// Upper bound on cluster count (effective bound is `min(max_clusters, n)`).
    pub max_clusters: usize,
    /// Cosine distance under which the closest clusters keep merging.
    pub merge_distance: f32,
}

impl Default for GroupingConfig {
    fn default() -> Self {
        Self {
            max_clusters: 5,
            merge_distance: 0.25,
        }
    }
}

impl EngineConfig {
    /// Load using env var + default path (see module docs).
    pub fn load() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_ENGINE_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!(
                    "{ENV_ENGINE_CONFIG_PATH} points to non-existent path {}",
                    pb.display()
                ));
            }
            return Self::load_from(&pb);
        }
        let default_path = PathBuf::from(DEFAULT_ENGINE_CONFIG_PATH);
        if default_path.exists() {
            return Self::load_from(&default_path);
        }
        let mut cfg = Self::default();
        cfg.finish();
        Ok(cfg)
    }

    /// Load from an explicit path (must exist).
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading engine config from {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("parsing engine config {}", path.display()))
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut cfg: EngineConfig = toml::from_str(s)?;
        cfg.finish();
        Ok(cfg)
    }

    fn finish(&mut self) {
        self.sanitize();
        self.apply_env_overrides();
    }

    /// Replace out-of-range values with defaults.
    fn sanitize(&mut self) {
        let d = SegmenterConfig::default();
        if self.segmenter.max_spans == 0 {
            self.segmenter.max_spans = d.max_spans;
        }
        if self.segmenter.min_clause_chars == 0 {
            self.segmenter.min_clause_chars = 1;
        }

        if !(0.0..=1.0).contains(&self.classifier.default_confidence) {
            self.classifier.default_confidence = ClassifierConfig::default().default_confidence;
        }

        let s = ScoringConfig::default();
        if self.scoring.max_risk_factors == 0 {
            self.scoring.max_risk_factors = s.max_risk_factors;
        }
        if self.scoring.max_recommendations == 0 {
            self.scoring.max_recommendations = s.max_recommendations;
        }

        let g = GroupingConfig::default();
        if self.grouping.max_clusters == 0 {
            self.grouping.max_clusters = g.max_clusters;
        }
        if !self.grouping.merge_distance.is_finite()
            || !(0.0..=2.0).contains(&self.grouping.merge_distance)
        {
            self.grouping.merge_distance = g.merge_distance;
        }

        self.generator.sanitize();
        self.embeddings.sanitize();
    }

    fn apply_env_overrides(&mut self) {
        if let Some(on) = parse_bool_env("GENERATOR_ENABLED") {
            self.generator.enabled = on;
        }
        if let Some(on) = parse_bool_env("EMBEDDINGS_ENABLED") {
            self.embeddings.enabled = on;
        }
    }
}

/// True when `AI_TEST_MODE=mock` (deterministic offline providers).
pub fn mock_mode() -> bool {
    std::env::var("AI_TEST_MODE")
        .map(|v| v.trim().eq_ignore_ascii_case("mock"))
        .unwrap_or(false)
}

fn parse_bool_env(key: &str) -> Option<bool> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let cfg = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(cfg.segmenter.max_spans, 50);
        assert_eq!(cfg.segmenter.min_clause_chars, 20);
        assert_eq!(cfg.scoring.max_risk_factors, 15);
        assert_eq!(cfg.grouping.max_clusters, 5);
        assert!((cfg.classifier.default_confidence - 0.8).abs() < f32::EPSILON);
    }

    #[test]
    fn out_of_range_values_are_sanitized() {
        let cfg = EngineConfig::from_toml_str(
            r#"
            [segmenter]
            max_spans = 0
            [classifier]
            default_confidence = 3.5
            [grouping]
            merge_distance = -1.0
            "#,
        )
        .unwrap();
        assert_eq!(cfg.segmenter.max_spans, 50);
        assert!((cfg.classifier.default_confidence - 0.8).abs() < f32::EPSILON);
        assert!((cfg.grouping.merge_distance - 0.25).abs() < f32::EPSILON);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = EngineConfig::from_toml_str(
            r#"
            [generator]
            enabled = true
            provider = "OPENAI"
            timeout_ms = 5000
            "#,
        )
        .unwrap();
        assert_eq!(cfg.generator.provider, "openai");
        assert_eq!(cfg.generator.timeout_ms, 5000);
        assert_eq!(cfg.generator.daily_limit, 200);
        assert_eq!(cfg.segmenter.max_spans, 50);
    }

    #[test]
    fn invalid_toml_is_an_error() {
        assert!(EngineConfig::from_toml_str("[segmenter\nmax_spans = ").is_err());
    }
}
