// src/capability/mock.rs
//! Offline providers: disabled stand-ins and deterministic mocks for tests/local runs.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use super::{Embedder, TextGenerator};
use crate::error::ExternalError;

/// Dimension of `MockEmbedder` vectors.
pub const MOCK_EMBEDDING_DIM: usize = 64;

/// Returns `ExternalError::Disabled` always; used when generation is off.
pub struct DisabledGenerator;

#[async_trait]
impl TextGenerator for DisabledGenerator {
    async fn generate(&self, _prompt: &str, _max_tokens: u32) -> Result<String, ExternalError> {
        Err(ExternalError::Disabled)
    }
    fn name(&self) -> &'static str {
        "disabled"
    }
}

pub struct DisabledEmbedder;

#[async_trait]
impl Embedder for DisabledEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, ExternalError> {
        Err(ExternalError::Disabled)
    }
    fn name(&self) -> &'static str {
        "disabled"
    }
}

/// Deterministic generator.
///
/// With `fixed` set, every prompt gets that reply. Otherwise the reply depends on
/// what the prompt asks for: a fenced JSON gap report when it mentions
/// `missing_clauses`, a short medium-risk narrative otherwise.
#[derive(Debug, Clone, Default)]
pub struct MockGenerator {
    pub fixed: Option<String>,
}

impl MockGenerator {
    pub fn fixed(reply: impl Into<String>) -> Self {
        Self {
            fixed: Some(reply.into()),
        }
    }
}

const MOCK_GAP_REPLY: &str = r#"Here is the gap analysis:
```json
{
  "missing_clauses": [
    {
      "clause_type": "dispute_resolution",
      "importance": "High",
      "reason": "No mechanism for resolving disputes is defined (mock)",
      "legal_basis": "General contract practice"
    }
  ],
  "compliance_score": 70,
  "critical_gaps": ["Dispute resolution mechanism not specified (mock)"]
}
```"#;

const MOCK_NARRATIVE: &str = "Mock assessment: the agreement carries medium risk. \
Payment and termination terms are standard; review liability caps before signing.";

#[async_trait]
impl TextGenerator for MockGenerator {
    async fn generate(&self, prompt: &str, _max_tokens: u32) -> Result<String, ExternalError> {
        if let Some(reply) = &self.fixed {
            return Ok(reply.clone());
        }
        if prompt.contains("missing_clauses") {
            return Ok(MOCK_GAP_REPLY.to_string());
        }
        Ok(MOCK_NARRATIVE.to_string())
    }
    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Hashed bag-of-words embedding, L2-normalized. Identical texts map to identical
/// vectors; texts sharing vocabulary land close together.
pub struct MockEmbedder;

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ExternalError> {
        Ok(hashed_bag_of_words(text))
    }
    fn name(&self) -> &'static str {
        "mock"
    }
}

fn hashed_bag_of_words(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; MOCK_EMBEDDING_DIM];
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let digest = Sha256::digest(word.to_lowercase().as_bytes());
        let bucket = u16::from_be_bytes([digest[0], digest[1]]) as usize % MOCK_EMBEDDING_DIM;
        v[bucket] += 1.0;
    }
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter_mut().for_each(|x| *x /= norm);
    }
    v
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_generator_answers_by_prompt_kind() {
        let g = MockGenerator::default();
        let gap = g.generate("return JSON with missing_clauses", 100).await.unwrap();
        assert!(gap.contains("```json"));
        let narrative = g.generate("assess the risk", 100).await.unwrap();
        assert!(narrative.contains("medium risk"));

        let fixed = MockGenerator::fixed("overall risk: Low");
        assert_eq!(fixed.generate("x", 1).await.unwrap(), "overall risk: Low");
    }

    #[tokio::test]
    async fn mock_embedder_is_deterministic_and_normalized() {
        let a = MockEmbedder.embed("The Client shall pay").await.unwrap();
        let b = MockEmbedder.embed("the client SHALL pay").await.unwrap();
        assert_eq!(a, b);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);

        let empty = MockEmbedder.embed("").await.unwrap();
        assert!(empty.iter().all(|x| *x == 0.0));
    }
}
