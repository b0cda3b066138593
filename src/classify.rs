// src/classify.rs
//! Clause classifier: first-match-wins taxonomy scan plus indicator-based risk level.

use std::sync::Arc;

use crate::model::{Clause, ClauseId, Entity, RiskLevel, Span};
use crate::taxonomy::{Taxonomy, GENERAL};

#[derive(Debug, Clone)]
pub struct Classifier {
    taxonomy: Arc<Taxonomy>,
    default_confidence: f32,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(Arc::new(Taxonomy::builtin().clone()), 0.8)
    }
}

impl Classifier {
    pub fn new(taxonomy: Arc<Taxonomy>, default_confidence: f32) -> Self {
        Self {
            taxonomy,
            default_confidence: default_confidence.clamp(0.0, 1.0),
        }
    }

    /// The first taxonomy type (declared order) with any keyword in `text` wins;
    /// `"general"` when nothing matches. A later type with more hits never overrides.
    pub fn classify(&self, text: &str) -> (String, f32) {
        let lowered = text.to_lowercase();
        let label = self
            .taxonomy
            .types()
            .iter()
            .find(|t| t.matches(&lowered))
            .map(|t| t.name.clone())
            .unwrap_or_else(|| GENERAL.to_string());
        (label, self.default_confidence)
    }

    /// Count the type's risk indicators present in `text`: 0 → Low, 1 → Medium, 2+ → High.
    pub fn assess_risk(&self, clause_type: &str, text: &str) -> RiskLevel {
        let hits = self
            .taxonomy
            .get(clause_type)
            .map(|t| t.indicator_hits(&text.to_lowercase()))
            .unwrap_or(0);
        RiskLevel::from_indicator_hits(hits)
    }

    /// Classify `span` and attach `entities` into a finished clause.
    pub fn build_clause(&self, id: ClauseId, span: Span, entities: Vec<Entity>) -> Clause {
        let (clause_type, confidence) = self.classify(&span.text);
        let risk_level = self.assess_risk(&clause_type, &span.text);
        Clause {
            id,
            span,
            clause_type,
            confidence,
            entities,
            risk_level,
        }
    }
}
