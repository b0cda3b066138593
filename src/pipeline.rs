// src/pipeline.rs
//! Analysis orchestrator.
//!
//! One document, start to finish, stages strictly in order:
//! 1) segment → classify + tag entities (NER merged when configured)
//! 2) document profile
//! 3) generator narratives (detailed analysis, risk narrative)
//! 4) risk scoring (structural weights + narrative adjustment)
//! 5) clause embeddings → similarity groups
//! 6) generator gap analysis (+ deterministic checklist)
//! 7) merge into `AnalysisReport`
//!
//! Every external call runs under its configured timeout. A failing collaborator only
//! degrades the sub-result it feeds, which is then tagged `Method::Fallback`.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, info_span, warn, Instrument};

use crate::capability::{
    build_embedder, build_generator, with_timeout, DynEmbedder, DynGenerator, DynNer,
};
use crate::classify::Classifier;
use crate::config::EngineConfig;
use crate::entities::{tag_patterns, EntityTagger};
use crate::error::ExternalError;
use crate::gaps::{self, GapAnalysis};
use crate::grouping::{SimilarityGroup, SimilarityGrouper};
use crate::metrics;
use crate::model::{truncate_chars, Clause, ClauseId, EntityKind, Method, RiskLevel, Severity};
use crate::profile::DocumentProfile;
use crate::prompts;
use crate::risk::{RiskAssessment, RiskScorer};
use crate::segment::Segmenter;
use crate::taxonomy::Taxonomy;

/// Characters of clause text kept in the categorized view.
const CATEGORIZED_EXCERPT_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorizedClause {
    pub clause_id: ClauseId,
    pub excerpt: String,
    pub risk_level: RiskLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrativeReport {
    pub detailed_analysis: Option<String>,
    pub risk_narrative: Option<String>,
    pub detailed_method: Method,
    /// Also stamped on `RiskAssessment::method`, since the adjustment reads this narrative.
    pub risk_method: Method,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityReport {
    pub groups: Vec<SimilarityGroup>,
    pub method: Method,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutiveSummary {
    pub document_type: String,
    pub total_clauses: usize,
    pub overall_score: f64,
    pub risk_level: Severity,
    pub headline: String,
    /// Stages that fell back to their default result.
    pub degraded_stages: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Short SHA-256 prefix of the document text.
    pub doc_id: String,
    pub clauses: Vec<Clause>,
    pub total_clauses: usize,
    pub categorized: BTreeMap<String, Vec<CategorizedClause>>,
    /// Unique entity texts per kind, sorted.
    pub entities: BTreeMap<EntityKind, Vec<String>>,
    pub profile: DocumentProfile,
    pub narratives: NarrativeReport,
    pub risk: RiskAssessment,
    pub similarity: SimilarityReport,
    pub gaps: GapAnalysis,
    pub summary: ExecutiveSummary,
    pub analyzed_at: DateTime<Utc>,
}

/// Owns every component; built once, shared (`Arc<Analyzer>`) across documents.
pub struct Analyzer {
    segmenter: Segmenter,
    classifier: Classifier,
    tagger: EntityTagger,
    scorer: RiskScorer,
    grouper: SimilarityGrouper,
    generator: DynGenerator,
    embedder: DynEmbedder,
    generator_timeout: Duration,
    embedder_timeout: Duration,
    embed_max_chars: usize,
}

impl Analyzer {
    /// Components and providers exactly as configured.
    pub fn from_config(cfg: &EngineConfig) -> Result<Self> {
        let generator = build_generator(&cfg.generator);
        let embedder = build_embedder(&cfg.embeddings);
        Self::with_capabilities(cfg, generator, embedder, None)
    }

    /// Same as `from_config` but with caller-supplied capabilities.
    pub fn with_capabilities(
        cfg: &EngineConfig,
        generator: DynGenerator,
        embedder: DynEmbedder,
        ner: Option<DynNer>,
    ) -> Result<Self> {
        let taxonomy = match &cfg.classifier.taxonomy_path {
            Some(path) => Arc::new(Taxonomy::load_from(path)?),
            None => Arc::new(Taxonomy::builtin().clone()),
        };
        Ok(Self {
            segmenter: Segmenter::new(&cfg.segmenter),
            classifier: Classifier::new(taxonomy.clone(), cfg.classifier.default_confidence),
            // NER shares the embeddings timeout.
            tagger: EntityTagger::new(ner, cfg.embeddings.timeout()),
            scorer: RiskScorer::new(taxonomy, &cfg.scoring),
            grouper: SimilarityGrouper::new(&cfg.grouping),
            generator,
            embedder,
            generator_timeout: cfg.generator.timeout(),
            embedder_timeout: cfg.embeddings.timeout(),
            embed_max_chars: cfg.embeddings.max_input_chars,
        })
    }

    /// Segment, classify and pattern-tag. No external calls.
    pub fn segment_and_classify(&self, text: &str) -> Vec<Clause> {
        self.segmenter
            .segment(text)
            .into_iter()
            .enumerate()
            .map(|(id, span)| {
                let entities = tag_patterns(&span.text);
                self.classifier.build_clause(id, span, entities)
            })
            .collect()
    }

    /// As `segment_and_classify`, with NER entities merged when a capability is set.
    pub async fn extract_clauses(&self, text: &str) -> Vec<Clause> {
        if !self.tagger.has_ner() {
            return self.segment_and_classify(text);
        }
        let mut clauses = Vec::new();
        for (id, span) in self.segmenter.segment(text).into_iter().enumerate() {
            let entities = self.tagger.tag(&span.text).await;
            clauses.push(self.classifier.build_clause(id, span, entities));
        }
        clauses
    }

    pub async fn analyze(&self, text: &str) -> AnalysisReport {
        let doc_id = doc_id(text);
        let span = info_span!("analyze", doc_id = %doc_id);
        self.analyze_inner(text, doc_id).instrument(span).await
    }

    async fn analyze_inner(&self, text: &str, doc_id: String) -> AnalysisReport {
        info!(chars = text.chars().count(), "analysis started");
        let mut degraded: Vec<String> = Vec::new();

        let clauses = self.extract_clauses(text).await;
        info!(clauses = clauses.len(), "clauses extracted");

        let profile = DocumentProfile::build(text, &clauses);
        debug!(document_type = %profile.document_type, "document profiled");

        let narratives = self.narratives(text, &profile, &clauses).await;
        if narratives.detailed_method == Method::Fallback {
            degraded.push("detailed_analysis".to_string());
        }
        if narratives.risk_method == Method::Fallback {
            degraded.push("risk_narrative".to_string());
        }

        let mut risk = self.scorer.score(
            &clauses,
            narratives.risk_narrative.as_deref().unwrap_or(""),
        );
        risk.method = narratives.risk_method;
        info!(
            score = risk.overall_score,
            band = %risk.level,
            adjustment = risk.scoring.narrative_adjustment,
            "risk scored"
        );

        let similarity = self.similarity(&clauses).await;
        if similarity.method == Method::Fallback {
            degraded.push("similarity".to_string());
        }

        let gaps = self.gap_analysis(text, &profile, &clauses).await;
        if gaps.method == Method::Fallback {
            degraded.push("gaps".to_string());
        }

        metrics::record_document(clauses.len(), risk.overall_score);
        info!(degraded = ?degraded, "analysis finished");

        let summary = ExecutiveSummary {
            document_type: profile.display_type(),
            total_clauses: clauses.len(),
            overall_score: risk.overall_score,
            risk_level: risk.level,
            headline: risk.summary.clone(),
            degraded_stages: degraded,
        };

        AnalysisReport {
            doc_id,
            categorized: categorize(&clauses),
            entities: entity_index(&clauses),
            total_clauses: clauses.len(),
            clauses,
            profile,
            narratives,
            risk,
            similarity,
            gaps,
            summary,
            analyzed_at: Utc::now(),
        }
    }

    async fn generate(&self, stage: &'static str, prompt: &str, max_tokens: u32) -> Option<String> {
        match with_timeout(self.generator_timeout, self.generator.generate(prompt, max_tokens)).await {
            Ok(text) if !text.trim().is_empty() => Some(text),
            Ok(_) => {
                fallback(stage, &ExternalError::EmptyResponse);
                None
            }
            Err(e) => {
                fallback(stage, &e);
                None
            }
        }
    }

    async fn narratives(
        &self,
        text: &str,
        profile: &DocumentProfile,
        clauses: &[Clause],
    ) -> NarrativeReport {
        let detailed = self
            .generate(
                "detailed_analysis",
                &prompts::detailed_analysis(&profile.document_type, clauses),
                prompts::DETAILED_ANALYSIS_TOKENS,
            )
            .await;
        let risk = self
            .generate(
                "risk_narrative",
                &prompts::risk_narrative(text),
                prompts::RISK_NARRATIVE_TOKENS,
            )
            .await;
        NarrativeReport {
            detailed_method: method_for(&detailed),
            risk_method: method_for(&risk),
            detailed_analysis: detailed,
            risk_narrative: risk,
        }
    }

    async fn similarity(&self, clauses: &[Clause]) -> SimilarityReport {
        let mut embeddings: BTreeMap<ClauseId, Vec<f32>> = BTreeMap::new();
        for c in clauses {
            let input = truncate_chars(c.text(), self.embed_max_chars);
            match with_timeout(self.embedder_timeout, self.embedder.embed(input)).await {
                Ok(v) => {
                    embeddings.insert(c.id, v);
                }
                Err(e) => {
                    fallback("embeddings", &e);
                    return SimilarityReport {
                        groups: Vec::new(),
                        method: Method::Fallback,
                    };
                }
            }
        }
        let groups = self.grouper.group(&embeddings);
        debug!(groups = groups.len(), "similarity groups built");
        SimilarityReport {
            groups,
            method: Method::Primary,
        }
    }

    async fn gap_analysis(
        &self,
        text: &str,
        profile: &DocumentProfile,
        clauses: &[Clause],
    ) -> GapAnalysis {
        let checklist = gaps::checklist(&profile.document_type, clauses);
        let found: BTreeSet<&str> = clauses.iter().map(|c| c.clause_type.as_str()).collect();
        let found: Vec<&str> = found.into_iter().collect();
        let prompt = prompts::gap_analysis(&profile.document_type, &found, text);

        let Some(raw) = self
            .generate("gap_analysis", &prompt, prompts::GAP_ANALYSIS_TOKENS)
            .await
        else {
            return GapAnalysis::fallback(checklist);
        };

        match GapAnalysis::from_response(&raw, checklist.clone()) {
            Some(g) => g,
            None => {
                fallback(
                    "gap_analysis",
                    &ExternalError::Malformed("no JSON object in reply".to_string()),
                );
                GapAnalysis::fallback(checklist)
            }
        }
    }
}

/// Segment, classify and pattern-tag with the built-in taxonomy and default limits.
pub fn segment_and_classify(document_text: &str) -> Vec<Clause> {
    let cfg = EngineConfig::default();
    let taxonomy = Arc::new(Taxonomy::builtin().clone());
    let segmenter = Segmenter::new(&cfg.segmenter);
    let classifier = Classifier::new(taxonomy, cfg.classifier.default_confidence);
    segmenter
        .segment(document_text)
        .into_iter()
        .enumerate()
        .map(|(id, span)| {
            let entities = tag_patterns(&span.text);
            classifier.build_clause(id, span, entities)
        })
        .collect()
}

fn method_for<T>(result: &Option<T>) -> Method {
    if result.is_some() {
        Method::Primary
    } else {
        Method::Fallback
    }
}

fn fallback(stage: &'static str, err: &ExternalError) {
    warn!(stage, error = %err, kind = err.kind(), "external call failed; using fallback");
    metrics::record_fallback(stage);
}

/// First 12 hex chars of SHA-256(text).
pub fn doc_id(text: &str) -> String {
    Sha256::digest(text.as_bytes())
        .iter()
        .take(6)
        .map(|b| format!("{b:02x}"))
        .collect()
}

fn categorize(clauses: &[Clause]) -> BTreeMap<String, Vec<CategorizedClause>> {
    let mut out: BTreeMap<String, Vec<CategorizedClause>> = BTreeMap::new();
    for c in clauses {
        out.entry(c.clause_type.clone())
            .or_default()
            .push(CategorizedClause {
                clause_id: c.id,
                excerpt: c.excerpt(CATEGORIZED_EXCERPT_CHARS),
                risk_level: c.risk_level,
            });
    }
    out
}

fn entity_index(clauses: &[Clause]) -> BTreeMap<EntityKind, Vec<String>> {
    let mut sets: BTreeMap<EntityKind, BTreeSet<String>> = BTreeMap::new();
    for e in clauses.iter().flat_map(|c| c.entities.iter()) {
        sets.entry(e.kind).or_default().insert(e.text.clone());
    }
    sets.into_iter()
        .map(|(k, v)| (k, v.into_iter().collect()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doc_id_is_short_and_stable() {
        let a = doc_id("some contract");
        assert_eq!(a.len(), 12);
        assert_eq!(a, doc_id("some contract"));
        assert_ne!(a, doc_id("another contract"));
    }

    #[test]
    fn free_function_matches_default_analyzer() {
        let doc = "1. The Client shall pay $2,000 per month to the Provider.\n\
                   2. Either party may terminate this agreement with 30 days written notice.";
        let clauses = segment_and_classify(doc);
        assert_eq!(clauses.len(), 2);
        assert_eq!(clauses[0].clause_type, "payment");
        assert_eq!(clauses[1].clause_type, "termination");
        assert_eq!(clauses[1].id, 1);
    }

    #[test]
    fn entity_index_dedups_and_sorts() {
        let doc = "1. Pay $10 now and $10 later, then $5 at the end of term.\n\
                   2. A further $5 is payable upon renewal of this agreement.";
        let clauses = segment_and_classify(doc);
        let idx = entity_index(&clauses);
        assert_eq!(idx[&EntityKind::Money], vec!["$10".to_string(), "$5".to_string()]);
    }

    #[test]
    fn categorized_groups_by_type() {
        let doc = "1. The Client shall pay the fee monthly in advance.\n\
                   2. The Client shall pay interest on overdue amounts.\n\
                   3. These headings are for convenience only and carry no meaning.";
        let clauses = segment_and_classify(doc);
        let cat = categorize(&clauses);
        assert_eq!(cat["payment"].len(), 2);
        assert_eq!(cat["general"][0].clause_id, 2);
    }
}
