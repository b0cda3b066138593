// src/risk.rs
//! Risk scorer: structural clause-type weights plus a narrative adjustment.
//!
//! base    = min(100, mean(weight) × 100/30), 0 for an empty clause set
//! adjust  = ordered keyword tiers over the narrative (+20 / +15 / +10 / +5 / 0), 0 with no clauses
//! overall = clamp(base + adjust, 0, 100), rounded to one decimal
//! band    = ≥70 Critical, ≥50 High, ≥30 Medium, else Low (on the rounded score)
//!
//! Factors, heatmap, matrix, recommendations and summary are pure derivations of
//! the same clause set.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::ScoringConfig;
use crate::model::{Clause, ClauseId, Method, RiskLevel, Severity};
use crate::taxonomy::{Taxonomy, MAX_WEIGHT};

/// Characters of clause text kept in `RiskFactor::clause_reference`.
const CLAUSE_REFERENCE_CHARS: usize = 200;

/// Narrative tiers, checked in order; the first tier with a hit decides.
const NARRATIVE_TIERS: [(f64, &[&str]); 4] = [
    (20.0, &["critical", "do not sign"]),
    (15.0, &["high risk"]),
    (10.0, &["medium risk", "moderate"]),
    (5.0, &["low risk"]),
];

/// "risk: low", "risk level - high", "Risk rating = moderate".
static LABELED_TIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"risk(?:\s+(?:level|rating))?\s*[:=\-]\s*(critical|high|medium|moderate|low)\b")
        .expect("labeled tier regex")
});

const STANDARD_RECOMMENDATIONS: [&str; 5] = [
    "Review all payment obligations, amounts and due dates",
    "Verify termination rights and notice periods for both parties",
    "Confirm the scope of indemnities and any limitation of liability",
    "Keep written records of every notice exchanged under the agreement",
    "Final validation by a legal professional is recommended",
];

/// Counts per severity. Used for the risk matrix and heatmap rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    #[serde(rename = "Critical")]
    pub critical: usize,
    #[serde(rename = "High")]
    pub high: usize,
    #[serde(rename = "Medium")]
    pub medium: usize,
    #[serde(rename = "Low")]
    pub low: usize,
}

impl SeverityCounts {
    pub fn add(&mut self, severity: Severity) {
        *self.slot(severity) += 1;
    }

    pub fn get(&self, severity: Severity) -> usize {
        match severity {
            Severity::Critical => self.critical,
            Severity::High => self.high,
            Severity::Medium => self.medium,
            Severity::Low => self.low,
        }
    }

    pub fn total(&self) -> usize {
        self.critical + self.high + self.medium + self.low
    }

    fn slot(&mut self, severity: Severity) -> &mut usize {
        match severity {
            Severity::Critical => &mut self.critical,
            Severity::High => &mut self.high,
            Severity::Medium => &mut self.medium,
            Severity::Low => &mut self.low,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFactor {
    pub category: String,
    pub severity: Severity,
    pub description: String,
    pub impact: String,
    pub mitigation: String,
    pub clause_reference: String,
    pub clause_id: ClauseId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatmapRow {
    pub category: String,
    pub severities: SeverityCounts,
    pub total: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringBreakdown {
    pub base_score: f64,
    pub narrative_adjustment: f64,
    pub clause_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub overall_score: f64,
    pub level: Severity,
    pub summary: String,
    pub risk_matrix: SeverityCounts,
    pub risk_factors: Vec<RiskFactor>,
    pub heatmap: Vec<HeatmapRow>,
    pub recommendations: Vec<String>,
    pub scoring: ScoringBreakdown,
    /// Fallback when the risk narrative feeding the adjustment was unavailable.
    pub method: Method,
}

#[derive(Debug, Clone)]
pub struct RiskScorer {
    taxonomy: Arc<Taxonomy>,
    max_risk_factors: usize,
    max_recommendations: usize,
}

impl Default for RiskScorer {
    fn default() -> Self {
        Self::new(Arc::new(Taxonomy::builtin().clone()), &ScoringConfig::default())
    }
}

impl RiskScorer {
    pub fn new(taxonomy: Arc<Taxonomy>, cfg: &ScoringConfig) -> Self {
        Self {
            taxonomy,
            max_risk_factors: cfg.max_risk_factors,
            max_recommendations: cfg.max_recommendations,
        }
    }

    /// Weight on the 0–30 scale: the type's own weight, else the risk-level weight.
    pub fn clause_weight(&self, clause_type: &str, level: RiskLevel) -> u32 {
        self.taxonomy
            .weight_for(clause_type)
            .unwrap_or_else(|| level_weight(level))
    }

    pub fn score(&self, clauses: &[Clause], narrative: &str) -> RiskAssessment {
        let base = self.base_score(clauses);
        // Nothing to assess: a narrative alone cannot raise the score.
        let adjustment = if clauses.is_empty() {
            0.0
        } else {
            narrative_adjustment(narrative)
        };
        let overall = round1((base + adjustment).clamp(0.0, 100.0));
        let level = Severity::from_score(overall);

        let mut risk_matrix = SeverityCounts::default();
        for c in clauses {
            risk_matrix.add(c.risk_level.into());
        }
        debug_assert_eq!(risk_matrix.total(), clauses.len(), "risk matrix must count every clause");

        let mut factors: Vec<RiskFactor> = clauses
            .iter()
            .filter(|c| c.risk_level >= RiskLevel::Medium)
            .map(|c| self.factor_for(c))
            .collect();
        // Stable: equal severities keep document order.
        factors.sort_by(|a, b| b.severity.cmp(&a.severity));
        let heatmap = build_heatmap(&factors);
        factors.truncate(self.max_risk_factors);

        let mut recommendations = recommendations_for(&risk_matrix);
        recommendations.truncate(self.max_recommendations);

        RiskAssessment {
            overall_score: overall,
            level,
            summary: summary_for(level, overall, &risk_matrix),
            risk_matrix,
            risk_factors: factors,
            heatmap,
            recommendations,
            scoring: ScoringBreakdown {
                base_score: round1(base),
                narrative_adjustment: adjustment,
                clause_count: clauses.len(),
            },
            method: Method::Primary,
        }
    }

    fn base_score(&self, clauses: &[Clause]) -> f64 {
        if clauses.is_empty() {
            return 0.0;
        }
        let total: u32 = clauses
            .iter()
            .map(|c| self.clause_weight(&c.clause_type, c.risk_level))
            .sum();
        let mean = f64::from(total) / clauses.len() as f64;
        (mean * 100.0 / f64::from(MAX_WEIGHT)).min(100.0)
    }

    fn factor_for(&self, clause: &Clause) -> RiskFactor {
        let words = clause.clause_type.replace('_', " ");
        let severity = Severity::from(clause.risk_level);
        let description = match self.taxonomy.description_for(&clause.clause_type) {
            Some(d) => format!("{} clause: {d}", title_case(&words)),
            None => format!("{} clause with risk indicators", title_case(&words)),
        };
        RiskFactor {
            category: title_case(&words),
            severity,
            description,
            impact: format!(
                "Contains {}-risk terms that may disadvantage the signing party",
                severity.as_str().to_lowercase()
            ),
            mitigation: format!("Consult legal counsel regarding this {words} clause"),
            clause_reference: clause.excerpt(CLAUSE_REFERENCE_CHARS),
            clause_id: clause.id,
        }
    }
}

/// Score with the built-in taxonomy and default limits.
pub fn score_risk(clauses: &[Clause], narrative: &str) -> RiskAssessment {
    RiskScorer::default().score(clauses, narrative)
}

pub fn level_weight(level: RiskLevel) -> u32 {
    match level {
        RiskLevel::High => 25,
        RiskLevel::Medium => 15,
        RiskLevel::Low => 5,
    }
}

/// Ordered keyword-tier scan of the lowercased narrative.
pub fn narrative_adjustment(narrative: &str) -> f64 {
    let lowered = narrative.to_lowercase();
    let labeled: Vec<&str> = LABELED_TIER
        .captures_iter(&lowered)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect();

    for (points, phrases) in NARRATIVE_TIERS {
        let phrase_hit = phrases.iter().any(|p| lowered.contains(p));
        let labeled_hit = labeled.iter().any(|l| tier_word_matches(l, phrases));
        if phrase_hit || labeled_hit {
            return points;
        }
    }
    0.0
}

/// "low" labels the "low risk" tier, "moderate" the "medium risk"/"moderate" tier, etc.
fn tier_word_matches(label: &str, phrases: &[&str]) -> bool {
    phrases
        .iter()
        .any(|p| *p == label || p.strip_suffix(" risk") == Some(label))
}

fn build_heatmap(factors: &[RiskFactor]) -> Vec<HeatmapRow> {
    let mut rows: Vec<HeatmapRow> = Vec::new();
    for f in factors {
        let idx = match rows.iter().position(|r| r.category == f.category) {
            Some(i) => i,
            None => {
                rows.push(HeatmapRow {
                    category: f.category.clone(),
                    severities: SeverityCounts::default(),
                    total: 0,
                });
                rows.len() - 1
            }
        };
        rows[idx].severities.add(f.severity);
        rows[idx].total += 1;
    }
    rows
}

fn recommendations_for(matrix: &SeverityCounts) -> Vec<String> {
    let mut out = Vec::new();
    if matrix.high > 0 {
        out.push(format!(
            "{} high-risk {} identified",
            matrix.high,
            plural(matrix.high, "clause", "clauses")
        ));
        out.push("Seek legal counsel before signing".to_string());
    }
    if matrix.medium > 2 {
        out.push(format!(
            "{} medium-risk clauses detected; negotiate terms",
            matrix.medium
        ));
    }
    out.extend(STANDARD_RECOMMENDATIONS.iter().map(|s| s.to_string()));
    out
}

fn summary_for(level: Severity, score: f64, matrix: &SeverityCounts) -> String {
    match level {
        Severity::Critical => format!(
            "CRITICAL RISK (Score: {score:.1}/100): {} high-risk clauses identified. Immediate legal review required.",
            matrix.high
        ),
        Severity::High => format!(
            "HIGH RISK (Score: {score:.1}/100): {} high-risk and {} medium-risk clauses found. Professional review strongly recommended.",
            matrix.high, matrix.medium
        ),
        Severity::Medium => format!(
            "MODERATE RISK (Score: {score:.1}/100): {} potentially concerning clauses detected. Review carefully before signing.",
            matrix.medium
        ),
        Severity::Low => format!(
            "LOW RISK (Score: {score:.1}/100): terms appear generally favorable. Review key obligations before proceeding."
        ),
    }
}

fn plural<'a>(n: usize, one: &'a str, many: &'a str) -> &'a str {
    if n == 1 {
        one
    } else {
        many
    }
}

fn title_case(words: &str) -> String {
    words
        .split_whitespace()
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}
