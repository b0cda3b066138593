//! model.rs: core value types shared by every stage: spans, entities, clauses, levels.
//!
//! Everything here is plain data. Stages produce new values from the previous
//! stage's output; nothing is mutated after construction.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A contiguous region of the source document proposed as one clause candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub text: String,
    /// Byte offset of `text` in the original document (inclusive).
    pub start_offset: usize,
    /// Byte offset of the end of `text` (exclusive).
    pub end_offset: usize,
    /// Numbered-section marker (e.g. "4.2") when the span came from a numbered section.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_label: Option<String>,
}

/// Entity categories. Pattern extractors produce the first five;
/// an external NER capability may add the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityKind {
    Money,
    Date,
    Act,
    Section,
    Court,
    Party,
    Other,
}

impl EntityKind {
    /// Map a free-form label from an external NER model onto a kind.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_uppercase().as_str() {
            "MONEY" | "AMOUNT" | "CURRENCY" => EntityKind::Money,
            "DATE" | "TIME" => EntityKind::Date,
            "ACT" | "STATUTE" | "LAW" => EntityKind::Act,
            "SECTION" | "PROVISION" => EntityKind::Section,
            "COURT" => EntityKind::Court,
            "PARTY" | "PETITIONER" | "RESPONDENT" | "ORG" | "ORGANIZATION" | "PERSON" => {
                EntityKind::Party
            }
            _ => EntityKind::Other,
        }
    }
}

/// A typed entity found inside a span. Offsets are relative to the span's text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub text: String,
    #[serde(rename = "type")]
    pub kind: EntityKind,
    pub start: usize,
    pub end: usize,
    /// In [0,1].
    pub confidence: f32,
}

/// Per-clause risk level assigned by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// 0 indicator hits → Low, 1 → Medium, 2+ → High.
    pub fn from_indicator_hits(hits: usize) -> Self {
        match hits {
            0 => RiskLevel::Low,
            1 => RiskLevel::Medium,
            _ => RiskLevel::High,
        }
    }
}

/// Severity scale used by risk factors, the risk matrix and the overall band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Band for an overall score: >=70 Critical, >=50 High, >=30 Medium, else Low.
    pub fn from_score(score: f64) -> Self {
        if score >= 70.0 {
            Severity::Critical
        } else if score >= 50.0 {
            Severity::High
        } else if score >= 30.0 {
            Severity::Medium
        } else {
            Severity::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "Critical",
            Severity::High => "High",
            Severity::Medium => "Medium",
            Severity::Low => "Low",
        }
    }
}

impl From<RiskLevel> for Severity {
    fn from(level: RiskLevel) -> Self {
        match level {
            RiskLevel::Low => Severity::Low,
            RiskLevel::Medium => Severity::Medium,
            RiskLevel::High => Severity::High,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which path produced an externally-dependent sub-result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Method {
    Primary,
    Fallback,
}

/// Index of a clause within one document's clause list.
pub type ClauseId = usize;

/// A classified, entity-annotated span with an assigned risk level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clause {
    pub id: ClauseId,
    pub span: Span,
    #[serde(rename = "type")]
    pub clause_type: String,
    /// In [0,1].
    pub confidence: f32,
    #[serde(default)]
    pub entities: Vec<Entity>,
    pub risk_level: RiskLevel,
}

impl Clause {
    pub fn text(&self) -> &str {
        &self.span.text
    }

    /// First `max_chars` characters of the clause text, with an ellipsis when cut.
    pub fn excerpt(&self, max_chars: usize) -> String {
        excerpt(&self.span.text, max_chars)
    }
}

/// Char-boundary-safe truncation with a trailing "..." when the text was cut.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// Char-boundary-safe prefix without any marker (used for prompts and model inputs).
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_boundaries_are_exact() {
        assert_eq!(Severity::from_score(70.0), Severity::Critical);
        assert_eq!(Severity::from_score(69.9), Severity::High);
        assert_eq!(Severity::from_score(50.0), Severity::High);
        assert_eq!(Severity::from_score(49.9), Severity::Medium);
        assert_eq!(Severity::from_score(30.0), Severity::Medium);
        assert_eq!(Severity::from_score(29.9), Severity::Low);
        assert_eq!(Severity::from_score(0.0), Severity::Low);
        assert_eq!(Severity::from_score(100.0), Severity::Critical);
    }

    #[test]
    fn indicator_hits_map_to_levels() {
        assert_eq!(RiskLevel::from_indicator_hits(0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_indicator_hits(1), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_indicator_hits(2), RiskLevel::High);
        assert_eq!(RiskLevel::from_indicator_hits(7), RiskLevel::High);
    }

    #[test]
    fn excerpt_respects_char_boundaries() {
        assert_eq!(excerpt("₹₹₹₹", 2), "₹₹...");
        assert_eq!(excerpt("short", 10), "short");
        assert_eq!(truncate_chars("abcdef", 3), "abc");
    }

    #[test]
    fn external_labels_map_to_kinds() {
        assert_eq!(EntityKind::from_label("money"), EntityKind::Money);
        assert_eq!(EntityKind::from_label("PETITIONER"), EntityKind::Party);
        assert_eq!(EntityKind::from_label("WITNESS"), EntityKind::Other);
    }

    #[test]
    fn entity_kind_serializes_screaming() {
        let s = serde_json::to_string(&EntityKind::Money).unwrap();
        assert_eq!(s, "\"MONEY\"");
    }
}
