// src/entities.rs
//! Entity tagging for clause text.
//!
//! Pattern extractors run in a fixed order (MONEY, DATE, ACT, SECTION, COURT), each
//! independently over the full span text, so overlapping matches of different kinds
//! are all kept. An optional external NER capability merges in more entities; its
//! failures are logged and swallowed.

use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::capability::{with_timeout, DynNer, ExternalEntity};
use crate::model::{truncate_chars, Entity, EntityKind};

/// Confidence attached to every pattern-derived entity.
pub const PATTERN_CONFIDENCE: f32 = 0.9;

/// NER input is cut to this many characters.
pub const NER_INPUT_CHARS: usize = 2000;

const MONTHS: &str = "January|February|March|April|May|June|July|August|September|October|November|December|Jan|Feb|Mar|Apr|Jun|Jul|Aug|Sept|Sep|Oct|Nov|Dec";

struct Extractor {
    kind: EntityKind,
    patterns: Vec<Regex>,
}

fn compile(kind: EntityKind, patterns: &[&str]) -> Extractor {
    Extractor {
        kind,
        patterns: patterns
            .iter()
            .map(|p| Regex::new(p).expect("valid entity pattern"))
            .collect(),
    }
}

static EXTRACTORS: Lazy<Vec<Extractor>> = Lazy::new(|| {
    vec![
        compile(
            EntityKind::Money,
            &[
                r"(?:₹|\$|€|£)\s*\d+(?:,\d+)*(?:\.\d+)?",
                r"\b(?:INR|USD|EUR|GBP|Rs\.?)\s*\d+(?:,\d+)*(?:\.\d+)?",
            ],
        ),
        compile(
            EntityKind::Date,
            &[
                r"\b\d{1,2}[/-]\d{1,2}[/-]\d{2,4}\b",
                r"\b\d{4}-\d{2}-\d{2}\b",
                &format!(r"(?i)\b\d{{1,2}}(?:st|nd|rd|th)?\s+(?:{MONTHS})\.?,?\s+\d{{4}}\b"),
                &format!(r"(?i)\b(?:{MONTHS})\.?\s+\d{{1,2}}(?:st|nd|rd|th)?,?\s+\d{{4}}\b"),
            ],
        ),
        compile(
            EntityKind::Act,
            &[r"\b[A-Z][A-Za-z]+(?:\s+(?:and|of|for|on|[A-Z][A-Za-z]+))*\s+Act\b(?:,?\s+\d{4})?"],
        ),
        compile(
            EntityKind::Section,
            &[r"(?i)(?:\bSection|\bSec\.|§)\s*\d+[A-Za-z]?(?:\(\w+\))*"],
        ),
        compile(
            EntityKind::Court,
            &[
                r"(?i)\b(?:Supreme Court|High Court|District Court|Court of Appeals?|Small Claims Court|Consumer (?:Disputes Redressal )?Forum|National Company Law (?:Appellate )?Tribunal)\b",
                r"\bNCLAT\b|\bNCLT\b",
            ],
        ),
    ]
});

/// Pattern-only tagging. Output is grouped by extractor order and sorted by start
/// offset within a kind; same-kind matches sharing a start keep the first pattern's hit.
pub fn tag_patterns(text: &str) -> Vec<Entity> {
    let mut out = Vec::new();
    for ex in EXTRACTORS.iter() {
        let mut found: Vec<Entity> = Vec::new();
        for re in &ex.patterns {
            for m in re.find_iter(text) {
                if found.iter().any(|e| e.start == m.start()) {
                    continue;
                }
                found.push(Entity {
                    text: m.as_str().to_string(),
                    kind: ex.kind,
                    start: m.start(),
                    end: m.end(),
                    confidence: PATTERN_CONFIDENCE,
                });
            }
        }
        found.sort_by_key(|e| e.start);
        out.extend(found);
    }
    out
}

/// Merge external entities into `tagged`, dropping ones that are empty, whose offsets
/// fall outside `text` (or off a char boundary), or that repeat a kind+start already present.
/// The result stays grouped by kind and ordered by start offset within a kind.
pub fn merge_external(tagged: &mut Vec<Entity>, external: Vec<ExternalEntity>, text: &str) {
    let mut extra: Vec<Entity> = Vec::new();
    for ext in external {
        let surface = ext.text.trim();
        if surface.is_empty() || ext.start >= ext.end || text.get(ext.start..ext.end).is_none() {
            debug!(label = %ext.label, start = ext.start, end = ext.end, "dropping external entity");
            continue;
        }
        let kind = EntityKind::from_label(&ext.label);
        let duplicate = tagged
            .iter()
            .chain(extra.iter())
            .any(|e| e.kind == kind && e.start == ext.start);
        if duplicate {
            continue;
        }
        let confidence = if ext.confidence.is_finite() {
            ext.confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        extra.push(Entity {
            text: surface.to_string(),
            kind,
            start: ext.start,
            end: ext.end,
            confidence,
        });
    }
    if extra.is_empty() {
        return;
    }
    tagged.extend(extra);
    tagged.sort_by_key(|e| (e.kind, e.start));
}

/// Pattern extractors plus an optional NER capability.
#[derive(Clone)]
pub struct EntityTagger {
    ner: Option<DynNer>,
    timeout: Duration,
}

impl EntityTagger {
    pub fn new(ner: Option<DynNer>, timeout: Duration) -> Self {
        Self { ner, timeout }
    }

    pub fn has_ner(&self) -> bool {
        self.ner.is_some()
    }

    /// Pattern entities, then NER entities when a capability is configured.
    /// NER failure (including timeout) leaves the pattern result untouched.
    pub async fn tag(&self, text: &str) -> Vec<Entity> {
        let mut tagged = tag_patterns(text);
        let Some(ner) = &self.ner else {
            return tagged;
        };

        let input = truncate_chars(text, NER_INPUT_CHARS);
        match with_timeout(self.timeout, ner.extract(input)).await {
            Ok(external) => merge_external(&mut tagged, external, input),
            Err(e) => {
                warn!(stage = "ner", error = %e, "NER capability failed; keeping pattern entities");
                crate::metrics::record_fallback("ner");
            }
        }
        tagged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn of_kind(entities: &[Entity], kind: EntityKind) -> Vec<&str> {
        entities
            .iter()
            .filter(|e| e.kind == kind)
            .map(|e| e.text.as_str())
            .collect()
    }

    #[test]
    fn money_stops_before_trailing_punctuation() {
        let e = tag_patterns("The Client shall pay $2,000 per month, plus INR 5,00,000.50 once.");
        assert_eq!(of_kind(&e, EntityKind::Money), vec!["$2,000", "INR 5,00,000.50"]);
        assert!(e.iter().all(|x| (x.confidence - 0.9).abs() < f32::EPSILON));
    }

    #[test]
    fn rupee_forms() {
        let e = tag_patterns("Fee of ₹50,000 or Rs. 10,000 payable");
        assert_eq!(of_kind(&e, EntityKind::Money), vec!["₹50,000", "Rs. 10,000"]);
    }

    #[test]
    fn dates_in_several_formats() {
        let text = "Signed 12/03/2024, effective 2024-04-01, renewal 12 March 2025 or March 12, 2026.";
        let e = tag_patterns(text);
        assert_eq!(
            of_kind(&e, EntityKind::Date),
            vec!["12/03/2024", "2024-04-01", "12 March 2025", "March 12, 2026"]
        );
    }

    #[test]
    fn statutes_sections_and_courts() {
        let text = "Governed by the Indian Contract Act, 1872 and Section 73(1) thereof; \
                    disputes go to the Delhi High Court or NCLT.";
        let e = tag_patterns(text);
        assert_eq!(of_kind(&e, EntityKind::Act), vec!["Indian Contract Act, 1872"]);
        assert_eq!(of_kind(&e, EntityKind::Section), vec!["Section 73(1)"]);
        assert_eq!(of_kind(&e, EntityKind::Court), vec!["High Court", "NCLT"]);
    }

    #[test]
    fn offsets_are_relative_to_text() {
        let text = "Pay ₹500 by 01/02/2024.";
        for e in tag_patterns(text) {
            assert_eq!(&text[e.start..e.end], e.text);
        }
    }

    #[test]
    fn output_is_grouped_by_extractor_order() {
        let e = tag_patterns("On 01/01/2024 pay $10 and on 02/02/2024 pay $20");
        let kinds: Vec<EntityKind> = e.iter().map(|x| x.kind).collect();
        assert_eq!(
            kinds,
            vec![EntityKind::Money, EntityKind::Money, EntityKind::Date, EntityKind::Date]
        );
    }

    #[test]
    fn merge_drops_invalid_and_duplicate_external_entities() {
        let text = "Pay $10 to Acme Corp";
        let mut tagged = tag_patterns(text);
        let ext = vec![
            ExternalEntity { text: "Acme Corp".into(), label: "ORG".into(), start: 11, end: 20, confidence: 1.7 },
            ExternalEntity { text: "$10".into(), label: "MONEY".into(), start: 4, end: 7, confidence: 0.5 },
            ExternalEntity { text: "  ".into(), label: "PERSON".into(), start: 0, end: 2, confidence: 0.5 },
            ExternalEntity { text: "ghost".into(), label: "PERSON".into(), start: 15, end: 99, confidence: 0.5 },
        ];
        merge_external(&mut tagged, ext, text);
        assert_eq!(tagged.len(), 2);
        let party = &tagged[1];
        assert_eq!(party.kind, EntityKind::Party);
        assert_eq!(party.text, "Acme Corp");
        assert_eq!(party.confidence, 1.0);
    }

    #[test]
    fn merged_entities_keep_start_order_within_kind() {
        let text = "Pay Acme 10 dollars, plus $20 later";
        let mut tagged = tag_patterns(text);
        assert_eq!(tagged.len(), 1);
        let ext = vec![
            ExternalEntity { text: "Acme".into(), label: "ORG".into(), start: 4, end: 8, confidence: 0.8 },
            ExternalEntity { text: "10 dollars".into(), label: "MONEY".into(), start: 9, end: 19, confidence: 0.6 },
        ];
        merge_external(&mut tagged, ext, text);
        let order: Vec<(EntityKind, usize)> = tagged.iter().map(|e| (e.kind, e.start)).collect();
        assert_eq!(
            order,
            vec![(EntityKind::Money, 9), (EntityKind::Money, 26), (EntityKind::Party, 4)]
        );
    }

    #[test]
    fn no_entities_in_plain_text() {
        assert!(tag_patterns("the parties agree to cooperate in good faith").is_empty());
    }
}
