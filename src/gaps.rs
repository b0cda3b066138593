// src/gaps.rs
//! Gap analysis: which expected provisions a document lacks.
//!
//! Two parts:
//! - a deterministic checklist (expected clause types for the document type vs. types found),
//!   always computed;
//! - the generator's JSON report (missing clauses, compliance score, critical gaps),
//!   read through the tolerant response parser. Anything unusable gives the neutral
//!   fallback: no missing clauses, score 50, one gap note, `Method::Fallback`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::{Clause, Method};
use crate::profile::{EMPLOYMENT_CONTRACT, LICENSE_AGREEMENT, SERVICE_AGREEMENT};
use crate::response::parse_object;

pub const NEUTRAL_COMPLIANCE_SCORE: f64 = 50.0;
pub const FALLBACK_GAP_NOTE: &str = "Could not complete missing-clause analysis";

const BASE_PROVISIONS: [&str; 6] = [
    "termination",
    "liability",
    "confidentiality",
    "arbitration",
    "force_majeure",
    "governing_law",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MissingClause {
    pub clause_type: String,
    pub importance: String,
    pub reason: String,
    pub legal_basis: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub provision: String,
    pub present: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapAnalysis {
    pub missing_clauses: Vec<MissingClause>,
    pub compliance_score: f64,
    pub critical_gaps: Vec<String>,
    pub checklist: Vec<ChecklistItem>,
    pub method: Method,
}

impl GapAnalysis {
    pub fn fallback(checklist: Vec<ChecklistItem>) -> Self {
        Self {
            missing_clauses: Vec::new(),
            compliance_score: NEUTRAL_COMPLIANCE_SCORE,
            critical_gaps: vec![FALLBACK_GAP_NOTE.to_string()],
            checklist,
            method: Method::Fallback,
        }
    }

    /// Read a generator reply. `None` when no JSON object can be recovered from it.
    ///
    /// Individual malformed entries are skipped rather than failing the whole report;
    /// a missing or non-numeric score becomes 50, and scores are clamped to [0, 100].
    pub fn from_response(raw: &str, checklist: Vec<ChecklistItem>) -> Option<Self> {
        let obj = parse_object(raw)?;

        let missing_clauses = obj
            .get("missing_clauses")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| serde_json::from_value::<MissingClause>(v.clone()).ok())
                    .filter(|m| !m.clause_type.trim().is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let compliance_score = obj
            .get("compliance_score")
            .and_then(number_like)
            .filter(|s| s.is_finite())
            .map(|s| s.clamp(0.0, 100.0))
            .unwrap_or(NEUTRAL_COMPLIANCE_SCORE);

        let critical_gaps = obj
            .get("critical_gaps")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Some(Self {
            missing_clauses,
            compliance_score,
            critical_gaps,
            checklist,
            method: Method::Primary,
        })
    }
}

/// 85 or "85" (or "85%").
fn number_like(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse().ok(),
        _ => None,
    }
}

/// Clause types a document of `document_type` is expected to contain.
pub fn expected_provisions(document_type: &str) -> Vec<&'static str> {
    let mut out: Vec<&'static str> = BASE_PROVISIONS.to_vec();
    let extra: &[&'static str] = match document_type {
        SERVICE_AGREEMENT => &["payment", "tax_and_duty", "indemnification"],
        EMPLOYMENT_CONTRACT => &["payment", "non_compete"],
        LICENSE_AGREEMENT => &["intellectual_property", "warranty"],
        _ => &["payment"],
    };
    for p in extra {
        if !out.contains(p) {
            out.push(p);
        }
    }
    out
}

pub fn checklist(document_type: &str, clauses: &[Clause]) -> Vec<ChecklistItem> {
    expected_provisions(document_type)
        .into_iter()
        .map(|p| ChecklistItem {
            provision: p.to_string(),
            present: clauses.iter().any(|c| c.clause_type == p),
        })
        .collect()
}
