// src/profile.rs
//! Document profile: coarse document type from the clause mix, plus a keyword-based
//! distribution over common contract kinds.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::Clause;

pub const SERVICE_AGREEMENT: &str = "service_agreement";
pub const EMPLOYMENT_CONTRACT: &str = "employment_contract";
pub const LICENSE_AGREEMENT: &str = "license_agreement";
pub const GENERAL_CONTRACT: &str = "general_contract";

const KIND_KEYWORDS: [(&str, &[&str]); 6] = [
    (SERVICE_AGREEMENT, &["service", "deliverable", "milestone", "statement of work"]),
    (EMPLOYMENT_CONTRACT, &["employee", "salary", "designation", "employment"]),
    (LICENSE_AGREEMENT, &["license", "intellectual property", "usage rights"]),
    ("nda", &["confidential", "non-disclosure", "proprietary"]),
    ("lease_agreement", &["lease", "rent", "premises", "tenant"]),
    ("purchase_order", &["purchase", "goods", "seller", "buyer"]),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentProfile {
    pub document_type: String,
    /// Share of each kind's keywords present, normalized to sum to 1 (all 0 when none hit).
    pub type_scores: BTreeMap<String, f64>,
}

impl DocumentProfile {
    pub fn build(text: &str, clauses: &[Clause]) -> Self {
        Self {
            document_type: document_type(clauses).to_string(),
            type_scores: type_scores(text),
        }
    }

    /// "service_agreement" → "Service Agreement".
    pub fn display_type(&self) -> String {
        self.document_type
            .split('_')
            .filter(|w| !w.is_empty())
            .map(|w| {
                let mut c = w.chars();
                match c.next() {
                    Some(f) => f.to_uppercase().chain(c).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Rules, first hit wins:
/// tax clause present or >2 payment clauses → service; >1 termination → employment;
/// any IP clause → license; otherwise general.
pub fn document_type(clauses: &[Clause]) -> &'static str {
    let count = |ty: &str| clauses.iter().filter(|c| c.clause_type == ty).count();
    if count("tax_and_duty") > 0 || count("payment") > 2 {
        SERVICE_AGREEMENT
    } else if count("termination") > 1 {
        EMPLOYMENT_CONTRACT
    } else if count("intellectual_property") > 0 {
        LICENSE_AGREEMENT
    } else {
        GENERAL_CONTRACT
    }
}

pub fn type_scores(text: &str) -> BTreeMap<String, f64> {
    let lowered = text.to_lowercase();
    let raw: Vec<(&str, f64)> = KIND_KEYWORDS
        .iter()
        .map(|(kind, terms)| {
            let hits = terms.iter().filter(|t| lowered.contains(*t)).count();
            (*kind, hits as f64 / terms.len() as f64)
        })
        .collect();
    let total: f64 = raw.iter().map(|(_, s)| s).sum();
    raw.into_iter()
        .map(|(k, s)| {
            let v = if total > 0.0 { s / total } else { 0.0 };
            (k.to_string(), v)
        })
        .collect()
}
