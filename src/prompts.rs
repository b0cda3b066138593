// src/prompts.rs
//! Prompt templates sent to the text generator, with their token budgets.

use crate::model::{truncate_chars, Clause};

pub const DETAILED_ANALYSIS_TOKENS: u32 = 2000;
pub const RISK_NARRATIVE_TOKENS: u32 = 1000;
pub const GAP_ANALYSIS_TOKENS: u32 = 800;

/// Clauses listed in the detailed-analysis prompt.
const PROMPT_CLAUSES: usize = 10;
const CLAUSE_PREVIEW_CHARS: usize = 150;
const RISK_PREVIEW_CHARS: usize = 3000;
const GAP_PREVIEW_CHARS: usize = 2000;

/// "1. PAYMENT: The Client shall pay..." one line per clause.
pub fn format_clauses(clauses: &[Clause]) -> String {
    clauses
        .iter()
        .take(PROMPT_CLAUSES)
        .enumerate()
        .map(|(i, c)| {
            format!(
                "{}. {}: {}...",
                i + 1,
                c.clause_type.to_uppercase(),
                truncate_chars(c.text(), CLAUSE_PREVIEW_CHARS)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn detailed_analysis(document_type: &str, clauses: &[Clause]) -> String {
    format!(
        "Analyze this legal document carefully.

DOCUMENT TYPE: {document_type}

KEY CLAUSES FOUND:
{clauses}

Please provide:
1. Executive Summary (2-3 sentences)
2. Key strengths of this contract
3. Key weaknesses or risks
4. Recommendations for improvement
5. Any red flags a signing party should know about

Focus on practical implications for the parties.",
        clauses = format_clauses(clauses)
    )
}

pub fn risk_narrative(document_text: &str) -> String {
    format!(
        "Assess the legal risks in this contract:

{preview}

Consider enforceability, one-sided obligations, liability exposure and termination rights.

Rate overall risk: Low, Medium, High, or Critical.
List the top 3 risk factors.",
        preview = truncate_chars(document_text, RISK_PREVIEW_CHARS)
    )
}

pub fn gap_analysis(document_type: &str, clause_types: &[&str], document_text: &str) -> String {
    let found = if clause_types.is_empty() {
        "(none)".to_string()
    } else {
        clause_types.join(", ")
    };
    format!(
        "Identify MISSING clauses that a well-drafted {document_type} would normally contain.

DOCUMENT TYPE: {document_type}

CLAUSES FOUND IN DOCUMENT:
{found}

DOCUMENT PREVIEW:
{preview}

Consider termination, governing law and jurisdiction, dispute resolution, limitation of
liability, confidentiality, force majeure, payment terms and tax responsibilities.

Output JSON format:
{{
    \"missing_clauses\": [
        {{
            \"clause_type\": \"dispute_resolution\",
            \"importance\": \"High|Medium\",
            \"reason\": \"Why it is needed\",
            \"legal_basis\": \"Law or practice that expects it\"
        }}
    ],
    \"compliance_score\": 0-100,
    \"critical_gaps\": [\"gap 1\", \"gap 2\"]
}}

Output ONLY the JSON, no additional text.",
        preview = truncate_chars(document_text, GAP_PREVIEW_CHARS)
    )
}
