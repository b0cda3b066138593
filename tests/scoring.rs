// tests/scoring.rs
use clause_risk_engine::model::{Clause, RiskLevel, Severity, Span};
use clause_risk_engine::risk::{narrative_adjustment, score_risk};
use proptest::prelude::*;

fn clause(id: usize, ty: &str, level: RiskLevel) -> Clause {
    let text = format!("clause {id} of type {ty} with enough text to count");
    Clause {
        id,
        span: Span {
            end_offset: text.len(),
            text,
            start_offset: 0,
            section_label: None,
        },
        clause_type: ty.to_string(),
        confidence: 0.8,
        entities: vec![],
        risk_level: level,
    }
}

#[test]
fn low_narrative_pushes_mixed_contract_into_critical() {
    // (28 + 26 + 5) / 3 = 19.67 on the 0-30 scale → 65.6; "risk: low" adds 5.
    let clauses = vec![
        clause(0, "indemnification", RiskLevel::High),
        clause(1, "liability", RiskLevel::Medium),
        clause(2, "general", RiskLevel::Low),
    ];
    let r = score_risk(&clauses, "Overall risk: Low. Standard terms.");
    assert_eq!(r.scoring.base_score, 65.6);
    assert_eq!(r.scoring.narrative_adjustment, 5.0);
    assert_eq!(r.overall_score, 70.6);
    assert_eq!(r.level, Severity::Critical);
    assert!(r.summary.starts_with("CRITICAL RISK (Score: 70.6/100)"));

    assert_eq!(r.risk_matrix.high, 1);
    assert_eq!(r.risk_matrix.medium, 1);
    assert_eq!(r.risk_matrix.low, 1);
    assert_eq!(r.risk_factors.len(), 2);
    assert_eq!(r.risk_factors[0].severity, Severity::High);
    assert_eq!(r.risk_factors[0].clause_id, 0);
    assert_eq!(r.recommendations[1], "Seek legal counsel before signing");
}

#[test]
fn without_narrative_the_same_contract_is_high() {
    let clauses = vec![
        clause(0, "indemnification", RiskLevel::High),
        clause(1, "liability", RiskLevel::Medium),
        clause(2, "general", RiskLevel::Low),
    ];
    let r = score_risk(&clauses, "");
    assert_eq!(r.overall_score, 65.6);
    assert_eq!(r.level, Severity::High);
}

#[test]
fn empty_document_scores_zero_whatever_the_narrative() {
    let r = score_risk(&[], "This is critical. Do not sign.");
    assert_eq!(r.scoring.base_score, 0.0);
    assert_eq!(r.scoring.narrative_adjustment, 0.0);
    assert_eq!(r.overall_score, 0.0);
    assert_eq!(r.level, Severity::Low);
    assert_eq!(r.risk_matrix.total(), 0);
    assert!(r.risk_factors.is_empty());
    assert!(r.heatmap.is_empty());
}

#[test]
fn narrative_tiers_are_checked_in_order() {
    assert_eq!(narrative_adjustment("HIGH RISK overall, but low risk on payment"), 15.0);
    assert_eq!(narrative_adjustment("a moderate concern"), 10.0);
    assert_eq!(narrative_adjustment("Risk level - high"), 15.0);
    assert_eq!(narrative_adjustment("nothing notable"), 0.0);
}

#[test]
fn band_edges() {
    assert_eq!(Severity::from_score(70.0), Severity::Critical);
    assert_eq!(Severity::from_score(69.9), Severity::High);
    assert_eq!(Severity::from_score(50.0), Severity::High);
    assert_eq!(Severity::from_score(49.9), Severity::Medium);
    assert_eq!(Severity::from_score(30.0), Severity::Medium);
    assert_eq!(Severity::from_score(29.9), Severity::Low);
}

const TYPES: [&str; 6] = [
    "payment",
    "termination",
    "indemnification",
    "liability",
    "general",
    "notices",
];

fn arb_clauses() -> impl Strategy<Value = Vec<Clause>> {
    prop::collection::vec((0usize..TYPES.len(), 0u8..3), 0..40).prop_map(|items| {
        items
            .into_iter()
            .enumerate()
            .map(|(id, (t, l))| {
                let level = match l {
                    0 => RiskLevel::Low,
                    1 => RiskLevel::Medium,
                    _ => RiskLevel::High,
                };
                clause(id, TYPES[t], level)
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn assessment_invariants_hold(clauses in arb_clauses(), narrative in "[a-z :]{0,40}") {
        let r = score_risk(&clauses, &narrative);

        prop_assert!((0.0..=100.0).contains(&r.overall_score));
        prop_assert_eq!(r.risk_matrix.total(), clauses.len());
        prop_assert_eq!(r.level, Severity::from_score(r.overall_score));
        prop_assert!(r.risk_factors.len() <= 15);
        prop_assert!(r.risk_factors.windows(2).all(|w| w[0].severity >= w[1].severity));

        let flagged = clauses.iter().filter(|c| c.risk_level >= RiskLevel::Medium).count();
        let heat_total: usize = r.heatmap.iter().map(|h| h.total).sum();
        prop_assert_eq!(heat_total, flagged);
    }
}
