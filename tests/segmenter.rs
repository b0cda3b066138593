// tests/segmenter.rs
use clause_risk_engine::config::SegmenterConfig;
use clause_risk_engine::segment::Segmenter;
use clause_risk_engine::segment_and_classify;
use proptest::prelude::*;

const SERVICE_AGREEMENT: &str = "SERVICE AGREEMENT

1. The Client shall pay $2,000 per month to the Provider within 15 days of invoice.
2. Either party may terminate this agreement with 30 days written notice.
2.1 The Provider shall indemnify the Client against any and all third party claims.
3. This agreement is governed by the laws of India and the courts of Mumbai.
";

#[test]
fn numbered_contract_becomes_ordered_clauses() {
    let clauses = segment_and_classify(SERVICE_AGREEMENT);
    let types: Vec<&str> = clauses.iter().map(|c| c.clause_type.as_str()).collect();
    assert_eq!(
        types,
        vec!["payment", "termination", "indemnification", "governing_law"]
    );
    let labels: Vec<Option<&str>> = clauses
        .iter()
        .map(|c| c.span.section_label.as_deref())
        .collect();
    assert_eq!(labels, vec![Some("1"), Some("2"), Some("2.1"), Some("3")]);
    for (i, c) in clauses.iter().enumerate() {
        assert_eq!(c.id, i);
        assert_eq!(
            &SERVICE_AGREEMENT[c.span.start_offset..c.span.end_offset],
            c.span.text
        );
    }
}

#[test]
fn indicator_hits_raise_the_risk_level() {
    let clauses = segment_and_classify(SERVICE_AGREEMENT);
    let indemnity = &clauses[2];
    assert_eq!(indemnity.clause_type, "indemnification");
    // "any and all" + "third party claims"
    assert_eq!(indemnity.risk_level, clause_risk_engine::RiskLevel::High);
}

#[test]
fn whitespace_only_input_has_no_clauses() {
    assert!(segment_and_classify("   \n\n \t ").is_empty());
}

fn doc_strategy() -> impl Strategy<Value = String> {
    let line = prop_oneof![
        "[A-Za-z ,₹$é]{0,60}",
        "[0-9]{1,2}\\. [A-Za-z ,]{0,60}",
        "[0-9]\\.[0-9] [A-Za-z ]{0,40}",
        Just(String::new()),
    ];
    prop::collection::vec(line, 0..30).prop_map(|lines| lines.join("\n"))
}

proptest! {
    #[test]
    fn spans_point_back_into_the_input(doc in doc_strategy(), max_spans in 1usize..10) {
        let seg = Segmenter::new(&SegmenterConfig { max_spans, min_clause_chars: 5 });
        let spans = seg.segment(&doc);

        prop_assert!(spans.len() <= max_spans);
        let mut last_end = 0;
        for s in &spans {
            prop_assert!(s.start_offset < s.end_offset);
            prop_assert!(s.start_offset >= last_end);
            prop_assert_eq!(&doc[s.start_offset..s.end_offset], s.text.as_str());
            prop_assert_eq!(s.text.trim(), s.text.as_str());
            prop_assert!(s.text.chars().count() >= 5);
            last_end = s.end_offset;
        }
    }
}
