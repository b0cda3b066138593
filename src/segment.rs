// src/segment.rs
//! Segmenter: splits document text into ordered clause-candidate spans.
//!
//! Strategy:
//! 1) numbered-section markers at line starts ("1.", "2.3", "4.1.2."); each marker
//!    plus the text up to the next marker becomes one span;
//! 2) if that yields nothing, blank-line-delimited paragraphs.
//!
//! Candidates shorter than `min_clause_chars` are dropped (stray headers, artifacts).
//! Output is capped at `max_spans`. Offsets are byte offsets into the input and
//! always satisfy `text[start..end] == span.text`.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::SegmenterConfig;
use crate::model::Span;

/// "1." | "1.2" | "1.2." | "1.2.3" at a line start, followed by horizontal whitespace.
/// A bare number without a dot ("30 days") is not a marker.
static SECTION_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*(\d+(?:\.\d+)+\.?|\d+\.)[ \t]+").expect("section marker regex")
});

static BLANK_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\r?\n[ \t\r]*\n").expect("blank line regex"));

#[derive(Debug, Clone)]
pub struct Segmenter {
    max_spans: usize,
    min_clause_chars: usize,
}

impl Default for Segmenter {
    fn default() -> Self {
        Self::new(&SegmenterConfig::default())
    }
}

impl Segmenter {
    pub fn new(cfg: &SegmenterConfig) -> Self {
        Self {
            max_spans: cfg.max_spans.max(1),
            min_clause_chars: cfg.min_clause_chars,
        }
    }

    /// Re-scans the full text on every call.
    pub fn segment(&self, text: &str) -> Vec<Span> {
        let numbered = self.numbered_sections(text);
        if !numbered.is_empty() {
            return numbered;
        }
        self.paragraphs(text)
    }

    fn numbered_sections(&self, text: &str) -> Vec<Span> {
        let markers: Vec<(String, usize, usize)> = SECTION_MARKER
            .captures_iter(text)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let label = caps.get(1)?.as_str().trim_end_matches('.').to_string();
                Some((label, whole.start(), whole.end()))
            })
            .collect();

        let mut spans = Vec::new();
        for (i, (label, _, body_start)) in markers.iter().enumerate() {
            let body_end = markers
                .get(i + 1)
                .map(|(_, next_start, _)| *next_start)
                .unwrap_or(text.len());
            if let Some(span) = self.make_span(text, *body_start, body_end, Some(label.clone())) {
                spans.push(span);
                if spans.len() == self.max_spans {
                    break;
                }
            }
        }
        spans
    }

    fn paragraphs(&self, text: &str) -> Vec<Span> {
        let mut spans = Vec::new();
        let mut cursor = 0;
        let bounds = BLANK_LINE
            .find_iter(text)
            .map(|m| (m.start(), m.end()))
            .chain(std::iter::once((text.len(), text.len())));

        for (sep_start, sep_end) in bounds {
            if let Some(span) = self.make_span(text, cursor, sep_start, None) {
                spans.push(span);
                if spans.len() == self.max_spans {
                    break;
                }
            }
            cursor = sep_end;
        }
        spans
    }

    /// Trim `text[from..to]` and build a span when it is long enough.
    fn make_span(&self, text: &str, from: usize, to: usize, label: Option<String>) -> Option<Span> {
        let raw = &text[from..to];
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.chars().count() < self.min_clause_chars {
            return None;
        }
        let lead = raw.len() - raw.trim_start().len();
        let start = from + lead;
        Some(Span {
            text: trimmed.to_string(),
            start_offset: start,
            end_offset: start + trimmed.len(),
            section_label: label,
        })
    }
}
