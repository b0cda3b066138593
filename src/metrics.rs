// src/metrics.rs
//! Engine metrics via the `metrics` facade.
//!
//! Without an installed recorder every call is a no-op, so library users pay nothing.
//! The CLI installs the Prometheus recorder with `--metrics` and renders it after the run.

use anyhow::{Context, Result};
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub const DOCUMENTS_TOTAL: &str = "clause_engine_documents_total";
pub const FALLBACK_TOTAL: &str = "clause_engine_fallback_total";
pub const RISK_SCORE: &str = "clause_engine_risk_score";
pub const CLAUSES_PER_DOCUMENT: &str = "clause_engine_clauses_per_document";

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder as the global recorder (once per process).
    pub fn init() -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("installing prometheus recorder")?;
        Ok(Self { handle })
    }

    /// Prometheus text exposition of everything recorded so far.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// One external-dependent stage degraded to its fallback.
pub fn record_fallback(stage: &'static str) {
    counter!(FALLBACK_TOTAL, "stage" => stage).increment(1);
}

/// One document fully analyzed.
pub fn record_document(clauses: usize, overall_score: f64) {
    counter!(DOCUMENTS_TOTAL).increment(1);
    histogram!(CLAUSES_PER_DOCUMENT).record(clauses as f64);
    histogram!(RISK_SCORE).record(overall_score);
}
