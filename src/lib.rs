// src/lib.rs
// Public library surface for the CLI and integration tests.

pub mod capability;
pub mod config;
pub mod error;
pub mod metrics;
pub mod model;
pub mod taxonomy;

// Deterministic analysis stages
pub mod classify;
pub mod entities;
pub mod grouping;
pub mod profile;
pub mod risk;
pub mod segment;

// Generator-backed stages (prompts, tolerant reply parsing, gap analysis)
pub mod gaps;
pub mod prompts;
pub mod response;

pub mod pipeline;

// ---- Re-exports for stable public API ----
pub use crate::config::EngineConfig;
pub use crate::error::ExternalError;
pub use crate::grouping::group_similar;
pub use crate::model::{Clause, Entity, EntityKind, Method, RiskLevel, Severity, Span};
pub use crate::pipeline::{segment_and_classify, AnalysisReport, Analyzer};
pub use crate::response::parse_response;
pub use crate::risk::{score_risk, RiskAssessment};
