// src/taxonomy.rs
//! Ordered clause taxonomy: keyword triggers, risk indicators and structural weights.
//!
//! The built-in table is embedded from `config/taxonomy.toml`; a replacement can be
//! loaded from disk through `[classifier] taxonomy_path`.
//!
//! Declaration order is the classification priority (first match wins).

use anyhow::{bail, Context, Result};
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Label for clauses that match no taxonomy entry.
pub const GENERAL: &str = "general";

/// Weight of the `general` type on the 0–30 scale.
pub const GENERAL_WEIGHT: u32 = 5;

/// Weights are expressed on this scale; the scorer rescales them to 0–100.
pub const MAX_WEIGHT: u32 = 30;

static BUILTIN: Lazy<Taxonomy> = Lazy::new(|| {
    let raw = include_str!("../config/taxonomy.toml");
    Taxonomy::from_toml_str(raw).expect("valid built-in taxonomy")
});

#[derive(Debug, Clone, Deserialize)]
pub struct ClauseTypeDef {
    pub name: String,
    #[serde(default)]
    pub weight: Option<u32>,
    #[serde(default)]
    pub description: Option<String>,
    pub keywords: Vec<String>,
    #[serde(default)]
    pub risk_indicators: Vec<String>,
}

impl ClauseTypeDef {
    /// `lowered` must already be lowercase.
    pub fn matches(&self, lowered: &str) -> bool {
        self.keywords.iter().any(|k| lowered.contains(k.as_str()))
    }

    /// Number of distinct risk indicators present in `lowered`.
    pub fn indicator_hits(&self, lowered: &str) -> usize {
        self.risk_indicators
            .iter()
            .filter(|i| lowered.contains(i.as_str()))
            .count()
    }
}

#[derive(Debug, Clone, Deserialize)]
struct TaxonomyFile {
    #[serde(rename = "clause_type", default)]
    types: Vec<ClauseTypeDef>,
}

#[derive(Debug, Clone)]
pub struct Taxonomy {
    types: Vec<ClauseTypeDef>,
}

impl Taxonomy {
    /// The embedded default taxonomy.
    pub fn builtin() -> &'static Taxonomy {
        &BUILTIN
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading taxonomy from {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("parsing taxonomy {}", path.display()))
    }

    /// Parse and validate. Keywords and indicators are lowercased once here so
    /// matching can work on a single lowercased copy of the clause text.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let file: TaxonomyFile = toml::from_str(s)?;
        let mut seen = HashSet::new();
        let mut types = Vec::with_capacity(file.types.len());

        for mut def in file.types {
            def.name = def.name.trim().to_lowercase();
            if def.name.is_empty() {
                bail!("clause type with empty name");
            }
            if def.name == GENERAL {
                bail!("`{GENERAL}` is reserved for unmatched clauses");
            }
            if !seen.insert(def.name.clone()) {
                bail!("duplicate clause type `{}`", def.name);
            }
            if let Some(w) = def.weight {
                if w > MAX_WEIGHT {
                    bail!("clause type `{}` weight {w} exceeds {MAX_WEIGHT}", def.name);
                }
            }
            def.keywords = normalize_phrases(def.keywords);
            if def.keywords.is_empty() {
                bail!("clause type `{}` has no keywords", def.name);
            }
            def.risk_indicators = normalize_phrases(def.risk_indicators);
            types.push(def);
        }

        Ok(Self { types })
    }

    /// Types in priority order.
    pub fn types(&self) -> &[ClauseTypeDef] {
        &self.types
    }

    pub fn get(&self, name: &str) -> Option<&ClauseTypeDef> {
        self.types.iter().find(|t| t.name == name)
    }

    /// Explicit structural weight for a type (`general` always has one).
    pub fn weight_for(&self, name: &str) -> Option<u32> {
        if name == GENERAL {
            return Some(GENERAL_WEIGHT);
        }
        self.get(name).and_then(|t| t.weight)
    }

    pub fn description_for(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|t| t.description.as_deref())
    }
}

fn normalize_phrases(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        let p = item.trim().to_lowercase();
        if !p.is_empty() && !out.contains(&p) {
            out.push(p);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_parses_and_keeps_order() {
        let t = Taxonomy::builtin();
        let names: Vec<&str> = t.types().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names.first(), Some(&"payment"));
        assert_eq!(names.last(), Some(&"notices"));
        let term = names.iter().position(|n| *n == "termination").unwrap();
        let notices = names.iter().position(|n| *n == "notices").unwrap();
        assert!(term < notices);
    }

    #[test]
    fn builtin_weights_match_scale() {
        let t = Taxonomy::builtin();
        assert_eq!(t.weight_for("indemnification"), Some(28));
        assert_eq!(t.weight_for("termination"), Some(24));
        assert_eq!(t.weight_for("payment"), Some(18));
        assert_eq!(t.weight_for("notices"), Some(10));
        assert_eq!(t.weight_for(GENERAL), Some(5));
        assert_eq!(t.weight_for("unknown_type"), None);
    }

    #[test]
    fn rejects_duplicates_and_reserved_names() {
        let dup = r#"
            [[clause_type]]
            name = "a"
            keywords = ["x"]
            [[clause_type]]
            name = "A"
            keywords = ["y"]
        "#;
        assert!(Taxonomy::from_toml_str(dup).is_err());

        let reserved = r#"
            [[clause_type]]
            name = "general"
            keywords = ["x"]
        "#;
        assert!(Taxonomy::from_toml_str(reserved).is_err());
    }

    #[test]
    fn rejects_weight_over_scale() {
        let heavy = r#"
            [[clause_type]]
            name = "heavy"
            weight = 31
            keywords = ["x"]
        "#;
        assert!(Taxonomy::from_toml_str(heavy).is_err());
    }

    #[test]
    fn phrases_are_lowercased_and_deduped() {
        let t = Taxonomy::from_toml_str(
            r#"
            [[clause_type]]
            name = "ip"
            keywords = ["Patent", "patent", "  "]
            risk_indicators = ["IRREVOCABLE"]
            "#,
        )
        .unwrap();
        let def = t.get("ip").unwrap();
        assert_eq!(def.keywords, vec!["patent".to_string()]);
        assert_eq!(def.risk_indicators, vec!["irrevocable".to_string()]);
        assert_eq!(def.weight, None);
    }
}
