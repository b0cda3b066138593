// src/grouping.rs
//! Similarity grouper: agglomerative clustering of clause embeddings.
//!
//! Cosine distance (`1 - cos`), average linkage. The closest pair of clusters keeps
//! merging while there are more than `min(max_clusters, n)` clusters or while that
//! pair is within `merge_distance`. Singletons are dropped from the output.
//!
//! Ties go to the lowest cluster indices, so identical input gives identical groups.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::GroupingConfig;
use crate::model::ClauseId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cohesion {
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimilarityGroup {
    pub group_id: usize,
    pub member_clause_refs: BTreeSet<ClauseId>,
    pub clause_count: usize,
    pub cohesion: Cohesion,
}

#[derive(Debug, Clone)]
pub struct SimilarityGrouper {
    max_clusters: usize,
    merge_distance: f64,
}

impl Default for SimilarityGrouper {
    fn default() -> Self {
        Self::new(&GroupingConfig::default())
    }
}

impl SimilarityGrouper {
    pub fn new(cfg: &GroupingConfig) -> Self {
        Self {
            max_clusters: cfg.max_clusters.max(1),
            merge_distance: f64::from(cfg.merge_distance),
        }
    }

    pub fn group(&self, embeddings: &BTreeMap<ClauseId, Vec<f32>>) -> Vec<SimilarityGroup> {
        let Some(dim) = embeddings.values().next().map(Vec::len) else {
            return Vec::new();
        };

        let mut ids: Vec<ClauseId> = Vec::with_capacity(embeddings.len());
        let mut vectors: Vec<&[f32]> = Vec::with_capacity(embeddings.len());
        for (id, v) in embeddings {
            if v.len() != dim {
                warn!(clause_id = *id, expected = dim, got = v.len(), "skipping embedding with mismatched dimension");
                continue;
            }
            ids.push(*id);
            vectors.push(v);
        }

        let n = vectors.len();
        if n < 2 {
            return Vec::new();
        }

        let dist = distance_matrix(&vectors);
        let target = self.max_clusters.min(n);
        let mut clusters: Vec<Vec<usize>> = (0..n).map(|i| vec![i]).collect();

        while clusters.len() > 1 {
            let (a, b, d) = closest_pair(&clusters, &dist);
            if clusters.len() <= target && d > self.merge_distance {
                break;
            }
            let absorbed = clusters.remove(b);
            clusters[a].extend(absorbed);
        }

        let mut groups: Vec<BTreeSet<ClauseId>> = clusters
            .into_iter()
            .filter(|c| c.len() >= 2)
            .map(|c| c.into_iter().map(|i| ids[i]).collect())
            .collect();
        groups.sort_by_key(|g| g.iter().next().copied());

        groups
            .into_iter()
            .enumerate()
            .map(|(group_id, members)| SimilarityGroup {
                group_id,
                clause_count: members.len(),
                member_clause_refs: members,
                cohesion: Cohesion::High,
            })
            .collect()
    }
}

/// Group with default settings (cap 5, merge distance 0.25).
pub fn group_similar(embeddings: &BTreeMap<ClauseId, Vec<f32>>) -> Vec<SimilarityGroup> {
    SimilarityGrouper::default().group(embeddings)
}

/// `1 - cos(a, b)` in [0, 2]. Zero-norm or non-finite input is at distance 1.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
    let mut dot = 0.0f64;
    let mut na = 0.0f64;
    let mut nb = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return 1.0;
    }
    let cos = dot / (na.sqrt() * nb.sqrt());
    if !cos.is_finite() {
        return 1.0;
    }
    1.0 - cos.clamp(-1.0, 1.0)
}

fn distance_matrix(vectors: &[&[f32]]) -> Vec<Vec<f64>> {
    let n = vectors.len();
    let mut d = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in (i + 1)..n {
            let v = cosine_distance(vectors[i], vectors[j]);
            d[i][j] = v;
            d[j][i] = v;
        }
    }
    d
}

/// Mean pairwise distance between members of two clusters.
fn average_linkage(a: &[usize], b: &[usize], dist: &[Vec<f64>]) -> f64 {
    let sum: f64 = a
        .iter()
        .flat_map(|&i| b.iter().map(move |&j| dist[i][j]))
        .sum();
    sum / (a.len() * b.len()) as f64
}

/// `(a, b, distance)` with `a < b`; first strictly-smaller pair wins ties.
fn closest_pair(clusters: &[Vec<usize>], dist: &[Vec<f64>]) -> (usize, usize, f64) {
    let mut best = (0, 1, f64::INFINITY);
    for a in 0..clusters.len() {
        for b in (a + 1)..clusters.len() {
            let d = average_linkage(&clusters[a], &clusters[b], dist);
            if d < best.2 {
                best = (a, b, d);
            }
        }
    }
    best
}
