//! Weighted score fusion across recall sources.
//!
//! Each source's scores are normalized into `[0, 1]` on their own scale,
//! weighted, and accumulated per [`StableKey`], so a chunk surfaced by
//! both sources counts once with a combined score. Weights are taken
//! as-is; nothing renormalizes after weighting.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use tandem_core::config::VectorScoreKind;
use tandem_core::types::{Chunk, ScoredCandidate, StableKey};

/// Guards normalization denominators when a score range collapses to zero.
pub const SCORE_EPSILON: f32 = 1e-10;

/// Per-source multipliers applied to normalized scores.
#[derive(Debug, Clone, Copy)]
pub struct FusionWeights {
    pub vector: f32,
    pub bm25: f32,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self { vector: 0.65, bm25: 0.35 }
    }
}

/// Min-max normalize vector scores into `[0, 1]`, higher is better.
///
/// Distances invert (`1 - (d - min) / (range + eps)`), so the nearest hit
/// lands at 1. A single hit, or all hits at the same distance, normalizes
/// to 1. Similarity scores are already higher-is-better and pass through
/// untouched.
pub fn normalize_vector_scores(hits: &[(Chunk, f32)], kind: VectorScoreKind) -> Vec<f32> {
    if hits.is_empty() {
        return Vec::new();
    }
    if kind == VectorScoreKind::Similarity {
        return hits.iter().map(|(_, s)| *s).collect();
    }
    let max_d = hits.iter().map(|(_, d)| *d).fold(f32::MIN, f32::max);
    let min_d = hits.iter().map(|(_, d)| *d).fold(f32::MAX, f32::min);
    let range = max_d - min_d;
    hits.iter().map(|(_, d)| 1.0 - (d - min_d) / (range + SCORE_EPSILON)).collect()
}

/// Scale lexical scores by the list maximum.
///
/// BM25 scores are non-negative with no upper bound, so dividing by the
/// max puts the best hit at 1. An all-zero list stays all zero instead of
/// collapsing to 1.
pub fn normalize_lexical_scores(hits: &[(Chunk, f32)]) -> Vec<f32> {
    if hits.is_empty() {
        return Vec::new();
    }
    let max_s = hits.iter().map(|(_, s)| *s).fold(f32::MIN, f32::max);
    hits.iter().map(|(_, s)| s / (max_s + SCORE_EPSILON)).collect()
}

/// Accumulates weighted contributions keyed by [`StableKey`].
///
/// The first chunk seen under a key stays the representative; later
/// contributions only add score. Candidates keep insertion order until
/// [`FusionTable::into_ranked`] sorts them, so with a stable sort, ties
/// resolve toward whichever source was folded in first.
#[derive(Default)]
pub struct FusionTable {
    slots: HashMap<StableKey, usize>,
    candidates: Vec<ScoredCandidate>,
}

impl FusionTable {
    pub fn accumulate(&mut self, chunk: &Chunk, contribution: f32) {
        match self.slots.entry(chunk.stable_key()) {
            Entry::Occupied(slot) => self.candidates[*slot.get()].score += contribution,
            Entry::Vacant(slot) => {
                slot.insert(self.candidates.len());
                self.candidates.push(ScoredCandidate { chunk: chunk.clone(), score: contribution });
            }
        }
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Candidates sorted descending by accumulated score.
    pub fn into_ranked(mut self) -> Vec<ScoredCandidate> {
        self.candidates
            .sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        self.candidates
    }
}

/// Fuse both recall lists into one deduplicated ranking.
///
/// Vector hits fold in first; with the stable final sort that means a
/// score tie between a vector-only and a lexical-only candidate resolves
/// toward vector recall.
pub fn fuse(
    vector_hits: &[(Chunk, f32)],
    lexical_hits: &[(Chunk, f32)],
    kind: VectorScoreKind,
    weights: FusionWeights,
) -> Vec<ScoredCandidate> {
    let mut table = FusionTable::default();

    let vector_norms = normalize_vector_scores(vector_hits, kind);
    for ((chunk, _), norm) in vector_hits.iter().zip(vector_norms) {
        table.accumulate(chunk, norm * weights.vector);
    }

    let lexical_norms = normalize_lexical_scores(lexical_hits);
    for ((chunk, _), norm) in lexical_hits.iter().zip(lexical_norms) {
        table.accumulate(chunk, norm * weights.bm25);
    }

    table.into_ranked()
}
