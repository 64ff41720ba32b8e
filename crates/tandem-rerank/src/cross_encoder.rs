//! Cross-encoder rerank wrapper: truncation, batching and the uniform
//! fallback that keeps a failing scorer from ever breaking retrieval.

use std::cmp::Ordering;
use std::sync::Arc;

use tracing::{debug, warn};

use tandem_core::error::Error;
use tandem_core::traits::{Reranker, UNIFORM_RERANK_SCORE};
use tandem_core::types::Chunk;
use tandem_core::util::char_prefix;

/// Characters of candidate text kept for scoring. Pairs are further
/// truncated to the model's positional limit at tokenization time.
pub const MAX_PASSAGE_CHARS: usize = 512;

/// A backend that scores one batch of (query, passage) pairs.
///
/// Implementations may fail freely; the wrapper owns the fallback.
pub trait PairScorer: Send + Sync {
    fn score_batch(&self, query: &str, passages: &[String]) -> anyhow::Result<Vec<f32>>;
}

pub struct CrossEncoderReranker {
    scorer: Arc<dyn PairScorer>,
    batch_size: usize,
}

impl CrossEncoderReranker {
    pub fn new(scorer: Arc<dyn PairScorer>, batch_size: usize) -> Self {
        // a zero batch size would starve the chunked loop
        Self { scorer, batch_size: batch_size.max(1) }
    }

    fn try_score(&self, query: &str, candidates: &[Chunk]) -> anyhow::Result<Vec<f32>> {
        let passages: Vec<String> = candidates
            .iter()
            .map(|c| char_prefix(&c.content, MAX_PASSAGE_CHARS).to_string())
            .collect();

        let mut scores = Vec::with_capacity(passages.len());
        for batch in passages.chunks(self.batch_size) {
            let batch_scores = self.scorer.score_batch(query, batch)?;
            if batch_scores.len() != batch.len() {
                anyhow::bail!(
                    "scorer returned {} scores for a batch of {}",
                    batch_scores.len(),
                    batch.len()
                );
            }
            scores.extend(batch_scores);
        }
        Ok(scores)
    }
}

impl Reranker for CrossEncoderReranker {
    fn name(&self) -> &str {
        "cross-encoder"
    }

    /// One score per candidate. A failure anywhere in the call
    /// substitutes the uniform score for every candidate, so the
    /// stable sort downstream preserves the incoming order.
    fn score(&self, query: &str, candidates: &[Chunk]) -> Vec<f32> {
        if candidates.is_empty() {
            return vec![];
        }
        match self.try_score(query, candidates) {
            Ok(scores) => scores,
            Err(e) => {
                warn!("{}", Error::RerankerScoringFailure(format!("{:#}", e)));
                vec![UNIFORM_RERANK_SCORE; candidates.len()]
            }
        }
    }

    fn rerank(&self, query: &str, candidates: &[Chunk], top_k: usize) -> Vec<Chunk> {
        if candidates.is_empty() || top_k == 0 {
            return vec![];
        }
        let scores = self.score(query, candidates);
        let mut ranked: Vec<(usize, f32)> = scores.into_iter().enumerate().collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        ranked.truncate(top_k);

        debug!("cross-encoder kept {} of {} candidates", ranked.len(), candidates.len());
        ranked.into_iter().map(|(i, _)| candidates[i].clone()).collect()
    }
}
