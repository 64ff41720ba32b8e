use crate::error::Result;
use crate::types::Chunk;

/// Score substituted for every candidate when a rerank scoring call
/// fails. Uniform scores keep the incoming order under a stable sort.
pub const UNIFORM_RERANK_SCORE: f32 = 0.5;

/// Query-time contract of the lexical index.
///
/// Returns at most `top_k` entries sorted descending by score, ties
/// broken by original corpus order. Scores have no fixed range and must
/// be normalized before they are combined with another source. Searching
/// an index that holds zero chunks is `Error::EmptyCorpus`; `top_k == 0`
/// or a query with no surviving tokens is an empty `Ok`.
pub trait LexicalSearch: Send + Sync {
    fn search(&self, query: &str, top_k: usize) -> Result<Vec<(Chunk, f32)>>;
}

/// Nearest-neighbor search over an external embedding index.
///
/// The score accompanying each chunk is read per the configured
/// `VectorScoreKind`: a distance (lower is more similar) by default, or
/// an already-normalized similarity. Neither normalized nor bounded
/// values may be assumed. Query-time errors are absorbed by the
/// orchestrator, which degrades to lexical-only recall.
pub trait VectorSearch: Send + Sync {
    fn search(&self, query: &str, k: usize) -> anyhow::Result<Vec<(Chunk, f32)>>;
}

/// Second-stage pairwise relevance scorer.
///
/// Implementations absorb their own failures: `rerank` never errors and
/// falls back to the incoming order when scoring is impossible, so an
/// optional refinement stage can never break retrieval.
pub trait Reranker: Send + Sync {
    /// Short backend label for log lines.
    fn name(&self) -> &str;

    /// Pairwise relevance per candidate, same length and order as
    /// `candidates`. Backends without per-candidate scores report the
    /// uniform fallback.
    fn score(&self, query: &str, candidates: &[Chunk]) -> Vec<f32> {
        let _ = query;
        vec![UNIFORM_RERANK_SCORE; candidates.len()]
    }

    /// Reorder `candidates` by pairwise relevance and keep the best
    /// `min(top_k, len)`.
    fn rerank(&self, query: &str, candidates: &[Chunk], top_k: usize) -> Vec<Chunk>;
}

/// The orchestrating language model as seen by the fallback reranker.
pub trait LlmClient: Send + Sync {
    fn complete(&self, prompt: &str) -> anyhow::Result<String>;
}
