//! Two-stage retrieval orchestration.
//!
//! Stage one runs lexical and vector recall concurrently and fuses the
//! results; stage two reranks the fused head when a reranker is wired
//! and there are more candidates than slots. The vector side is best
//! effort: its errors and panics degrade the call to lexical-only
//! recall, while a lexical failure fails the call.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use tandem_core::config::RetrievalConfig;
use tandem_core::corpus::load_corpus;
use tandem_core::error::{Error, Result};
use tandem_core::traits::{LexicalSearch, LlmClient, Reranker, VectorSearch};
use tandem_core::types::{Chunk, SearchTiming};
use tandem_core::util::char_prefix;
use tandem_lexical::LexicalIndex;
use tandem_rerank::build_reranker;

use crate::fusion::{fuse, FusionWeights};

pub struct HybridRetriever<L, V>
where
    L: LexicalSearch,
    V: VectorSearch,
{
    lexical: L,
    vector: V,
    reranker: Option<Box<dyn Reranker>>,
    config: RetrievalConfig,
}

impl<L, V> HybridRetriever<L, V>
where
    L: LexicalSearch,
    V: VectorSearch,
{
    pub fn new(
        lexical: L,
        vector: V,
        reranker: Option<Box<dyn Reranker>>,
        config: RetrievalConfig,
    ) -> Self {
        Self { lexical, vector, reranker, config }
    }

    /// Top `top_k` chunks for `query`, best first.
    pub fn search(&self, query: &str) -> Result<Vec<Chunk>> {
        self.search_with_timing(query).map(|(chunks, _)| chunks)
    }

    /// Like [`HybridRetriever::search`], also reporting per-stage timing.
    pub fn search_with_timing(&self, query: &str) -> Result<(Vec<Chunk>, SearchTiming)> {
        let top_k = self.config.top_k;
        if query.trim().is_empty() || top_k == 0 {
            return Ok((Vec::new(), SearchTiming::default()));
        }

        let recall_start = Instant::now();
        let (lexical_hits, vector_hits) = self.recall(query, self.config.recall_k())?;

        let weights = FusionWeights {
            vector: self.config.vector_weight,
            bm25: self.config.bm25_weight,
        };
        let candidates = fuse(&vector_hits, &lexical_hits, self.config.vector_score, weights);
        let recall = recall_start.elapsed();

        let rerank_start = Instant::now();
        let (results, rerank) = match &self.reranker {
            Some(reranker) if candidates.len() > top_k => {
                let window = self.config.candidate_window().min(candidates.len());
                let pool: Vec<Chunk> =
                    candidates.into_iter().take(window).map(|c| c.chunk).collect();
                let reranked = reranker.rerank(query, &pool, top_k);
                let elapsed = rerank_start.elapsed();
                debug!(
                    "rerank [{}]: {} candidates -> {} results",
                    reranker.name(),
                    pool.len(),
                    reranked.len()
                );
                (reranked, elapsed)
            }
            _ => {
                let kept: Vec<Chunk> =
                    candidates.into_iter().take(top_k).map(|c| c.chunk).collect();
                (kept, Duration::ZERO)
            }
        };

        info!(
            "hybrid search '{}': {} results (recall {:?}, rerank {:?})",
            char_prefix(query, 50),
            results.len(),
            recall,
            rerank
        );
        Ok((results, SearchTiming { recall, rerank }))
    }

    /// Run both recall sources concurrently.
    ///
    /// Neither source shares mutable state, so the two searches run on
    /// scoped threads and join before fusion. The lexical result is
    /// load-bearing and propagates its error; the vector side degrades
    /// to an empty hit list on error or panic.
    fn recall(&self, query: &str, recall_k: usize) -> Result<RecallHits> {
        let (lexical_res, vector_res) = std::thread::scope(|s| {
            let lexical = s.spawn(|| self.lexical.search(query, recall_k));
            let vector = s.spawn(|| self.vector.search(query, recall_k));
            (lexical.join(), vector.join())
        });

        let lexical_hits = match lexical_res {
            Ok(res) => res?,
            Err(_) => return Err(Error::Operation("lexical recall panicked".to_string())),
        };

        let vector_hits = match vector_res {
            Ok(Ok(hits)) => hits,
            Ok(Err(e)) => {
                warn!("vector recall failed: {:#}; continuing with lexical hits only", e);
                Vec::new()
            }
            Err(_) => {
                warn!("vector recall panicked; continuing with lexical hits only");
                Vec::new()
            }
        };

        debug!("recall: {} lexical hits, {} vector hits", lexical_hits.len(), vector_hits.len());
        Ok((lexical_hits, vector_hits))
    }
}

type RecallHits = (Vec<(Chunk, f32)>, Vec<(Chunk, f32)>);

/// Wire a full retriever from a corpus snapshot and a vector backend.
///
/// The lexical index is built from the snapshot, and the reranker is
/// selected from `config.rerank`; an unavailable reranker leaves the
/// stage off rather than failing construction. A missing snapshot is
/// `Error::IndexUnavailable`.
pub fn build_retriever<V>(
    snapshot: &Path,
    vector: V,
    config: RetrievalConfig,
    llm: Option<Arc<dyn LlmClient>>,
) -> Result<HybridRetriever<LexicalIndex, V>>
where
    V: VectorSearch,
{
    let chunks = load_corpus(snapshot)?;
    debug!("corpus snapshot {}: {} chunks", snapshot.display(), chunks.len());
    let lexical = LexicalIndex::new(chunks);
    let reranker = build_reranker(&config.rerank, llm);
    Ok(HybridRetriever::new(lexical, vector, reranker, config))
}
