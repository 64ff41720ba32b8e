//! In-memory BM25 index over an immutable corpus snapshot.

use std::collections::HashMap;

use tracing::debug;

use tandem_core::error::{Error, Result};
use tandem_core::traits::LexicalSearch;
use tandem_core::types::Chunk;

use crate::tokenize::Tokenizer;

/// BM25 shape parameters: `k1` saturates term frequency, `b` scales
/// document-length normalization.
#[derive(Debug, Clone, Copy)]
pub struct Bm25Params {
    pub k1: f32,
    pub b: f32,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 1.5, b: 0.75 }
    }
}

impl Bm25Params {
    /// Custom parameters, clamped to sane ranges.
    pub fn new(k1: f32, b: f32) -> Self {
        Self { k1: k1.clamp(0.0, 3.0), b: b.clamp(0.0, 1.0) }
    }
}

#[derive(Debug, Clone, Copy)]
struct Posting {
    doc: u32,
    tf: u32,
}

/// Query-time BM25 scorer using the non-negative IDF formulation
/// `ln((N - df + 0.5) / (df + 0.5) + 1)`.
///
/// Every chunk participates in every ranking: chunks matching no query
/// term score 0 and sort behind the matches in corpus order, so a search
/// is exhaustive up to `top_k` and fully deterministic.
pub struct LexicalIndex {
    chunks: Vec<Chunk>,
    postings: HashMap<String, Vec<Posting>>,
    doc_lens: Vec<u32>,
    avgdl: f32,
    params: Bm25Params,
    tokenizer: Tokenizer,
}

impl LexicalIndex {
    pub fn new(chunks: Vec<Chunk>) -> Self {
        Self::with_options(chunks, Bm25Params::default(), Tokenizer::default())
    }

    pub fn with_options(chunks: Vec<Chunk>, params: Bm25Params, tokenizer: Tokenizer) -> Self {
        let mut postings: HashMap<String, Vec<Posting>> = HashMap::new();
        let mut doc_lens = Vec::with_capacity(chunks.len());

        for (doc, chunk) in chunks.iter().enumerate() {
            let terms = tokenizer.tokenize(&chunk.content);
            doc_lens.push(terms.len() as u32);

            let mut tf: HashMap<String, u32> = HashMap::new();
            for term in terms {
                *tf.entry(term).or_insert(0) += 1;
            }
            for (term, count) in tf {
                postings.entry(term).or_default().push(Posting { doc: doc as u32, tf: count });
            }
        }

        let total: u64 = doc_lens.iter().map(|l| u64::from(*l)).sum();
        let avgdl = (total as f32 / doc_lens.len().max(1) as f32).max(1.0);

        debug!(
            "lexical index built: {} chunks, {} terms, avgdl {:.1}",
            chunks.len(),
            postings.len(),
            avgdl
        );

        Self { chunks, postings, doc_lens, avgdl, params, tokenizer }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    fn idf(&self, df: usize) -> f32 {
        let n = self.chunks.len() as f32;
        ((n - df as f32 + 0.5) / (df as f32 + 0.5) + 1.0).ln()
    }

    /// BM25 score of every chunk against the tokenized query. Repeated
    /// query terms contribute once per occurrence, like the reference
    /// scorer.
    fn score_all(&self, terms: &[String]) -> Vec<f32> {
        let mut scores = vec![0.0f32; self.chunks.len()];
        let Bm25Params { k1, b } = self.params;

        for term in terms {
            if let Some(plist) = self.postings.get(term) {
                let idf = self.idf(plist.len());
                for posting in plist {
                    let tf = posting.tf as f32;
                    let doc_len = self.doc_lens[posting.doc as usize] as f32;
                    let length_norm = 1.0 - b + b * (doc_len / self.avgdl);
                    scores[posting.doc as usize] += idf * (tf * (k1 + 1.0)) / (tf + k1 * length_norm);
                }
            }
        }
        scores
    }
}

impl LexicalSearch for LexicalIndex {
    fn search(&self, query: &str, top_k: usize) -> Result<Vec<(Chunk, f32)>> {
        if self.chunks.is_empty() {
            return Err(Error::EmptyCorpus);
        }
        if top_k == 0 {
            return Ok(vec![]);
        }
        let terms = self.tokenizer.tokenize(query);
        if terms.is_empty() {
            debug!("lexical query '{}' tokenized to nothing", query);
            return Ok(vec![]);
        }

        let scores = self.score_all(&terms);
        let mut ranked: Vec<(usize, f32)> = scores.into_iter().enumerate().collect();
        // stable sort keeps corpus order among equal scores
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked.truncate(top_k);

        debug!(
            "lexical search '{}': {} of {} chunks returned",
            query,
            ranked.len(),
            self.chunks.len()
        );
        Ok(ranked.into_iter().map(|(i, s)| (self.chunks[i].clone(), s)).collect())
    }
}
