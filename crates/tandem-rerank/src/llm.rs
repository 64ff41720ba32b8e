//! Language-model fallback reranker.
//!
//! Asks the orchestrating model for a comma-separated permutation of
//! candidate indices and applies it. The response is treated as hostile
//! input: any irregularity reverts to the incoming order, and the call
//! never errors.

use std::fmt::Write as _;
use std::sync::Arc;

use tracing::warn;

use tandem_core::error::Error;
use tandem_core::traits::{LlmClient, Reranker};
use tandem_core::types::Chunk;
use tandem_core::util::char_prefix;

/// At most this many candidates go into the prompt; later candidates
/// keep their fused order behind the reranked head.
pub const MAX_PROMPT_CANDIDATES: usize = 10;
/// Characters of each candidate shown to the model.
const PREVIEW_CHARS: usize = 200;

pub struct LlmReranker {
    client: Arc<dyn LlmClient>,
}

impl LlmReranker {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client }
    }

    fn ranked_window(&self, query: &str, window: &[Chunk]) -> Option<Vec<usize>> {
        let prompt = build_ranking_prompt(query, window);
        match self.client.complete(&prompt) {
            Ok(response) => {
                let order = parse_permutation(&response, window.len());
                if order.is_none() {
                    let snippet = char_prefix(response.trim(), 120).to_string();
                    warn!("{}", Error::MalformedFallbackResponse(snippet));
                }
                order
            }
            Err(e) => {
                warn!("llm rerank call failed: {:#}", e);
                None
            }
        }
    }
}

impl Reranker for LlmReranker {
    fn name(&self) -> &str {
        "llm-fallback"
    }

    fn rerank(&self, query: &str, candidates: &[Chunk], top_k: usize) -> Vec<Chunk> {
        if candidates.is_empty() || top_k == 0 {
            return vec![];
        }
        let window = &candidates[..candidates.len().min(MAX_PROMPT_CANDIDATES)];
        match self.ranked_window(query, window) {
            Some(order) => {
                let mut reranked: Vec<Chunk> =
                    order.into_iter().map(|i| window[i].clone()).collect();
                reranked.extend(candidates[window.len()..].iter().cloned());
                reranked.truncate(top_k);
                reranked
            }
            None => candidates[..candidates.len().min(top_k)].to_vec(),
        }
    }
}

fn build_ranking_prompt(query: &str, window: &[Chunk]) -> String {
    let mut prompt = format!(
        "Given the query: \"{}\"\n\nRank these documents by relevance (most relevant first):\n",
        query
    );
    for (i, chunk) in window.iter().enumerate() {
        let _ = writeln!(prompt, "[{}] {}...", i, char_prefix(&chunk.content, PREVIEW_CHARS));
    }
    prompt.push_str(
        "\nReturn only the numbers in order of relevance, separated by commas (e.g., 3,1,5,2,4):",
    );
    prompt
}

/// Parse a comma-separated permutation of `0..expected`. `None` on any
/// irregularity: non-integer tokens, out-of-range or repeated indices,
/// wrong count.
fn parse_permutation(response: &str, expected: usize) -> Option<Vec<usize>> {
    let mut seen = vec![false; expected];
    let mut order = Vec::with_capacity(expected);
    for token in response.trim().split(',') {
        let idx: usize = token.trim().parse().ok()?;
        if idx >= expected || seen[idx] {
            return None;
        }
        seen[idx] = true;
        order.push(idx);
    }
    if order.len() == expected {
        Some(order)
    } else {
        None
    }
}
