//! tandem-rerank
//!
//! Second-stage relevance scoring. Two backends implement the shared
//! `Reranker` trait: a candle cross-encoder over local model files and a
//! language-model fallback that asks for an index permutation. Both are
//! constructed through [`build_reranker`], which owns the process-scoped
//! model cache and collapses every load failure into "no reranker" so
//! the retrieval path never depends on the stage existing.

pub mod cross_encoder;
pub mod device;
pub mod llm;
pub mod model;

pub use cross_encoder::{CrossEncoderReranker, PairScorer, MAX_PASSAGE_CHARS};
pub use llm::LlmReranker;
pub use model::CrossEncoderModel;

use std::sync::{Arc, OnceLock};

use tracing::{debug, warn};

use tandem_core::config::{resolve_model_dir, RerankBackend, RerankConfig};
use tandem_core::error::Error;
use tandem_core::traits::{LlmClient, Reranker};

static SCORER: OnceLock<Option<Arc<CrossEncoderModel>>> = OnceLock::new();

/// The process-scoped cross-encoder, loaded on first use. A load failure
/// is cached as `None`, so an unavailable model is probed exactly once
/// instead of on every query.
fn global_scorer(config: &RerankConfig) -> Option<Arc<CrossEncoderModel>> {
    SCORER
        .get_or_init(|| {
            let model_dir = resolve_model_dir(config);
            match CrossEncoderModel::load(&model_dir) {
                Ok(model) => Some(Arc::new(model)),
                Err(e) => {
                    let err = Error::RerankerUnavailable(format!("{:#}", e));
                    warn!("{}; reranking degrades to pass-through", err);
                    None
                }
            }
        })
        .clone()
}

/// Select and construct a reranker from configuration.
///
/// `None` means the stage is disabled or its backend is unavailable.
/// Callers only ever branch on that; backend choice stays in here.
pub fn build_reranker(
    config: &RerankConfig,
    llm: Option<Arc<dyn LlmClient>>,
) -> Option<Box<dyn Reranker>> {
    if !config.enabled {
        debug!("reranking disabled by configuration");
        return None;
    }
    match config.backend {
        RerankBackend::CrossEncoder => {
            let scorer = global_scorer(config)?;
            Some(Box::new(CrossEncoderReranker::new(scorer, config.batch_size)))
        }
        RerankBackend::Llm => match llm {
            Some(client) => Some(Box::new(LlmReranker::new(client))),
            None => {
                warn!("llm rerank backend selected but no client wired; reranking disabled");
                None
            }
        },
    }
}
