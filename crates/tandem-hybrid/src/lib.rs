//! tandem-hybrid
//!
//! The retrieval orchestrator: concurrent lexical and vector recall,
//! weighted score fusion deduplicated on stable chunk identity, and an
//! optional rerank stage that falls back to fusion order whenever the
//! reranker is absent or unneeded.

pub mod format;
pub mod fusion;
pub mod retriever;

pub use format::format_results;
pub use fusion::{fuse, FusionTable, FusionWeights, SCORE_EPSILON};
pub use retriever::{build_retriever, HybridRetriever};
