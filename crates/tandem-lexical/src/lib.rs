//! tandem-lexical
//!
//! In-memory BM25 scoring over an immutable corpus snapshot. The index is
//! built once from a `Vec<Chunk>` and serves the query-time half of the
//! recall stage; see `index` for the scorer and `tokenize` for the text
//! pipeline feeding it.

pub mod index;
pub mod tokenize;

pub use index::{Bm25Params, LexicalIndex};
pub use tokenize::{Tokenizer, TokenizerConfig};
