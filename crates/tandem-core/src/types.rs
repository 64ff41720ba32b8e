//! Domain types shared by the recall, fusion and rerank stages.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use crate::util::char_prefix;

/// Leading content characters hashed into the fallback [`StableKey`]
/// when a chunk carries no explicit `chunk_id`.
const KEY_PREFIX_CHARS: usize = 120;
/// Hex characters of the content digest kept in the key.
const KEY_DIGEST_CHARS: usize = 16;

/// Metadata attached to a chunk by the ingester.
///
/// `page` is stored 0-indexed; only the citation formatter shifts it to
/// the 1-indexed form humans expect (see [`ChunkMetadata::display_page`]).
/// `extra` carries ingester-specific fields the engine never interprets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_id: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub extra: HashMap<String, String>,
}

impl ChunkMetadata {
    pub fn new<S: Into<String>>(source_file: S) -> Self {
        Self { source_file: Some(source_file.into()), ..Self::default() }
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn with_chunk_id<S: Into<String>>(mut self, chunk_id: S) -> Self {
        self.chunk_id = Some(chunk_id.into());
        self
    }

    /// 1-indexed page for human-readable citations.
    pub fn display_page(&self) -> Option<u32> {
        self.page.map(|p| p + 1)
    }
}

/// An immutable unit of retrievable text.
///
/// Created once during ingestion, referenced read-only by the engine.
/// The lexical and vector indexes may each hold their own copy of the
/// same chunk; identity across copies is [`StableKey`], never pointer
/// or object identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    #[serde(default)]
    pub metadata: ChunkMetadata,
}

impl Chunk {
    pub fn new<S: Into<String>>(content: S, metadata: ChunkMetadata) -> Self {
        Self { content: content.into(), metadata }
    }

    pub fn stable_key(&self) -> StableKey {
        StableKey::for_chunk(self)
    }
}

/// Deterministic chunk identity used for cross-source deduplication.
///
/// With a `chunk_id`: `source_file:page:chunk_id`. Without one, the key
/// falls back to a short digest of the first 120 content characters, so
/// separately constructed copies of the same text still collide (and two
/// chunks differing only past the prefix deliberately share a key).
/// Missing `source_file` renders as `unknown`, missing `page` as `0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StableKey(String);

impl StableKey {
    pub fn for_chunk(chunk: &Chunk) -> Self {
        let meta = &chunk.metadata;
        let source = meta.source_file.as_deref().unwrap_or("unknown");
        let page = meta.page.unwrap_or(0);
        match meta.chunk_id.as_deref() {
            Some(id) => Self(format!("{}:{}:{}", source, page, id)),
            None => {
                let digest = blake3::hash(char_prefix(&chunk.content, KEY_PREFIX_CHARS).as_bytes());
                let hex = digest.to_hex();
                Self(format!("{}:{}:{}", source, page, &hex[..KEY_DIGEST_CHARS]))
            }
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A chunk with its accumulated fusion score.
///
/// The score is a weighted sum of per-source normalized scores and lives
/// in `[0, inf)`; it is comparable within one query only.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub chunk: Chunk,
    pub score: f32,
}

/// Wall-clock durations of the two retrieval stages.
///
/// `recall` covers both index searches plus fusion; `rerank` is zero when
/// the stage was skipped. Observational only, never affects ranking.
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchTiming {
    pub recall: Duration,
    pub rerank: Duration,
}

impl SearchTiming {
    pub fn total(&self) -> Duration {
        self.recall + self.rerank
    }
}
