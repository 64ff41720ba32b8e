use std::collections::HashSet;
use std::hash::Hasher;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use twox_hash::XxHash64;

use tandem_core::config::{RetrievalConfig, VectorScoreKind};
use tandem_core::corpus::save_corpus;
use tandem_core::error::Error;
use tandem_core::traits::{LexicalSearch, Reranker, VectorSearch};
use tandem_core::types::{Chunk, ChunkMetadata};
use tandem_hybrid::{build_retriever, HybridRetriever};
use tandem_lexical::LexicalIndex;

fn chunk(source: &str, page: u32, content: &str) -> Chunk {
    Chunk::new(content, ChunkMetadata::new(source).with_page(page))
}

fn contents(chunks: &[Chunk]) -> Vec<String> {
    chunks.iter().map(|c| c.content.clone()).collect()
}

/// Lexical source with canned hits, bypassing real BM25 scoring so tests
/// control the exact score spread.
struct StubLexicalIndex {
    hits: Vec<(Chunk, f32)>,
}

impl LexicalSearch for StubLexicalIndex {
    fn search(&self, _query: &str, top_k: usize) -> tandem_core::error::Result<Vec<(Chunk, f32)>> {
        Ok(self.hits.iter().take(top_k).cloned().collect())
    }
}

/// Lexical source that records the requested depth of every call.
struct RecordingLexicalIndex {
    hits: Vec<(Chunk, f32)>,
    requested: Arc<Mutex<Vec<usize>>>,
}

impl LexicalSearch for RecordingLexicalIndex {
    fn search(&self, _query: &str, top_k: usize) -> tandem_core::error::Result<Vec<(Chunk, f32)>> {
        self.requested.lock().unwrap().push(top_k);
        Ok(self.hits.iter().take(top_k).cloned().collect())
    }
}

/// Vector backend returning a fixed hit list regardless of the query.
struct StubVectorIndex {
    hits: Vec<(Chunk, f32)>,
}

impl VectorSearch for StubVectorIndex {
    fn search(&self, _query: &str, k: usize) -> anyhow::Result<Vec<(Chunk, f32)>> {
        Ok(self.hits.iter().take(k).cloned().collect())
    }
}

/// Vector backend that is down.
struct FailingVectorIndex;

impl VectorSearch for FailingVectorIndex {
    fn search(&self, _query: &str, _k: usize) -> anyhow::Result<Vec<(Chunk, f32)>> {
        anyhow::bail!("vector store offline")
    }
}

/// Vector backend that dies mid-call.
struct PanickingVectorIndex;

impl VectorSearch for PanickingVectorIndex {
    fn search(&self, _query: &str, _k: usize) -> anyhow::Result<Vec<(Chunk, f32)>> {
        panic!("simulated vector backend crash")
    }
}

/// Deterministic pseudo-distances hashed from query and content, giving
/// realistic unequal spreads without a real embedding model.
struct HashedVectorIndex {
    chunks: Vec<Chunk>,
}

impl VectorSearch for HashedVectorIndex {
    fn search(&self, query: &str, k: usize) -> anyhow::Result<Vec<(Chunk, f32)>> {
        let mut hits: Vec<(Chunk, f32)> = self
            .chunks
            .iter()
            .map(|c| {
                let mut hasher = XxHash64::with_seed(0);
                hasher.write(query.as_bytes());
                hasher.write(c.content.as_bytes());
                let distance = (hasher.finish() % 1000) as f32 / 1000.0;
                (c.clone(), distance)
            })
            .collect();
        hits.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap());
        hits.truncate(k);
        Ok(hits)
    }
}

/// Reranker that reverses its window, making the stage visible in output.
struct ReversingReranker;

impl Reranker for ReversingReranker {
    fn name(&self) -> &str {
        "reversing"
    }

    fn rerank(&self, _query: &str, candidates: &[Chunk], top_k: usize) -> Vec<Chunk> {
        let mut out: Vec<Chunk> = candidates.to_vec();
        out.reverse();
        out.truncate(top_k);
        out
    }
}

/// Reranker that records how many candidates it was handed.
struct WindowRecordingReranker {
    seen: Arc<Mutex<Vec<usize>>>,
}

impl Reranker for WindowRecordingReranker {
    fn name(&self) -> &str {
        "recording"
    }

    fn rerank(&self, _query: &str, candidates: &[Chunk], top_k: usize) -> Vec<Chunk> {
        self.seen.lock().unwrap().push(candidates.len());
        candidates.iter().take(top_k).cloned().collect()
    }
}

/// Reranker with measurable latency.
struct SleepingReranker {
    delay: Duration,
}

impl Reranker for SleepingReranker {
    fn name(&self) -> &str {
        "sleeping"
    }

    fn rerank(&self, _query: &str, candidates: &[Chunk], top_k: usize) -> Vec<Chunk> {
        std::thread::sleep(self.delay);
        candidates.iter().take(top_k).cloned().collect()
    }
}

/// The worked score-fusion example: lexical favors a, vector strongly
/// favors b, and the weighted sum flips the order.
fn scenario_sources() -> (StubLexicalIndex, StubVectorIndex) {
    let a = chunk("x.pdf", 0, "alpha passage");
    let b = chunk("y.pdf", 2, "beta passage");
    let lexical = StubLexicalIndex { hits: vec![(a.clone(), 5.0), (b.clone(), 1.0)] };
    let vector = StubVectorIndex { hits: vec![(b, 0.1), (a, 0.9)] };
    (lexical, vector)
}

#[test]
fn fused_ranking_puts_vector_favorite_first() {
    let (lexical, vector) = scenario_sources();
    let retriever = HybridRetriever::new(lexical, vector, None, RetrievalConfig::default());

    let results = retriever.search("alpha beta").unwrap();

    // a fuses to 0.35, b to 0.72
    assert_eq!(contents(&results), vec!["beta passage", "alpha passage"]);
}

#[test]
fn rerank_stage_reorders_the_fused_head() {
    let a = chunk("x.pdf", 0, "alpha passage");
    let b = chunk("y.pdf", 2, "beta passage");
    let c = chunk("z.pdf", 4, "gamma passage");
    let lexical = StubLexicalIndex {
        hits: vec![(a.clone(), 5.0), (b.clone(), 1.0), (c, 0.5)],
    };
    let vector = StubVectorIndex { hits: vec![(b, 0.1), (a, 0.9)] };

    let config = RetrievalConfig {
        top_k: 2,
        top_n_candidates: Some(2),
        ..RetrievalConfig::default()
    };
    let retriever =
        HybridRetriever::new(lexical, vector, Some(Box::new(ReversingReranker)), config);

    let results = retriever.search("alpha beta gamma").unwrap();

    // fusion yields [b, a, c]; the reranker sees the top-2 window [b, a]
    // and reverses it
    assert_eq!(contents(&results), vec!["alpha passage", "beta passage"]);
}

#[test]
fn reranker_skipped_when_candidates_fit_top_k() {
    let (lexical, vector) = scenario_sources();
    let retriever = HybridRetriever::new(
        lexical,
        vector,
        Some(Box::new(ReversingReranker)),
        RetrievalConfig::default(),
    );

    let (results, timing) = retriever.search_with_timing("alpha beta").unwrap();

    // two candidates against top_k 4: fusion order survives untouched
    assert_eq!(contents(&results), vec!["beta passage", "alpha passage"]);
    assert_eq!(timing.rerank, Duration::ZERO);
}

#[test]
fn reranker_window_caps_candidates_handed_over() {
    let hits: Vec<(Chunk, f32)> = (0..12)
        .map(|i| (chunk("big.pdf", i, &format!("passage number {}", i)), 12.0 - i as f32))
        .collect();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let reranker = WindowRecordingReranker { seen: seen.clone() };

    let config = RetrievalConfig {
        top_k: 2,
        top_n_candidates: Some(5),
        ..RetrievalConfig::default()
    };
    let retriever = HybridRetriever::new(
        StubLexicalIndex { hits },
        StubVectorIndex { hits: vec![] },
        Some(Box::new(reranker)),
        config,
    );

    let results = retriever.search("passage").unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![5]);
    assert_eq!(results.len(), 2);
}

#[test]
fn no_reranker_returns_fusion_order_truncated() {
    let (lexical, vector) = scenario_sources();
    let config = RetrievalConfig { top_k: 1, ..RetrievalConfig::default() };
    let retriever = HybridRetriever::new(lexical, vector, None, config);

    let results = retriever.search("alpha beta").unwrap();

    assert_eq!(contents(&results), vec!["beta passage"]);
}

#[test]
fn duplicate_hits_collapse_to_one_result() {
    // Same identity surfaced by both sources as separately built copies.
    let meta = ChunkMetadata::new("x.pdf").with_page(1).with_chunk_id("c7");
    let from_vector = Chunk::new("shared passage", meta.clone());
    let from_lexical = Chunk::new("shared passage", meta);
    let solo = chunk("y.pdf", 0, "solo passage");

    let lexical =
        StubLexicalIndex { hits: vec![(from_lexical, 4.0), (solo.clone(), 2.0)] };
    let vector = StubVectorIndex { hits: vec![(from_vector, 0.2), (solo, 0.8)] };
    let retriever = HybridRetriever::new(lexical, vector, None, RetrievalConfig::default());

    let results = retriever.search("shared solo").unwrap();

    assert_eq!(results.len(), 2);
    let keys: HashSet<String> =
        results.iter().map(|c| c.stable_key().as_str().to_string()).collect();
    assert_eq!(keys.len(), results.len(), "stable keys must be unique");
}

#[test]
fn vector_errors_degrade_to_lexical_order() {
    let corpus = vec![
        chunk("a.md", 0, "postgres replication lag troubleshooting"),
        chunk("b.md", 0, "kubernetes ingress controller setup"),
        chunk("c.md", 0, "rust borrow checker lifetimes explained"),
    ];
    let retriever = HybridRetriever::new(
        LexicalIndex::new(corpus),
        FailingVectorIndex,
        None,
        RetrievalConfig::default(),
    );

    let results = retriever.search("kubernetes ingress").unwrap();

    assert!(!results.is_empty());
    assert_eq!(results[0].content, "kubernetes ingress controller setup");
}

#[test]
fn vector_panic_degrades_to_lexical_order() {
    let corpus = vec![
        chunk("a.md", 0, "postgres replication lag troubleshooting"),
        chunk("b.md", 0, "kubernetes ingress controller setup"),
    ];
    let retriever = HybridRetriever::new(
        LexicalIndex::new(corpus),
        PanickingVectorIndex,
        None,
        RetrievalConfig::default(),
    );

    let results = retriever.search("postgres replication").unwrap();

    assert_eq!(results[0].content, "postgres replication lag troubleshooting");
}

#[test]
fn empty_corpus_fails_the_search() {
    let retriever = HybridRetriever::new(
        LexicalIndex::new(Vec::new()),
        StubVectorIndex { hits: vec![(chunk("x.pdf", 0, "stray"), 0.1)] },
        None,
        RetrievalConfig::default(),
    );

    let err = retriever.search("anything").unwrap_err();
    assert!(matches!(err, Error::EmptyCorpus));
}

#[test]
fn blank_query_short_circuits_before_recall() {
    // Both sources would blow up if touched.
    let retriever = HybridRetriever::new(
        LexicalIndex::new(Vec::new()),
        PanickingVectorIndex,
        None,
        RetrievalConfig::default(),
    );

    let (results, timing) = retriever.search_with_timing("   \t ").unwrap();

    assert!(results.is_empty());
    assert_eq!(timing.recall, Duration::ZERO);
    assert_eq!(timing.rerank, Duration::ZERO);
}

#[test]
fn zero_top_k_short_circuits_before_recall() {
    let config = RetrievalConfig { top_k: 0, ..RetrievalConfig::default() };
    let retriever = HybridRetriever::new(
        LexicalIndex::new(Vec::new()),
        PanickingVectorIndex,
        None,
        config,
    );

    let results = retriever.search("a perfectly good query").unwrap();
    assert!(results.is_empty());
}

#[test]
fn repeated_searches_are_deterministic() {
    let corpus: Vec<Chunk> = [
        "retrieval quality depends on recall depth",
        "recall and precision trade off against each other",
        "lexical retrieval matches exact terms",
        "vector retrieval captures paraphrase",
        "reranking sharpens the fused candidate list",
        "chunk granularity shapes recall behaviour",
        "score fusion balances both retrieval sources",
        "stable identity keys deduplicate repeated chunks",
    ]
    .iter()
    .enumerate()
    .map(|(i, text)| chunk("handbook.md", i as u32, text))
    .collect();

    let config = RetrievalConfig { top_k: 5, ..RetrievalConfig::default() };
    let retriever = HybridRetriever::new(
        LexicalIndex::new(corpus.clone()),
        HashedVectorIndex { chunks: corpus },
        None,
        config,
    );

    let first = retriever.search("retrieval recall").unwrap();
    let second = retriever.search("retrieval recall").unwrap();

    assert!(!first.is_empty());
    assert_eq!(contents(&first), contents(&second));
}

#[test]
fn recall_depth_covers_the_rerank_window() {
    let probe = |config: RetrievalConfig| {
        let requested = Arc::new(Mutex::new(Vec::new()));
        let lexical = RecordingLexicalIndex {
            hits: vec![(chunk("a.md", 0, "lone passage"), 1.0)],
            requested: requested.clone(),
        };
        let retriever =
            HybridRetriever::new(lexical, StubVectorIndex { hits: vec![] }, None, config);
        retriever.search("passage").unwrap();
        let depths = requested.lock().unwrap().clone();
        depths
    };

    // defaults: window top_k * 8
    assert_eq!(probe(RetrievalConfig::default()), vec![32]);
    // a narrow window still recalls at least top_k * 4 deep
    let narrow = RetrievalConfig { top_n_candidates: Some(2), ..RetrievalConfig::default() };
    assert_eq!(probe(narrow), vec![16]);
}

#[test]
fn increasing_vector_weight_promotes_vector_hits() {
    let v_only = chunk("v.pdf", 0, "vector only");
    let l_only = chunk("l.pdf", 0, "lexical only");

    let order_for = |vector_weight: f32| {
        let lexical = StubLexicalIndex { hits: vec![(l_only.clone(), 3.0)] };
        let vector = StubVectorIndex { hits: vec![(v_only.clone(), 0.2)] };
        let config = RetrievalConfig { vector_weight, ..RetrievalConfig::default() };
        let retriever = HybridRetriever::new(lexical, vector, None, config);
        contents(&retriever.search("either").unwrap())
    };

    assert_eq!(order_for(0.1), vec!["lexical only", "vector only"]);
    assert_eq!(order_for(0.9), vec!["vector only", "lexical only"]);
}

#[test]
fn similarity_backend_skips_distance_inversion() {
    let near = chunk("n.pdf", 0, "near passage");
    let far = chunk("f.pdf", 0, "far passage");

    let order_for = |kind: VectorScoreKind| {
        let lexical =
            StubLexicalIndex { hits: vec![(near.clone(), 0.0), (far.clone(), 0.0)] };
        let vector =
            StubVectorIndex { hits: vec![(near.clone(), 0.9), (far.clone(), 0.2)] };
        let config = RetrievalConfig { vector_score: kind, ..RetrievalConfig::default() };
        let retriever = HybridRetriever::new(lexical, vector, None, config);
        contents(&retriever.search("passage").unwrap())
    };

    // read as distances, 0.2 is the better hit; read as similarities, 0.9 is
    assert_eq!(order_for(VectorScoreKind::Distance), vec!["far passage", "near passage"]);
    assert_eq!(order_for(VectorScoreKind::Similarity), vec!["near passage", "far passage"]);
}

#[test]
fn rerank_duration_reflects_stage_execution() {
    let hits: Vec<(Chunk, f32)> = (0..6)
        .map(|i| (chunk("t.pdf", i, &format!("timed passage {}", i)), 6.0 - i as f32))
        .collect();
    let config = RetrievalConfig { top_k: 2, ..RetrievalConfig::default() };
    let retriever = HybridRetriever::new(
        StubLexicalIndex { hits },
        StubVectorIndex { hits: vec![] },
        Some(Box::new(SleepingReranker { delay: Duration::from_millis(5) })),
        config,
    );

    let (results, timing) = retriever.search_with_timing("timed").unwrap();

    assert_eq!(results.len(), 2);
    assert!(timing.rerank >= Duration::from_millis(5), "rerank {:?}", timing.rerank);
    assert!(timing.total() >= timing.rerank);
}

#[test]
fn build_retriever_serves_snapshot_corpus() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot = dir.path().join("corpus.jsonl");
    save_corpus(
        &snapshot,
        &[
            chunk("guide.pdf", 0, "hybrid retrieval fuses two recall sources"),
            chunk("guide.pdf", 1, "reranking refines the candidate list"),
            chunk("notes.md", 0, "unrelated grocery list"),
        ],
    )
    .unwrap();

    let retriever = build_retriever(
        &snapshot,
        StubVectorIndex { hits: vec![] },
        RetrievalConfig::default(),
        None,
    )
    .unwrap();

    let results = retriever.search("hybrid retrieval sources").unwrap();
    assert!(!results.is_empty());
    assert_eq!(results[0].content, "hybrid retrieval fuses two recall sources");
}

#[test]
fn build_retriever_requires_the_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.jsonl");

    let err = build_retriever(
        &missing,
        StubVectorIndex { hits: vec![] },
        RetrievalConfig::default(),
        None,
    )
    .map(|_| ())
    .unwrap_err();

    assert!(matches!(err, Error::IndexUnavailable { .. }));
}
