use std::env;
use std::path::PathBuf;

use tracing_subscriber::EnvFilter;

use tandem_core::config::{expand_path, Config};
use tandem_core::traits::VectorSearch;
use tandem_core::types::Chunk;
use tandem_hybrid::{build_retriever, format_results};

/// Stand-in for an embedding backend: contributes no hits, so the engine
/// serves lexical recall plus reranking from the snapshot alone. A real
/// vector index plugs in through the same trait.
struct NoVectorIndex;

impl VectorSearch for NoVectorIndex {
    fn search(&self, _query: &str, _k: usize) -> anyhow::Result<Vec<(Chunk, f32)>> {
        Ok(Vec::new())
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn main() -> anyhow::Result<()> {
    init_logging();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <query> [snapshot]", args[0]);
        eprintln!("Example: {} 'fusion weights' data/corpus.jsonl", args[0]);
        std::process::exit(1);
    }
    let query_text = &args[1];

    let config = Config::load()?;
    let retrieval = config.retrieval()?;
    let snapshot = args.get(2).map(PathBuf::from).unwrap_or_else(|| {
        let path: String = config
            .get("data.corpus_snapshot")
            .unwrap_or_else(|_| "data/corpus.jsonl".to_string());
        expand_path(path)
    });

    println!("🔍 tandem-search\n================");
    println!("Query: {}", query_text);
    println!("Snapshot: {}", snapshot.display());

    let retriever = build_retriever(&snapshot, NoVectorIndex, retrieval, None)?;
    let (results, timing) = retriever.search_with_timing(query_text)?;

    println!("\n{}", format_results(&results));
    println!("⏱  recall {:?}, rerank {:?}", timing.recall, timing.rerank);
    Ok(())
}
