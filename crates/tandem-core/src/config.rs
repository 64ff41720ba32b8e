//! Layered configuration and path helpers.
//!
//! Figment merges `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (nested keys split on `__`). Typed sections carry serde defaults so
//! partial files and bare environments both work.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Default model for the cross-encoder rerank backend.
pub const DEFAULT_RERANKER_MODEL_ID: &str = "BAAI/bge-reranker-base";

/// How the vector backend's per-result score is read during fusion.
///
/// `Distance`: lower is more similar; min-max inverted before weighting.
/// `Similarity`: already higher-is-better; taken as-is. Getting this
/// wrong silently inverts the vector half of the ranking, which is why
/// it is explicit configuration instead of an assumption.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorScoreKind {
    #[default]
    Distance,
    Similarity,
}

/// Which rerank implementation the factory should construct.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RerankBackend {
    #[default]
    CrossEncoder,
    Llm,
}

/// Rerank stage settings; the stage is off by default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankConfig {
    pub enabled: bool,
    pub backend: RerankBackend,
    pub model_id: String,
    /// Explicit model directory; overrides env and conventional lookup.
    pub model_dir: Option<String>,
    pub batch_size: usize,
}

impl Default for RerankConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            backend: RerankBackend::default(),
            model_id: DEFAULT_RERANKER_MODEL_ID.to_string(),
            model_dir: None,
            batch_size: 32,
        }
    }
}

/// Retrieval engine settings.
///
/// `vector_weight` and `bm25_weight` need not sum to 1 and fused scores
/// are not renormalized after weighting; calibrating the pair is the
/// caller's responsibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
    pub vector_weight: f32,
    pub bm25_weight: f32,
    /// Fused candidates kept for the rerank stage; `None` means `top_k * 8`.
    pub top_n_candidates: Option<usize>,
    pub vector_score: VectorScoreKind,
    pub rerank: RerankConfig,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 4,
            vector_weight: 0.65,
            bm25_weight: 0.35,
            top_n_candidates: None,
            vector_score: VectorScoreKind::default(),
            rerank: RerankConfig::default(),
        }
    }
}

impl RetrievalConfig {
    /// Size of the fused candidate window handed to the rerank stage.
    pub fn candidate_window(&self) -> usize {
        self.top_n_candidates.unwrap_or(self.top_k * 8)
    }

    /// How many candidates to request from each recall source.
    pub fn recall_k(&self) -> usize {
        self.candidate_window().max(self.top_k * 4)
    }
}

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        Ok(Self { figment })
    }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::InvalidConfig(format!("failed to get '{}': {}", key, e)))
    }

    /// The `retriever` section, or full defaults when no source sets it.
    pub fn retrieval(&self) -> Result<RetrievalConfig> {
        if self.figment.find_value("retriever").is_ok() {
            self.get("retriever")
        } else {
            Ok(RetrievalConfig::default())
        }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Locate the cross-encoder model directory.
///
/// Order: explicit `rerank.model_dir`, then the `APP_RERANKER_DIR` env
/// var, then `models/<model_id basename>` under the working directory.
/// Existence is not checked here; the model loader reports a missing
/// directory as an unavailable reranker.
pub fn resolve_model_dir(rerank: &RerankConfig) -> PathBuf {
    if let Some(dir) = &rerank.model_dir {
        return expand_path(dir);
    }
    if let Ok(dir) = env::var("APP_RERANKER_DIR") {
        return expand_path(dir);
    }
    let basename = rerank.model_id.rsplit('/').next().unwrap_or(&rerank.model_id);
    Path::new("models").join(basename)
}
