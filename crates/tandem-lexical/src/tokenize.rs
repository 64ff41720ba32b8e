//! Tokenization for the lexical index.
//!
//! Lowercase, NFKD-normalize with combining marks stripped, split on
//! non-alphanumerics, drop short tokens. Stop-word removal and Snowball
//! stemming are opt-in; the default pipeline stays close to the plain
//! tokenization the corpus statistics were calibrated against.

use rust_stemmers::{Algorithm, Stemmer};
use unicode_normalization::UnicodeNormalization;

/// Common English stop words. Kept sorted: lookups binary-search it.
const ENGLISH_STOP_WORDS: &[&str] = &[
    "a", "all", "also", "an", "and", "are", "as", "at", "be", "been", "but", "by", "can",
    "could", "did", "do", "does", "for", "from", "had", "has", "have", "he", "if", "in", "is",
    "it", "its", "just", "may", "might", "must", "no", "not", "of", "on", "or", "our", "out",
    "should", "so", "than", "that", "the", "their", "then", "there", "they", "this", "to",
    "too", "up", "very", "was", "we", "were", "what", "when", "where", "which", "who", "will",
    "with", "would", "you", "your",
];

#[derive(Debug, Clone)]
pub struct TokenizerConfig {
    pub stop_words: bool,
    pub stemming: bool,
    pub stemmer_algorithm: Algorithm,
    pub min_token_length: usize,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            stop_words: false,
            stemming: false,
            stemmer_algorithm: Algorithm::English,
            min_token_length: 2,
        }
    }
}

impl TokenizerConfig {
    /// Stemming plus stop-word removal, for English prose corpora.
    pub fn enhanced() -> Self {
        Self { stop_words: true, stemming: true, ..Self::default() }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Tokenizer {
    config: TokenizerConfig,
}

impl Tokenizer {
    pub fn new(config: TokenizerConfig) -> Self {
        Self { config }
    }

    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let normalized: String = text
            .to_lowercase()
            .nfkd()
            .filter(|c| !unicode_normalization::char::is_combining_mark(*c))
            .collect();

        let mut tokens: Vec<String> = normalized
            .split(|c: char| !c.is_alphanumeric())
            .filter(|s| !s.is_empty() && s.len() >= self.config.min_token_length)
            .map(str::to_string)
            .collect();

        if self.config.stop_words {
            tokens.retain(|t| !is_stop_word(t));
        }
        if self.config.stemming {
            let stemmer = Stemmer::create(self.config.stemmer_algorithm);
            tokens = tokens.into_iter().map(|t| stemmer.stem(&t).to_string()).collect();
        }
        tokens
    }
}

fn is_stop_word(word: &str) -> bool {
    ENGLISH_STOP_WORDS.binary_search(&word).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_word_table_is_sorted() {
        // binary_search silently misses entries otherwise
        assert!(ENGLISH_STOP_WORDS.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn lowercases_and_splits_on_non_alphanumerics() {
        let t = Tokenizer::default();
        assert_eq!(t.tokenize("Hello, World! BM25-scoring"), ["hello", "world", "bm25", "scoring"]);
    }

    #[test]
    fn strips_accents_via_nfkd() {
        let t = Tokenizer::default();
        assert_eq!(t.tokenize("Café Résumé"), ["cafe", "resume"]);
    }

    #[test]
    fn drops_tokens_below_min_length() {
        let t = Tokenizer::default();
        assert_eq!(t.tokenize("a I x yz"), ["yz"]);
    }

    #[test]
    fn stop_words_filtered_when_enabled() {
        let t = Tokenizer::new(TokenizerConfig { stop_words: true, ..TokenizerConfig::default() });
        assert_eq!(t.tokenize("the cat and the mat"), ["cat", "mat"]);
    }

    #[test]
    fn stemming_folds_inflections() {
        let t = Tokenizer::new(TokenizerConfig::enhanced());
        assert_eq!(t.tokenize("running runs"), ["run", "run"]);
    }

    #[test]
    fn symbols_only_yields_nothing() {
        let t = Tokenizer::default();
        assert!(t.tokenize("!!! ??? ...").is_empty());
    }
}
