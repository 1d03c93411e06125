//! Bag-of-words count features.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use ndarray::Array2;
use regex::Regex;

use crate::error::{Result, TextSpaceError};

/// Words of two or more word characters.
const TOKEN_PATTERN: &str = r"(?u)\b\w\w+\b";

fn compile_pattern(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| {
        TextSpaceError::InvariantViolation(format!("invalid token pattern '{}': {}", pattern, e))
    })
}

fn token_regex() -> Result<&'static Regex> {
    static TOKEN_RE: OnceLock<std::result::Result<Regex, String>> = OnceLock::new();
    TOKEN_RE
        .get_or_init(|| compile_pattern(TOKEN_PATTERN).map_err(|e| e.to_string()))
        .as_ref()
        .map_err(|e| TextSpaceError::InvariantViolation(e.clone()))
}

/// Count matrix together with the vocabulary indexing its columns.
#[derive(Debug, Clone)]
pub struct BagOfWords {
    /// Alphabetically ordered terms; `vocabulary[j]` labels column `j`
    pub vocabulary: Vec<String>,
    /// Documents x terms
    pub counts: Array2<f64>,
}

impl BagOfWords {
    /// Column of `term`, if it occurs in the batch.
    pub fn term_index(&self, term: &str) -> Option<usize> {
        self.vocabulary
            .binary_search_by(|t| t.as_str().cmp(term))
            .ok()
    }
}

/// Lower-casing word tokenizer and counter.
#[derive(Debug, Clone, Copy, Default)]
pub struct CountVectorizer;

impl CountVectorizer {
    pub fn new() -> Self {
        Self
    }

    /// Lower-cased tokens of `text` in order of appearance.
    pub fn tokenize(&self, text: &str) -> Result<Vec<String>> {
        let lowered = text.to_lowercase();
        Ok(token_regex()?
            .find_iter(&lowered)
            .map(|m| m.as_str().to_string())
            .collect())
    }

    /// Build the batch vocabulary and the document-term count matrix.
    ///
    /// Fails if no document contains a single token.
    pub fn fit_transform(&self, texts: &[&str]) -> Result<BagOfWords> {
        let tokenized = texts
            .iter()
            .map(|t| self.tokenize(t))
            .collect::<Result<Vec<_>>>()?;

        let mut index: BTreeMap<&str, usize> = BTreeMap::new();
        for tokens in &tokenized {
            for token in tokens {
                index.entry(token.as_str()).or_insert(0);
            }
        }
        if index.is_empty() {
            return Err(TextSpaceError::Validation(
                "empty vocabulary: no document contains a word of two or more characters"
                    .to_string(),
            ));
        }
        for (col, slot) in index.values_mut().enumerate() {
            *slot = col;
        }

        let mut counts = Array2::<f64>::zeros((texts.len(), index.len()));
        for (row, tokens) in tokenized.iter().enumerate() {
            for token in tokens {
                counts[[row, index[token.as_str()]]] += 1.0;
            }
        }

        let vocabulary = index.keys().map(|t| t.to_string()).collect();
        Ok(BagOfWords { vocabulary, counts })
    }
}
