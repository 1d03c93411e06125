//! Batch tokenization into padded model inputs.

use std::path::Path;

use ndarray::Array2;
use tokenizers::tokenizer::Tokenizer;

use crate::engine::{EngineError, Result};

/// `input_ids` and `attention_mask` for one batch, shape `(batch, seq_len)`.
#[derive(Debug, Clone, PartialEq)]
pub struct PaddedBatch {
    pub input_ids: Array2<i64>,
    pub attention_mask: Array2<i64>,
}

impl PaddedBatch {
    pub fn batch_size(&self) -> usize {
        self.input_ids.nrows()
    }

    pub fn seq_len(&self) -> usize {
        self.input_ids.ncols()
    }
}

/// Right-pad token sequences to the longest one in the batch.
///
/// Sequences longer than `max_tokens` are cut. Padding positions hold
/// `pad_id` and are masked out with 0.
pub fn pad_batch(sequences: &[Vec<u32>], max_tokens: usize, pad_id: u32) -> PaddedBatch {
    let seq_len = sequences
        .iter()
        .map(|s| s.len().min(max_tokens))
        .max()
        .unwrap_or(0)
        .max(1);

    let mut input_ids = Array2::<i64>::from_elem((sequences.len(), seq_len), pad_id as i64);
    let mut attention_mask = Array2::<i64>::zeros((sequences.len(), seq_len));
    for (row, ids) in sequences.iter().enumerate() {
        for (col, &id) in ids.iter().take(seq_len).enumerate() {
            input_ids[[row, col]] = id as i64;
            attention_mask[[row, col]] = 1;
        }
    }

    PaddedBatch {
        input_ids,
        attention_mask,
    }
}

/// Tokenizer for a sequence model, producing [`PaddedBatch`]es.
pub struct TextTokenizer {
    tokenizer: Tokenizer,
    max_tokens: usize,
    pad_id: u32,
}

impl TextTokenizer {
    /// Load a `tokenizer.json`.
    pub fn from_file(path: impl AsRef<Path>, max_tokens: usize) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(EngineError::TokenizerLoad(format!(
                "tokenizer file not found: {}",
                path.display()
            )));
        }
        let tokenizer =
            Tokenizer::from_file(path).map_err(|e| EngineError::TokenizerLoad(e.to_string()))?;
        Self::from_tokenizer(tokenizer, max_tokens)
    }

    /// Wrap an already built tokenizer.
    ///
    /// Padding and truncation configured in the tokenizer itself are turned
    /// off; [`pad_batch`] takes care of both.
    pub fn from_tokenizer(mut tokenizer: Tokenizer, max_tokens: usize) -> Result<Self> {
        if max_tokens == 0 {
            return Err(EngineError::InvalidInput(
                "max_tokens must be greater than zero".to_string(),
            ));
        }
        let pad_id = tokenizer.get_padding().map(|p| p.pad_id).unwrap_or(0);
        tokenizer.with_padding(None);
        tokenizer
            .with_truncation(None)
            .map_err(|e| EngineError::TokenizerLoad(e.to_string()))?;

        Ok(Self {
            tokenizer,
            max_tokens,
            pad_id,
        })
    }

    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    /// Token ids of `text`, special tokens included, before cutting.
    pub fn token_ids(&self, text: &str) -> Result<Vec<u32>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| EngineError::Tokenization(e.to_string()))?;
        Ok(encoding.get_ids().to_vec())
    }

    /// Tokenize and pad a batch of texts.
    pub fn encode_batch(&self, texts: &[&str]) -> Result<PaddedBatch> {
        self.encode_batch_within(texts, self.max_tokens)
    }

    /// Like [`encode_batch`](Self::encode_batch), cutting each text at
    /// `limit` tokens when that is shorter than the tokenizer's own window.
    pub fn encode_batch_within(&self, texts: &[&str], limit: usize) -> Result<PaddedBatch> {
        if limit == 0 {
            return Err(EngineError::InvalidInput(
                "token limit must be greater than zero".to_string(),
            ));
        }
        if texts.is_empty() {
            return Err(EngineError::InvalidInput("empty input".to_string()));
        }
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| EngineError::Tokenization(e.to_string()))?;
        let sequences: Vec<Vec<u32>> = encodings.iter().map(|e| e.get_ids().to_vec()).collect();
        Ok(pad_batch(&sequences, limit.min(self.max_tokens), self.pad_id))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use ndarray::array;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    pub(crate) const WORD_LEVEL: &str = r#"{
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [],
        "normalizer": null,
        "pre_tokenizer": {"type": "Whitespace"},
        "post_processor": null,
        "decoder": null,
        "model": {
            "type": "WordLevel",
            "vocab": {"[UNK]": 0, "[PAD]": 1, "hello": 2, "world": 3, "the": 4, "sea": 5},
            "unk_token": "[UNK]"
        }
    }"#;

    fn word_level() -> Tokenizer {
        Tokenizer::from_str(WORD_LEVEL).unwrap()
    }

    #[test]
    fn pads_to_longest_on_the_right() {
        let batch = pad_batch(&[vec![7, 8, 9], vec![5]], 16, 0);
        assert_eq!(batch.input_ids, array![[7, 8, 9], [5, 0, 0]]);
        assert_eq!(batch.attention_mask, array![[1, 1, 1], [1, 0, 0]]);
    }

    #[test]
    fn cuts_at_max_tokens() {
        let batch = pad_batch(&[vec![1, 2, 3, 4, 5], vec![6, 7]], 3, 9);
        assert_eq!(batch.seq_len(), 3);
        assert_eq!(batch.input_ids, array![[1, 2, 3], [6, 7, 9]]);
        assert_eq!(batch.attention_mask, array![[1, 1, 1], [1, 1, 0]]);
    }

    #[test]
    fn empty_sequence_keeps_one_masked_column() {
        let batch = pad_batch(&[vec![]], 8, 0);
        assert_eq!(batch.batch_size(), 1);
        assert_eq!(batch.attention_mask, array![[0]]);
    }

    #[test]
    fn encodes_batch_with_word_level_model() {
        let tokenizer = TextTokenizer::from_tokenizer(word_level(), 8).unwrap();
        let batch = tokenizer.encode_batch(&["hello the sea", "world"]).unwrap();
        assert_eq!(batch.input_ids, array![[2, 4, 5], [3, 0, 0]]);
        assert_eq!(batch.attention_mask, array![[1, 1, 1], [1, 0, 0]]);
        assert_eq!(tokenizer.token_ids("unknown sea").unwrap(), vec![0, 5]);
    }

    #[test]
    fn caller_limit_cuts_below_the_window() {
        let tokenizer = TextTokenizer::from_tokenizer(word_level(), 8).unwrap();
        let batch = tokenizer
            .encode_batch_within(&["hello the sea", "world"], 2)
            .unwrap();
        assert_eq!(batch.input_ids, array![[2, 4], [3, 0]]);
        assert_eq!(batch.attention_mask, array![[1, 1], [1, 0]]);

        let wide = tokenizer
            .encode_batch_within(&["hello the sea world"], 100)
            .unwrap();
        assert_eq!(wide.seq_len(), 4);
        assert!(matches!(
            tokenizer.encode_batch_within(&["hello"], 0),
            Err(EngineError::InvalidInput(_))
        ));
    }

    #[test]
    fn rejects_empty_batch_and_zero_window() {
        let tokenizer = TextTokenizer::from_tokenizer(word_level(), 8).unwrap();
        assert!(matches!(
            tokenizer.encode_batch(&[]),
            Err(EngineError::InvalidInput(_))
        ));
        assert!(TextTokenizer::from_tokenizer(word_level(), 0).is_err());
        assert!(matches!(
            TextTokenizer::from_file("/nonexistent/tokenizer.json", 8),
            Err(EngineError::TokenizerLoad(_))
        ));
    }
}
