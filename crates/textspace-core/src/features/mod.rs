//! Feature extraction strategies
//!
//! Turns a batch of documents into one numeric row per document:
//!
//! - **Lexical**: bag-of-words counts over the batch vocabulary
//! - **Emotion**: probability distribution over 7 emotions from a classifier
//! - **Neural**: first-position final-layer hidden state of a sequence model
//! - **Topic**: non-negative topic mixture fitted over the batch
//!
//! The two model-backed strategies reach their pretrained models through the
//! [`SequenceEncoder`] and [`EmotionClassifier`] handles held in [`Models`].
//!
//! # Example
//!
//! ```rust
//! use textspace_core::features::{FeatureExtractor, Models, StrategyKind};
//! use textspace_core::{Document, TextSpaceConfig};
//!
//! let docs = vec![
//!     Document::new(0, "Hello", "Adele", "hello from the other side"),
//!     Document::new(1, "Yesterday", "The Beatles", "all my troubles seemed so far away"),
//! ];
//! let extractor = FeatureExtractor::new(Models::new(), &TextSpaceConfig::default());
//! let matrix = extractor.extract(&docs, StrategyKind::Lexical).unwrap();
//! assert_eq!(matrix.nrows(), 2);
//! ```

pub mod emotion;
pub mod lexical;
pub mod neural;
pub mod topic;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::TextSpaceConfig;
use crate::document::{check_texts, Document};
use crate::error::{Result, TextSpaceError};

pub use emotion::{Emotion, EmotionClassifier, EmotionScores, EMOTION_COUNT};
pub use lexical::{BagOfWords, CountVectorizer};
pub use neural::SequenceEncoder;
pub use topic::TopicModel;

/// One row per document, one column per feature.
pub type FeatureMatrix = Array2<f64>;

/// The closed set of feature extraction strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    Lexical,
    Emotion,
    Neural,
    Topic,
}

impl StrategyKind {
    /// All strategies in the order they are offered to a viewer.
    pub const ALL: [StrategyKind; 4] = [
        StrategyKind::Emotion,
        StrategyKind::Neural,
        StrategyKind::Lexical,
        StrategyKind::Topic,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Lexical => "lexical",
            Self::Emotion => "emotion",
            Self::Neural => "neural",
            Self::Topic => "topic",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for StrategyKind {
    type Err = TextSpaceError;

    /// Case-insensitive; `bow` and `gpt2` are accepted as older names.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lexical" | "bow" => Ok(Self::Lexical),
            "emotion" => Ok(Self::Emotion),
            "neural" | "gpt2" => Ok(Self::Neural),
            "topic" => Ok(Self::Topic),
            other => Err(TextSpaceError::Configuration(format!(
                "unsupported strategy '{}', expected one of: lexical, emotion, neural, topic",
                other
            ))),
        }
    }
}

/// Handles to the pretrained models, loaded once by the caller.
#[derive(Clone, Default)]
pub struct Models {
    encoder: Option<Arc<dyn SequenceEncoder>>,
    emotion: Option<Arc<dyn EmotionClassifier>>,
}

impl Models {
    /// No models: only the lexical and topic strategies are available.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_encoder(mut self, encoder: Arc<dyn SequenceEncoder>) -> Self {
        self.encoder = Some(encoder);
        self
    }

    pub fn with_emotion_classifier(mut self, classifier: Arc<dyn EmotionClassifier>) -> Self {
        self.emotion = Some(classifier);
        self
    }

    pub fn encoder(&self) -> Option<&Arc<dyn SequenceEncoder>> {
        self.encoder.as_ref()
    }

    pub fn emotion_classifier(&self) -> Option<&Arc<dyn EmotionClassifier>> {
        self.emotion.as_ref()
    }
}

impl fmt::Debug for Models {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Models")
            .field("encoder", &self.encoder.as_ref().map(|e| e.name().to_string()))
            .field("emotion", &self.emotion.as_ref().map(|c| c.name().to_string()))
            .finish()
    }
}

/// Dispatches a batch to the selected strategy.
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    models: Models,
    vectorizer: CountVectorizer,
    topic_model: TopicModel,
    emotion_max_chars: usize,
    neural_max_tokens: usize,
}

impl FeatureExtractor {
    pub fn new(models: Models, config: &TextSpaceConfig) -> Self {
        Self {
            models,
            vectorizer: CountVectorizer::new(),
            topic_model: TopicModel::from_config(&config.topic),
            emotion_max_chars: config.emotion.max_chars,
            neural_max_tokens: config.neural.max_tokens,
        }
    }

    /// Whether the models needed by `strategy` were provided.
    pub fn supports(&self, strategy: StrategyKind) -> bool {
        match strategy {
            StrategyKind::Lexical | StrategyKind::Topic => true,
            StrategyKind::Emotion => self.models.emotion.is_some(),
            StrategyKind::Neural => self.models.encoder.is_some(),
        }
    }

    /// Extract by strategy name, as received from a selector.
    pub fn extract_named(&self, documents: &[Document], strategy: &str) -> Result<FeatureMatrix> {
        self.extract(documents, strategy.parse()?)
    }

    /// Compute the feature matrix of `documents` with `strategy`.
    pub fn extract(&self, documents: &[Document], strategy: StrategyKind) -> Result<FeatureMatrix> {
        check_texts(documents)?;
        let texts: Vec<&str> = documents.iter().map(|d| d.text.as_str()).collect();

        info!(
            "Extracting {} features for {} documents",
            strategy,
            documents.len()
        );

        let matrix = match strategy {
            StrategyKind::Lexical => self.vectorizer.fit_transform(&texts)?.counts,
            StrategyKind::Emotion => {
                let classifier = self.models.emotion.as_ref().ok_or_else(|| {
                    missing_model(strategy, "an emotion classifier")
                })?;
                emotion::emotion_matrix(classifier.as_ref(), &texts, self.emotion_max_chars)?
            }
            StrategyKind::Neural => {
                let encoder = self
                    .models
                    .encoder
                    .as_ref()
                    .ok_or_else(|| missing_model(strategy, "a sequence encoder"))?;
                neural::neural_matrix(encoder.as_ref(), &texts, self.neural_max_tokens)?
            }
            StrategyKind::Topic => {
                let bow = self.vectorizer.fit_transform(&texts)?;
                self.topic_model.fit_transform(&bow.counts)?
            }
        };

        if matrix.nrows() != documents.len() {
            return Err(TextSpaceError::InvariantViolation(format!(
                "{} strategy produced {} rows for {} documents",
                strategy,
                matrix.nrows(),
                documents.len()
            )));
        }

        debug!(
            "{} feature matrix: {} x {}",
            strategy,
            matrix.nrows(),
            matrix.ncols()
        );
        Ok(matrix)
    }
}

fn missing_model(strategy: StrategyKind, what: &str) -> TextSpaceError {
    TextSpaceError::Configuration(format!(
        "{} strategy requires {} but none was provided",
        strategy, what
    ))
}

/// First `max_chars` characters of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}
