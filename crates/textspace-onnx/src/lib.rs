//! ONNX Runtime backends for TextSpace
//!
//! Provides the pretrained models behind the neural and emotion strategies:
//! a causal language model read at its first position, and a seven-way
//! emotion classifier. Both are loaded once and shared through
//! [`textspace_core::Models`].
//!
//! The ONNX Runtime library is loaded at run time from `ORT_DYLIB_PATH`.

pub mod classifier;
pub mod encoder;
pub mod engine;
pub mod tokenizer;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use textspace_core::Models;
use tracing::info;

pub use classifier::{ClassifierConfig, OnnxEmotionClassifier, DEFAULT_LABEL_ORDER};
pub use encoder::{EncoderConfig, OnnxSequenceEncoder};
pub use engine::{EngineError, Result};
pub use tokenizer::{pad_batch, PaddedBatch, TextTokenizer};

/// Which model backends to load. Absent entries leave the matching strategy
/// unavailable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OnnxModelsConfig {
    pub encoder: Option<EncoderConfig>,
    pub emotion: Option<ClassifierConfig>,
}

impl OnnxModelsConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| EngineError::Config(format!("invalid model config JSON: {}", e)))
    }

    /// Load every configured backend.
    pub fn load(&self) -> Result<Models> {
        let mut models = Models::new();
        if let Some(config) = &self.encoder {
            let encoder = OnnxSequenceEncoder::load(config.clone())?;
            info!("Sequence encoder ready ({} dims)", config.hidden_size);
            models = models.with_encoder(Arc::new(encoder));
        }
        if let Some(config) = &self.emotion {
            let classifier = OnnxEmotionClassifier::load(config.clone())?;
            info!("Emotion classifier ready");
            models = models.with_emotion_classifier(Arc::new(classifier));
        }
        Ok(models)
    }
}
