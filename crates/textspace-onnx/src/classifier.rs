//! Sequence classification model for the emotion strategy.

use std::path::PathBuf;

use ndarray::ArrayView2;
use ort::session::Session;
use serde::{Deserialize, Serialize};
use textspace_core::features::{Emotion, EMOTION_COUNT};
use textspace_core::{EmotionClassifier, EmotionScores, Result as PipelineResult, TextSpaceError};
use tracing::debug;

use crate::encoder::backend_name;
use crate::engine::{load_session, run_batch, softmax_rows, EngineError, Result};
use crate::tokenizer::TextTokenizer;

/// Output label order of the j-hartmann English emotion model.
pub const DEFAULT_LABEL_ORDER: [&str; EMOTION_COUNT] = [
    "anger", "disgust", "fear", "joy", "neutral", "sadness", "surprise",
];

/// Configuration of an exported emotion classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Path to the ONNX model file
    pub model_path: PathBuf,
    /// Path to the tokenizer.json file
    pub tokenizer_path: PathBuf,
    /// Model input window
    pub max_tokens: usize,
    /// Name of the logits output
    pub output_name: String,
    /// Emotion label of each logit column, in model order
    pub label_order: Vec<String>,
    /// Texts per inference call
    pub batch_size: usize,
    /// Number of threads for inference (0 = auto)
    pub num_threads: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::new(),
            tokenizer_path: PathBuf::new(),
            max_tokens: 512,
            output_name: "logits".to_string(),
            label_order: DEFAULT_LABEL_ORDER.iter().map(|s| s.to_string()).collect(),
            batch_size: 16,
            num_threads: 0,
        }
    }
}

impl ClassifierConfig {
    pub fn new(model_path: impl Into<PathBuf>, tokenizer_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            tokenizer_path: tokenizer_path.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_tokens == 0 || self.batch_size == 0 {
            return Err(EngineError::Config(
                "classifier max_tokens and batch_size must be greater than zero".to_string(),
            ));
        }
        label_columns(&self.label_order).map(|_| ())
    }
}

/// For every model column, the [`Emotion::index`] it feeds.
///
/// Each of the seven emotions must appear exactly once.
pub fn label_columns(labels: &[String]) -> Result<[usize; EMOTION_COUNT]> {
    if labels.len() != EMOTION_COUNT {
        return Err(EngineError::Config(format!(
            "expected {} emotion labels, got {}",
            EMOTION_COUNT,
            labels.len()
        )));
    }
    let mut columns = [0usize; EMOTION_COUNT];
    let mut seen = [false; EMOTION_COUNT];
    for (col, label) in labels.iter().enumerate() {
        let emotion = Emotion::from_label(label)
            .ok_or_else(|| EngineError::Config(format!("unknown emotion label '{}'", label)))?;
        if seen[emotion.index()] {
            return Err(EngineError::Config(format!(
                "emotion label '{}' listed twice",
                label
            )));
        }
        seen[emotion.index()] = true;
        columns[col] = emotion.index();
    }
    Ok(columns)
}

/// Reorder model-ordered probabilities into [`Emotion`] order.
pub fn to_emotion_scores(
    probs: ArrayView2<'_, f32>,
    columns: &[usize; EMOTION_COUNT],
) -> Result<Vec<EmotionScores>> {
    if probs.ncols() != EMOTION_COUNT {
        return Err(EngineError::Inference(format!(
            "classifier returned {} labels, expected {}",
            probs.ncols(),
            EMOTION_COUNT
        )));
    }
    Ok(probs
        .rows()
        .into_iter()
        .map(|row| {
            let mut scores = [0.0f32; EMOTION_COUNT];
            for (col, &p) in row.iter().enumerate() {
                scores[columns[col]] = p;
            }
            scores
        })
        .collect())
}

/// [`EmotionClassifier`] over an ONNX Runtime session.
pub struct OnnxEmotionClassifier {
    name: String,
    session: Session,
    tokenizer: TextTokenizer,
    columns: [usize; EMOTION_COUNT],
    config: ClassifierConfig,
}

impl OnnxEmotionClassifier {
    pub fn load(config: ClassifierConfig) -> Result<Self> {
        config.validate()?;
        let columns = label_columns(&config.label_order)?;
        let tokenizer = TextTokenizer::from_file(&config.tokenizer_path, config.max_tokens)?;
        let session = load_session(&config.model_path, config.num_threads)?;
        Ok(Self {
            name: backend_name("emotion", &config.model_path),
            session,
            tokenizer,
            columns,
            config,
        })
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    fn classify_chunk(&self, texts: &[&str]) -> Result<Vec<EmotionScores>> {
        let batch = self.tokenizer.encode_batch(texts)?;
        debug!("Classifying {} texts", batch.batch_size());
        let logits = run_batch(&self.session, batch, &self.config.output_name)?;
        let probs = softmax_rows(logits.view())?;
        to_emotion_scores(probs.view(), &self.columns)
    }
}

impl EmotionClassifier for OnnxEmotionClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn classify(&self, text: &str) -> PipelineResult<EmotionScores> {
        self.classify_batch(&[text])?
            .into_iter()
            .next()
            .ok_or_else(|| TextSpaceError::model(&self.name, "no scores returned"))
    }

    fn classify_batch(&self, texts: &[&str]) -> PipelineResult<Vec<EmotionScores>> {
        let mut scores = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.config.batch_size) {
            let chunk_scores = self
                .classify_chunk(chunk)
                .map_err(|e| TextSpaceError::model(&self.name, e.to_string()))?;
            scores.extend(chunk_scores);
        }
        Ok(scores)
    }
}
