//! Causal language model encoder for the neural strategy.

use std::path::{Path, PathBuf};

use ort::session::Session;
use serde::{Deserialize, Serialize};
use textspace_core::{Result as PipelineResult, SequenceEncoder, TextSpaceError};
use tracing::debug;

use crate::engine::{first_position, load_session, run_batch, EngineError, Result};
use crate::tokenizer::TextTokenizer;

/// Configuration of an exported sequence model (GPT-2 by default).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// Path to the ONNX model file
    pub model_path: PathBuf,
    /// Path to the tokenizer.json file
    pub tokenizer_path: PathBuf,
    /// Context window; longer texts are cut. The pipeline's
    /// `neural.max_tokens` can only lower it.
    pub max_tokens: usize,
    /// Width of the final hidden state
    pub hidden_size: usize,
    /// Name of the hidden-state output
    pub output_name: String,
    /// Texts per inference call
    pub batch_size: usize,
    /// Number of threads for inference (0 = auto)
    pub num_threads: usize,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::new(),
            tokenizer_path: PathBuf::new(),
            max_tokens: 1024,
            hidden_size: 768,
            output_name: "last_hidden_state".to_string(),
            batch_size: 8,
            num_threads: 0,
        }
    }
}

impl EncoderConfig {
    pub fn new(model_path: impl Into<PathBuf>, tokenizer_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            tokenizer_path: tokenizer_path.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_tokens == 0 || self.hidden_size == 0 || self.batch_size == 0 {
            return Err(EngineError::Config(
                "encoder max_tokens, hidden_size and batch_size must be greater than zero"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

/// [`SequenceEncoder`] over an ONNX Runtime session.
pub struct OnnxSequenceEncoder {
    name: String,
    session: Session,
    tokenizer: TextTokenizer,
    config: EncoderConfig,
}

impl OnnxSequenceEncoder {
    pub fn load(config: EncoderConfig) -> Result<Self> {
        config.validate()?;
        let tokenizer = TextTokenizer::from_file(&config.tokenizer_path, config.max_tokens)?;
        let session = load_session(&config.model_path, config.num_threads)?;
        Ok(Self {
            name: backend_name("encoder", &config.model_path),
            session,
            tokenizer,
            config,
        })
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    fn encode_chunk(&self, texts: &[&str], max_tokens: usize) -> Result<Vec<Vec<f32>>> {
        let batch = self.tokenizer.encode_batch_within(texts, max_tokens)?;
        debug!(
            "Encoding {} texts, padded length {}",
            batch.batch_size(),
            batch.seq_len()
        );
        let hidden = run_batch(&self.session, batch, &self.config.output_name)?;
        let states = first_position(hidden.view())?;

        if states.ncols() != self.config.hidden_size {
            return Err(EngineError::Inference(format!(
                "hidden size {} does not match configured {}",
                states.ncols(),
                self.config.hidden_size
            )));
        }
        Ok(states.rows().into_iter().map(|r| r.to_vec()).collect())
    }
}

impl SequenceEncoder for OnnxSequenceEncoder {
    fn name(&self) -> &str {
        &self.name
    }

    fn hidden_size(&self) -> usize {
        self.config.hidden_size
    }

    fn encode_batch(&self, texts: &[&str], max_tokens: usize) -> PipelineResult<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.config.batch_size) {
            let encoded = self
                .encode_chunk(chunk, max_tokens)
                .map_err(|e| TextSpaceError::model(&self.name, e.to_string()))?;
            vectors.extend(encoded);
        }
        Ok(vectors)
    }
}

/// `onnx:<role>:<file stem>`, used in error messages.
pub(crate) fn backend_name(role: &str, model_path: &Path) -> String {
    let stem = model_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "model".to_string());
    format!("onnx:{}:{}", role, stem)
}
