//! ONNX Runtime session handling shared by the model backends.

use std::path::Path;

use ndarray::{Array2, ArrayViewD, Axis, Ix3};
use ort::session::{builder::GraphOptimizationLevel, Session};
use thiserror::Error;
use textspace_core::TextSpaceError;
use tracing::info;

use crate::tokenizer::PaddedBatch;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    #[error("failed to load tokenizer: {0}")]
    TokenizerLoad(String),

    #[error("tokenization failed: {0}")]
    Tokenization(String),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid backend configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;

impl From<EngineError> for TextSpaceError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::Config(message) => TextSpaceError::Configuration(message),
            other => TextSpaceError::model("onnx", other.to_string()),
        }
    }
}

/// Open an ONNX model with full graph optimisation.
///
/// `num_threads == 0` leaves the intra-op thread count to the runtime.
pub(crate) fn load_session(model_path: &Path, num_threads: usize) -> Result<Session> {
    if !model_path.exists() {
        return Err(EngineError::ModelLoad(format!(
            "model file not found: {}",
            model_path.display()
        )));
    }
    info!("Loading ONNX model from {}", model_path.display());

    let mut builder = Session::builder()
        .map_err(|e| EngineError::ModelLoad(e.to_string()))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| EngineError::ModelLoad(e.to_string()))?;

    if num_threads > 0 {
        builder = builder
            .with_intra_threads(num_threads)
            .map_err(|e| EngineError::ModelLoad(e.to_string()))?;
    }

    builder
        .commit_from_file(model_path)
        .map_err(|e| EngineError::ModelLoad(e.to_string()))
}

/// Run `session` on a padded batch and copy out the named `f32` output.
pub(crate) fn run_batch(
    session: &Session,
    batch: PaddedBatch,
    output_name: &str,
) -> Result<ndarray::ArrayD<f32>> {
    let outputs = session
        .run(
            ort::inputs! {
                "input_ids" => batch.input_ids,
                "attention_mask" => batch.attention_mask,
            }
            .map_err(|e| EngineError::Inference(e.to_string()))?,
        )
        .map_err(|e| EngineError::Inference(e.to_string()))?;

    let output = outputs
        .get(output_name)
        .ok_or_else(|| EngineError::Inference(format!("model has no output '{}'", output_name)))?;
    let tensor: ArrayViewD<f32> = output
        .try_extract_tensor()
        .map_err(|e| EngineError::Inference(e.to_string()))?;
    Ok(tensor.to_owned())
}

/// Hidden state at position 0 of every sequence.
///
/// `hidden` has shape `(batch, seq_len, hidden_size)`.
pub fn first_position(hidden: ArrayViewD<'_, f32>) -> Result<Array2<f32>> {
    let hidden = hidden.into_dimensionality::<Ix3>().map_err(|_| {
        EngineError::Inference("expected a (batch, seq_len, hidden) output".to_string())
    })?;
    if hidden.len_of(Axis(1)) == 0 {
        return Err(EngineError::Inference("output has no positions".to_string()));
    }
    Ok(hidden.index_axis(Axis(1), 0).to_owned())
}

/// Row-wise softmax of classifier logits.
pub fn softmax_rows(logits: ArrayViewD<'_, f32>) -> Result<Array2<f32>> {
    let mut probs = logits
        .into_dimensionality::<ndarray::Ix2>()
        .map_err(|_| EngineError::Inference("expected a (batch, labels) output".to_string()))?
        .to_owned();
    for mut row in probs.rows_mut() {
        let max = row.fold(f32::NEG_INFINITY, |m, &v| m.max(v));
        row.mapv_inplace(|v| (v - max).exp());
        let sum = row.sum();
        row.mapv_inplace(|v| v / sum);
    }
    Ok(probs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array3};
    use textspace_core::ErrorKind;

    #[test]
    fn first_position_takes_position_zero() {
        let hidden = Array3::from_shape_fn((2, 3, 4), |(b, s, h)| (b * 100 + s * 10 + h) as f32);
        let out = first_position(hidden.view().into_dyn()).unwrap();
        assert_eq!(out, array![[0.0, 1.0, 2.0, 3.0], [100.0, 101.0, 102.0, 103.0]]);
    }

    #[test]
    fn first_position_rejects_pooled_output() {
        let pooled = Array2::<f32>::zeros((2, 4));
        assert!(first_position(pooled.view().into_dyn()).is_err());
    }

    #[test]
    fn softmax_rows_sum_to_one() {
        let logits = array![[1.0f32, 2.0, 3.0], [1000.0, 1000.0, 1000.0]];
        let probs = softmax_rows(logits.view().into_dyn()).unwrap();
        for row in probs.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-6);
        }
        assert!(probs[[0, 2]] > probs[[0, 1]] && probs[[0, 1]] > probs[[0, 0]]);
        assert!((probs[[1, 0]] - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn engine_errors_map_to_pipeline_kinds() {
        let err: TextSpaceError = EngineError::Inference("boom".into()).into();
        assert_eq!(err.kind(), ErrorKind::Model);
        let err: TextSpaceError = EngineError::Config("bad labels".into()).into();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn missing_model_file() {
        assert!(matches!(
            load_session(Path::new("/nonexistent/model.onnx"), 0),
            Err(EngineError::ModelLoad(_))
        ));
    }
}
