//! Neural contextual embedding features.

use ndarray::Array2;

use crate::error::{Result, TextSpaceError};

/// A pretrained sequence model producing one vector per text.
///
/// Implementations take the final layer's hidden state at the first
/// position. They own tokenization, which means truncation to the context
/// window, padding and masking the padding out of attention.
pub trait SequenceEncoder: Send + Sync {
    /// Backend name, used in error messages.
    fn name(&self) -> &str;

    /// Length of every vector this encoder returns.
    fn hidden_size(&self) -> usize;

    /// Encode a batch of texts, one vector per text, in order.
    ///
    /// At most `max_tokens` tokens of each text are read. A backend whose
    /// own context window is shorter uses that instead.
    fn encode_batch(&self, texts: &[&str], max_tokens: usize) -> Result<Vec<Vec<f32>>>;
}

pub(crate) fn neural_matrix(
    encoder: &dyn SequenceEncoder,
    texts: &[&str],
    max_tokens: usize,
) -> Result<Array2<f64>> {
    let vectors = encoder.encode_batch(texts, max_tokens)?;
    let width = encoder.hidden_size();

    if vectors.len() != texts.len() {
        return Err(TextSpaceError::InvariantViolation(format!(
            "encoder '{}' returned {} vectors for {} texts",
            encoder.name(),
            vectors.len(),
            texts.len()
        )));
    }

    let mut matrix = Array2::<f64>::zeros((texts.len(), width));
    for (row, vector) in vectors.iter().enumerate() {
        if vector.len() != width {
            return Err(TextSpaceError::InvariantViolation(format!(
                "encoder '{}' returned a vector of length {} at row {}, expected {}",
                encoder.name(),
                vector.len(),
                row,
                width
            )));
        }
        for (col, &v) in vector.iter().enumerate() {
            matrix[[row, col]] = f64::from(v);
        }
    }
    Ok(matrix)
}
