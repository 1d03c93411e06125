//! Emotion classifier score features.

use std::fmt;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::truncate_chars;
use crate::error::{Result, TextSpaceError};

/// Number of emotion labels.
pub const EMOTION_COUNT: usize = 7;

/// Tolerance on the sum of a score row.
const SUM_TOLERANCE: f32 = 1e-3;

/// The fixed, ordered emotion label set. The discriminant is the column index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Neutral = 0,
    Disgust = 1,
    Anger = 2,
    Fear = 3,
    Sadness = 4,
    Joy = 5,
    Surprise = 6,
}

impl Emotion {
    pub const ALL: [Emotion; EMOTION_COUNT] = [
        Emotion::Neutral,
        Emotion::Disgust,
        Emotion::Anger,
        Emotion::Fear,
        Emotion::Sadness,
        Emotion::Joy,
        Emotion::Surprise,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Neutral => "neutral",
            Self::Disgust => "disgust",
            Self::Anger => "anger",
            Self::Fear => "fear",
            Self::Sadness => "sadness",
            Self::Joy => "joy",
            Self::Surprise => "surprise",
        }
    }

    /// Case-insensitive lookup by label.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|e| e.label().eq_ignore_ascii_case(label.trim()))
    }

    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Probabilities indexed by [`Emotion::index`].
pub type EmotionScores = [f32; EMOTION_COUNT];

/// A pretrained text classifier over the [`Emotion`] label set.
pub trait EmotionClassifier: Send + Sync {
    /// Backend name, used in error messages.
    fn name(&self) -> &str;

    /// Score a single text.
    fn classify(&self, text: &str) -> Result<EmotionScores>;

    /// Score a batch of texts.
    ///
    /// The default implementation calls [`classify`](EmotionClassifier::classify)
    /// sequentially. Backends that batch natively should override it.
    fn classify_batch(&self, texts: &[&str]) -> Result<Vec<EmotionScores>> {
        texts.iter().map(|t| self.classify(t)).collect()
    }
}

/// Score each text (cut to `max_chars`) and stack the distributions.
pub(crate) fn emotion_matrix(
    classifier: &dyn EmotionClassifier,
    texts: &[&str],
    max_chars: usize,
) -> Result<Array2<f64>> {
    let truncated: Vec<&str> = texts.iter().map(|t| truncate_chars(t, max_chars)).collect();
    let scores = classifier.classify_batch(&truncated)?;

    if scores.len() != texts.len() {
        return Err(TextSpaceError::model(
            classifier.name(),
            format!("returned {} score rows for {} texts", scores.len(), texts.len()),
        ));
    }

    let mut matrix = Array2::<f64>::zeros((texts.len(), EMOTION_COUNT));
    for (row, dist) in scores.iter().enumerate() {
        check_distribution(classifier.name(), row, dist)?;
        for (col, &p) in dist.iter().enumerate() {
            matrix[[row, col]] = f64::from(p);
        }
    }
    Ok(matrix)
}

fn check_distribution(backend: &str, row: usize, dist: &EmotionScores) -> Result<()> {
    if let Some(&p) = dist.iter().find(|p| !(0.0..=1.0).contains(*p)) {
        return Err(TextSpaceError::model(
            backend,
            format!("score {} outside [0, 1] at row {}", p, row),
        ));
    }
    let sum: f32 = dist.iter().sum();
    if (sum - 1.0).abs() > SUM_TOLERANCE {
        return Err(TextSpaceError::model(
            backend,
            format!("scores at row {} sum to {}, not 1", row, sum),
        ));
    }
    Ok(())
}
