//! Topic-mixture features via non-negative matrix factorisation.
//!
//! The document-term count matrix `X` is factorised as `X ≈ W·H` with
//! `W` (documents x topics) and `H` (topics x terms) non-negative, using
//! Lee-Seung multiplicative updates. Rows of `W`, normalised to sum to one,
//! are the topic mixtures.

use ndarray::{Array2, Zip};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::config::TopicConfig;
use crate::error::{Result, TextSpaceError};

/// Guards the multiplicative updates against division by zero.
const EPSILON: f64 = 1e-10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicModel {
    n_topics: usize,
    max_iter: usize,
    seed: u64,
}

impl TopicModel {
    pub fn new(n_topics: usize, max_iter: usize, seed: u64) -> Self {
        Self {
            n_topics,
            max_iter,
            seed,
        }
    }

    pub fn from_config(config: &TopicConfig) -> Self {
        Self::new(config.n_topics, config.max_iter, config.seed)
    }

    pub fn n_topics(&self) -> usize {
        self.n_topics
    }

    /// Fit on `counts` and return the per-document topic mixtures.
    pub fn fit_transform(&self, counts: &Array2<f64>) -> Result<Array2<f64>> {
        if self.n_topics == 0 {
            return Err(TextSpaceError::Configuration(
                "topic model needs at least one topic".to_string(),
            ));
        }
        let (n_docs, n_terms) = counts.dim();
        if n_docs == 0 || n_terms == 0 {
            return Err(TextSpaceError::Validation(format!(
                "cannot fit topics on a {} x {} count matrix",
                n_docs, n_terms
            )));
        }
        if counts.iter().any(|&c| c < 0.0 || !c.is_finite()) {
            return Err(TextSpaceError::Validation(
                "topic model input must be finite and non-negative".to_string(),
            ));
        }

        let k = self.n_topics;
        let scale = (counts.mean().unwrap_or(0.0) / k as f64).sqrt();
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut w = Array2::from_shape_fn((n_docs, k), |_| rng.gen::<f64>() * scale);
        let mut h = Array2::from_shape_fn((k, n_terms), |_| rng.gen::<f64>() * scale);

        for _ in 0..self.max_iter {
            let numerator = w.t().dot(counts);
            let denominator = w.t().dot(&w).dot(&h);
            Zip::from(&mut h)
                .and(&numerator)
                .and(&denominator)
                .for_each(|h, &num, &den| *h *= num / (den + EPSILON));

            let numerator = counts.dot(&h.t());
            let denominator = w.dot(&h.dot(&h.t()));
            Zip::from(&mut w)
                .and(&numerator)
                .and(&denominator)
                .for_each(|w, &num, &den| *w *= num / (den + EPSILON));
        }

        let residual = counts - &w.dot(&h);
        debug!(
            "Topic model: {} topics, reconstruction error {:.4}",
            k,
            residual.iter().map(|r| r * r).sum::<f64>().sqrt()
        );

        for mut row in w.rows_mut() {
            let total = row.sum();
            if total > EPSILON {
                row.mapv_inplace(|v| v / total);
            } else {
                row.fill(1.0 / k as f64);
            }
        }
        Ok(w)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::CountVectorizer;
    use ndarray::array;

    fn corpus_counts() -> Array2<f64> {
        CountVectorizer::new()
            .fit_transform(&[
                "guitar drums bass guitar stage",
                "drums bass guitar concert stage",
                "rain clouds storm thunder rain",
                "storm thunder clouds wind rain",
                "guitar rain",
            ])
            .unwrap()
            .counts
    }

    #[test]
    fn mixtures_are_distributions() {
        let model = TopicModel::new(3, 100, 7);
        let mixtures = model.fit_transform(&corpus_counts()).unwrap();
        assert_eq!(mixtures.dim(), (5, 3));
        for row in mixtures.rows() {
            assert!(row.iter().all(|&p| p >= 0.0));
            assert!((row.sum() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn fixed_seed_is_deterministic() {
        let counts = corpus_counts();
        let a = TopicModel::new(3, 50, 42).fit_transform(&counts).unwrap();
        let b = TopicModel::new(3, 50, 42).fit_transform(&counts).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn document_without_terms_gets_uniform_mixture() {
        let counts = array![[2.0, 1.0, 0.0], [0.0, 0.0, 0.0], [0.0, 1.0, 3.0]];
        let mixtures = TopicModel::new(4, 30, 0).fit_transform(&counts).unwrap();
        for &p in mixtures.row(1).iter() {
            assert!((p - 0.25).abs() < 1e-12);
        }
    }

    #[test]
    fn zero_topics_is_a_configuration_error() {
        let err = TopicModel::new(0, 10, 0)
            .fit_transform(&corpus_counts())
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Configuration);
    }
}
