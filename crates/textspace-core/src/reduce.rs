//! Dimensionality reduction to plot space.
//!
//! [`Pca`] centres the feature matrix and projects it onto its directions of
//! largest variance, taken from nalgebra's SVD of the centred matrix.
//!
//! Each axis is oriented so that its largest-magnitude loading is positive.
//! That makes repeated fits reproducible, but consumers should still treat
//! the sign of an axis as arbitrary.

use nalgebra::DMatrix;
use ndarray::{Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::PLOT_DIMENSIONS;
use crate::error::{Result, TextSpaceError};

/// Relative eigenvalue below which a component is treated as zero variance.
const RANK_TOLERANCE: f64 = 1e-12;

/// Contract for dimensionality reduction backends.
pub trait DimensionReducer {
    /// Number of output columns.
    fn n_components(&self) -> usize;

    /// Fit on `data` (rows = points) and return the projected points.
    fn fit_transform(&self, data: ArrayView2<'_, f64>) -> Result<Array2<f64>>;
}

/// A point in plot space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectedPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl ProjectedPoint {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn distance(&self, other: &ProjectedPoint) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2) + (self.z - other.z).powi(2))
            .sqrt()
    }
}

/// Result of a PCA fit.
#[derive(Debug, Clone)]
pub struct PcaFit {
    /// Rows = points, columns = components
    pub coordinates: Array2<f64>,
    /// Rows = components, columns = input features (unit length or zero)
    pub components: Array2<f64>,
    /// Variance along each component
    pub explained_variance: Vec<f64>,
    /// Share of the total variance along each component
    pub explained_variance_ratio: Vec<f64>,
}

/// Principal component analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pca {
    n_components: usize,
}

impl Pca {
    pub fn new(n_components: usize) -> Result<Self> {
        if n_components == 0 {
            return Err(TextSpaceError::Configuration(
                "PCA needs at least one component".to_string(),
            ));
        }
        Ok(Self { n_components })
    }

    /// Fit the components and project `data` onto them.
    ///
    /// Requires at least one row, at least `n_components` columns, and only
    /// finite values.
    pub fn fit(&self, data: ArrayView2<'_, f64>) -> Result<PcaFit> {
        let (n_rows, n_cols) = data.dim();
        let k = self.n_components;

        if n_rows == 0 {
            return Err(TextSpaceError::Validation(
                "cannot fit PCA on an empty matrix".to_string(),
            ));
        }
        if n_cols < k {
            return Err(TextSpaceError::Validation(format!(
                "cannot extract {} components from {} feature columns",
                k, n_cols
            )));
        }
        if let Some(((row, col), v)) = data.indexed_iter().find(|(_, v)| !v.is_finite()) {
            return Err(TextSpaceError::Validation(format!(
                "non-finite feature value {} at row {}, column {}",
                v, row, col
            )));
        }

        let mean = data.mean_axis(Axis(0)).ok_or_else(|| {
            TextSpaceError::InvariantViolation("column means of a non-empty matrix".to_string())
        })?;
        let centered = &data - &mean;

        let total = total_scatter(&centered);
        let (eigenvalues, mut components, mut coordinates) = principal_axes(&centered, k, total)?;

        let dof = if n_rows > 1 { (n_rows - 1) as f64 } else { 1.0 };
        let explained_variance: Vec<f64> = eigenvalues.iter().map(|l| l / dof).collect();
        let explained_variance_ratio: Vec<f64> = eigenvalues
            .iter()
            .map(|l| if total > 0.0 { l / total } else { 0.0 })
            .collect();

        orient_axes(&mut components, &mut coordinates);

        debug!(
            "PCA {} x {} -> {}: explained variance ratio {:?}",
            n_rows, n_cols, k, explained_variance_ratio
        );
        if eigenvalues.iter().any(|&l| l <= RANK_TOLERANCE * total.max(f64::MIN_POSITIVE)) {
            warn!(
                "PCA input has fewer than {} directions of variance; degenerate axes are flat",
                k
            );
        }

        Ok(PcaFit {
            coordinates,
            components,
            explained_variance,
            explained_variance_ratio,
        })
    }
}

impl DimensionReducer for Pca {
    fn n_components(&self) -> usize {
        self.n_components
    }

    fn fit_transform(&self, data: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        Ok(self.fit(data)?.coordinates)
    }
}

/// Fit a 3-component PCA and return one point per input row.
pub fn fit_project(matrix: ArrayView2<'_, f64>) -> Result<Vec<ProjectedPoint>> {
    let coordinates = Pca::new(PLOT_DIMENSIONS)?.fit_transform(matrix)?;
    Ok(coordinates
        .rows()
        .into_iter()
        .map(|r| ProjectedPoint::new(r[0], r[1], r[2]))
        .collect())
}

/// Sum of squared centred values, i.e. the trace of the scatter matrix.
fn total_scatter(centered: &Array2<f64>) -> f64 {
    centered.iter().map(|v| v * v).sum()
}

/// Principal axes of a centred matrix from its thin SVD `X = UΣVᵀ`.
///
/// Returns the per-axis scatter `σ²`, the loadings (rows of `Vᵀ`) and the
/// scores `U·Σ`, largest first. Axes with no variance are left at zero.
fn principal_axes(
    centered: &Array2<f64>,
    k: usize,
    total: f64,
) -> Result<(Vec<f64>, Array2<f64>, Array2<f64>)> {
    let (n_rows, n_cols) = centered.dim();
    let svd = DMatrix::from_fn(n_rows, n_cols, |i, j| centered[[i, j]]).svd(true, true);
    let (u, v_t) = match (&svd.u, &svd.v_t) {
        (Some(u), Some(v_t)) => (u, v_t),
        _ => {
            return Err(TextSpaceError::InvariantViolation(
                "SVD did not return singular vectors".to_string(),
            ))
        }
    };

    let sigma = &svd.singular_values;
    let mut order: Vec<usize> = (0..sigma.len()).collect();
    order.sort_by(|&a, &b| sigma[b].total_cmp(&sigma[a]));

    let mut eigenvalues = Vec::with_capacity(k);
    let mut components = Array2::<f64>::zeros((k, n_cols));
    let mut coordinates = Array2::<f64>::zeros((n_rows, k));
    for (j, &src) in order.iter().take(k).enumerate() {
        let lambda = sigma[src] * sigma[src];
        eigenvalues.push(lambda);
        if lambda <= RANK_TOLERANCE * total.max(f64::MIN_POSITIVE) {
            continue;
        }
        for c in 0..n_cols {
            components[[j, c]] = v_t[(src, c)];
        }
        for r in 0..n_rows {
            coordinates[[r, j]] = u[(r, src)] * sigma[src];
        }
    }
    eigenvalues.resize(k, 0.0);
    Ok((eigenvalues, components, coordinates))
}

/// Flip every axis whose largest-magnitude loading is negative.
fn orient_axes(components: &mut Array2<f64>, coordinates: &mut Array2<f64>) {
    for j in 0..components.nrows() {
        let pivot = components
            .row(j)
            .iter()
            .copied()
            .fold(0.0f64, |best, v| if v.abs() > best.abs() { v } else { best });
        if pivot < 0.0 {
            components.row_mut(j).mapv_inplace(|v| -v);
            coordinates.column_mut(j).mapv_inplace(|v| -v);
        }
    }
}
