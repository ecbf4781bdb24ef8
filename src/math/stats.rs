//! Summary statistics shared by the QC, variable-gene and grouping stages.
//!
//! Note: `median` reorders the input slice.

use crate::matrix::ExpressionMatrix;

pub fn median(values: &mut [f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let n = values.len();
    if n % 2 == 1 {
        values[n / 2]
    } else {
        let a = values[n / 2 - 1];
        let b = values[n / 2];
        (a + b) / 2.0
    }
}

pub fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let sum: f64 = values.iter().map(|&v| v as f64).sum();
    (sum / values.len() as f64) as f32
}

#[derive(Debug, Clone)]
pub struct ColumnMoments {
    pub mean: Vec<f64>,
    /// Unbiased (n - 1) variance.
    pub var: Vec<f64>,
}

/// Per-gene mean and variance over all cells, zeros included. Two passes so
/// that constant genes come out with a variance of exactly zero.
pub fn column_moments(matrix: &ExpressionMatrix) -> ColumnMoments {
    let n_genes = matrix.n_genes();
    let n = matrix.n_cells() as f64;
    let mut mean = vec![0.0f64; n_genes];
    let mut var = vec![0.0f64; n_genes];
    if n == 0.0 {
        return ColumnMoments { mean, var };
    }

    let mut nnz = vec![0usize; n_genes];
    for row in matrix.counts().outer_iterator() {
        for (g, &v) in row.iter() {
            mean[g] += v as f64;
            nnz[g] += 1;
        }
    }
    for m in mean.iter_mut() {
        *m /= n;
    }
    if n < 2.0 {
        return ColumnMoments { mean, var };
    }

    for row in matrix.counts().outer_iterator() {
        for (g, &v) in row.iter() {
            let d = v as f64 - mean[g];
            var[g] += d * d;
        }
    }
    for g in 0..n_genes {
        let zeros = n - nnz[g] as f64;
        var[g] = (var[g] + zeros * mean[g] * mean[g]) / (n - 1.0);
    }
    ColumnMoments { mean, var }
}
