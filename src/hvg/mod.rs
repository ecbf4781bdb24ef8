//! Highly variable gene selection, seurat_v3 flavor.
//!
//! Variances are computed on raw counts after a loess-regularized clip, so the
//! input must hold counts (rounded), not normalized values.

use anyhow::Result;
use tracing::debug;

use crate::error::PrepError;
use crate::math::stats::column_moments;
use crate::matrix::ExpressionMatrix;

pub mod loess;

#[derive(Debug, Clone)]
pub struct HvgResult {
    /// Matrix columns that were ranked.
    pub candidates: Vec<usize>,
    pub means: Vec<f64>,
    pub variances: Vec<f64>,
    pub variances_norm: Vec<f64>,
    /// 0-based rank per candidate, 0 = most variable.
    pub rank: Vec<usize>,
    /// Selected matrix columns in ascending column order.
    pub selected: Vec<usize>,
}

impl HvgResult {
    pub fn is_selected(&self, column: usize) -> bool {
        self.selected.binary_search(&column).is_ok()
    }

    /// Candidates with zero variance; they are ranked with a unit trend.
    pub fn constant_genes(&self) -> usize {
        self.variances.iter().filter(|&&v| v <= 0.0).count()
    }
}

pub fn seurat_v3(
    matrix: &ExpressionMatrix,
    candidates: &[usize],
    n_top_genes: usize,
    span: f64,
    threads: usize,
) -> Result<HvgResult> {
    let n_cells = matrix.n_cells();
    if n_cells < 2 {
        return Err(PrepError::DimensionMismatch {
            what: "cells for variable-gene selection (need at least 2)".into(),
            expected: 2,
            actual: n_cells,
        }
        .into());
    }
    if candidates.is_empty() {
        return Err(PrepError::EmptyGeneSet {
            stage: "variable-gene selection",
        }
        .into());
    }

    let sub = matrix.select_genes(candidates)?;
    let moments = column_moments(&sub);
    let n_genes = sub.n_genes();

    let non_constant: Vec<usize> = (0..n_genes).filter(|&g| moments.var[g] > 0.0).collect();
    let x: Vec<f64> = non_constant.iter().map(|&g| moments.mean[g].log10()).collect();
    let y: Vec<f64> = non_constant.iter().map(|&g| moments.var[g].log10()).collect();
    let fitted = loess::loess_fit(&x, &y, span, threads)?;

    let mut reg_std = vec![1.0f64; n_genes];
    for (k, &g) in non_constant.iter().enumerate() {
        reg_std[g] = 10f64.powf(fitted[k]).sqrt();
    }
    debug!(
        candidates = n_genes,
        constant = n_genes - non_constant.len(),
        "hvg_trend_fitted"
    );

    let n = n_cells as f64;
    let clip: Vec<f64> = (0..n_genes)
        .map(|g| moments.mean[g] + n.sqrt() * reg_std[g])
        .collect();

    let mut sum_clip = vec![0.0f64; n_genes];
    let mut sum_sq_clip = vec![0.0f64; n_genes];
    for row in sub.counts().outer_iterator() {
        for (g, &v) in row.iter() {
            let c = (v as f64).min(clip[g]);
            sum_clip[g] += c;
            sum_sq_clip[g] += c * c;
        }
    }

    let variances_norm: Vec<f64> = (0..n_genes)
        .map(|g| {
            let m = moments.mean[g];
            (n * m * m + sum_sq_clip[g] - 2.0 * m * sum_clip[g])
                / ((n - 1.0) * reg_std[g] * reg_std[g])
        })
        .collect();

    let mut by_rank: Vec<usize> = (0..n_genes).collect();
    by_rank.sort_by(|&a, &b| {
        variances_norm[b]
            .total_cmp(&variances_norm[a])
            .then(a.cmp(&b))
    });
    let mut rank = vec![0usize; n_genes];
    for (r, &g) in by_rank.iter().enumerate() {
        rank[g] = r;
    }

    let n_keep = n_top_genes.min(n_genes);
    let mut selected: Vec<usize> = by_rank[..n_keep].iter().map(|&g| candidates[g]).collect();
    selected.sort_unstable();

    Ok(HvgResult {
        candidates: candidates.to_vec(),
        means: moments.mean,
        variances: moments.var,
        variances_norm,
        rank,
        selected,
    })
}
