//! Built-in backend: pseudotime from the leading principal axis of
//! log-normalized expression.
//!
//! Axes come from seeded randomized subspace iteration followed by a
//! Rayleigh-Ritz step, so training is reproducible for a fixed seed. Each axis
//! is oriented so that its largest-magnitude loading is positive.

use anyhow::{Result, anyhow, bail};
use nalgebra::{DMatrix, SymmetricEigen};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::ModelConfig;
use crate::error::PrepError;
use crate::matrix::ExpressionMatrix;
use crate::model::{ModelParams, TrainedModel, Trajectory, TrajectoryBackend};

pub const BACKEND_NAME: &str = "principal-axis";
const OVERSAMPLE: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrincipalAxisParams {
    pub target_sum: f64,
    pub seed: u64,
    pub n_iter: usize,
    /// Training mean of each log-normalized gene, in model gene order.
    pub gene_means: Vec<f64>,
    /// One row per latent dimension, one loading per gene.
    pub axes: Vec<Vec<f64>>,
    pub explained_variance: Vec<f64>,
    /// Training range of the first coordinate, used to scale pseudotime.
    pub ptime_min: f64,
    pub ptime_max: f64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PrincipalAxisBackend;

impl TrajectoryBackend for PrincipalAxisBackend {
    fn name(&self) -> &'static str {
        BACKEND_NAME
    }

    fn train(&self, matrix: &ExpressionMatrix, config: &ModelConfig) -> Result<TrainedModel> {
        let n_cells = matrix.n_cells();
        let n_genes = matrix.n_genes();
        let k = config.n_latent.min(n_genes).min(n_cells);
        if k == 0 {
            return Err(PrepError::EmptyGeneSet {
                stage: "model training",
            }
            .into());
        }

        let rows = log_normalize(matrix, config.target_sum);
        let gene_means = column_means(&rows, n_cells, n_genes);
        let l = (k + OVERSAMPLE).min(n_genes).min(n_cells);

        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let normal = Normal::new(0.0, 1.0).map_err(|e| anyhow!("normal sampler: {}", e))?;
        let omega = DMatrix::from_fn(n_genes, l, |_, _| normal.sample(&mut rng));

        let mut q = omega.qr().q();
        for _ in 0..config.n_iter {
            let p = centered_times(&rows, &gene_means, &q).qr().q();
            q = centered_t_times(&rows, &gene_means, &p).qr().q();
        }

        let b = centered_times(&rows, &gene_means, &q);
        let denom = (n_cells.max(2) - 1) as f64;
        let gram = (b.transpose() * &b) / denom;
        let eig = SymmetricEigen::new(gram);

        let mut order: Vec<usize> = (0..eig.eigenvalues.len()).collect();
        order.sort_by(|&a, &b| {
            eig.eigenvalues[b]
                .total_cmp(&eig.eigenvalues[a])
                .then(a.cmp(&b))
        });

        let mut axes = Vec::with_capacity(k);
        let mut explained_variance = Vec::with_capacity(k);
        for &idx in order.iter().take(k) {
            let axis = &q * eig.eigenvectors.column(idx);
            let mut axis: Vec<f64> = axis.iter().copied().collect();
            orient(&mut axis);
            axes.push(axis);
            explained_variance.push(eig.eigenvalues[idx].max(0.0));
        }

        let coords = project(&rows, &gene_means, &axes);
        let (ptime_min, ptime_max) = coords
            .iter()
            .map(|r| r[0])
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            });
        info!(
            cells = n_cells,
            genes = n_genes,
            n_latent = k,
            pc1_variance = explained_variance[0],
            "principal_axis_trained"
        );

        let params = PrincipalAxisParams {
            target_sum: config.target_sum,
            seed: config.seed,
            n_iter: config.n_iter,
            gene_means,
            axes,
            explained_variance,
            ptime_min,
            ptime_max,
        };
        let trajectory = to_trajectory(matrix, &params, coords);
        Ok(TrainedModel {
            params: ModelParams::PrincipalAxis(params),
            trajectory,
        })
    }

    fn predict(&self, params: &ModelParams, matrix: &ExpressionMatrix) -> Result<Trajectory> {
        let ModelParams::PrincipalAxis(params) = params;
        if params.gene_means.len() != matrix.n_genes() {
            return Err(PrepError::DimensionMismatch {
                what: "model genes".into(),
                expected: params.gene_means.len(),
                actual: matrix.n_genes(),
            }
            .into());
        }
        if params.axes.is_empty() {
            bail!("principal-axis parameters hold no axes");
        }
        let rows = log_normalize(matrix, params.target_sum);
        let coords = project(&rows, &params.gene_means, &params.axes);
        Ok(to_trajectory(matrix, params, coords))
    }
}

type SparseRows = Vec<Vec<(usize, f64)>>;

/// Library-size normalization to `target_sum` followed by `ln(1 + x)`.
fn log_normalize(matrix: &ExpressionMatrix, target_sum: f64) -> SparseRows {
    matrix
        .counts()
        .outer_iterator()
        .map(|row| {
            let total: f64 = row.iter().map(|(_, &v)| v as f64).sum();
            let scale = if total > 0.0 { target_sum / total } else { 0.0 };
            row.iter()
                .map(|(g, &v)| (g, (v as f64 * scale).ln_1p()))
                .collect()
        })
        .collect()
}

fn column_means(rows: &SparseRows, n_cells: usize, n_genes: usize) -> Vec<f64> {
    let mut means = vec![0.0f64; n_genes];
    for row in rows {
        for &(g, v) in row {
            means[g] += v;
        }
    }
    let n = n_cells.max(1) as f64;
    for m in means.iter_mut() {
        *m /= n;
    }
    means
}

/// `(X - 1 mu^T) * Q` without densifying `X`.
fn centered_times(rows: &SparseRows, means: &[f64], q: &DMatrix<f64>) -> DMatrix<f64> {
    let l = q.ncols();
    let offset: Vec<f64> = (0..l)
        .map(|j| (0..q.nrows()).map(|g| means[g] * q[(g, j)]).sum())
        .collect();
    let mut out = DMatrix::zeros(rows.len(), l);
    for (i, row) in rows.iter().enumerate() {
        for j in 0..l {
            let dot: f64 = row.iter().map(|&(g, v)| v * q[(g, j)]).sum();
            out[(i, j)] = dot - offset[j];
        }
    }
    out
}

/// `(X - 1 mu^T)^T * P` without densifying `X`.
fn centered_t_times(rows: &SparseRows, means: &[f64], p: &DMatrix<f64>) -> DMatrix<f64> {
    let l = p.ncols();
    let mut out = DMatrix::zeros(means.len(), l);
    for (i, row) in rows.iter().enumerate() {
        for &(g, v) in row {
            for j in 0..l {
                out[(g, j)] += v * p[(i, j)];
            }
        }
    }
    for j in 0..l {
        let col_sum: f64 = p.column(j).iter().sum();
        for (g, &m) in means.iter().enumerate() {
            out[(g, j)] -= m * col_sum;
        }
    }
    out
}

fn project(rows: &SparseRows, means: &[f64], axes: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let offsets: Vec<f64> = axes
        .iter()
        .map(|a| a.iter().zip(means).map(|(w, m)| w * m).sum())
        .collect();
    rows.iter()
        .map(|row| {
            axes.iter()
                .zip(&offsets)
                .map(|(a, off)| row.iter().map(|&(g, v)| v * a[g]).sum::<f64>() - off)
                .collect()
        })
        .collect()
}

/// Flips `axis` so that its largest-magnitude loading is positive.
fn orient(axis: &mut [f64]) {
    let mut best = 0usize;
    for (g, v) in axis.iter().enumerate() {
        if v.abs() > axis[best].abs() {
            best = g;
        }
    }
    if axis.get(best).is_some_and(|&v| v < 0.0) {
        for v in axis.iter_mut() {
            *v = -*v;
        }
    }
}

fn to_trajectory(
    matrix: &ExpressionMatrix,
    params: &PrincipalAxisParams,
    coords: Vec<Vec<f64>>,
) -> Trajectory {
    let range = params.ptime_max - params.ptime_min;
    let ptime = coords
        .iter()
        .map(|r| {
            if range > 0.0 {
                ((r[0] - params.ptime_min) / range).clamp(0.0, 1.0) as f32
            } else {
                0.0
            }
        })
        .collect();
    let embedding = coords
        .into_iter()
        .map(|r| r.into_iter().map(|v| v as f32).collect())
        .collect();
    Trajectory {
        cells: matrix.cells().to_vec(),
        ptime,
        embedding,
    }
}
