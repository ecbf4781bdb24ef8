use crate::error::PrepError;
use crate::matrix::ExpressionMatrix;

#[derive(Debug, Clone, Default)]
pub struct CellQc {
    pub total_counts: Vec<f64>,
    pub n_genes_by_counts: Vec<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct GeneQc {
    pub n_cells_by_counts: Vec<u32>,
    pub mean_counts: Vec<f64>,
    pub total_counts: Vec<f64>,
    pub pct_dropout_by_counts: Vec<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct QcMetrics {
    pub cells: CellQc,
    pub genes: GeneQc,
}

/// A value counts as expressed when it is strictly positive.
pub fn calculate_qc_metrics(matrix: &ExpressionMatrix) -> QcMetrics {
    let n_cells = matrix.n_cells();
    let n_genes = matrix.n_genes();

    let mut cell_total = Vec::with_capacity(n_cells);
    let mut cell_genes = Vec::with_capacity(n_cells);
    let mut gene_cells = vec![0u32; n_genes];
    let mut gene_total = vec![0.0f64; n_genes];

    for row in matrix.counts().outer_iterator() {
        let mut total = 0.0f64;
        let mut expressed = 0u32;
        for (g, &v) in row.iter() {
            total += v as f64;
            gene_total[g] += v as f64;
            if v > 0.0 {
                expressed += 1;
                gene_cells[g] += 1;
            }
        }
        cell_total.push(total);
        cell_genes.push(expressed);
    }

    let denom = n_cells.max(1) as f64;
    let mean_counts = gene_total.iter().map(|t| t / denom).collect();
    let pct_dropout_by_counts = gene_cells
        .iter()
        .map(|&c| (1.0 - c as f64 / denom) * 100.0)
        .collect();

    QcMetrics {
        cells: CellQc {
            total_counts: cell_total,
            n_genes_by_counts: cell_genes,
        },
        genes: GeneQc {
            n_cells_by_counts: gene_cells,
            mean_counts,
            total_counts: gene_total,
            pct_dropout_by_counts,
        },
    }
}

/// Column indices of genes expressed in at least `min_cells` cells.
pub fn genes_passing(metrics: &QcMetrics, min_cells: usize) -> Result<Vec<usize>, PrepError> {
    let passing: Vec<usize> = metrics
        .genes
        .n_cells_by_counts
        .iter()
        .enumerate()
        .filter(|(_, n)| **n as usize >= min_cells)
        .map(|(g, _)| g)
        .collect();
    if passing.is_empty() {
        return Err(PrepError::EmptyGeneSet {
            stage: "quality-control filtering",
        });
    }
    Ok(passing)
}
