use sprs::{CsMat, CsVecView, TriMat};

use crate::error::PrepError;
use crate::geneset::GeneSet;

/// Cells × genes count matrix in CSR layout.
#[derive(Debug, Clone)]
pub struct ExpressionMatrix {
    counts: CsMat<f32>,
    cells: Vec<String>,
    genes: GeneSet,
}

impl ExpressionMatrix {
    pub fn new(counts: CsMat<f32>, cells: Vec<String>, genes: GeneSet) -> Result<Self, PrepError> {
        if !counts.is_csr() {
            return Err(PrepError::DimensionMismatch {
                what: "matrix layout (expected CSR)".into(),
                expected: 0,
                actual: 1,
            });
        }
        if counts.rows() != cells.len() {
            return Err(PrepError::DimensionMismatch {
                what: "cell identifiers".into(),
                expected: counts.rows(),
                actual: cells.len(),
            });
        }
        if counts.cols() != genes.len() {
            return Err(PrepError::DimensionMismatch {
                what: "gene identifiers".into(),
                expected: counts.cols(),
                actual: genes.len(),
            });
        }
        Ok(Self {
            counts,
            cells,
            genes,
        })
    }

    /// Builds from `(cell, gene, value)` triplets; repeated coordinates are summed.
    pub fn from_triplets(
        cells: Vec<String>,
        genes: GeneSet,
        triplets: &[(usize, usize, f32)],
    ) -> Result<Self, PrepError> {
        let mut tri = TriMat::new((cells.len(), genes.len()));
        for &(cell, gene, value) in triplets {
            if cell >= cells.len() || gene >= genes.len() {
                return Err(PrepError::DimensionMismatch {
                    what: format!("triplet ({}, {})", cell, gene),
                    expected: cells.len().max(genes.len()),
                    actual: cell.max(gene),
                });
            }
            tri.add_triplet(cell, gene, value);
        }
        let counts: CsMat<f32> = tri.to_csr();
        Self::new(counts, cells, genes)
    }

    /// Builds from per-cell sparse rows of `(gene, value)`; rows need not be sorted.
    pub fn from_rows(
        cells: Vec<String>,
        genes: GeneSet,
        rows: Vec<Vec<(usize, f32)>>,
    ) -> Result<Self, PrepError> {
        if rows.len() != cells.len() {
            return Err(PrepError::DimensionMismatch {
                what: "matrix rows".into(),
                expected: cells.len(),
                actual: rows.len(),
            });
        }
        let n_genes = genes.len();
        let counts = assemble_csr(rows, n_genes)?;
        Self::new(counts, cells, genes)
    }

    pub fn n_cells(&self) -> usize {
        self.counts.rows()
    }

    pub fn n_genes(&self) -> usize {
        self.counts.cols()
    }

    pub fn nnz(&self) -> usize {
        self.counts.nnz()
    }

    pub fn cells(&self) -> &[String] {
        &self.cells
    }

    pub fn genes(&self) -> &GeneSet {
        &self.genes
    }

    pub fn counts(&self) -> &CsMat<f32> {
        &self.counts
    }

    pub fn row(&self, cell: usize) -> Option<CsVecView<'_, f32>> {
        self.counts.outer_view(cell)
    }

    pub fn get(&self, cell: usize, gene: usize) -> f32 {
        self.counts.get(cell, gene).copied().unwrap_or(0.0)
    }

    /// Rounds every stored value to the nearest integer, ties to even.
    pub fn round_counts(&mut self) {
        self.counts.map_inplace(|v| v.round_ties_even());
    }

    pub fn select_genes(&self, columns: &[usize]) -> Result<Self, PrepError> {
        let genes = self.genes.select(columns);
        let columns: Vec<Option<usize>> = columns.iter().map(|&c| Some(c)).collect();
        self.project_genes(&columns, genes)
    }

    /// New matrix whose column `j` is old column `columns[j]`, or all zeros
    /// when `columns[j]` is `None`.
    pub fn project_genes(
        &self,
        columns: &[Option<usize>],
        genes: GeneSet,
    ) -> Result<Self, PrepError> {
        if columns.len() != genes.len() {
            return Err(PrepError::DimensionMismatch {
                what: "projected gene identifiers".into(),
                expected: columns.len(),
                actual: genes.len(),
            });
        }
        let mut remap: Vec<Option<usize>> = vec![None; self.n_genes()];
        for (new_col, old_col) in columns.iter().enumerate() {
            if let Some(old) = *old_col {
                if old >= self.n_genes() {
                    return Err(PrepError::DimensionMismatch {
                        what: "gene column".into(),
                        expected: self.n_genes(),
                        actual: old,
                    });
                }
                remap[old] = Some(new_col);
            }
        }

        let mut rows = Vec::with_capacity(self.n_cells());
        for row in self.counts.outer_iterator() {
            let mut entries = Vec::new();
            for (old, &value) in row.iter() {
                if let Some(new_col) = remap[old] {
                    entries.push((new_col, value));
                }
            }
            rows.push(entries);
        }

        let counts = assemble_csr(rows, genes.len())?;
        Self::new(counts, self.cells.clone(), genes)
    }

    pub fn select_cells(&self, rows_idx: &[usize]) -> Result<Self, PrepError> {
        let mut rows = Vec::with_capacity(rows_idx.len());
        let mut cells = Vec::with_capacity(rows_idx.len());
        for &r in rows_idx {
            let view = self.counts.outer_view(r).ok_or_else(|| PrepError::DimensionMismatch {
                what: "cell row".into(),
                expected: self.n_cells(),
                actual: r,
            })?;
            rows.push(view.iter().map(|(c, &v)| (c, v)).collect());
            cells.push(self.cells[r].clone());
        }
        let counts = assemble_csr(rows, self.n_genes())?;
        Self::new(counts, cells, self.genes.clone())
    }
}

fn assemble_csr(rows: Vec<Vec<(usize, f32)>>, n_cols: usize) -> Result<CsMat<f32>, PrepError> {
    let n_rows = rows.len();
    let nnz: usize = rows.iter().map(|r| r.len()).sum();
    let mut indptr = Vec::with_capacity(n_rows + 1);
    let mut indices = Vec::with_capacity(nnz);
    let mut data = Vec::with_capacity(nnz);
    indptr.push(0usize);

    for mut row in rows {
        row.sort_by_key(|&(c, _)| c);
        let mut last: Option<usize> = None;
        for (col, value) in row {
            if col >= n_cols {
                return Err(PrepError::DimensionMismatch {
                    what: "column index".into(),
                    expected: n_cols,
                    actual: col,
                });
            }
            if last == Some(col) {
                if let Some(v) = data.last_mut() {
                    *v += value;
                }
                continue;
            }
            indices.push(col);
            data.push(value);
            last = Some(col);
        }
        indptr.push(indices.len());
    }

    Ok(CsMat::new((n_rows, n_cols), indptr, indices, data))
}
