use std::path::Path;

use anyhow::{Result, bail};
use tracing::info;

use crate::config::PrepConfig;
use crate::ctx::InputFormat;
use crate::geneset::GeneSet;
use crate::io::features::{RawFeature, select_features};
use crate::io::{barcodes, discover_mtx_files, features, mtx, tenx_h5};
use crate::matrix::ExpressionMatrix;

#[derive(Debug)]
pub struct LoadedMatrix {
    pub matrix: ExpressionMatrix,
    pub warnings: Vec<String>,
    /// Features dropped because they are not gene expression.
    pub dropped_features: usize,
}

pub fn load_expression_matrix(
    input: &Path,
    format: InputFormat,
    config: &PrepConfig,
) -> Result<LoadedMatrix> {
    match format {
        InputFormat::TenxH5 => load_h5(input, config),
        InputFormat::Mtx10x => load_mtx(input, config),
    }
}

fn load_mtx(dir: &Path, config: &PrepConfig) -> Result<LoadedMatrix> {
    let files = discover_mtx_files(dir)?;
    info!(
        matrix = %files.matrix.display(),
        features = %files.features.display(),
        barcodes = %files.barcodes.display(),
        "input_files"
    );

    let raw_features = features::read_features(&files.features)?;
    let cells = barcodes::read_barcodes(&files.barcodes)?;
    let (remap, genes, warnings) = build_gene_axis(&raw_features, config)?;

    let mut triplets = Vec::new();
    let summary = mtx::for_each_entry(&files.matrix, |gene, cell, value| {
        if let Some(Some(g)) = remap.get(gene) {
            triplets.push((cell, *g, value));
        }
        Ok(())
    })?;

    if summary.nrows != raw_features.len() {
        bail!(
            "MTX rows ({}) do not match features lines ({})",
            summary.nrows,
            raw_features.len()
        );
    }
    if summary.ncols != cells.len() {
        bail!(
            "MTX cols ({}) do not match barcodes lines ({})",
            summary.ncols,
            cells.len()
        );
    }

    let dropped_features = raw_features.len() - genes.len();
    let matrix = ExpressionMatrix::from_triplets(cells, genes, &triplets)?;
    Ok(LoadedMatrix {
        matrix,
        warnings,
        dropped_features,
    })
}

fn load_h5(path: &Path, config: &PrepConfig) -> Result<LoadedMatrix> {
    let raw = tenx_h5::read_tenx_h5(path)?;
    info!(
        features = raw.features.len(),
        barcodes = raw.barcodes.len(),
        nnz = raw.nnz,
        "tenx_h5_summary"
    );

    let (remap, genes, warnings) = build_gene_axis(&raw.features, config)?;
    let rows: Vec<Vec<(usize, f32)>> = raw
        .rows
        .into_iter()
        .map(|row| {
            row.into_iter()
                .filter_map(|(feature, value)| remap[feature].map(|g| (g, value)))
                .collect()
        })
        .collect();

    let dropped_features = raw.features.len() - genes.len();
    let matrix = ExpressionMatrix::from_rows(raw.barcodes, genes, rows)?;
    Ok(LoadedMatrix {
        matrix,
        warnings,
        dropped_features,
    })
}

/// Maps raw feature rows to gene columns and names the columns.
fn build_gene_axis(
    raw_features: &[RawFeature],
    config: &PrepConfig,
) -> Result<(Vec<Option<usize>>, GeneSet, Vec<String>)> {
    let (keep, names) = select_features(raw_features, config.var_names, config.gex_only)?;
    let mut remap = vec![None; raw_features.len()];
    for (col, &feature) in keep.iter().enumerate() {
        remap[feature] = Some(col);
    }
    let (genes, warnings) = GeneSet::make_unique(names);
    Ok((remap, genes, warnings))
}
