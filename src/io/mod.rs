use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use flate2::read::GzDecoder;

pub mod barcodes;
pub mod embedding_writer;
pub mod features;
pub mod groups_writer;
pub mod json_writer;
pub mod loader;
pub mod metadata;
pub mod mtx;
pub mod ptime_writer;
pub mod summary;
#[cfg(feature = "hdf5")]
pub mod tenx_h5;
#[cfg(not(feature = "hdf5"))]
pub mod tenx_h5 {
    use anyhow::{Result, bail};
    use std::path::Path;

    use crate::io::features::RawFeature;

    #[derive(Debug)]
    pub struct TenxH5Matrix {
        pub features: Vec<RawFeature>,
        pub barcodes: Vec<String>,
        pub rows: Vec<Vec<(usize, f32)>>,
        pub nnz: usize,
    }

    pub fn read_tenx_h5(_path: &Path) -> Result<TenxH5Matrix> {
        bail!("10x HDF5 support not enabled. Rebuild with --features hdf5");
    }
}

pub(crate) fn open_maybe_gz(path: &Path) -> Result<Box<dyn Read>> {
    let file =
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    if path.extension().and_then(|s| s.to_str()) == Some("gz") {
        let decoder = GzDecoder::new(file);
        Ok(Box::new(decoder))
    } else {
        Ok(Box::new(file))
    }
}

#[derive(Debug, Clone)]
pub struct MtxInputFiles {
    pub matrix: PathBuf,
    pub features: PathBuf,
    pub barcodes: PathBuf,
}

/// Locates the three files of a 10x MTX directory; gzipped variants and the
/// legacy `genes.tsv` name are accepted.
pub fn discover_mtx_files(dir: &Path) -> Result<MtxInputFiles> {
    let matrix = first_existing(dir, &["matrix.mtx", "matrix.mtx.gz"])
        .context("missing matrix.mtx or matrix.mtx.gz")?;
    let features = first_existing(
        dir,
        &["features.tsv", "features.tsv.gz", "genes.tsv", "genes.tsv.gz"],
    )
    .context("missing features.tsv/genes.tsv (or .gz)")?;
    let barcodes = first_existing(dir, &["barcodes.tsv", "barcodes.tsv.gz"])
        .context("missing barcodes.tsv or barcodes.tsv.gz")?;
    Ok(MtxInputFiles {
        matrix,
        features,
        barcodes,
    })
}

fn first_existing(dir: &Path, names: &[&str]) -> Option<PathBuf> {
    names.iter().map(|n| dir.join(n)).find(|p| p.is_file())
}
