use std::path::Path;

use anyhow::{Context, Result, bail};
use hdf5::types::{FixedAscii, FixedUnicode, TypeDescriptor, VarLenAscii, VarLenUnicode};
use hdf5::{Dataset, File, Group};

use crate::io::features::{GENE_EXPRESSION, RawFeature};

const MATRIX_GROUP: &str = "matrix";
const FEATURES_GROUP: &str = "features";
const MAX_STR_LEN: usize = 256;

/// Feature-barcode matrix as stored by 10x: one sparse column per barcode.
/// `rows[c]` holds `(feature, count)` pairs for barcode `c`.
#[derive(Debug)]
pub struct TenxH5Matrix {
    pub features: Vec<RawFeature>,
    pub barcodes: Vec<String>,
    pub rows: Vec<Vec<(usize, f32)>>,
    pub nnz: usize,
}

pub fn read_tenx_h5(path: &Path) -> Result<TenxH5Matrix> {
    let file = File::open(path)
        .with_context(|| format!("failed to open 10x HDF5 file {}", path.display()))?;

    let (group, features) = if let Ok(group) = file.group(MATRIX_GROUP) {
        let features = read_v3_features(&group)?;
        (group, features)
    } else {
        // Legacy layout: a single group named after the genome.
        let names = file.member_names().context("failed to list HDF5 root")?;
        let genome = names
            .first()
            .context("10x HDF5 file has no matrix group")?
            .clone();
        let group = file
            .group(&genome)
            .with_context(|| format!("missing group: {}", genome))?;
        let features = read_v2_features(&group)?;
        (group, features)
    };

    let shape = read_index_vec(&dataset(&group, "shape")?, "shape")?;
    if shape.len() != 2 {
        bail!("matrix/shape must have length 2");
    }
    let (n_features, n_barcodes) = (shape[0] as usize, shape[1] as usize);

    let barcodes = read_string_vec(&dataset(&group, "barcodes")?)
        .context("failed to read barcodes")?;
    let data = read_value_vec(&dataset(&group, "data")?)?;
    let indices = read_index_vec(&dataset(&group, "indices")?, "indices")?;
    let indptr = read_index_vec(&dataset(&group, "indptr")?, "indptr")?;

    if features.len() != n_features {
        bail!(
            "features length ({}) does not match matrix rows ({})",
            features.len(),
            n_features
        );
    }
    if barcodes.len() != n_barcodes {
        bail!(
            "barcodes length ({}) does not match matrix cols ({})",
            barcodes.len(),
            n_barcodes
        );
    }
    if indices.len() != data.len() {
        bail!(
            "indices length ({}) does not match data length ({})",
            indices.len(),
            data.len()
        );
    }
    if indptr.len() != n_barcodes + 1 {
        bail!(
            "indptr length ({}) does not match barcodes+1 ({})",
            indptr.len(),
            n_barcodes + 1
        );
    }

    let mut rows = Vec::with_capacity(n_barcodes);
    for c in 0..n_barcodes {
        let start = indptr[c] as usize;
        let end = indptr[c + 1] as usize;
        if start > end || end > data.len() {
            bail!("indptr is not monotonic at barcode {}", c);
        }
        let mut row = Vec::with_capacity(end - start);
        for k in start..end {
            let feature = indices[k] as usize;
            if feature >= n_features {
                bail!("feature index {} out of range at barcode {}", feature, c);
            }
            row.push((feature, data[k]));
        }
        rows.push(row);
    }

    Ok(TenxH5Matrix {
        features,
        barcodes,
        rows,
        nnz: data.len(),
    })
}

fn dataset(group: &Group, name: &str) -> Result<Dataset> {
    group
        .dataset(name)
        .with_context(|| format!("missing dataset: {}/{}", group.name(), name))
}

fn read_v3_features(group: &Group) -> Result<Vec<RawFeature>> {
    let fg = group
        .group(FEATURES_GROUP)
        .context("missing group: matrix/features")?;
    let ids = read_string_vec(&dataset(&fg, "id")?).context("failed to read features/id")?;
    let names =
        read_string_vec(&dataset(&fg, "name")?).context("failed to read features/name")?;
    let types = match fg.dataset("feature_type") {
        Ok(ds) => read_string_vec(&ds).context("failed to read features/feature_type")?,
        Err(_) => vec![GENE_EXPRESSION.to_string(); ids.len()],
    };
    zip_features(ids, names, types)
}

fn read_v2_features(group: &Group) -> Result<Vec<RawFeature>> {
    let ids = read_string_vec(&dataset(group, "genes")?).context("failed to read genes")?;
    let names =
        read_string_vec(&dataset(group, "gene_names")?).context("failed to read gene_names")?;
    let types = vec![GENE_EXPRESSION.to_string(); ids.len()];
    zip_features(ids, names, types)
}

fn zip_features(
    ids: Vec<String>,
    names: Vec<String>,
    types: Vec<String>,
) -> Result<Vec<RawFeature>> {
    if ids.len() != names.len() || ids.len() != types.len() {
        bail!(
            "feature columns differ in length: id={} name={} type={}",
            ids.len(),
            names.len(),
            types.len()
        );
    }
    Ok(ids
        .into_iter()
        .zip(names)
        .zip(types)
        .map(|((id, name), feature_type)| RawFeature {
            id,
            name,
            feature_type,
        })
        .collect())
}

fn read_string_vec(ds: &Dataset) -> Result<Vec<String>> {
    let values: Vec<String> = match ds.dtype()?.to_descriptor()? {
        TypeDescriptor::FixedAscii(_) => ds
            .read_raw::<FixedAscii<MAX_STR_LEN>>()?
            .iter()
            .map(|s| s.as_str().to_string())
            .collect(),
        TypeDescriptor::FixedUnicode(_) => ds
            .read_raw::<FixedUnicode<MAX_STR_LEN>>()?
            .iter()
            .map(|s| s.as_str().to_string())
            .collect(),
        TypeDescriptor::VarLenAscii => ds
            .read_raw::<VarLenAscii>()?
            .iter()
            .map(|s| s.as_str().to_string())
            .collect(),
        TypeDescriptor::VarLenUnicode => ds
            .read_raw::<VarLenUnicode>()?
            .iter()
            .map(|s| s.as_str().to_string())
            .collect(),
        other => bail!("unsupported string type {:?}", other),
    };
    Ok(values)
}

fn read_value_vec(ds: &Dataset) -> Result<Vec<f32>> {
    let values: Vec<f32> = match ds.dtype()?.to_descriptor()? {
        TypeDescriptor::Integer(_) => ds
            .read_raw::<i64>()?
            .into_iter()
            .map(|x| x as f32)
            .collect(),
        TypeDescriptor::Unsigned(_) => ds
            .read_raw::<u64>()?
            .into_iter()
            .map(|x| x as f32)
            .collect(),
        TypeDescriptor::Float(_) => ds
            .read_raw::<f64>()?
            .into_iter()
            .map(|x| x as f32)
            .collect(),
        other => bail!("unsupported data type for matrix/data: {:?}", other),
    };
    Ok(values)
}

fn read_index_vec(ds: &Dataset, what: &str) -> Result<Vec<u64>> {
    match ds.dtype()?.to_descriptor()? {
        TypeDescriptor::Integer(_) => {
            let raw = ds.read_raw::<i64>()?;
            let mut out = Vec::with_capacity(raw.len());
            for x in raw {
                if x < 0 {
                    bail!("matrix/{} contains negative value", what);
                }
                out.push(x as u64);
            }
            Ok(out)
        }
        TypeDescriptor::Unsigned(_) => Ok(ds.read_raw::<u64>()?),
        other => bail!("unsupported index type for matrix/{}: {:?}", what, other),
    }
}
