use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result, bail};

use crate::config::VarNames;
use crate::io::open_maybe_gz;

pub const GENE_EXPRESSION: &str = "Gene Expression";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFeature {
    pub id: String,
    pub name: String,
    pub feature_type: String,
}

impl RawFeature {
    pub fn is_gene_expression(&self) -> bool {
        self.feature_type == GENE_EXPRESSION
    }

    pub fn var_name(&self, var_names: VarNames) -> &str {
        match var_names {
            VarNames::Symbol => &self.name,
            VarNames::Id => &self.id,
        }
    }
}

/// Reads `features.tsv` (id, name, type) or legacy `genes.tsv` (id, name).
/// A missing type column means gene expression.
pub fn read_features(path: &Path) -> Result<Vec<RawFeature>> {
    let reader = open_maybe_gz(path)?;
    let mut reader = BufReader::new(reader);

    let mut features = Vec::new();
    let mut line = String::new();
    let mut line_no = 0usize;
    while reader.read_line(&mut line)? > 0 {
        line_no += 1;
        let trimmed = line.trim_end_matches(['\n', '\r']);
        if trimmed.is_empty() {
            line.clear();
            continue;
        }
        let parts: Vec<&str> = trimmed.split('\t').collect();
        let id = parts[0].trim();
        if id.is_empty() {
            bail!("{}:{} empty feature id", path.display(), line_no);
        }
        let name = parts.get(1).map(|s| s.trim()).unwrap_or(id);
        let feature_type = parts
            .get(2)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .unwrap_or(GENE_EXPRESSION);
        features.push(RawFeature {
            id: id.to_string(),
            name: (if name.is_empty() { id } else { name }).to_string(),
            feature_type: feature_type.to_string(),
        });
        line.clear();
    }

    if features.is_empty() {
        bail!("features file {} is empty", path.display());
    }

    Ok(features)
}

/// Indices of the features to keep and their identifiers, in file order.
pub fn select_features(
    features: &[RawFeature],
    var_names: VarNames,
    gex_only: bool,
) -> Result<(Vec<usize>, Vec<String>)> {
    let mut keep = Vec::with_capacity(features.len());
    let mut names = Vec::with_capacity(features.len());
    for (i, f) in features.iter().enumerate() {
        if gex_only && !f.is_gene_expression() {
            continue;
        }
        keep.push(i);
        names.push(f.var_name(var_names).to_string());
    }
    if keep.is_empty() {
        return Err(anyhow::anyhow!("no gene expression features found"))
            .context("feature selection");
    }
    Ok((keep, names))
}
