use std::path::Path;

use anyhow::{Context, Result, bail};

use crate::geneset::ExclusionList;

/// Reads a JSON file holding a flat array of gene identifiers.
pub fn load_exclusion_json(path: &Path) -> Result<ExclusionList> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read exclusion list {}", path.display()))?;
    parse_exclusion_json(&content, &path.display().to_string())
}

fn parse_exclusion_json(content: &str, source: &str) -> Result<ExclusionList> {
    let value: serde_json::Value = serde_json::from_str(content)
        .with_context(|| format!("{}: malformed JSON", source))?;
    let items = match value {
        serde_json::Value::Array(items) => items,
        _ => bail!("{}: exclusion list must be a JSON array of strings", source),
    };

    let mut genes = Vec::with_capacity(items.len());
    for (idx, item) in items.into_iter().enumerate() {
        match item {
            serde_json::Value::String(gene) => {
                let gene = gene.trim();
                if gene.is_empty() {
                    bail!("{}: empty gene identifier at position {}", source, idx);
                }
                genes.push(gene.to_string());
            }
            other => bail!(
                "{}: expected a string at position {}, found {}",
                source,
                idx,
                other
            ),
        }
    }

    Ok(ExclusionList::new(genes))
}
