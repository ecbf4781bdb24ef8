use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result, bail};

use crate::error::PrepError;

/// Per-cell annotation table read from a CSV whose first column is the cell id.
#[derive(Debug, Clone)]
pub struct CellMetadata {
    columns: Vec<String>,
    cells: Vec<String>,
    index: HashMap<String, usize>,
    rows: Vec<Vec<String>>,
}

impl CellMetadata {
    pub fn from_csv(path: &Path) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(path)
            .with_context(|| format!("failed to open metadata {}", path.display()))?;

        let headers = reader
            .headers()
            .with_context(|| format!("failed to read metadata header {}", path.display()))?
            .clone();
        if headers.is_empty() {
            bail!("metadata {} has no header", path.display());
        }
        let columns: Vec<String> = headers.iter().skip(1).map(|s| s.to_string()).collect();

        let mut cells = Vec::new();
        let mut index = HashMap::new();
        let mut rows = Vec::new();
        for (i, record) in reader.records().enumerate() {
            let record = record
                .with_context(|| format!("{}: malformed row {}", path.display(), i + 2))?;
            let cell = record.get(0).unwrap_or("").trim().to_string();
            if cell.is_empty() {
                bail!("{}: empty cell id at row {}", path.display(), i + 2);
            }
            if index.insert(cell.clone(), cells.len()).is_some() {
                bail!("{}: duplicate cell id '{}'", path.display(), cell);
            }
            cells.push(cell);
            rows.push(record.iter().skip(1).map(|s| s.to_string()).collect());
        }

        Ok(Self {
            columns,
            cells,
            index,
            rows,
        })
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn cells(&self) -> &[String] {
        &self.cells
    }

    pub fn contains(&self, cell: &str) -> bool {
        self.index.contains_key(cell)
    }

    pub fn value(&self, cell: &str, column: &str) -> Option<&str> {
        let row = *self.index.get(cell)?;
        let col = self.columns.iter().position(|c| c == column)?;
        self.rows[row].get(col).map(|s| s.as_str())
    }

    /// Keeps only `names`, in the order given.
    pub fn select_columns(&self, names: &[String]) -> Result<Self, PrepError> {
        let mut positions = Vec::with_capacity(names.len());
        for name in names {
            let pos = self
                .columns
                .iter()
                .position(|c| c == name)
                .ok_or_else(|| PrepError::MissingMetadataColumn(name.clone()))?;
            positions.push(pos);
        }
        let rows = self
            .rows
            .iter()
            .map(|row| {
                positions
                    .iter()
                    .map(|&p| row.get(p).cloned().unwrap_or_default())
                    .collect()
            })
            .collect();
        Ok(Self {
            columns: names.to_vec(),
            cells: self.cells.clone(),
            index: self.index.clone(),
            rows,
        })
    }

    /// Positions in `cells` that have a metadata row, in `cells` order.
    pub fn intersect(&self, cells: &[String]) -> Vec<usize> {
        cells
            .iter()
            .enumerate()
            .filter(|(_, c)| self.contains(c))
            .map(|(i, _)| i)
            .collect()
    }
}
