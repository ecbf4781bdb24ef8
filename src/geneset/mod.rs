mod align;
mod loader;

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::PrepError;

pub use align::{AlignmentSummary, GeneResolution, align_to_model, resolve_model_genes};
pub use loader::load_exclusion_json;

const PREVIEW_LEN: usize = 10;

/// Comma-joined identifiers, truncated to the first ten.
pub fn preview_ids(ids: &[String]) -> String {
    if ids.len() <= PREVIEW_LEN {
        ids.join(", ")
    } else {
        format!(
            "{}, ... (+{} more)",
            ids[..PREVIEW_LEN].join(", "),
            ids.len() - PREVIEW_LEN
        )
    }
}

/// Ordered, duplicate-free list of gene identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct GeneSet {
    ids: Vec<String>,
    index: HashMap<String, usize>,
}

impl GeneSet {
    pub fn new(ids: Vec<String>) -> Result<Self, PrepError> {
        let mut index = HashMap::with_capacity(ids.len());
        for (i, id) in ids.iter().enumerate() {
            if index.insert(id.clone(), i).is_some() {
                return Err(PrepError::DuplicateGene(id.clone()));
            }
        }
        Ok(Self { ids, index })
    }

    /// Suffixes repeated identifiers with `-1`, `-2`, ... in order of
    /// appearance; the first occurrence keeps its name.
    pub fn make_unique(ids: Vec<String>) -> (Self, Vec<String>) {
        let mut warnings = Vec::new();
        let taken: HashSet<String> = ids.iter().cloned().collect();
        let mut seen: HashSet<String> = HashSet::with_capacity(ids.len());
        let mut counters: HashMap<String, usize> = HashMap::new();
        let mut out = Vec::with_capacity(ids.len());

        for (row, id) in ids.into_iter().enumerate() {
            if seen.insert(id.clone()) {
                out.push(id);
                continue;
            }
            let counter = counters.entry(id.clone()).or_insert(0);
            let renamed = loop {
                *counter += 1;
                let candidate = format!("{}-{}", id, counter);
                if !taken.contains(&candidate) && !seen.contains(&candidate) {
                    break candidate;
                }
            };
            warnings.push(format!(
                "duplicate gene identifier '{}' at row {} renamed to '{}'",
                id,
                row + 1,
                renamed
            ));
            seen.insert(renamed.clone());
            out.push(renamed);
        }

        let mut index = HashMap::with_capacity(out.len());
        for (i, id) in out.iter().enumerate() {
            index.insert(id.clone(), i);
        }
        (Self { ids: out, index }, warnings)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.ids.iter()
    }

    /// Gene set restricted to `columns`, in the order given.
    pub fn select(&self, columns: &[usize]) -> Self {
        let ids: Vec<String> = columns.iter().map(|&c| self.ids[c].clone()).collect();
        let mut index = HashMap::with_capacity(ids.len());
        for (i, id) in ids.iter().enumerate() {
            index.insert(id.clone(), i);
        }
        Self { ids, index }
    }
}

impl TryFrom<Vec<String>> for GeneSet {
    type Error = PrepError;

    fn try_from(ids: Vec<String>) -> Result<Self, Self::Error> {
        GeneSet::new(ids)
    }
}

impl From<GeneSet> for Vec<String> {
    fn from(set: GeneSet) -> Self {
        set.ids
    }
}

/// Gene identifiers removed before any filtering.
#[derive(Debug, Clone, Default)]
pub struct ExclusionList {
    genes: HashSet<String>,
}

#[derive(Debug, Clone)]
pub struct ExclusionOutcome {
    /// Column indices that survive, in their original order.
    pub kept: Vec<usize>,
    pub removed: usize,
    /// Excluded identifiers that were not present in the gene set.
    pub absent: usize,
}

impl ExclusionList {
    pub fn new<I: IntoIterator<Item = String>>(genes: I) -> Self {
        Self {
            genes: genes.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.genes.contains(id)
    }

    /// Filters `genes` in place order; never reorders survivors.
    pub fn apply(&self, genes: &GeneSet) -> ExclusionOutcome {
        let mut kept = Vec::with_capacity(genes.len());
        for (i, id) in genes.iter().enumerate() {
            if !self.genes.contains(id) {
                kept.push(i);
            }
        }
        let removed = genes.len() - kept.len();
        ExclusionOutcome {
            kept,
            removed,
            absent: self.genes.len().saturating_sub(removed),
        }
    }
}
