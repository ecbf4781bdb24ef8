use std::fs;

use kira_pseudotime::error::PrepError;
use kira_pseudotime::io::metadata::CellMetadata;
use tempfile::TempDir;

const META: &str = "\
,ClusterNames_0.2,SubjectId,Timepoint
AAAC-1,T cells,S1,Day0
AAAG-1,B cells,S2,Day7
TTTT-1,T cells,S1,Day7
";

#[test]
fn metadata_reads_first_column_as_cell_id() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("meta.csv");
    fs::write(&path, META).unwrap();

    let meta = CellMetadata::from_csv(&path).unwrap();
    assert_eq!(meta.len(), 3);
    assert_eq!(meta.columns(), &["ClusterNames_0.2", "SubjectId", "Timepoint"]);
    assert_eq!(meta.value("AAAG-1", "SubjectId"), Some("S2"));
    assert_eq!(meta.value("nope", "SubjectId"), None);
}

#[test]
fn metadata_intersection_keeps_matrix_order() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("meta.csv");
    fs::write(&path, META).unwrap();
    let meta = CellMetadata::from_csv(&path).unwrap();

    let cells: Vec<String> = ["TTTT-1", "CCCC-1", "AAAC-1"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(meta.intersect(&cells), vec![0, 2]);

    let none: Vec<String> = vec!["X".to_string()];
    assert!(meta.intersect(&none).is_empty());
}

#[test]
fn metadata_select_columns() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("meta.csv");
    fs::write(&path, META).unwrap();
    let meta = CellMetadata::from_csv(&path).unwrap();

    let picked = meta
        .select_columns(&["Timepoint".to_string(), "SubjectId".to_string()])
        .unwrap();
    assert_eq!(picked.columns(), &["Timepoint", "SubjectId"]);
    assert_eq!(picked.value("TTTT-1", "Timepoint"), Some("Day7"));

    let err = meta.select_columns(&["Population".to_string()]).unwrap_err();
    assert!(matches!(err, PrepError::MissingMetadataColumn(c) if c == "Population"));
}

#[test]
fn metadata_rejects_duplicate_cells() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("meta.csv");
    fs::write(&path, ",a\nX,1\nX,2\n").unwrap();
    assert!(CellMetadata::from_csv(&path).is_err());
}
