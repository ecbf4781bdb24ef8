use std::fs;
use std::io::Write;
use std::path::Path;

use flate2::Compression;
use flate2::write::GzEncoder;
use kira_pseudotime::config::{PrepConfig, VarNames};
use kira_pseudotime::ctx::{Ctx, InputFormat};
use kira_pseudotime::pipeline::Pipeline;
use kira_pseudotime::pipeline::stage1_input::Stage1Input;
use kira_pseudotime::schema::v1::Mode;
use tempfile::TempDir;

const MTX: &str = "\
%%MatrixMarket matrix coordinate integer general
%
4 2 5
1 1 3
2 1 1
3 2 4
4 1 7
4 2 2
";

const FEATURES: &str = "\
ENSG01\tCD3E\tGene Expression
ENSG02\tCD3E\tGene Expression
ENSG03\tMS4A1\tGene Expression
AB01\tCD4_TotalSeqB\tAntibody Capture
";

fn write_dir(dir: &Path, features_name: &str, features: &str) {
    fs::write(dir.join("matrix.mtx"), MTX).unwrap();
    fs::write(dir.join(features_name), features).unwrap();
    fs::write(dir.join("barcodes.tsv"), "AAAC-1\nTTTG-1\n").unwrap();
}

fn run_stage1(dir: &Path, config: PrepConfig) -> anyhow::Result<Ctx> {
    let mut ctx = Ctx::new(dir.to_path_buf(), Mode::Validate, config, "test");
    Pipeline::new(vec![Box::new(Stage1Input::new())]).run(&mut ctx)?;
    Ok(ctx)
}

#[test]
fn mtx_dir_is_detected() {
    let tmp = TempDir::new().unwrap();
    assert_eq!(InputFormat::detect(tmp.path()), InputFormat::Mtx10x);
    assert_eq!(
        InputFormat::detect(&tmp.path().join("raw.h5")),
        InputFormat::TenxH5
    );
}

#[test]
fn stage1_loads_gene_expression_only() {
    let tmp = TempDir::new().unwrap();
    write_dir(tmp.path(), "features.tsv", FEATURES);

    let ctx = run_stage1(tmp.path(), PrepConfig::default()).unwrap();
    let m = ctx.matrix().unwrap();
    assert_eq!(m.n_cells(), 2);
    assert_eq!(m.n_genes(), 3);
    assert_eq!(m.cells(), &["AAAC-1".to_string(), "TTTG-1".to_string()][..]);
    assert_eq!(m.get(0, 0), 3.0);
    assert_eq!(m.get(1, 2), 4.0);
    assert_eq!(m.nnz(), 3);
    assert_eq!(ctx.report.input_meta.dropped_features, 1);
    assert_eq!(ctx.report.input_meta.cells, Some(2));
}

#[test]
fn stage1_renames_duplicate_symbols() {
    let tmp = TempDir::new().unwrap();
    write_dir(tmp.path(), "features.tsv", FEATURES);

    let ctx = run_stage1(tmp.path(), PrepConfig::default()).unwrap();
    let genes = ctx.matrix().unwrap().genes().ids().to_vec();
    assert_eq!(genes, vec!["CD3E", "CD3E-1", "MS4A1"]);
    assert_eq!(ctx.warnings.len(), 1);
    assert!(ctx.warnings[0].contains("CD3E-1"));
}

#[test]
fn stage1_can_keep_all_features_by_id() {
    let tmp = TempDir::new().unwrap();
    write_dir(tmp.path(), "features.tsv", FEATURES);
    let config = PrepConfig {
        var_names: VarNames::Id,
        gex_only: false,
        ..PrepConfig::default()
    };

    let ctx = run_stage1(tmp.path(), config).unwrap();
    let m = ctx.matrix().unwrap();
    assert_eq!(m.genes().ids(), &["ENSG01", "ENSG02", "ENSG03", "AB01"]);
    assert_eq!(m.get(0, 3), 7.0);
    assert!(ctx.warnings.is_empty());
}

#[test]
fn stage1_reads_legacy_gzipped_genes_tsv() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("matrix.mtx"), MTX).unwrap();
    fs::write(tmp.path().join("barcodes.tsv"), "AAAC-1\nTTTG-1\n").unwrap();
    let file = fs::File::create(tmp.path().join("genes.tsv.gz")).unwrap();
    let mut gz = GzEncoder::new(file, Compression::default());
    gz.write_all(b"ENSG01\tCD3E\nENSG02\tCD8A\nENSG03\tMS4A1\nENSG04\tNKG7\n")
        .unwrap();
    gz.finish().unwrap();

    let ctx = run_stage1(tmp.path(), PrepConfig::default()).unwrap();
    let m = ctx.matrix().unwrap();
    assert_eq!(m.genes().ids(), &["CD3E", "CD8A", "MS4A1", "NKG7"]);
    assert_eq!(m.get(1, 3), 2.0);
}

#[test]
fn stage1_rejects_barcode_mismatch() {
    let tmp = TempDir::new().unwrap();
    write_dir(tmp.path(), "features.tsv", FEATURES);
    fs::write(tmp.path().join("barcodes.tsv"), "AAAC-1\n").unwrap();

    let err = run_stage1(tmp.path(), PrepConfig::default()).unwrap_err();
    assert!(format!("{:#}", err).contains("barcodes"));
}

#[test]
fn stage1_reports_missing_files() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("matrix.mtx"), MTX).unwrap();
    let err = run_stage1(tmp.path(), PrepConfig::default()).unwrap_err();
    assert!(format!("{:#}", err).contains("features.tsv"));
}
