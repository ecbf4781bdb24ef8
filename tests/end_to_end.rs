use std::fs;
use std::path::Path;

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

const N_CELLS: usize = 6;

fn counts(gene: usize, cell: usize, n_cells: usize) -> u32 {
    match gene {
        0 => cell as u32 + 1,
        1 => (n_cells - cell) as u32,
        2 => (cell % 2) as u32 * 5 + 1,
        3 => (cell * cell) as u32,
        _ => 2,
    }
}

fn write_10x(dir: &Path, gene_names: &[&str]) {
    write_10x_cells(dir, gene_names, N_CELLS);
}

fn write_10x_cells(dir: &Path, gene_names: &[&str], n_cells: usize) {
    fs::create_dir_all(dir).unwrap();
    let mut entries = Vec::new();
    for gene in 0..gene_names.len() {
        for cell in 0..n_cells {
            let v = counts(gene, cell, n_cells);
            if v > 0 {
                entries.push(format!("{} {} {}", gene + 1, cell + 1, v));
            }
        }
    }
    let mtx = format!(
        "%%MatrixMarket matrix coordinate integer general\n{} {} {}\n{}\n",
        gene_names.len(),
        n_cells,
        entries.len(),
        entries.join("\n")
    );
    fs::write(dir.join("matrix.mtx"), mtx).unwrap();

    let features: String = gene_names
        .iter()
        .enumerate()
        .map(|(i, g)| format!("ENSG{:02}\t{}\tGene Expression\n", i, g))
        .collect();
    fs::write(dir.join("features.tsv"), features).unwrap();

    let barcodes: String = (0..n_cells).map(|c| format!("cell{}-1\n", c)).collect();
    fs::write(dir.join("barcodes.tsv"), barcodes).unwrap();
}

const GENES: [&str; 5] = ["CD3E", "MS4A1", "NKG7", "LYZ", "ACTB"];

fn train(input: &Path, out: &Path) -> std::path::PathBuf {
    train_with(input, out, &["--n-top-genes", "3"])
}

fn train_with(input: &Path, out: &Path, extra: &[&str]) -> std::path::PathBuf {
    let mut cmd = Command::cargo_bin("kira-pseudotime").unwrap();
    cmd.arg("train")
        .arg("--input")
        .arg(input)
        .arg("--model-dir")
        .arg(out.join("models"))
        .args(["--model-name", "demo"])
        .arg("--ptime-out")
        .arg(out.join("train").join("ptime.csv"))
        .arg("--embedding-out")
        .arg(out.join("train").join("embedding.csv"))
        .arg("--report")
        .arg(out.join("train").join("report.json"))
        .args(["--min-cells", "1"])
        .args(extra);
    cmd.assert().success();
    out.join("models").join("demo.json")
}

#[test]
fn train_writes_ptime_embedding_and_model() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("data");
    write_10x(&input, &GENES);
    let model = train(&input, tmp.path());
    assert!(model.is_file());

    let ptime = fs::read_to_string(tmp.path().join("train").join("ptime.csv")).unwrap();
    let lines: Vec<&str> = ptime.lines().collect();
    assert_eq!(lines.len(), N_CELLS + 1);
    assert_eq!(lines[0], ",ptime");
    assert!(lines[1].starts_with("cell0-1,"));
    for line in &lines[1..] {
        let t: f32 = line.split(',').nth(1).unwrap().parse().unwrap();
        assert!((0.0..=1.0).contains(&t));
    }

    let embedding = fs::read_to_string(tmp.path().join("train").join("embedding.csv")).unwrap();
    let rows: Vec<&str> = embedding.lines().collect();
    assert_eq!(rows.len(), N_CELLS);
    assert!(rows.iter().all(|r| r.split(',').count() == 3));

    let v: Value =
        serde_json::from_slice(&fs::read(tmp.path().join("train").join("report.json")).unwrap())
            .unwrap();
    assert_eq!(v["mode"], "train");
    assert_eq!(v["schema_version"], "v1");
    assert_eq!(v["qc"]["min_cells"], 1);
    assert_eq!(v["hvg"]["flavor"], "seurat_v3");
    assert_eq!(v["features"].as_array().unwrap().len(), 3);
    assert_eq!(v["model"]["backend"], "principal-axis");
    assert!(v["outputs"]["model"].is_string());

    let artifact: Value = serde_json::from_slice(&fs::read(&model).unwrap()).unwrap();
    assert_eq!(artifact["genes"], v["features"]);
}

#[test]
fn train_three_cells_five_genes() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("small");
    write_10x_cells(&input, &GENES, 3);
    train(&input, tmp.path());

    let ptime = fs::read_to_string(tmp.path().join("train").join("ptime.csv")).unwrap();
    assert_eq!(ptime.lines().count(), 4);
    let embedding = fs::read_to_string(tmp.path().join("train").join("embedding.csv")).unwrap();
    let rows: Vec<&str> = embedding.lines().collect();
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|r| r.split(',').count() == 3));
}

#[test]
fn predict_reuses_model_genes() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("data");
    write_10x(&input, &GENES);
    let model = train(&input, tmp.path());

    let mut cmd = Command::cargo_bin("kira-pseudotime").unwrap();
    cmd.arg("predict")
        .arg("--input")
        .arg(&input)
        .arg("--model")
        .arg(&model)
        .arg("--ptime-out")
        .arg(tmp.path().join("pred").join("ptime.csv"))
        .arg("--embedding-out")
        .arg(tmp.path().join("pred").join("embedding.csv"))
        .args(["--min-cells", "1", "--n-top-genes", "3"]);
    cmd.assert().success();

    let trained = fs::read_to_string(tmp.path().join("train").join("ptime.csv")).unwrap();
    let predicted = fs::read_to_string(tmp.path().join("pred").join("ptime.csv")).unwrap();
    let parse = |s: &str| -> Vec<f32> {
        s.lines()
            .skip(1)
            .map(|l| l.split(',').nth(1).unwrap().parse().unwrap())
            .collect()
    };
    for (a, b) in parse(&trained).iter().zip(parse(&predicted)) {
        assert!((a - b).abs() < 1e-4);
    }
}

#[test]
fn predict_fails_fast_on_missing_model_genes() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("data");
    write_10x(&input, &GENES);
    let model = train(&input, tmp.path());

    let other = tmp.path().join("other");
    write_10x(&other, &["G1", "G2", "G3", "G4", "G5"]);
    let mut cmd = Command::cargo_bin("kira-pseudotime").unwrap();
    cmd.arg("predict")
        .arg("--input")
        .arg(&other)
        .arg("--model")
        .arg(&model)
        .arg("--ptime-out")
        .arg(tmp.path().join("pred").join("ptime.csv"))
        .arg("--embedding-out")
        .arg(tmp.path().join("pred").join("embedding.csv"))
        .args(["--min-cells", "1"]);
    let out = cmd.assert().failure().get_output().stderr.clone();
    let stderr = String::from_utf8(out).unwrap();
    assert!(stderr.contains("absent from the dataset"));
    assert!(!tmp.path().join("pred").join("ptime.csv").exists());
}

#[test]
fn explore_without_overlap_reports_and_writes_nothing() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("data");
    write_10x(&input, &GENES);
    let meta = tmp.path().join("meta.csv");
    fs::write(&meta, ",Timepoint\nother-1,Day0\nother-2,Day7\n").unwrap();
    let ptime = tmp.path().join("explore").join("ptime.csv");

    let mut cmd = Command::cargo_bin("kira-pseudotime").unwrap();
    cmd.arg("explore")
        .arg("--input")
        .arg(&input)
        .arg("--metadata")
        .arg(&meta)
        .arg("--ptime-out")
        .arg(&ptime)
        .args(["--min-cells", "1", "--n-top-genes", "3"]);
    let out = cmd.assert().code(1).get_output().stdout.clone();
    let stdout = String::from_utf8(out).unwrap();
    assert!(stdout.contains("No cells in intersection"));
    assert!(!ptime.exists());
}

#[test]
fn explore_restricts_sorts_and_groups() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("data");
    write_10x(&input, &GENES);
    let meta = tmp.path().join("meta.csv");
    fs::write(
        &meta,
        ",Timepoint,SubjectId\ncell1-1,Day0,S1\ncell2-1,Day0,S2\ncell4-1,Day7,S1\ncell5-1,Day7,S2\nghost-1,Day7,S3\n",
    )
    .unwrap();
    let out_dir = tmp.path().join("explore");

    let mut cmd = Command::cargo_bin("kira-pseudotime").unwrap();
    cmd.arg("explore")
        .arg("--input")
        .arg(&input)
        .arg("--metadata")
        .arg(&meta)
        .args(["--metadata-columns", "Timepoint"])
        .arg("--ptime-out")
        .arg(out_dir.join("ptime.csv"))
        .arg("--sort-by-ptime")
        .args(["--group-by", "Timepoint"])
        .arg("--group-out")
        .arg(out_dir.join("groups.tsv"))
        .args(["--min-cells", "1", "--n-top-genes", "3"]);
    cmd.assert().success();

    let ptime = fs::read_to_string(out_dir.join("ptime.csv")).unwrap();
    let values: Vec<f32> = ptime
        .lines()
        .skip(1)
        .map(|l| l.split(',').nth(1).unwrap().parse().unwrap())
        .collect();
    assert_eq!(values.len(), 4);
    assert!(values.windows(2).all(|w| w[0] <= w[1]));
    assert!(!out_dir.join("embedding.csv").exists());

    let groups = fs::read_to_string(out_dir.join("groups.tsv")).unwrap();
    let lines: Vec<&str> = groups.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[1].starts_with("Day0\t2\t"));
    assert!(lines[2].starts_with("Day7\t2\t"));
}

#[test]
fn model_show_prints_artifact_metadata() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("data");
    write_10x(&input, &GENES);
    let model = train(&input, tmp.path());

    let mut cmd = Command::cargo_bin("kira-pseudotime").unwrap();
    cmd.args(["model", "show", "--genes", "--model"]).arg(&model);
    let out = cmd.assert().success().get_output().stdout.clone();
    let stdout = String::from_utf8(out).unwrap();
    assert!(stdout.contains("model: demo"));
    assert!(stdout.contains("backend: principal-axis"));
    assert!(stdout.contains("genes: 3"));
    assert!(stdout.contains("min_cells=1"));
}

fn predict_cmd(input: &Path, model: &Path, out: &Path) -> Command {
    let mut cmd = Command::cargo_bin("kira-pseudotime").unwrap();
    cmd.arg("predict")
        .arg("--input")
        .arg(input)
        .arg("--model")
        .arg(model)
        .arg("--ptime-out")
        .arg(out.join("ptime.csv"))
        .arg("--embedding-out")
        .arg(out.join("embedding.csv"));
    cmd
}

fn model_genes(model: &Path) -> Vec<String> {
    let artifact: Value = serde_json::from_slice(&fs::read(model).unwrap()).unwrap();
    artifact["genes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|g| g.as_str().unwrap().to_string())
        .collect()
}

#[test]
fn train_never_keeps_excluded_genes() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("data");
    write_10x(&input, &GENES);
    let exclude = tmp.path().join("exclude.json");
    fs::write(&exclude, r#"["LYZ"]"#).unwrap();

    // Every remaining gene is selected, so LYZ would be kept without the list.
    let model = train_with(
        &input,
        tmp.path(),
        &["--n-top-genes", "5", "--exclude", exclude.to_str().unwrap()],
    );

    let genes = model_genes(&model);
    assert_eq!(genes, vec!["CD3E", "MS4A1", "NKG7", "ACTB"]);
    let v: Value =
        serde_json::from_slice(&fs::read(tmp.path().join("train").join("report.json")).unwrap())
            .unwrap();
    let features: Vec<&str> = v["features"]
        .as_array()
        .unwrap()
        .iter()
        .map(|g| g.as_str().unwrap())
        .collect();
    assert!(!features.contains(&"LYZ"));
    assert_eq!(v["exclusion"]["removed"], 1);
}

#[test]
fn predict_fails_fast_on_excluded_model_gene() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("data");
    write_10x(&input, &GENES);
    let model = train_with(&input, tmp.path(), &["--n-top-genes", "5"]);
    assert!(model_genes(&model).contains(&"LYZ".to_string()));
    let exclude = tmp.path().join("exclude.json");
    fs::write(&exclude, r#"["LYZ"]"#).unwrap();

    let out_dir = tmp.path().join("pred");
    let mut cmd = predict_cmd(&input, &model, &out_dir);
    cmd.arg("--exclude").arg(&exclude).args(["--min-cells", "1"]);
    let out = cmd.assert().failure().get_output().stderr.clone();
    let stderr = String::from_utf8(out).unwrap();
    assert!(stderr.contains("1 of 5 model genes are absent"));
    assert!(stderr.contains("LYZ"));
    assert!(!out_dir.join("ptime.csv").exists());
}

#[test]
fn predict_treats_qc_failing_model_gene_as_missing() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("data");
    write_10x(&input, &GENES);
    let model = train_with(&input, tmp.path(), &["--n-top-genes", "5"]);

    // LYZ is zero in cell0, so it is expressed in 5 of 6 cells.
    let out_dir = tmp.path().join("pred");
    let mut cmd = predict_cmd(&input, &model, &out_dir);
    cmd.args(["--min-cells", "6"]);
    let out = cmd.assert().failure().get_output().stderr.clone();
    let stderr = String::from_utf8(out).unwrap();
    assert!(stderr.contains("1 of 5 model genes are absent"));
    assert!(stderr.contains("LYZ"));
    assert!(!out_dir.join("ptime.csv").exists());
    assert!(!out_dir.join("embedding.csv").exists());
}

#[test]
fn predict_zero_fills_qc_failing_model_gene_on_request() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("data");
    write_10x(&input, &GENES);
    let model = train_with(&input, tmp.path(), &["--n-top-genes", "5"]);

    let out_dir = tmp.path().join("pred");
    let mut cmd = predict_cmd(&input, &model, &out_dir);
    cmd.args(["--min-cells", "6", "--missing-genes", "zero-fill"])
        .arg("--report")
        .arg(out_dir.join("report.json"));
    let out = cmd.assert().success().get_output().stdout.clone();
    let stdout = String::from_utf8(out).unwrap();
    assert!(stdout.contains("zero-filled: LYZ"));

    let v: Value = serde_json::from_slice(&fs::read(out_dir.join("report.json")).unwrap()).unwrap();
    assert_eq!(v["alignment"]["present"], 4);
    assert_eq!(v["alignment"]["zero_filled"][0], "LYZ");
    assert_eq!(v["features"].as_array().unwrap().len(), 5);
    let embedding = fs::read_to_string(out_dir.join("embedding.csv")).unwrap();
    assert_eq!(embedding.lines().count(), N_CELLS);
}

#[test]
fn failed_report_write_removes_earlier_outputs() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("data");
    write_10x(&input, &GENES);
    let out_dir = tmp.path().join("train");
    let report = out_dir.join("report.json");
    fs::create_dir_all(&report).unwrap();

    let mut cmd = Command::cargo_bin("kira-pseudotime").unwrap();
    cmd.arg("train")
        .arg("--input")
        .arg(&input)
        .arg("--model-dir")
        .arg(tmp.path().join("models"))
        .args(["--model-name", "demo"])
        .arg("--ptime-out")
        .arg(out_dir.join("ptime.csv"))
        .arg("--embedding-out")
        .arg(out_dir.join("embedding.csv"))
        .arg("--report")
        .arg(&report)
        .args(["--min-cells", "1", "--n-top-genes", "3"]);
    cmd.assert().failure();

    assert!(!out_dir.join("ptime.csv").exists());
    assert!(!out_dir.join("embedding.csv").exists());
    assert!(!tmp.path().join("models").join("demo.json").exists());
    assert!(report.is_dir());
}
