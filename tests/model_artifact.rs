use std::fs;

use kira_pseudotime::config::{ModelConfig, PrepConfig};
use kira_pseudotime::geneset::GeneSet;
use kira_pseudotime::matrix::ExpressionMatrix;
use kira_pseudotime::model::artifact::PreprocessingSnapshot;
use kira_pseudotime::model::{PrincipalAxisBackend, TrainedModelArtifact, TrajectoryBackend};
use tempfile::TempDir;

fn ids(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn trained_artifact() -> TrainedModelArtifact {
    let genes = GeneSet::new(ids(&["CD3E", "MS4A1", "NKG7"])).unwrap();
    let m = ExpressionMatrix::from_triplets(
        ids(&["c1", "c2", "c3", "c4"]),
        genes.clone(),
        &[
            (0, 0, 5.0),
            (0, 1, 1.0),
            (1, 0, 3.0),
            (1, 2, 2.0),
            (2, 1, 4.0),
            (2, 2, 1.0),
            (3, 0, 1.0),
            (3, 1, 6.0),
        ],
    )
    .unwrap();
    let trained = PrincipalAxisBackend
        .train(&m, &ModelConfig::default())
        .unwrap();
    TrainedModelArtifact::new(
        "tcells",
        genes,
        PreprocessingSnapshot::from_config(&PrepConfig::default(), false),
        trained.params,
    )
}

#[test]
fn artifact_roundtrip_keeps_gene_order() {
    let tmp = TempDir::new().unwrap();
    let model_dir = tmp.path().join("models").join("nested");
    let artifact = trained_artifact();

    let path = artifact.save(&model_dir).unwrap();
    assert_eq!(path, model_dir.join("tcells.json"));

    let loaded = TrainedModelArtifact::load(&path).unwrap();
    assert_eq!(loaded.model_name, artifact.model_name);
    assert_eq!(loaded.genes, artifact.genes);
    assert_eq!(loaded.preprocessing, artifact.preprocessing);
    assert_eq!(loaded.params.n_latent(), artifact.params.n_latent());
    assert_eq!(loaded.genes.ids(), &ids(&["CD3E", "MS4A1", "NKG7"])[..]);
    assert_eq!(loaded.schema_version, "v1");
    assert_eq!(loaded.preprocessing.min_cells, 20);
    assert_eq!(loaded.preprocessing.n_top_genes, 2000);
}

#[test]
fn artifact_json_names_backend() {
    let tmp = TempDir::new().unwrap();
    let path = trained_artifact().save(tmp.path()).unwrap();
    let value: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(value["params"]["backend"], "principal-axis");
    assert_eq!(value["genes"][1], "MS4A1");
    assert_eq!(value["tool"], "kira-pseudotime");
}

#[test]
fn artifact_load_rejects_inconsistent_genes() {
    let tmp = TempDir::new().unwrap();
    let path = trained_artifact().save(tmp.path()).unwrap();
    let mut value: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    value["genes"] = serde_json::json!(["CD3E", "MS4A1"]);
    fs::write(&path, serde_json::to_string(&value).unwrap()).unwrap();
    assert!(TrainedModelArtifact::load(&path).is_err());

    value["genes"] = serde_json::json!(["CD3E", "CD3E", "NKG7"]);
    fs::write(&path, serde_json::to_string(&value).unwrap()).unwrap();
    assert!(TrainedModelArtifact::load(&path).is_err());
}
