use kira_pseudotime::pipeline::Pipeline;
use kira_pseudotime::schema::v1::Mode;

#[test]
fn validate_stops_after_hvg() {
    let names = Pipeline::for_mode(Mode::Validate).stage_names();
    assert_eq!(names.first(), Some(&"stage0_preflight"));
    assert_eq!(names.last(), Some(&"stage6_hvg"));
    assert!(!names.contains(&"stage10_output"));
}

#[test]
fn metadata_stage_runs_before_filtering() {
    let names = Pipeline::for_mode(Mode::Explore).stage_names();
    let pos = |n: &str| names.iter().position(|s| *s == n).unwrap();
    assert!(pos("stage1_input") < pos("stage2_metadata"));
    assert!(pos("stage2_metadata") < pos("stage3_counts"));
    assert!(pos("stage5_qc") < pos("stage6_hvg"));
    assert_eq!(names.last(), Some(&"stage10_output"));
    assert_eq!(names.len(), 11);
}
