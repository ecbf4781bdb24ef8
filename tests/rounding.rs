use kira_pseudotime::geneset::GeneSet;
use kira_pseudotime::matrix::ExpressionMatrix;

fn ids(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn fractional_matrix() -> ExpressionMatrix {
    ExpressionMatrix::from_triplets(
        ids(&["c1", "c2"]),
        GeneSet::new(ids(&["g0", "g1", "g2"])).unwrap(),
        &[
            (0, 0, 0.5),
            (0, 1, 1.5),
            (0, 2, 2.5),
            (1, 0, 2.4),
            (1, 1, 2.6),
            (1, 2, 0.2),
        ],
    )
    .unwrap()
}

#[test]
fn rounding_is_ties_to_even() {
    let mut m = fractional_matrix();
    m.round_counts();
    assert_eq!(m.get(0, 0), 0.0);
    assert_eq!(m.get(0, 1), 2.0);
    assert_eq!(m.get(0, 2), 2.0);
    assert_eq!(m.get(1, 0), 2.0);
    assert_eq!(m.get(1, 1), 3.0);
    assert_eq!(m.get(1, 2), 0.0);
}

#[test]
fn rounding_is_idempotent() {
    let mut once = fractional_matrix();
    once.round_counts();
    let mut twice = once.clone();
    twice.round_counts();
    assert_eq!(once.counts(), twice.counts());
    for c in 0..once.n_cells() {
        for g in 0..once.n_genes() {
            assert_eq!(once.get(c, g).fract(), 0.0);
        }
    }
}
