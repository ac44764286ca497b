//! Small hand-built models shared by unit tests.

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::{Dag, VarKind};
use crate::models::{HybridIm, HybridPm};

/// A (discrete, 2), W (continuous), X (continuous),
/// Y (continuous) <- A, X and Z (discrete, 3) <- W, A, X.
pub fn mixed_parts() -> (Dag, Vec<String>, HashMap<String, VarKind>) {
    let dag = Dag::from_edges(
        &["A", "W", "X", "Y", "Z"],
        &[("A", "Y"), ("X", "Y"), ("W", "Z"), ("A", "Z"), ("X", "Z")],
    )
    .unwrap();
    let order = ["A", "W", "X", "Y", "Z"].iter().map(|s| s.to_string()).collect();
    let kinds = HashMap::from([
        ("A".to_string(), VarKind::discrete(2)),
        ("W".to_string(), VarKind::Continuous),
        ("X".to_string(), VarKind::Continuous),
        ("Y".to_string(), VarKind::Continuous),
        ("Z".to_string(), VarKind::discrete(3)),
    ]);
    (dag, order, kinds)
}

pub fn mixed_pm() -> HybridPm {
    let (dag, order, kinds) = mixed_parts();
    HybridPm::new(dag, &order, &kinds).unwrap()
}

/// `mixed_pm` with W cut at `[0.0]` and X cut at `[-1.0, 1.0]` for Z.
pub fn complete_mixed_pm() -> HybridPm {
    let mut pm = mixed_pm();
    pm.set_cutpoints(
        "Z",
        &HashMap::from([
            ("W".to_string(), vec![0.0]),
            ("X".to_string(), vec![-1.0, 1.0]),
        ]),
    )
    .unwrap();
    pm
}

/// X (continuous) -> Y (discrete, 2) with Y cutting X at `[0.0]`.
pub fn binary_threshold_pm() -> HybridPm {
    let dag = Dag::from_edges(&["X", "Y"], &[("X", "Y")]).unwrap();
    let kinds = HashMap::from([
        ("X".to_string(), VarKind::Continuous),
        ("Y".to_string(), VarKind::discrete(2)),
    ]);
    HybridPm::builder(dag, &["X", "Y"], &kinds)
        .unwrap()
        .cutpoints("Y", &HashMap::from([("X".to_string(), vec![0.0])]))
        .unwrap()
        .build()
        .unwrap()
}

/// X ~ N(0, 1) -> Y (discrete, 3) cut at `[-0.5, 0.5]`, plus
/// V (continuous) <- X, Y with a per-category regression on X.
pub fn round_trip_pm() -> Arc<HybridPm> {
    let dag = Dag::from_edges(&["X", "Y", "V"], &[("X", "Y"), ("X", "V"), ("Y", "V")]).unwrap();
    let kinds = HashMap::from([
        ("X".to_string(), VarKind::Continuous),
        ("Y".to_string(), VarKind::discrete(3)),
        ("V".to_string(), VarKind::Continuous),
    ]);
    let pm = HybridPm::builder(dag, &["X", "Y", "V"], &kinds)
        .unwrap()
        .cutpoints("Y", &HashMap::from([("X".to_string(), vec![-0.5, 0.5])]))
        .unwrap()
        .build()
        .unwrap();
    Arc::new(pm)
}

/// Generating probabilities of Y per X bin in `round_trip_im`.
pub const ROUND_TRIP_CPT: [[f64; 3]; 3] = [[0.7, 0.2, 0.1], [0.2, 0.6, 0.2], [0.1, 0.3, 0.6]];

/// Generating `(intercept, slope on X, variance)` of V per Y category.
pub const ROUND_TRIP_V: [(f64, f64, f64); 3] = [(0.0, 1.0, 0.5), (1.0, -0.5, 0.25), (-1.0, 2.0, 1.0)];

pub fn round_trip_im() -> HybridIm {
    let pm = round_trip_pm();
    let x = pm.require_index("X").unwrap();
    let y = pm.require_index("Y").unwrap();
    let v = pm.require_index("V").unwrap();

    let mut im = HybridIm::new(pm).unwrap();
    im.set_intercept(x, 0, 0.0).unwrap();
    im.set_variance(x, 0, 1.0).unwrap();
    for (row, probs) in ROUND_TRIP_CPT.iter().enumerate() {
        for (k, &p) in probs.iter().enumerate() {
            im.set_probability(y, row, k, p).unwrap();
        }
    }
    for (row, &(b0, b1, var)) in ROUND_TRIP_V.iter().enumerate() {
        im.set_intercept(v, row, b0).unwrap();
        im.set_coefficient(v, row, 0, b1).unwrap();
        im.set_variance(v, row, var).unwrap();
    }
    im
}
