//! Literal end-to-end scenarios, public API surface.

use librbd::{bridge_identical, koon_generic, koon_identical, parallel_generic, series_generic};

#[test]
fn scenario_1_series_n3_t2() {
    let rel = [0.9, 0.8, 0.95, 0.9, 0.8, 0.7];
    let out = series_generic(&rel, 3, 2).unwrap();
    assert!((out[0] - 0.684).abs() < 1e-12);
    assert!((out[1] - 0.504).abs() < 1e-12);
}

#[test]
fn scenario_2_parallel_n2_t1() {
    let rel = [0.5, 0.5];
    let out = parallel_generic(&rel, 2, 1).unwrap();
    assert!((out[0] - 0.75).abs() < 1e-12);
}

#[test]
fn scenario_3_bridge_identical_t3() {
    let rel = [0.9, 0.5, 0.99];
    let out = bridge_identical(&rel, 5, 3).unwrap();
    assert!((out[0] - 0.97848).abs() < 1e-9);
    assert!((out[1] - 0.5).abs() < 1e-12);
    assert!((out[2] - 0.999702).abs() < 1e-6);
}

#[test]
fn scenario_4_koon_3_2_identical_t1() {
    let rel = [0.9];
    let out = koon_identical(&rel, 3, 1, 2).unwrap();
    assert!((out[0] - 0.972).abs() < 1e-12);
}

#[test]
fn scenario_5_koon_5_3_generic_matches_identical() {
    let rel = [0.9; 5];
    let out = koon_generic(&rel, 5, 1, 3).unwrap();
    assert!((out[0] - 0.99144).abs() < 1e-9);
}

#[test]
fn scenario_6_koon_6_3_generic_t2() {
    let mut rel = Vec::with_capacity(12);
    for _ in 0..6 {
        rel.push(0.8);
        rel.push(0.9);
    }
    let out = koon_generic(&rel, 6, 2, 3).unwrap();
    assert!((out[0] - 0.98304).abs() < 1e-5);
    assert!((out[1] - 0.99837).abs() < 1e-5);
}
