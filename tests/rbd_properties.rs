//! Randomized invariant tests over the public API (spec.md section 8).

use librbd::{
    bridge_generic, koon_generic, koon_identical, parallel_generic, series_generic,
};
use proptest::prelude::*;

fn reliabilities(n: usize, t: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(0.0f64..=1.0f64, n * t)
}

proptest! {
    #[test]
    fn series_is_clamped_and_le_min_component(rel in reliabilities(4, 6)) {
        let n = 4;
        let t = 6;
        let out = series_generic(&rel, n, t).unwrap();
        for tt in 0..t {
            prop_assert!((0.0..=1.0).contains(&out[tt]));
            let min = (0..n).map(|c| rel[c * t + tt]).fold(f64::INFINITY, f64::min);
            prop_assert!(out[tt] <= min + 1e-9);
        }
    }

    #[test]
    fn parallel_is_clamped_and_ge_max_component(rel in reliabilities(4, 6)) {
        let n = 4;
        let t = 6;
        let out = parallel_generic(&rel, n, t).unwrap();
        for tt in 0..t {
            prop_assert!((0.0..=1.0).contains(&out[tt]));
            let max = (0..n).map(|c| rel[c * t + tt]).fold(f64::NEG_INFINITY, f64::max);
            prop_assert!(out[tt] >= max - 1e-9);
        }
    }

    #[test]
    fn bridge_generic_is_clamped(rel in reliabilities(5, 4)) {
        let out = bridge_generic(&rel, 5, 4).unwrap();
        for v in out {
            prop_assert!((0.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn koon_identical_is_monotonic_in_k(r in 0.0f64..=1.0f64) {
        let n = 6;
        let mut prev = 1.0;
        for k in 1..=n {
            let out = koon_identical(&[r], n, 1, k).unwrap();
            prop_assert!(out[0] <= prev + 1e-9);
            prev = out[0];
        }
    }

    #[test]
    fn koon_identical_boundary_matches_series_and_parallel(r in 0.0f64..=1.0f64) {
        let n = 5;
        let series = koon_identical(&[r], n, 1, n).unwrap()[0];
        let expected_series = r.powi(n as i32);
        prop_assert!((series - expected_series).abs() < 1e-9);

        let parallel = koon_identical(&[r], n, 1, 1).unwrap()[0];
        let expected_parallel = 1.0 - (1.0 - r).powi(n as i32);
        prop_assert!((parallel - expected_parallel).abs() < 1e-9);
    }

    #[test]
    fn koon_generic_matches_recursive_for_mixed_reliabilities(rel in reliabilities(6, 1)) {
        let n = 6;
        for k in 1..=n {
            let combinatorial = koon_generic(&rel, n, 1, k).unwrap()[0];
            let recursive = librbd::koon::recursive_one(&rel, 1, 0, n, k);
            prop_assert!((combinatorial - recursive).abs() < 1e-6);
        }
    }

    #[test]
    fn series_generic_output_is_independent_of_thread_count(rel in reliabilities(3, 300)) {
        let n = 3;
        let t = 300;
        let first = series_generic(&rel, n, t).unwrap();
        let second = series_generic(&rel, n, t).unwrap();
        for tt in 0..t {
            prop_assert!((first[tt] - second[tt]).abs() < 2.0 * f64::EPSILON);
        }
    }
}

#[test]
fn non_multiple_of_batch_times_numcores_skips_no_index() {
    // Regression for spec.md section 9 open question (a): a T that
    // doesn't divide evenly across workers/lanes must still produce a
    // value at every index (no skipped tail, no duplicate write).
    let n = 2;
    for t in [1usize, 3, 5, 7, 17, 33, 127, 257] {
        let mut rel = vec![0.0f64; n * t];
        for c in 0..n {
            for tt in 0..t {
                rel[c * t + tt] = 0.5 + 0.01 * (tt as f64 % 13.0);
            }
        }
        let out = series_generic(&rel, n, t).unwrap();
        assert_eq!(out.len(), t);
        for v in out {
            assert!((0.0..=1.0).contains(&v));
        }
    }
}
