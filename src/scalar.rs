//! Reference scalar kernels (C1).
//!
//! One time instant at a time. These define the exact numerical
//! contract every vector kernel must reproduce (up to the associativity
//! allowances spec.md section 4.1/4.2 spells out), and they are also
//! what every tiered worker falls back to for a trailing scalar tail.

/// `min(max(x, 0), 1)`.
#[inline(always)]
pub fn cap(x: f64) -> f64 {
    x.max(0.0).min(1.0)
}

/// Series, generic components, one time instant.
#[inline]
pub fn series_generic_one(components: &[f64]) -> f64 {
    let mut r = components[0];
    for &c in &components[1..] {
        r *= c;
    }
    cap(r)
}

/// Series, identical components, one time instant. Power by repeated
/// multiplication; `pow` is not permitted so vector kernels can match
/// this bit for bit modulo FMA fusion.
#[inline]
pub fn series_identical_one(r: f64, n: usize) -> f64 {
    let mut acc = r;
    for _ in 1..n {
        acc *= r;
    }
    cap(acc)
}

/// Parallel, generic components, one time instant.
#[inline]
pub fn parallel_generic_one(components: &[f64]) -> f64 {
    let mut s = 1.0 - components[0];
    for &c in &components[1..] {
        s *= 1.0 - c;
    }
    cap(1.0 - s)
}

/// Parallel, identical components, one time instant.
#[inline]
pub fn parallel_identical_one(r: f64, n: usize) -> f64 {
    let u = 1.0 - r;
    let mut acc = u;
    for _ in 1..n {
        acc *= u;
    }
    cap(1.0 - acc)
}

/// Bridge, generic (5 components), one time instant. Mandated
/// reformulation (spec.md section 4.1): fewer operations than the
/// textbook form, no explicit `1-x` subtractions beyond VAL1/VAL2.
#[inline]
pub fn bridge_generic_one(r1: f64, r2: f64, r3: f64, r4: f64, r5: f64) -> f64 {
    let val1 = (r1 + r3 - r1 * r3) * (r2 + r4 - r2 * r4);
    let val2 = r1 * r2 + r3 * r4 - r1 * r2 * r3 * r4;
    cap(r5 * (val1 - val2) + val2)
}

/// Bridge, identical components, one time instant. The parenthesization
/// is mandatory (spec.md section 4.1) so every tier matches bit for bit.
#[inline]
pub fn bridge_identical_one(r: f64) -> f64 {
    let u = 1.0 - r;
    cap(r * (1.0 + u * (u * (u * u - 2.0) + r * (2.0 - r * r))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn series_matches_scenario_1() {
        // spec.md section 8, scenario 1: N=3, T=2.
        let t0 = [0.9, 0.95, 0.8];
        let t1 = [0.8, 0.9, 0.7];
        assert!((series_generic_one(&t0) - 0.684).abs() < 1e-12);
        assert!((series_generic_one(&t1) - 0.504).abs() < 1e-12);
    }

    #[test]
    fn parallel_matches_scenario_2() {
        // spec.md section 8, scenario 2: N=2, T=1, rel = [0.5, 0.5].
        let t0 = [0.5, 0.5];
        assert!((parallel_generic_one(&t0) - 0.75).abs() < 1e-12);
    }

    #[test]
    fn bridge_identical_matches_scenario_3() {
        // spec.md section 8, scenario 3.
        assert!((bridge_identical_one(0.9) - 0.97848).abs() < 1e-9);
        assert!((bridge_identical_one(0.5) - 0.5).abs() < 1e-12);
        assert!((bridge_identical_one(0.99) - 0.999702).abs() < 1e-6);
    }

    #[test]
    fn bridge_generic_agrees_with_identical_when_rows_equal() {
        for r in [0.1, 0.42, 0.9, 0.999] {
            let generic = bridge_generic_one(r, r, r, r, r);
            let identical = bridge_identical_one(r);
            assert!((generic - identical).abs() < 1e-9, "r={r}");
        }
    }

    #[test]
    fn series_le_min_component() {
        let row = [0.9, 0.3, 0.95];
        let out = series_generic_one(&row);
        let min = row.iter().cloned().fold(f64::INFINITY, f64::min);
        assert!(out <= min + 1e-15);
    }

    #[test]
    fn parallel_ge_max_component() {
        let row = [0.9, 0.3, 0.95];
        let out = parallel_generic_one(&row);
        let max = row.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        assert!(out >= max - 1e-15);
    }

    #[test]
    fn cap_clamps_both_directions() {
        assert_eq!(cap(-0.1), 0.0);
        assert_eq!(cap(1.1), 1.0);
        assert_eq!(cap(0.4), 0.4);
    }
}
