//! The k-out-of-n solver (C4).
//!
//! Three algorithms share this module: combinatorial success-sum,
//! combinatorial fail-sum, and recursive Shannon expansion. A policy
//! function chooses among them per spec.md section 4.4.

use crate::config::KOON_COMBINATORIAL_TERM_LIMIT;
use crate::scalar::cap;

/// Which of the three KooN algorithms a given `(n, k)` resolves to.
/// Trivial cases (`k == 0`, `k == 1`, `k == n`, `k > n`) are handled by
/// the caller before this policy is consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    SuccessSum,
    FailSum,
    Recursive,
}

/// Enumerate every size-`k` subset of `{0, ..., n-1}` in lexicographic
/// order, calling `f` with the subset's sorted indices. No allocation
/// beyond the one reused `k`-length scratch vector.
pub fn for_each_combination(n: usize, k: usize, mut f: impl FnMut(&[u8])) {
    if k > n {
        return;
    }
    if k == 0 {
        f(&[]);
        return;
    }
    let mut combo: Vec<u8> = (0..k as u8).collect();
    loop {
        f(&combo);
        let mut i = k;
        let pos = loop {
            if i == 0 {
                return;
            }
            i -= 1;
            if combo[i] as usize != i + n - k {
                break i;
            }
        };
        combo[pos] += 1;
        for j in (pos + 1)..k {
            combo[j] = combo[j - 1] + 1;
        }
    }
}

/// `C(n, k)` with checked arithmetic; `None` on overflow or `k > n`.
fn binomial_checked(n: u64, k: u64) -> Option<u64> {
    if k > n {
        return Some(0);
    }
    let k = k.min(n - k);
    let mut acc: u64 = 1;
    for i in 0..k {
        acc = acc.checked_mul(n - i)?;
        acc = acc.checked_div(i + 1)?;
    }
    Some(acc)
}

/// Sums `C(n, i)` for `i` in `[lo, hi]`, bailing out to `None` as soon as
/// the running total exceeds `limit` (or overflows) since the caller
/// only needs to know "small enough to enumerate" vs. "too large".
fn combinatorial_term_count(n: usize, lo: usize, hi: usize, limit: u64) -> Option<u64> {
    if lo > hi {
        return Some(0);
    }
    let mut total: u64 = 0;
    for i in lo..=hi {
        let term = binomial_checked(n as u64, i as u64)?;
        total = total.checked_add(term)?;
        if total > limit {
            return None;
        }
    }
    Some(total)
}

/// Policy for generic (non-identical) components: prefer whichever
/// combinatorial branch has fewer terms, provided it stays under the
/// configured limit; otherwise fall back to recursive Shannon expansion.
/// Assumes `2 <= k <= n - 1` (trivial cases are handled by the caller).
pub fn choose_generic_algorithm(n: usize, k: usize) -> Algorithm {
    let limit = KOON_COMBINATORIAL_TERM_LIMIT;
    let success_terms = combinatorial_term_count(n, k, n, limit);
    let fail_terms = combinatorial_term_count(n, 0, k - 1, limit);
    match (success_terms, fail_terms) {
        (Some(s), Some(f)) => {
            if f <= s {
                Algorithm::FailSum
            } else {
                Algorithm::SuccessSum
            }
        }
        (Some(_), None) => Algorithm::SuccessSum,
        (None, Some(_)) => Algorithm::FailSum,
        (None, None) => Algorithm::Recursive,
    }
}

/// `C(n, i)` for `i` in `[0, n]`, computed as `f64` via the
/// multiplicative recurrence so it never overflows the way a `u64`
/// binomial table would for large `n`.
pub fn binomial_table_f64(n: usize) -> Vec<f64> {
    let mut table = vec![0.0f64; n + 1];
    table[0] = 1.0;
    for i in 1..=n {
        table[i] = table[i - 1] * (n - i + 1) as f64 / i as f64;
    }
    table
}

#[inline]
fn pow_mul(base: f64, exp: usize) -> f64 {
    let mut acc = 1.0;
    for _ in 0..exp {
        acc *= base;
    }
    acc
}

/// Identical-components closed form, one time instant:
/// `R = sum_{i=k}^{n} C(n,i) R^i (1-R)^(n-i)`, switched to the
/// complementary sum when `k > n/2` (spec.md section 4.4 policy).
/// Trivial cases are handled here too since the closed form degenerates
/// cleanly to them.
pub fn identical_closed_form_one(r: f64, n: usize, k: usize, binom: &[f64]) -> f64 {
    if k == 0 {
        return 1.0;
    }
    if k > n {
        return 0.0;
    }
    if k == n {
        return cap(pow_mul(r, n));
    }
    if k == 1 {
        return cap(1.0 - pow_mul(1.0 - r, n));
    }

    let u = 1.0 - r;
    if k > n / 2 {
        let mut sum = 0.0;
        for i in 0..k {
            sum += binom[i] * pow_mul(r, i) * pow_mul(u, n - i);
        }
        cap(1.0 - sum)
    } else {
        let mut sum = 0.0;
        for i in k..=n {
            sum += binom[i] * pow_mul(r, i) * pow_mul(u, n - i);
        }
        cap(sum)
    }
}

/// Generic combinatorial success-sum, one time instant. `rel` is
/// row-major `n x t_stride`; `t` selects the column.
pub fn success_sum_one(rel: &[f64], n: usize, t_stride: usize, t: usize, k: usize) -> f64 {
    let mut total = 0.0;
    for i in k..=n {
        for_each_combination(n, i, |combo| {
            total += subset_term(rel, n, t_stride, t, combo, true);
        });
    }
    cap(total)
}

/// Generic combinatorial fail-sum, one time instant. Enumerates the
/// *working* subsets of each size `i < k` (their complement is the
/// "failing" set the algorithm is named for) so `1 - total` is
/// `P(>= k work)`, matching the success-sum result exactly.
pub fn fail_sum_one(rel: &[f64], n: usize, t_stride: usize, t: usize, k: usize) -> f64 {
    let mut total = 0.0;
    for i in 0..k {
        for_each_combination(n, i, |combo| {
            total += subset_term(rel, n, t_stride, t, combo, true);
        });
    }
    cap(1.0 - total)
}

/// Product over `combo` of (reliability if `combo_is_working` else
/// unreliability), times the product over the complement of the
/// opposite quantity.
fn subset_term(rel: &[f64], n: usize, t_stride: usize, t: usize, combo: &[u8], combo_is_working: bool) -> f64 {
    let mut term = 1.0;
    let mut combo_iter = combo.iter().peekable();
    for comp in 0..n {
        let r = rel[comp * t_stride + t];
        let in_combo = combo_iter.peek() == Some(&&(comp as u8));
        if in_combo {
            combo_iter.next();
        }
        let working = in_combo == combo_is_working;
        term *= if working { r } else { 1.0 - r };
    }
    term
}

/// Recursive Shannon expansion, lane-parallel over `W` consecutive time
/// instants starting at `rel[.., t0]`. Batches `best = min(k-1, n-k)`
/// levels at once: loads the `best` trailing components' reliabilities
/// and, for each `j` in `[0, best]`, sums the product of `j`
/// unreliabilities and `best-j` reliabilities over every size-`j`
/// sub-combination, then multiplies by a recursive call on the
/// remaining `n - best` components. Mirror layers `j` and `best-j` are
/// built from the same combination enumeration (spec.md section 4.4).
pub fn recursive_wide<const W: usize>(rel: &[f64], t_stride: usize, t0: usize, n: usize, k: usize) -> [f64; W] {
    if k == 0 {
        return [1.0; W];
    }
    if k > n {
        return [0.0; W];
    }
    if k == n {
        return series_wide::<W>(rel, t_stride, t0, n);
    }
    if k == 1 {
        return parallel_wide::<W>(rel, t_stride, t0, n);
    }

    let best = (k - 1).min(n - k);
    let half = best / 2;
    let base = n - best;

    // Sized to the layer count actually needed for this call so large N
    // (best > SCHAR_MAX) can't index past a fixed-size array.
    let mut weights = vec![[0.0f64; W]; best + 1];

    for j in 0..=half {
        for_each_combination(best, j, |combo| {
            let mut unrel_s = [1.0f64; W];
            let mut rel_s = [1.0f64; W];
            let mut unrel_compl = [1.0f64; W];
            let mut rel_compl = [1.0f64; W];
            let mut combo_iter = combo.iter().peekable();
            for local in 0..best {
                let comp = base + local;
                let mut lane_r = [0.0f64; W];
                for lane in 0..W {
                    lane_r[lane] = rel[comp * t_stride + t0 + lane];
                }
                let in_s = combo_iter.peek() == Some(&&(local as u8));
                if in_s {
                    combo_iter.next();
                    for lane in 0..W {
                        unrel_s[lane] *= 1.0 - lane_r[lane];
                        rel_s[lane] *= lane_r[lane];
                    }
                } else {
                    for lane in 0..W {
                        rel_compl[lane] *= lane_r[lane];
                        unrel_compl[lane] *= 1.0 - lane_r[lane];
                    }
                }
            }
            for lane in 0..W {
                weights[j][lane] += unrel_s[lane] * rel_compl[lane];
            }
            if j != best - j {
                for lane in 0..W {
                    weights[best - j][lane] += unrel_compl[lane] * rel_s[lane];
                }
            }
        });
    }

    let mut total = [0.0f64; W];
    for j in 0..=best {
        let sub = recursive_wide::<W>(rel, t_stride, t0, base, k - best + j);
        for lane in 0..W {
            total[lane] += weights[j][lane] * sub[lane];
        }
    }
    for lane in &mut total {
        *lane = cap(*lane);
    }
    total
}

fn series_wide<const W: usize>(rel: &[f64], t_stride: usize, t0: usize, n: usize) -> [f64; W] {
    let mut acc = [0.0f64; W];
    for lane in 0..W {
        acc[lane] = rel[t0 + lane];
    }
    for comp in 1..n {
        for lane in 0..W {
            acc[lane] *= rel[comp * t_stride + t0 + lane];
        }
    }
    for lane in &mut acc {
        *lane = cap(*lane);
    }
    acc
}

fn parallel_wide<const W: usize>(rel: &[f64], t_stride: usize, t0: usize, n: usize) -> [f64; W] {
    let mut acc = [0.0f64; W];
    for lane in 0..W {
        acc[lane] = 1.0 - rel[t0 + lane];
    }
    for comp in 1..n {
        for lane in 0..W {
            acc[lane] *= 1.0 - rel[comp * t_stride + t0 + lane];
        }
    }
    for lane in &mut acc {
        *lane = cap(1.0 - *lane);
    }
    acc
}

/// Scalar (`W = 1`) convenience wrapper over [`recursive_wide`].
pub fn recursive_one(rel: &[f64], t_stride: usize, t0: usize, n: usize, k: usize) -> f64 {
    recursive_wide::<1>(rel, t_stride, t0, n, k)[0]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combinations_of_four_choose_two_are_lexicographic() {
        let mut seen = Vec::new();
        for_each_combination(4, 2, |c| seen.push(c.to_vec()));
        assert_eq!(
            seen,
            vec![
                vec![0, 1],
                vec![0, 2],
                vec![0, 3],
                vec![1, 2],
                vec![1, 3],
                vec![2, 3],
            ]
        );
    }

    #[test]
    fn combinations_count_matches_binomial() {
        for (n, k) in [(5, 0), (5, 1), (5, 3), (5, 5), (6, 3), (8, 4)] {
            let mut count = 0;
            for_each_combination(n, k, |_| count += 1);
            assert_eq!(count as u64, binomial_checked(n as u64, k as u64).unwrap());
        }
    }

    #[test]
    fn identical_closed_form_matches_scenario_4() {
        // spec.md section 8, scenario 4: KooN(3,2), R=0.9.
        let binom = binomial_table_f64(3);
        let out = identical_closed_form_one(0.9, 3, 2, &binom);
        assert!((out - 0.972).abs() < 1e-12);
    }

    #[test]
    fn identical_closed_form_matches_scenario_5() {
        // spec.md section 8, scenario 5: KooN(5,3), R=0.9.
        let binom = binomial_table_f64(5);
        let out = identical_closed_form_one(0.9, 5, 3, &binom);
        assert!((out - 0.99144).abs() < 1e-9);
    }

    #[test]
    fn generic_success_and_fail_sum_agree() {
        let rel = [0.9, 0.8, 0.7, 0.6, 0.5];
        for k in 1..=5 {
            let s = success_sum_one(&rel, 5, 1, 0, k);
            let f = fail_sum_one(&rel, 5, 1, 0, k);
            assert!((s - f).abs() < 1e-9, "k={k} success={s} fail={f}");
        }
    }

    #[test]
    fn recursive_matches_combinatorial_for_mixed_components() {
        let rel = [0.9, 0.8, 0.7, 0.6, 0.5, 0.4];
        for k in 2..=5 {
            let comb = success_sum_one(&rel, 6, 1, 0, k);
            let rec = recursive_one(&rel, 1, 0, 6, k);
            assert!((comb - rec).abs() < 1e-9, "k={k} comb={comb} rec={rec}");
        }
    }

    #[test]
    fn koon_monotonic_in_k() {
        let rel = [0.9, 0.8, 0.7, 0.6, 0.5, 0.4];
        let mut prev = 1.0;
        for k in 1..=6 {
            let out = recursive_one(&rel, 1, 0, 6, k);
            assert!(out <= prev + 1e-12);
            prev = out;
        }
    }

    #[test]
    fn koon_boundary_conditions() {
        let rel = [0.9, 0.8, 0.7];
        assert_eq!(recursive_one(&rel, 1, 0, 3, 0), 1.0);
        assert_eq!(recursive_one(&rel, 1, 0, 3, 4), 0.0);
        let parallel = crate::scalar::parallel_generic_one(&rel);
        assert!((recursive_one(&rel, 1, 0, 3, 1) - parallel).abs() < 1e-12);
        let series = crate::scalar::series_generic_one(&rel);
        assert!((recursive_one(&rel, 1, 0, 3, 3) - series).abs() < 1e-12);
    }
}
