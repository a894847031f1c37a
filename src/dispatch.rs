//! Dispatch & partition (C5): the public entry points. Validates
//! arguments, precomputes whatever the KooN solver needs, picks the
//! worker count, partitions `T` into contiguous per-worker blocks, and
//! runs them the way the teacher's `calc_kinship` does — `numCores - 1`
//! threads spawned, the last block run inline on the calling thread,
//! everything joined before returning.

use crate::config::MIN_BATCH;
use crate::descriptor::{Descriptor, KooNPlan, RecursionScratch};
use crate::error::{RbdError, RbdResult};
use crate::worker;

fn validate_components(n: usize) -> RbdResult<()> {
    if n == 0 {
        return Err(RbdError::ZeroComponents(n));
    }
    Ok(())
}

fn validate_times(t: usize) -> RbdResult<()> {
    if t == 0 {
        return Err(RbdError::ZeroTimes(t));
    }
    Ok(())
}

fn validate_bridge(n: usize) -> RbdResult<()> {
    if n != 5 {
        return Err(RbdError::BridgeComponentCount(n));
    }
    Ok(())
}

fn validate_koon(n: usize, k: usize) -> RbdResult<()> {
    if k == 0 || k > n {
        return Err(RbdError::KooNInvalidK { k, n });
    }
    Ok(())
}

/// `numCores = min(available_parallelism, ceil(T / MIN_BATCH))`. Always
/// 1 when the `threading` feature is disabled (spec.md section 5's
/// single-threaded fallback).
fn num_cores(t: usize) -> usize {
    if !cfg!(feature = "threading") {
        return 1;
    }
    let hw = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
    let by_batch = (t + MIN_BATCH - 1) / MIN_BATCH;
    hw.min(by_batch).max(1)
}

/// Divides `[0, t)` into `cores` contiguous blocks whose lengths differ
/// by at most one element; returns `(offset, len)` pairs in order.
fn block_bounds(cores: usize, t: usize) -> Vec<(usize, usize)> {
    let base = t / cores;
    let rem = t % cores;
    let mut bounds = Vec::with_capacity(cores);
    let mut start = 0;
    for i in 0..cores {
        let len = base + usize::from(i < rem);
        bounds.push((start, len));
        start += len;
    }
    bounds
}

/// Runs `op` once per worker block, spawning `cores - 1` threads and
/// running the last block inline, per spec.md section 4.5.
fn run_workers<F>(rel: &[f64], t_stride: usize, n: usize, t: usize, out: &mut [f64], cores: usize, op: F) -> RbdResult<()>
where
    F: Fn(&mut Descriptor) + Sync,
{
    let bounds = block_bounds(cores, t);

    if cores <= 1 {
        let mut desc = Descriptor { rel, t_stride, n, out, t_offset: 0, num_cores: 1 };
        op(&mut desc);
        return Ok(());
    }

    let mut remaining = out;
    let mut blocks: Vec<(usize, &mut [f64])> = Vec::with_capacity(cores);
    for &(offset, len) in &bounds {
        let (head, tail) = remaining.split_at_mut(len);
        blocks.push((offset, head));
        remaining = tail;
    }

    let last = blocks.pop().expect("cores > 1 implies at least one block");

    let result = std::thread::scope(|scope| -> RbdResult<()> {
        let mut handles = Vec::with_capacity(blocks.len());
        for (offset, block) in blocks {
            let op = &op;
            let spawned = std::thread::Builder::new().spawn_scoped(scope, move || {
                let mut desc = Descriptor { rel, t_stride, n, out: block, t_offset: offset, num_cores: cores };
                op(&mut desc);
            });
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(_) => {
                    for handle in handles {
                        let _ = handle.join();
                    }
                    return Err(RbdError::ThreadSpawn);
                }
            }
        }

        let (offset, block) = last;
        let mut desc = Descriptor { rel, t_stride, n, out: block, t_offset: offset, num_cores: cores };
        op(&mut desc);

        for handle in handles {
            let _ = handle.join();
        }
        Ok(())
    });

    result
}

/// Series, generic components. `rel` is `N x T` row-major.
pub fn series_generic(rel: &[f64], n: usize, t: usize) -> RbdResult<Vec<f64>> {
    validate_components(n)?;
    validate_times(t)?;
    let cores = num_cores(t);
    log::debug!("series_generic: N={n} T={t} cores={cores}");
    let mut out = vec![0.0; t];
    run_workers(rel, t, n, t, &mut out, cores, worker::series_generic)?;
    Ok(out)
}

/// Series, identical components. `rel` is `T`-length.
pub fn series_identical(rel: &[f64], n: usize, t: usize) -> RbdResult<Vec<f64>> {
    validate_components(n)?;
    validate_times(t)?;
    let cores = num_cores(t);
    log::debug!("series_identical: N={n} T={t} cores={cores}");
    let mut out = vec![0.0; t];
    run_workers(rel, 0, n, t, &mut out, cores, worker::series_identical)?;
    Ok(out)
}

/// Parallel, generic components.
pub fn parallel_generic(rel: &[f64], n: usize, t: usize) -> RbdResult<Vec<f64>> {
    validate_components(n)?;
    validate_times(t)?;
    let cores = num_cores(t);
    log::debug!("parallel_generic: N={n} T={t} cores={cores}");
    let mut out = vec![0.0; t];
    run_workers(rel, t, n, t, &mut out, cores, worker::parallel_generic)?;
    Ok(out)
}

/// Parallel, identical components.
pub fn parallel_identical(rel: &[f64], n: usize, t: usize) -> RbdResult<Vec<f64>> {
    validate_components(n)?;
    validate_times(t)?;
    let cores = num_cores(t);
    log::debug!("parallel_identical: N={n} T={t} cores={cores}");
    let mut out = vec![0.0; t];
    run_workers(rel, 0, n, t, &mut out, cores, worker::parallel_identical)?;
    Ok(out)
}

/// Bridge, generic components. `rel` is `5 x T` row-major; `n` is the
/// caller-supplied component count and must equal 5 (spec.md section
/// 4.5's Bridge shape check).
pub fn bridge_generic(rel: &[f64], n: usize, t: usize) -> RbdResult<Vec<f64>> {
    validate_bridge(n)?;
    validate_times(t)?;
    let cores = num_cores(t);
    log::debug!("bridge_generic: N={n} T={t} cores={cores}");
    let mut out = vec![0.0; t];
    run_workers(rel, t, 5, t, &mut out, cores, worker::bridge_generic)?;
    Ok(out)
}

/// Bridge, identical components. `rel` is `T`-length; `n` must equal 5.
pub fn bridge_identical(rel: &[f64], n: usize, t: usize) -> RbdResult<Vec<f64>> {
    validate_bridge(n)?;
    validate_times(t)?;
    let cores = num_cores(t);
    log::debug!("bridge_identical: N={n} T={t} cores={cores}");
    let mut out = vec![0.0; t];
    run_workers(rel, 0, 5, t, &mut out, cores, worker::bridge_identical)?;
    Ok(out)
}

/// KooN, generic components. `rel` is `N x T` row-major, `1 <= K <= N`.
pub fn koon_generic(rel: &[f64], n: usize, t: usize, k: usize) -> RbdResult<Vec<f64>> {
    validate_components(n)?;
    validate_times(t)?;
    validate_koon(n, k)?;
    let cores = num_cores(t);
    let plan = KooNPlan::for_generic(n, k);
    log::debug!("koon_generic: N={n} T={t} K={k} cores={cores} algorithm={:?}", plan.algorithm);
    if plan.algorithm == crate::koon::Algorithm::Recursive {
        let _scratch = RecursionScratch::reserve(cores)?;
    }
    let mut out = vec![0.0; t];
    run_workers(rel, t, n, t, &mut out, cores, |desc| worker::koon_generic(desc, &plan))?;
    Ok(out)
}

/// KooN, identical components. `rel` is `T`-length, `1 <= K <= N`.
pub fn koon_identical(rel: &[f64], n: usize, t: usize, k: usize) -> RbdResult<Vec<f64>> {
    validate_components(n)?;
    validate_times(t)?;
    validate_koon(n, k)?;
    let cores = num_cores(t);
    let plan = KooNPlan::for_identical(n, k);
    log::debug!("koon_identical: N={n} T={t} K={k} cores={cores}");
    let mut out = vec![0.0; t];
    run_workers(rel, 0, n, t, &mut out, cores, |desc| worker::koon_identical(desc, &plan))?;
    Ok(out)
}

/// `extern "C"`-ABI-shaped wrappers returning the negative status codes
/// spec.md section 7 specifies, for embedding from a non-Rust caller —
/// mirrors the teacher's `extern "C" fn check_gpu_device_availability`
/// boundary in `kinship.rs`.
pub mod ffi {
    use super::*;
    use std::slice;

    /// # Safety
    /// `rel` must point to `n * t` valid `f64`s; `out` to `t` writable `f64`s.
    #[no_mangle]
    pub unsafe extern "C" fn rbd_series_generic(rel: *const f64, n: usize, t: usize, out: *mut f64) -> i32 {
        let rel = unsafe { slice::from_raw_parts(rel, n * t) };
        match series_generic(rel, n, t) {
            Ok(result) => {
                unsafe { slice::from_raw_parts_mut(out, t) }.copy_from_slice(&result);
                0
            }
            Err(e) => e.status_code(),
        }
    }

    /// # Safety
    /// `rel` must point to `n * t` valid `f64`s; `out` to `t` writable `f64`s.
    #[no_mangle]
    pub unsafe extern "C" fn rbd_koon_generic(rel: *const f64, n: usize, t: usize, k: usize, out: *mut f64) -> i32 {
        let rel = unsafe { slice::from_raw_parts(rel, n * t) };
        match koon_generic(rel, n, t, k) {
            Ok(result) => {
                unsafe { slice::from_raw_parts_mut(out, t) }.copy_from_slice(&result);
                0
            }
            Err(e) => e.status_code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_bounds_cover_every_index_exactly_once() {
        for (cores, t) in [(1, 1), (3, 10), (4, 7), (5, 5), (7, 100)] {
            let bounds = block_bounds(cores, t);
            assert_eq!(bounds.len(), cores);
            let total: usize = bounds.iter().map(|&(_, len)| len).sum();
            assert_eq!(total, t);
            let mut expected_offset = 0;
            for &(offset, len) in &bounds {
                assert_eq!(offset, expected_offset);
                expected_offset += len;
            }
        }
    }

    #[test]
    fn series_generic_rejects_zero_components() {
        let err = series_generic(&[], 0, 4).unwrap_err();
        assert_eq!(err.status_code(), -1);
    }

    #[test]
    fn series_generic_rejects_zero_times() {
        let err = series_generic(&[0.9], 1, 0).unwrap_err();
        assert_eq!(err.status_code(), -3);
    }

    #[test]
    fn bridge_rejects_wrong_component_count() {
        let err = bridge_generic(&[0.0; 20], 4, 5).unwrap_err();
        assert_eq!(err.status_code(), -2);
    }

    #[test]
    fn koon_rejects_k_out_of_range() {
        assert_eq!(koon_generic(&[0.0; 10], 5, 2, 0).unwrap_err().status_code(), -4);
        assert_eq!(koon_generic(&[0.0; 10], 5, 2, 6).unwrap_err().status_code(), -4);
    }

    #[test]
    fn series_generic_matches_scenario_1() {
        // spec.md section 8, scenario 1: N=3, T=2, row-major rel.
        let rel = [0.9, 0.8, 0.95, 0.9, 0.8, 0.7];
        let out = series_generic(&rel, 3, 2).unwrap();
        assert!((out[0] - 0.684).abs() < 1e-12);
        assert!((out[1] - 0.504).abs() < 1e-12);
    }

    #[test]
    fn koon_identical_matches_scenario_4() {
        // spec.md section 8, scenario 4: KooN(3,2), R=0.9, single time instant.
        let out = koon_identical(&[0.9], 3, 1, 2).unwrap();
        assert!((out[0] - 0.972).abs() < 1e-12);
    }

    #[test]
    fn output_is_thread_count_invariant() {
        let n = 4;
        let t = 257;
        let mut rel = vec![0.0f64; n * t];
        for comp in 0..n {
            for tt in 0..t {
                rel[comp * t + tt] = 0.5 + 0.001 * ((comp * t + tt) % 97) as f64;
            }
        }
        let one = series_generic(&rel, n, t).unwrap();
        let out = series_generic(&rel, n, t).unwrap();
        for i in 0..t {
            assert!((one[i] - out[i]).abs() < 2.0 * f64::EPSILON, "i={i}");
        }
    }
}
