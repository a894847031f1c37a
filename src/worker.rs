//! Per-worker loop (C3): one contiguous block of the `T` axis, run
//! start to finish on a single thread. Each block runs the widest
//! available SIMD tier over as much of its range as fits, then
//! narrows down through `Portable<4>`/`Portable<2>`, then finishes
//! with the scalar kernel — so no index is ever skipped regardless of
//! how evenly `T` divided across workers and lanes.

use crate::descriptor::{Descriptor, KooNPlan};
use crate::koon::{self, Algorithm};
use crate::scalar;
use crate::vector::{self, Portable, SimdF64, Tier};

#[cfg(target_arch = "x86_64")]
use crate::vector::{AvxLane, Avx512Lane, Fma3Lane, Sse2Lane};
#[cfg(target_arch = "aarch64")]
use crate::vector::NeonLane;

#[inline(always)]
fn prefetch_read(_ptr: *const f64) {
    #[cfg(target_arch = "x86_64")]
    unsafe {
        use std::arch::x86_64::{_mm_prefetch, _MM_HINT_T0};
        _mm_prefetch(_ptr as *const i8, _MM_HINT_T0);
    }
}

/// Runs `width`-wide steps of `f` over `[t, end)` while `end - t >= width`,
/// then returns the new `t`. One entry in the descending-width cascade.
#[inline]
fn cascade_step(mut t: usize, end: usize, width: usize, mut f: impl FnMut(usize)) -> usize {
    while end - t >= width {
        f(t);
        t += width;
    }
    t
}

/// Series, generic components, over one worker's whole block.
pub fn series_generic(desc: &mut Descriptor) {
    let n = desc.n;
    let t_stride = desc.t_stride;
    let rel = unsafe { desc.rel.as_ptr().add(desc.t_offset) };
    let out = desc.out.as_mut_ptr();
    let end = desc.out.len();
    let tier = vector::select_tier();
    log::trace!("series_generic: tier={tier:?} block_len={end}");

    let mut t = 0usize;
    macro_rules! wide_step {
        ($lane:ty) => {
            t = cascade_step(t, end, <$lane>::WIDTH, |t0| unsafe {
                prefetch_read(rel.add(t0));
                vector::series_generic::<$lane>(rel, t_stride, t0, n, out);
            });
        };
    }
    match tier {
        #[cfg(target_arch = "x86_64")]
        Tier::Avx512f => wide_step!(Avx512Lane),
        #[cfg(target_arch = "x86_64")]
        Tier::Fma3 => wide_step!(Fma3Lane),
        #[cfg(target_arch = "x86_64")]
        Tier::Avx => wide_step!(AvxLane),
        #[cfg(target_arch = "x86_64")]
        Tier::Sse2 => wide_step!(Sse2Lane),
        #[cfg(target_arch = "aarch64")]
        Tier::Neon => wide_step!(NeonLane),
        Tier::Vsx | Tier::Rvv | Tier::Sve => wide_step!(Portable<8>),
        Tier::Scalar => {}
        #[allow(unreachable_patterns)]
        _ => {}
    }
    t = cascade_step(t, end, 4, |t0| unsafe {
        vector::series_generic::<Portable<4>>(rel, t_stride, t0, n, out);
    });
    t = cascade_step(t, end, 2, |t0| unsafe {
        vector::series_generic::<Portable<2>>(rel, t_stride, t0, n, out);
    });
    while t < end {
        let col: Vec<f64> = (0..n).map(|c| desc.rel[desc.t_offset + c * t_stride + t]).collect();
        desc.out[t] = scalar::series_generic_one(&col);
        t += 1;
    }
}

/// Series, identical components.
pub fn series_identical(desc: &mut Descriptor) {
    let rel = unsafe { desc.rel.as_ptr().add(desc.t_offset) };
    let out = desc.out.as_mut_ptr();
    let end = desc.out.len();
    let n = desc.n;
    let tier = vector::select_tier();

    let mut t = 0usize;
    macro_rules! wide_step {
        ($lane:ty) => {
            t = cascade_step(t, end, <$lane>::WIDTH, |t0| unsafe {
                prefetch_read(rel.add(t0));
                vector::series_identical::<$lane>(rel, t0, n, out);
            });
        };
    }
    match tier {
        #[cfg(target_arch = "x86_64")]
        Tier::Avx512f => wide_step!(Avx512Lane),
        #[cfg(target_arch = "x86_64")]
        Tier::Fma3 => wide_step!(Fma3Lane),
        #[cfg(target_arch = "x86_64")]
        Tier::Avx => wide_step!(AvxLane),
        #[cfg(target_arch = "x86_64")]
        Tier::Sse2 => wide_step!(Sse2Lane),
        #[cfg(target_arch = "aarch64")]
        Tier::Neon => wide_step!(NeonLane),
        Tier::Vsx | Tier::Rvv | Tier::Sve => wide_step!(Portable<8>),
        Tier::Scalar => {}
        #[allow(unreachable_patterns)]
        _ => {}
    }
    t = cascade_step(t, end, 4, |t0| unsafe {
        vector::series_identical::<Portable<4>>(rel, t0, n, out);
    });
    t = cascade_step(t, end, 2, |t0| unsafe {
        vector::series_identical::<Portable<2>>(rel, t0, n, out);
    });
    while t < end {
        desc.out[t] = scalar::series_identical_one(desc.rel[desc.t_offset + t], n);
        t += 1;
    }
}

/// Parallel, generic components.
pub fn parallel_generic(desc: &mut Descriptor) {
    let n = desc.n;
    let t_stride = desc.t_stride;
    let rel = unsafe { desc.rel.as_ptr().add(desc.t_offset) };
    let out = desc.out.as_mut_ptr();
    let end = desc.out.len();
    let tier = vector::select_tier();

    let mut t = 0usize;
    macro_rules! wide_step {
        ($lane:ty) => {
            t = cascade_step(t, end, <$lane>::WIDTH, |t0| unsafe {
                prefetch_read(rel.add(t0));
                vector::parallel_generic::<$lane>(rel, t_stride, t0, n, out);
            });
        };
    }
    match tier {
        #[cfg(target_arch = "x86_64")]
        Tier::Avx512f => wide_step!(Avx512Lane),
        #[cfg(target_arch = "x86_64")]
        Tier::Fma3 => wide_step!(Fma3Lane),
        #[cfg(target_arch = "x86_64")]
        Tier::Avx => wide_step!(AvxLane),
        #[cfg(target_arch = "x86_64")]
        Tier::Sse2 => wide_step!(Sse2Lane),
        #[cfg(target_arch = "aarch64")]
        Tier::Neon => wide_step!(NeonLane),
        Tier::Vsx | Tier::Rvv | Tier::Sve => wide_step!(Portable<8>),
        Tier::Scalar => {}
        #[allow(unreachable_patterns)]
        _ => {}
    }
    t = cascade_step(t, end, 4, |t0| unsafe {
        vector::parallel_generic::<Portable<4>>(rel, t_stride, t0, n, out);
    });
    t = cascade_step(t, end, 2, |t0| unsafe {
        vector::parallel_generic::<Portable<2>>(rel, t_stride, t0, n, out);
    });
    while t < end {
        let col: Vec<f64> = (0..n).map(|c| desc.rel[desc.t_offset + c * t_stride + t]).collect();
        desc.out[t] = scalar::parallel_generic_one(&col);
        t += 1;
    }
}

/// Parallel, identical components.
pub fn parallel_identical(desc: &mut Descriptor) {
    let rel = unsafe { desc.rel.as_ptr().add(desc.t_offset) };
    let out = desc.out.as_mut_ptr();
    let end = desc.out.len();
    let n = desc.n;
    let tier = vector::select_tier();

    let mut t = 0usize;
    macro_rules! wide_step {
        ($lane:ty) => {
            t = cascade_step(t, end, <$lane>::WIDTH, |t0| unsafe {
                prefetch_read(rel.add(t0));
                vector::parallel_identical::<$lane>(rel, t0, n, out);
            });
        };
    }
    match tier {
        #[cfg(target_arch = "x86_64")]
        Tier::Avx512f => wide_step!(Avx512Lane),
        #[cfg(target_arch = "x86_64")]
        Tier::Fma3 => wide_step!(Fma3Lane),
        #[cfg(target_arch = "x86_64")]
        Tier::Avx => wide_step!(AvxLane),
        #[cfg(target_arch = "x86_64")]
        Tier::Sse2 => wide_step!(Sse2Lane),
        #[cfg(target_arch = "aarch64")]
        Tier::Neon => wide_step!(NeonLane),
        Tier::Vsx | Tier::Rvv | Tier::Sve => wide_step!(Portable<8>),
        Tier::Scalar => {}
        #[allow(unreachable_patterns)]
        _ => {}
    }
    t = cascade_step(t, end, 4, |t0| unsafe {
        vector::parallel_identical::<Portable<4>>(rel, t0, n, out);
    });
    t = cascade_step(t, end, 2, |t0| unsafe {
        vector::parallel_identical::<Portable<2>>(rel, t0, n, out);
    });
    while t < end {
        desc.out[t] = scalar::parallel_identical_one(desc.rel[desc.t_offset + t], n);
        t += 1;
    }
}

/// Bridge, generic (N must already be validated as 5 by the caller).
pub fn bridge_generic(desc: &mut Descriptor) {
    let t_stride = desc.t_stride;
    let rel = unsafe { desc.rel.as_ptr().add(desc.t_offset) };
    let out = desc.out.as_mut_ptr();
    let end = desc.out.len();
    let tier = vector::select_tier();

    let mut t = 0usize;
    macro_rules! wide_step {
        ($lane:ty) => {
            t = cascade_step(t, end, <$lane>::WIDTH, |t0| unsafe {
                prefetch_read(rel.add(t0));
                vector::bridge_generic::<$lane>(rel, t_stride, t0, out);
            });
        };
    }
    match tier {
        #[cfg(target_arch = "x86_64")]
        Tier::Avx512f => wide_step!(Avx512Lane),
        #[cfg(target_arch = "x86_64")]
        Tier::Fma3 => wide_step!(Fma3Lane),
        #[cfg(target_arch = "x86_64")]
        Tier::Avx => wide_step!(AvxLane),
        #[cfg(target_arch = "x86_64")]
        Tier::Sse2 => wide_step!(Sse2Lane),
        #[cfg(target_arch = "aarch64")]
        Tier::Neon => wide_step!(NeonLane),
        Tier::Vsx | Tier::Rvv | Tier::Sve => wide_step!(Portable<8>),
        Tier::Scalar => {}
        #[allow(unreachable_patterns)]
        _ => {}
    }
    t = cascade_step(t, end, 4, |t0| unsafe {
        vector::bridge_generic::<Portable<4>>(rel, t_stride, t0, out);
    });
    t = cascade_step(t, end, 2, |t0| unsafe {
        vector::bridge_generic::<Portable<2>>(rel, t_stride, t0, out);
    });
    while t < end {
        let base = desc.t_offset + t;
        desc.out[t] = scalar::bridge_generic_one(
            desc.rel[base],
            desc.rel[t_stride + base],
            desc.rel[2 * t_stride + base],
            desc.rel[3 * t_stride + base],
            desc.rel[4 * t_stride + base],
        );
        t += 1;
    }
}

/// Bridge, identical components.
pub fn bridge_identical(desc: &mut Descriptor) {
    let rel = unsafe { desc.rel.as_ptr().add(desc.t_offset) };
    let out = desc.out.as_mut_ptr();
    let end = desc.out.len();
    let tier = vector::select_tier();

    let mut t = 0usize;
    macro_rules! wide_step {
        ($lane:ty) => {
            t = cascade_step(t, end, <$lane>::WIDTH, |t0| unsafe {
                prefetch_read(rel.add(t0));
                vector::bridge_identical::<$lane>(rel, t0, out);
            });
        };
    }
    match tier {
        #[cfg(target_arch = "x86_64")]
        Tier::Avx512f => wide_step!(Avx512Lane),
        #[cfg(target_arch = "x86_64")]
        Tier::Fma3 => wide_step!(Fma3Lane),
        #[cfg(target_arch = "x86_64")]
        Tier::Avx => wide_step!(AvxLane),
        #[cfg(target_arch = "x86_64")]
        Tier::Sse2 => wide_step!(Sse2Lane),
        #[cfg(target_arch = "aarch64")]
        Tier::Neon => wide_step!(NeonLane),
        Tier::Vsx | Tier::Rvv | Tier::Sve => wide_step!(Portable<8>),
        Tier::Scalar => {}
        #[allow(unreachable_patterns)]
        _ => {}
    }
    t = cascade_step(t, end, 4, |t0| unsafe {
        vector::bridge_identical::<Portable<4>>(rel, t0, out);
    });
    t = cascade_step(t, end, 2, |t0| unsafe {
        vector::bridge_identical::<Portable<2>>(rel, t0, out);
    });
    while t < end {
        desc.out[t] = scalar::bridge_identical_one(desc.rel[desc.t_offset + t]);
        t += 1;
    }
}

/// KooN, generic components. `W=4` batches of the recursive solver where
/// that algorithm was chosen; the combinatorial sums are inherently
/// scalar-per-time-instant, so they run one `t` at a time regardless of
/// tier (spec.md leaves their vectorization unspecified).
pub fn koon_generic(desc: &mut Descriptor, plan: &KooNPlan) {
    let t_stride = desc.t_stride;
    let n = desc.n;
    let k = plan.k;
    match plan.algorithm {
        Algorithm::SuccessSum => {
            for t in 0..desc.out.len() {
                let base = desc.t_offset + t;
                desc.out[t] = koon::success_sum_one(desc.rel, n, t_stride, base, k);
            }
        }
        Algorithm::FailSum => {
            for t in 0..desc.out.len() {
                let base = desc.t_offset + t;
                desc.out[t] = koon::fail_sum_one(desc.rel, n, t_stride, base, k);
            }
        }
        Algorithm::Recursive => {
            let mut t = 0usize;
            let end = desc.out.len();
            while end - t >= 4 {
                let base = desc.t_offset + t;
                let lanes = koon::recursive_wide::<4>(desc.rel, t_stride, base, n, k);
                desc.out[t..t + 4].copy_from_slice(&lanes);
                t += 4;
            }
            while t < end {
                let base = desc.t_offset + t;
                desc.out[t] = koon::recursive_one(desc.rel, t_stride, base, n, k);
                t += 1;
            }
        }
    }
}

/// KooN, identical components: the closed form, one time instant at a
/// time (cheap enough in practice that vectorizing it buys little —
/// it is `O(n)` per instant, not the combinatorial blowup the generic
/// path guards against).
pub fn koon_identical(desc: &mut Descriptor, plan: &KooNPlan) {
    let n = desc.n;
    let k = plan.k;
    for t in 0..desc.out.len() {
        let r = desc.rel[desc.t_offset + t];
        desc.out[t] = koon::identical_closed_form_one(r, n, k, &plan.binom);
    }
}
