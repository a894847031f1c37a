//! Vector kernels (C2): one generic formula implementation per block
//! type, parameterized over a `SimdF64` lane type so every SIMD family
//! shares exactly one copy of each formula (grounded on the
//! `SimdRegister` abstraction used for the same purpose in the
//! `cfavml` crate's danger module).

mod aarch64_tiers;
mod portable;
mod x86_tiers;

pub use portable::Portable;

#[cfg(target_arch = "aarch64")]
pub use aarch64_tiers::NeonLane;
#[cfg(target_arch = "x86_64")]
pub use x86_tiers::{AvxLane, Fma3Lane, Sse2Lane, Avx512Lane};

/// A lane-parallel `f64` register. Every method requires that the
/// matching CPU feature (if any) has already been verified by the
/// caller — these are never called un-gated (spec.md section 9).
pub trait SimdF64: Copy {
    const WIDTH: usize;

    /// # Safety
    /// `ptr` must point to at least `WIDTH` valid, initialized `f64`s.
    unsafe fn load(ptr: *const f64) -> Self;

    /// # Safety
    /// `ptr` must point to at least `WIDTH` writable `f64`s.
    unsafe fn store(self, ptr: *mut f64);

    /// # Safety
    /// Requires the tier's CPU feature to be present.
    unsafe fn splat(v: f64) -> Self;

    /// # Safety
    /// Requires the tier's CPU feature to be present.
    unsafe fn add(self, rhs: Self) -> Self;

    /// # Safety
    /// Requires the tier's CPU feature to be present.
    unsafe fn sub(self, rhs: Self) -> Self;

    /// # Safety
    /// Requires the tier's CPU feature to be present.
    unsafe fn mul(self, rhs: Self) -> Self;

    /// `self * b + c`, fused where the tier has a native FMA.
    /// # Safety
    /// Requires the tier's CPU feature to be present.
    unsafe fn fused_mul_add(self, b: Self, c: Self) -> Self;

    /// `c - self * b`, fused where the tier has a native FMA.
    /// # Safety
    /// Requires the tier's CPU feature to be present.
    unsafe fn fused_neg_mul_add(self, b: Self, c: Self) -> Self;

    /// # Safety
    /// Requires the tier's CPU feature to be present.
    unsafe fn max(self, rhs: Self) -> Self;

    /// # Safety
    /// Requires the tier's CPU feature to be present.
    unsafe fn min(self, rhs: Self) -> Self;
}

#[inline]
unsafe fn clamp<S: SimdF64>(v: S) -> S {
    unsafe {
        let zero = S::splat(0.0);
        let one = S::splat(1.0);
        S::min(S::max(v, zero), one)
    }
}

/// Series, generic components, `S::WIDTH` lanes starting at column `t0`.
///
/// # Safety
/// `rel` must have `n` rows of at least `t0 + S::WIDTH` columns each
/// (row stride `t_stride`); `out` must have `t0 + S::WIDTH` writable
/// columns. The tier's CPU feature must be present.
pub unsafe fn series_generic<S: SimdF64>(rel: *const f64, t_stride: usize, t0: usize, n: usize, out: *mut f64) {
    unsafe {
        let mut acc = S::load(rel.add(t0));
        for comp in 1..n {
            let v = S::load(rel.add(comp * t_stride + t0));
            acc = S::mul(acc, v);
        }
        clamp(acc).store(out.add(t0));
    }
}

/// Series, identical components.
///
/// # Safety
/// Same preconditions as [`series_generic`], with a single input row.
pub unsafe fn series_identical<S: SimdF64>(rel: *const f64, t0: usize, n: usize, out: *mut f64) {
    unsafe {
        let r = S::load(rel.add(t0));
        let mut acc = r;
        for _ in 1..n {
            acc = S::mul(acc, r);
        }
        clamp(acc).store(out.add(t0));
    }
}

/// Parallel, generic components.
///
/// # Safety
/// Same preconditions as [`series_generic`].
pub unsafe fn parallel_generic<S: SimdF64>(rel: *const f64, t_stride: usize, t0: usize, n: usize, out: *mut f64) {
    unsafe {
        let one = S::splat(1.0);
        let mut s = S::sub(one, S::load(rel.add(t0)));
        for comp in 1..n {
            let v = S::load(rel.add(comp * t_stride + t0));
            s = S::mul(s, S::sub(one, v));
        }
        clamp(S::sub(one, s)).store(out.add(t0));
    }
}

/// Parallel, identical components.
///
/// # Safety
/// Same preconditions as [`series_identical`].
pub unsafe fn parallel_identical<S: SimdF64>(rel: *const f64, t0: usize, n: usize, out: *mut f64) {
    unsafe {
        let one = S::splat(1.0);
        let u = S::sub(one, S::load(rel.add(t0)));
        let mut acc = u;
        for _ in 1..n {
            acc = S::mul(acc, u);
        }
        clamp(S::sub(one, acc)).store(out.add(t0));
    }
}

/// Bridge, generic (5 components). `rel` rows `0..4` are R1..R5.
///
/// # Safety
/// `rel` must have 5 rows of at least `t0 + S::WIDTH` columns each
/// (row stride `t_stride`); `out` as in [`series_generic`].
pub unsafe fn bridge_generic<S: SimdF64>(rel: *const f64, t_stride: usize, t0: usize, out: *mut f64) {
    unsafe {
        let r1 = S::load(rel.add(t0));
        let r2 = S::load(rel.add(t_stride + t0));
        let r3 = S::load(rel.add(2 * t_stride + t0));
        let r4 = S::load(rel.add(3 * t_stride + t0));
        let r5 = S::load(rel.add(4 * t_stride + t0));

        let a = S::fused_neg_mul_add(r1, r3, S::add(r1, r3));
        let b = S::fused_neg_mul_add(r2, r4, S::add(r2, r4));
        let val1 = S::mul(a, b);

        let p = S::mul(r1, r2);
        let q = S::mul(r3, r4);
        let val2 = S::fused_neg_mul_add(p, q, S::add(p, q));

        let result = S::fused_mul_add(r5, S::sub(val1, val2), val2);
        clamp(result).store(out.add(t0));
    }
}

/// Bridge, identical components.
///
/// # Safety
/// Same preconditions as [`series_identical`].
pub unsafe fn bridge_identical<S: SimdF64>(rel: *const f64, t0: usize, out: *mut f64) {
    unsafe {
        let r = S::load(rel.add(t0));
        let one = S::splat(1.0);
        let two = S::splat(2.0);
        let u = S::sub(one, r);
        let uu = S::mul(u, u);
        let inner1 = S::sub(uu, two); // u*u - 2
        let inner2 = S::fused_neg_mul_add(r, r, two); // 2 - r*r
        let inner3 = S::fused_mul_add(u, inner1, S::mul(r, inner2)); // u*(u*u-2) + r*(2-r*r)
        let poly = S::fused_mul_add(u, inner3, one); // 1 + u*inner3
        clamp(S::mul(r, poly)).store(out.add(t0));
    }
}

/// A named SIMD capability tier. Carries its lane width; worker loops
/// (C3) select the widest tier the running CPU supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Scalar,
    Sse2,
    Avx,
    Fma3,
    Avx512f,
    Neon,
    Vsx,
    Rvv,
    Sve,
}

impl Tier {
    pub fn width(self) -> usize {
        match self {
            Tier::Scalar => 1,
            Tier::Sse2 | Tier::Neon | Tier::Vsx => 2,
            Tier::Avx | Tier::Fma3 => 4,
            Tier::Avx512f => 8,
            Tier::Rvv | Tier::Sve => crate::config::PORTABLE_MAX_WIDTH,
        }
    }
}

/// Consults the CPU-feature oracles in decreasing-capability order and
/// returns the widest tier the running CPU supports (spec.md section 4.3).
pub fn select_tier() -> Tier {
    use crate::cpu_features as cpu;

    #[cfg(target_arch = "x86_64")]
    {
        if cpu::avx512f_supported() {
            return Tier::Avx512f;
        }
        if cpu::fma3_supported() {
            return Tier::Fma3;
        }
        if cpu::avx_supported() {
            return Tier::Avx;
        }
        if cpu::sse2_supported() {
            return Tier::Sse2;
        }
        return Tier::Scalar;
    }

    #[cfg(target_arch = "aarch64")]
    {
        if cpu::neon_supported() {
            return Tier::Neon;
        }
        return Tier::Scalar;
    }

    #[cfg(target_arch = "powerpc64")]
    {
        if cpu::vsx_supported() {
            return Tier::Vsx;
        }
        return Tier::Scalar;
    }

    #[cfg(target_arch = "riscv64")]
    {
        if cpu::rvv_supported() {
            return Tier::Rvv;
        }
        return Tier::Scalar;
    }

    #[cfg(not(any(
        target_arch = "x86_64",
        target_arch = "aarch64",
        target_arch = "powerpc64",
        target_arch = "riscv64"
    )))]
    {
        Tier::Scalar
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_widths_match_spec_lanes() {
        assert_eq!(Tier::Scalar.width(), 1);
        assert_eq!(Tier::Sse2.width(), 2);
        assert_eq!(Tier::Avx.width(), 4);
        assert_eq!(Tier::Fma3.width(), 4);
        assert_eq!(Tier::Avx512f.width(), 8);
    }

    #[test]
    fn portable_width4_series_generic_matches_scalar() {
        let rel = [0.9, 0.8, 0.95, 0.9, 0.8, 0.7, 0.0, 0.0];
        // Two components (rows), 4 time instants each (t_stride = 4).
        let n = 2;
        let t_stride = 4;
        let mut out = [0.0f64; 4];
        unsafe {
            series_generic::<Portable<4>>(rel.as_ptr(), t_stride, 0, n, out.as_mut_ptr());
        }
        for t in 0..4 {
            let col = [rel[t], rel[t_stride + t]];
            let expected = crate::scalar::series_generic_one(&col);
            assert!((out[t] - expected).abs() < 1e-12, "t={t}");
        }
    }

    #[test]
    fn portable_bridge_identical_matches_scalar() {
        let rel = [0.9, 0.5, 0.99, 0.2];
        let mut out = [0.0f64; 4];
        unsafe {
            bridge_identical::<Portable<4>>(rel.as_ptr(), 0, out.as_mut_ptr());
        }
        for t in 0..4 {
            let expected = crate::scalar::bridge_identical_one(rel[t]);
            assert!((out[t] - expected).abs() < 1e-9, "t={t}");
        }
    }
}
