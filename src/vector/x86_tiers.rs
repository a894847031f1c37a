//! x86_64 SIMD lane types. Each wraps a hardware vector register and is
//! `#[target_feature]`-gated per method; callers only ever construct
//! one of these after the matching oracle in `cpu_features` returned
//! `true` (spec.md section 9).

use super::SimdF64;
use std::arch::x86_64::*;

macro_rules! impl_lane {
    (
        $ty:ident, $reg:ty, $feature:literal,
        set1 = $set1:ident, add = $add:ident, sub = $sub:ident, mul = $mul:ident,
        max = $max:ident, min = $min:ident, load = $load:ident, store = $store:ident,
        fma = $fma:tt,
    ) => {
        #[derive(Clone, Copy)]
        pub struct $ty($reg);

        impl SimdF64 for $ty {
            const WIDTH: usize = std::mem::size_of::<$reg>() / std::mem::size_of::<f64>();

            #[inline]
            #[target_feature(enable = $feature)]
            unsafe fn load(ptr: *const f64) -> Self {
                unsafe { $ty($load(ptr)) }
            }

            #[inline]
            #[target_feature(enable = $feature)]
            unsafe fn store(self, ptr: *mut f64) {
                unsafe { $store(ptr, self.0) }
            }

            #[inline]
            #[target_feature(enable = $feature)]
            unsafe fn splat(v: f64) -> Self {
                unsafe { $ty($set1(v)) }
            }

            #[inline]
            #[target_feature(enable = $feature)]
            unsafe fn add(self, rhs: Self) -> Self {
                unsafe { $ty($add(self.0, rhs.0)) }
            }

            #[inline]
            #[target_feature(enable = $feature)]
            unsafe fn sub(self, rhs: Self) -> Self {
                unsafe { $ty($sub(self.0, rhs.0)) }
            }

            #[inline]
            #[target_feature(enable = $feature)]
            unsafe fn mul(self, rhs: Self) -> Self {
                unsafe { $ty($mul(self.0, rhs.0)) }
            }

            #[inline]
            #[target_feature(enable = $feature)]
            unsafe fn max(self, rhs: Self) -> Self {
                unsafe { $ty($max(self.0, rhs.0)) }
            }

            #[inline]
            #[target_feature(enable = $feature)]
            unsafe fn min(self, rhs: Self) -> Self {
                unsafe { $ty($min(self.0, rhs.0)) }
            }

            impl_lane!(@fma $fma, $feature);
        }
    };

    (@fma native($fmadd:ident, $fnmadd:ident), $feature:literal) => {
        #[inline]
        #[target_feature(enable = $feature)]
        unsafe fn fused_mul_add(self, b: Self, c: Self) -> Self {
            unsafe { Self($fmadd(self.0, b.0, c.0)) }
        }

        #[inline]
        #[target_feature(enable = $feature)]
        unsafe fn fused_neg_mul_add(self, b: Self, c: Self) -> Self {
            unsafe { Self($fnmadd(self.0, b.0, c.0)) }
        }
    };

    (@fma composed, $feature:literal) => {
        #[inline]
        #[target_feature(enable = $feature)]
        unsafe fn fused_mul_add(self, b: Self, c: Self) -> Self {
            unsafe { self.mul(b).add(c) }
        }

        #[inline]
        #[target_feature(enable = $feature)]
        unsafe fn fused_neg_mul_add(self, b: Self, c: Self) -> Self {
            unsafe { c.sub(self.mul(b)) }
        }
    };
}

impl_lane!(
    Sse2Lane, __m128d, "sse2",
    set1 = _mm_set1_pd, add = _mm_add_pd, sub = _mm_sub_pd, mul = _mm_mul_pd,
    max = _mm_max_pd, min = _mm_min_pd, load = _mm_loadu_pd, store = _mm_storeu_pd,
    fma = composed,
);

impl_lane!(
    AvxLane, __m256d, "avx",
    set1 = _mm256_set1_pd, add = _mm256_add_pd, sub = _mm256_sub_pd, mul = _mm256_mul_pd,
    max = _mm256_max_pd, min = _mm256_min_pd, load = _mm256_loadu_pd, store = _mm256_storeu_pd,
    fma = composed,
);

impl_lane!(
    Fma3Lane, __m256d, "avx2,fma",
    set1 = _mm256_set1_pd, add = _mm256_add_pd, sub = _mm256_sub_pd, mul = _mm256_mul_pd,
    max = _mm256_max_pd, min = _mm256_min_pd, load = _mm256_loadu_pd, store = _mm256_storeu_pd,
    fma = native(_mm256_fmadd_pd, _mm256_fnmadd_pd),
);

impl_lane!(
    Avx512Lane, __m512d, "avx512f",
    set1 = _mm512_set1_pd, add = _mm512_add_pd, sub = _mm512_sub_pd, mul = _mm512_mul_pd,
    max = _mm512_max_pd, min = _mm512_min_pd, load = _mm512_loadu_pd, store = _mm512_storeu_pd,
    fma = native(_mm512_fmadd_pd, _mm512_fnmadd_pd),
);
