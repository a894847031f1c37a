//! CPU-feature oracles.
//!
//! Spec section 1 treats CPU-feature detection as an external
//! collaborator consumed at its interface. A Rust crate has to supply
//! something behind that interface to be buildable, so this module is
//! a minimal, honest implementation: cheap boolean predicates, cached
//! after the first query, stable for the life of the process.

use std::sync::OnceLock;

macro_rules! cached_oracle {
    ($name:ident, $probe:expr) => {
        pub fn $name() -> bool {
            static CACHE: OnceLock<bool> = OnceLock::new();
            *CACHE.get_or_init(|| $probe)
        }
    };
}

#[cfg(target_arch = "x86_64")]
mod x86 {
    use super::*;

    cached_oracle!(sse2_supported, is_x86_feature_detected!("sse2"));
    cached_oracle!(avx_supported, is_x86_feature_detected!("avx"));
    cached_oracle!(
        fma3_supported,
        is_x86_feature_detected!("avx2") && is_x86_feature_detected!("fma")
    );
    cached_oracle!(avx512f_supported, is_x86_feature_detected!("avx512f"));
    cached_oracle!(neon_supported, false);
    cached_oracle!(vsx_supported, false);
    cached_oracle!(rvv_supported, false);
}

#[cfg(target_arch = "x86_64")]
pub use x86::*;

#[cfg(target_arch = "aarch64")]
mod arm {
    use super::*;

    cached_oracle!(sse2_supported, false);
    cached_oracle!(avx_supported, false);
    cached_oracle!(fma3_supported, false);
    cached_oracle!(avx512f_supported, false);
    cached_oracle!(neon_supported, std::arch::is_aarch64_feature_detected!("neon"));
    cached_oracle!(vsx_supported, false);
    cached_oracle!(rvv_supported, false);
}

#[cfg(target_arch = "aarch64")]
pub use arm::*;

#[cfg(target_arch = "powerpc64")]
mod power {
    use super::*;

    cached_oracle!(sse2_supported, false);
    cached_oracle!(avx_supported, false);
    cached_oracle!(fma3_supported, false);
    cached_oracle!(avx512f_supported, false);
    cached_oracle!(neon_supported, false);
    // No stable powerpc64 target_feature detection in std; VSX kernels
    // bind to the portable width-8 fallback regardless of this value.
    cached_oracle!(vsx_supported, false);
    cached_oracle!(rvv_supported, false);
}

#[cfg(target_arch = "powerpc64")]
pub use power::*;

#[cfg(target_arch = "riscv64")]
mod riscv {
    use super::*;

    cached_oracle!(sse2_supported, false);
    cached_oracle!(avx_supported, false);
    cached_oracle!(fma3_supported, false);
    cached_oracle!(avx512f_supported, false);
    cached_oracle!(neon_supported, false);
    cached_oracle!(vsx_supported, false);
    // No stable riscv64 "v" (RVV) detection in std; RVV kernels bind to
    // the portable width-8 fallback regardless of this value.
    cached_oracle!(rvv_supported, false);
}

#[cfg(target_arch = "riscv64")]
pub use riscv::*;

#[cfg(not(any(
    target_arch = "x86_64",
    target_arch = "aarch64",
    target_arch = "powerpc64",
    target_arch = "riscv64"
)))]
mod other {
    pub fn sse2_supported() -> bool {
        false
    }
    pub fn avx_supported() -> bool {
        false
    }
    pub fn fma3_supported() -> bool {
        false
    }
    pub fn avx512f_supported() -> bool {
        false
    }
    pub fn neon_supported() -> bool {
        false
    }
    pub fn vsx_supported() -> bool {
        false
    }
    pub fn rvv_supported() -> bool {
        false
    }
}

#[cfg(not(any(
    target_arch = "x86_64",
    target_arch = "aarch64",
    target_arch = "powerpc64",
    target_arch = "riscv64"
)))]
pub use other::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oracles_are_stable_across_calls() {
        assert_eq!(sse2_supported(), sse2_supported());
        assert_eq!(avx512f_supported(), avx512f_supported());
    }
}
