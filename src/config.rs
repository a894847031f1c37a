//! Tunable constants.
//!
//! This crate has no runtime configuration file or environment surface:
//! every input it needs arrives through the entry-point arguments. What
//! would otherwise be "config" is the handful of implementer-chosen
//! constants the spec leaves open, gathered here so they are easy to
//! find and change in one place.

/// Minimum number of time instants handed to a single worker thread.
/// `numCores = min(available_parallelism, ceil(T / MIN_BATCH))`.
pub const MIN_BATCH: usize = 8;

/// Widest portable (non-intrinsic) vector width this crate defines.
/// Used for the `Scalable` tier and for targets with no stable SIMD
/// intrinsics (riscv64, power8).
pub const PORTABLE_MAX_WIDTH: usize = 8;

/// When the combinatorial KooN term count (success-sum or fail-sum,
/// whichever is smaller) exceeds this many terms, the solver switches
/// to the recursive Shannon-expansion algorithm instead.
pub const KOON_COMBINATORIAL_TERM_LIMIT: u64 = 20_000;
