//! Per-worker descriptors and KooN precomputation (C4/C5 shared state).
//!
//! One `Descriptor` is built per worker before any thread is spawned; it
//! borrows the shared read-only input and this worker's disjoint slice
//! of the output, so workers never need to synchronize with each other.

use crate::error::{RbdError, RbdResult};
use crate::koon::{binomial_table_f64, choose_generic_algorithm, Algorithm};

/// What a single worker thread needs to compute its slice of the output.
/// `rel` and `t_stride` describe the full reliability input (shared,
/// read-only); `out` is this worker's own disjoint sub-slice, already
/// positioned at the right offset by the caller's `split_at_mut`.
pub struct Descriptor<'a> {
    pub rel: &'a [f64],
    pub t_stride: usize,
    pub n: usize,
    pub out: &'a mut [f64],
    /// Index of `out[0]` within the full `T`-length output.
    pub t_offset: usize,
    pub num_cores: usize,
}

/// Precomputed KooN solver state, shared (read-only) across every
/// worker for one `koon_*` call.
pub struct KooNPlan {
    pub algorithm: Algorithm,
    pub k: usize,
    /// `C(n, i)` for `i` in `[0, n]`, `f64`-valued. Only populated (and
    /// only used) for the identical-components closed form.
    pub binom: Vec<f64>,
}

impl KooNPlan {
    /// Builds the plan for a generic-components call.
    pub fn for_generic(n: usize, k: usize) -> Self {
        let algorithm = choose_generic_algorithm(n, k);
        KooNPlan { algorithm, k, binom: Vec::new() }
    }

    /// Builds the plan for an identical-components call: the closed form
    /// always applies, so the only precomputation is the binomial table.
    pub fn for_identical(n: usize, k: usize) -> Self {
        KooNPlan { algorithm: Algorithm::SuccessSum, k, binom: binomial_table_f64(n) }
    }
}

/// Per-worker recursion scratch. Each call into `koon::recursive_wide`
/// allocates its own `best + 1`-layer weights buffer, sized to the
/// `(n, k)` of that call rather than a fixed worst case, since `best =
/// min(k-1, n-k)` has no upper bound independent of `N`. This type
/// instead performs one small pre-flight allocation per worker before
/// any thread is spawned, turning a hypothetical allocation failure
/// into a checked `RbdError::ScratchAllocation` at dispatch time rather
/// than an abort deep inside a spawned thread.
pub struct RecursionScratch {
    _reserved: Vec<f64>,
}

impl RecursionScratch {
    pub fn reserve(num_workers: usize) -> RbdResult<Self> {
        const PREFLIGHT_PROBE_SIZE: usize = 128;
        let mut reserved = Vec::new();
        reserved
            .try_reserve_exact(num_workers * PREFLIGHT_PROBE_SIZE)
            .map_err(|_| RbdError::ScratchAllocation)?;
        Ok(RecursionScratch { _reserved: reserved })
    }
}
