//! Internal error type for the RBD kernel.
//!
//! Public entry points never leak this type across the crate boundary;
//! they collapse it to the negative `i32` status codes the spec's
//! C-ABI-shaped contract expects (see [`RbdError::status_code`]).

use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RbdError {
    #[error("numComponents must be >= 1, got {0}")]
    ZeroComponents(usize),

    #[error("Bridge requires exactly 5 components, got {0}")]
    BridgeComponentCount(usize),

    #[error("numTimes must be >= 1, got {0}")]
    ZeroTimes(usize),

    #[error("KooN minComponents must satisfy 1 <= K <= numComponents, got K={k}, N={n}")]
    KooNInvalidK { k: usize, n: usize },

    #[error("failed to allocate per-worker recursion scratch")]
    ScratchAllocation,

    #[error("failed to spawn a worker thread")]
    ThreadSpawn,
}

impl RbdError {
    /// Maps this error to the negative status code returned by the
    /// public entry points (spec section 7).
    pub fn status_code(self) -> i32 {
        match self {
            RbdError::ZeroComponents(_) => -1,
            RbdError::BridgeComponentCount(_) => -2,
            RbdError::ZeroTimes(_) => -3,
            RbdError::KooNInvalidK { .. } => -4,
            RbdError::ScratchAllocation => -10,
            RbdError::ThreadSpawn => -11,
        }
    }
}

pub type RbdResult<T> = Result<T, RbdError>;
