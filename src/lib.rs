//! Time-dependent Reliability Block Diagram (RBD) kernels.
//!
//! Computes the time-varying reliability of Series, Parallel, Bridge
//! (5-component diamond-plus-cross-link), and KooN (k-out-of-n) block
//! diagrams from per-component reliability curves sampled over a time
//! axis, using tiered SIMD kernels dispatched across a transient worker
//! thread pool.
//!
//! See [`dispatch`] for the public entry points.

pub mod config;
pub mod cpu_features;
pub mod descriptor;
pub mod dispatch;
pub mod error;
pub mod koon;
pub mod scalar;
pub mod vector;
pub mod worker;

pub use dispatch::{
    bridge_generic, bridge_identical, koon_generic, koon_identical, parallel_generic,
    parallel_identical, series_generic, series_identical,
};
pub use error::{RbdError, RbdResult};
