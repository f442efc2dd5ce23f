//! labelmetry-core — numeric primitives for per-object image measurement.
//!
//! Two families of building blocks, both independent of any image type:
//!
//! 1. **Accumulators** – streaming, mergeable statistics (mean/variance up to
//!    skewness and excess kurtosis, min/max). Samples are folded in one at a
//!    time in O(1); two accumulators filled on disjoint sample partitions
//!    combine exactly, which is what makes thread-parallel accumulation with
//!    a final reduction possible.
//! 2. **Linalg kernels** – dense decompositions and reductions on tiny
//!    matrices passed as flat column-major buffers with caller-pre-sized
//!    outputs, so per-pixel inner loops never allocate.

pub mod accumulators;
pub mod linalg;

pub use accumulators::{MinMaxAccumulator, StatisticsAccumulator, VarianceAccumulator};
pub use linalg::KernelError;
