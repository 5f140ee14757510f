//! Pairwise kernels between training images.
//!
//! - [`channels`]: the four kernel channels and the dense [`KernelMatrix`].
//! - [`engine`]: row-blocked parallel evaluation and theta replacement.
//! - [`cache`]: on-disk block cache for resuming a run.

pub mod cache;
pub mod channels;
pub mod engine;

pub use cache::{load_or_compute, CacheKey, KernelCache, KernelSource};
pub use channels::{check_sigma, omega1, omega2, omega3, theta, KernelEntry, KernelMatrix};
pub use engine::{
    assemble_blocks, compute_block, compute_blocks, compute_kernels, replace_theta, row_blocks,
    KernelBlock,
};
