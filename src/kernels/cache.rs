//! Persisted kernel blocks for resuming without the O(n²) phase.
//!
//! The cache is a map from block start row to [`KernelBlock`] together with
//! a [`CacheKey`] describing the training set (sizes and a content hash) and
//! the parallelism degree it was computed with. A cache whose key matches is reused; a differing
//! bandwidth only triggers [`replace_theta`].
use super::channels::KernelMatrix;
use super::engine::{assemble_blocks, compute_blocks, replace_theta, KernelBlock};
use crate::error::{CosegError, Result};
use crate::image::io::ensure_parent_dir;
use crate::training::TrainingSet;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Identity of the inputs a cached kernel matrix was computed from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheKey {
    pub n_images: usize,
    pub width: usize,
    pub height: usize,
    pub qbins: u32,
    pub feature_len: usize,
    pub workers: usize,
    /// [`TrainingSet::fingerprint`] of the images the kernels describe.
    pub fingerprint: String,
}

impl CacheKey {
    pub fn for_training_set(set: &TrainingSet, workers: usize) -> Self {
        let (width, height) = set.shape();
        Self {
            n_images: set.len(),
            width,
            height,
            qbins: set.qbins(),
            feature_len: set.features().first().map_or(0, Vec::len),
            workers,
            fingerprint: set.fingerprint().to_string(),
        }
    }
}

/// Kernel blocks keyed by their start row.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KernelCache {
    pub key: CacheKey,
    /// Bandwidth the theta channel was computed with.
    pub sigma: f64,
    pub blocks: BTreeMap<usize, KernelBlock>,
}

impl KernelCache {
    pub fn from_blocks(key: CacheKey, sigma: f64, blocks: Vec<KernelBlock>) -> Self {
        let blocks = blocks.into_iter().map(|b| (b.start, b)).collect();
        Self { key, sigma, blocks }
    }

    /// Combined matrix in block-start order.
    pub fn to_matrix(&self) -> Result<KernelMatrix> {
        assemble_blocks(self.key.n_images, self.blocks.values().cloned().collect())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        ensure_parent_dir(path)?;
        let json = serde_json::to_string(self).map_err(|source| CosegError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json).map_err(|e| CosegError::io(path, e))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path).map_err(|e| CosegError::io(path, e))?;
        serde_json::from_str(&data).map_err(|source| CosegError::Json {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Where [`load_or_compute`] got its kernels from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum KernelSource {
    Computed,
    Cached,
    /// Cached channels with theta recomputed for a new bandwidth.
    CachedNewSigma,
}

/// Read the kernel matrix from `path` when it matches `set`, otherwise
/// compute it and write the cache.
pub fn load_or_compute(
    path: &Path,
    set: &TrainingSet,
    sigma: f64,
    workers: usize,
) -> Result<(KernelMatrix, KernelSource)> {
    let key = CacheKey::for_training_set(set, workers);
    if path.exists() {
        match KernelCache::load(path) {
            Ok(cache) if cache.key == key => {
                info!("reusing cached kernels from {}", path.display());
                let kernels = cache.to_matrix()?;
                if cache.sigma == sigma {
                    return Ok((kernels, KernelSource::Cached));
                }
                debug!("cached sigma {} differs from {sigma}; recomputing theta", cache.sigma);
                let kernels = replace_theta(&kernels, set.features(), sigma)?;
                return Ok((kernels, KernelSource::CachedNewSigma));
            }
            Ok(cache) => {
                info!(
                    "kernel cache {} was built for {:?}; recomputing",
                    path.display(),
                    cache.key
                );
            }
            Err(err) => {
                warn!("ignoring unreadable kernel cache {}: {err}", path.display());
            }
        }
    }
    let blocks = compute_blocks(set, sigma, workers)?;
    let cache = KernelCache::from_blocks(key, sigma, blocks);
    cache.save(path)?;
    info!("wrote kernel cache {}", path.display());
    Ok((cache.to_matrix()?, KernelSource::Computed))
}
