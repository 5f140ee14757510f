//! Row-blocked evaluation of the kernel matrix.
//!
//! `[0, n)` is cut into contiguous row blocks, one per worker. Each block
//! computes the full kernel rows of its images against all `n` images and
//! returns them in memory; [`assemble_blocks`] orders blocks by start row, so
//! the result never depends on completion order.
use super::channels::{check_sigma, omega1, omega2, omega3, theta, KernelEntry, KernelMatrix};
use crate::error::{CosegError, Result};
use crate::parallel::{run_tasks, task_error};
use crate::training::TrainingSet;
use log::debug;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::time::Instant;

/// Kernel rows `start..start + rows.len() / n` of the full matrix.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KernelBlock {
    pub start: usize,
    pub row_count: usize,
    pub entries: Vec<KernelEntry>,
}

/// Contiguous row ranges covering `[0, n)`, at most `workers` of them.
pub fn row_blocks(n: usize, workers: usize) -> Vec<Range<usize>> {
    if n == 0 {
        return Vec::new();
    }
    let workers = workers.clamp(1, n);
    let chunk = n.div_ceil(workers);
    (0..n)
        .step_by(chunk)
        .map(|start| start..(start + chunk).min(n))
        .collect()
}

/// Kernel rows for `rows` against every training image.
pub fn compute_block(set: &TrainingSet, rows: Range<usize>, sigma: f64) -> Result<KernelBlock> {
    check_sigma(sigma)?;
    let n = set.len();
    if rows.end > n {
        return Err(CosegError::invalid(
            "rows",
            format!("block {rows:?} exceeds {n} training images"),
        ));
    }
    let t0 = Instant::now();
    let bins = set.total_bins();
    let mut entries = Vec::with_capacity(rows.len() * n);
    for i in rows.clone() {
        let q_i = &set.qimages[i];
        let mask_i = &set.masks[i];
        for j in 0..n {
            let mask_j = &set.masks[j];
            entries.push(KernelEntry {
                theta: theta(&set.features[i], &set.features[j], sigma),
                omega1: omega1(mask_i, mask_j)?,
                omega2: omega2(q_i, mask_i, mask_j, bins)?,
                omega3: omega3(set.global_fidelity[i], set.global_fidelity[j]),
            });
        }
    }
    debug!(
        "kernel block rows {:?} done in {:.1} ms",
        rows,
        t0.elapsed().as_secs_f64() * 1000.0
    );
    Ok(KernelBlock {
        start: rows.start,
        row_count: rows.len(),
        entries,
    })
}

/// Concatenate blocks in ascending start order into an `n × n` matrix.
///
/// Fails if the blocks leave a gap, overlap, or have the wrong width.
pub fn assemble_blocks(n: usize, mut blocks: Vec<KernelBlock>) -> Result<KernelMatrix> {
    blocks.sort_by_key(|b| b.start);
    let mut entries = Vec::with_capacity(n * n);
    let mut next = 0usize;
    for block in blocks {
        if block.start != next {
            return Err(CosegError::Worker {
                task: format!("kernel block at row {}", block.start),
                reason: format!("expected block starting at row {next}"),
            });
        }
        if block.entries.len() != block.row_count * n {
            return Err(CosegError::Worker {
                task: format!("kernel block at row {}", block.start),
                reason: format!(
                    "{} entries for {} rows of width {n}",
                    block.entries.len(),
                    block.row_count
                ),
            });
        }
        next += block.row_count;
        entries.extend(block.entries);
    }
    if next != n {
        return Err(CosegError::Worker {
            task: "kernel assembly".to_string(),
            reason: format!("blocks cover {next} of {n} rows"),
        });
    }
    KernelMatrix::from_entries(n, entries)
}

/// Compute every block on a pool of `workers` threads.
pub fn compute_blocks(set: &TrainingSet, sigma: f64, workers: usize) -> Result<Vec<KernelBlock>> {
    check_sigma(sigma)?;
    let ranges = row_blocks(set.len(), workers);
    debug!(
        "computing {}x{} kernels in {} blocks on {} workers",
        set.len(),
        set.len(),
        ranges.len(),
        workers
    );
    run_tasks(workers, &ranges, |rows| {
        compute_block(set, rows.clone(), sigma)
            .map_err(|e| task_error(format!("kernel rows {rows:?}"), e))
    })
}

/// Full kernel matrix of the training set.
pub fn compute_kernels(set: &TrainingSet, sigma: f64, workers: usize) -> Result<KernelMatrix> {
    let blocks = compute_blocks(set, sigma, workers)?;
    assemble_blocks(set.len(), blocks)
}

/// Copy of `kernels` with only the theta channel recomputed for `sigma`.
///
/// The omega channels do not depend on the bandwidth, so sweeping `sigma`
/// never repeats the O(n²·pixels) work.
pub fn replace_theta(
    kernels: &KernelMatrix,
    features: &[Vec<f64>],
    sigma: f64,
) -> Result<KernelMatrix> {
    check_sigma(sigma)?;
    let n = kernels.len();
    if features.len() != n {
        return Err(CosegError::invalid(
            "features",
            format!("{} feature vectors for {n} kernel rows", features.len()),
        ));
    }
    let mut out = kernels.clone();
    for (idx, entry) in out.entries_mut().iter_mut().enumerate() {
        let (i, j) = (idx / n, idx % n);
        entry.theta = theta(&features[i], &features[j], sigma);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_blocks_cover_range_contiguously() {
        for (n, workers) in [(10, 4), (3, 8), (7, 1), (16, 4), (1, 1)] {
            let blocks = row_blocks(n, workers);
            assert!(blocks.len() <= workers.max(1));
            assert_eq!(blocks.first().unwrap().start, 0);
            assert_eq!(blocks.last().unwrap().end, n);
            for pair in blocks.windows(2) {
                assert_eq!(pair[0].end, pair[1].start);
            }
        }
        assert!(row_blocks(0, 4).is_empty());
    }

    #[test]
    fn assembly_ignores_arrival_order() {
        let entry = |v: f64| KernelEntry {
            theta: v,
            ..KernelEntry::default()
        };
        let b0 = KernelBlock {
            start: 0,
            row_count: 1,
            entries: vec![entry(0.0), entry(1.0)],
        };
        let b1 = KernelBlock {
            start: 1,
            row_count: 1,
            entries: vec![entry(2.0), entry(3.0)],
        };
        let m = assemble_blocks(2, vec![b1, b0]).unwrap();
        assert_eq!(m.get(0, 1).theta, 1.0);
        assert_eq!(m.get(1, 0).theta, 2.0);
    }

    #[test]
    fn missing_block_is_an_error() {
        let b1 = KernelBlock {
            start: 1,
            row_count: 1,
            entries: vec![KernelEntry::default(); 2],
        };
        assert!(assemble_blocks(2, vec![b1]).is_err());
    }
}
