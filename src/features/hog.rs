//! Histogram-of-oriented-gradients descriptor on a coarse cell grid.
//!
//! Geometry is derived from the image size: both dimensions are trimmed down
//! to a multiple of `cells_per_axis`, cells are square with side
//! `min(rows, cols) / cells_per_axis`, blocks span `cells_per_block` cells
//! and advance by `cells_per_stride` cells. Each cell accumulates gradient
//! magnitude into `bins` unsigned orientation bins with linear interpolation
//! between neighboring bins; each block is L2-Hys normalized.
use super::grad::color_gradients;
use super::FeatureExtractor;
use crate::error::{CosegError, Result};
use crate::image::RgbImage;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

const L2HYS_CLIP: f64 = 0.2;
const NORM_EPS: f64 = 1e-3;

/// Descriptor layout parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HogParams {
    /// Cells along the shorter image axis.
    pub cells_per_axis: usize,
    /// Block side in cells.
    pub cells_per_block: usize,
    /// Block step in cells.
    pub cells_per_stride: usize,
    /// Unsigned orientation bins over `[0, π)`.
    pub bins: usize,
}

impl Default for HogParams {
    fn default() -> Self {
        Self {
            cells_per_axis: 5,
            cells_per_block: 3,
            cells_per_stride: 2,
            bins: 9,
        }
    }
}

/// HOG descriptor with fixed geometry for a fixed input size.
#[derive(Clone, Debug)]
pub struct HogDescriptor {
    params: HogParams,
    cell: usize,
    cells_x: usize,
    cells_y: usize,
}

impl HogDescriptor {
    /// Geometry for a `width × height` input with the default parameters.
    pub fn for_image(width: usize, height: usize) -> Result<Self> {
        Self::with_params(width, height, HogParams::default())
    }

    pub fn with_params(width: usize, height: usize, params: HogParams) -> Result<Self> {
        if params.cells_per_axis == 0 || params.bins == 0 {
            return Err(CosegError::invalid("hog", "cells and bins must be positive"));
        }
        if params.cells_per_block == 0
            || params.cells_per_stride == 0
            || params.cells_per_block > params.cells_per_axis
        {
            return Err(CosegError::invalid(
                "hog",
                format!(
                    "block of {} cells with stride {} does not fit {} cells",
                    params.cells_per_block, params.cells_per_stride, params.cells_per_axis
                ),
            ));
        }
        let cols = width - width % params.cells_per_axis;
        let rows = height - height % params.cells_per_axis;
        let cell = (rows / params.cells_per_axis).min(cols / params.cells_per_axis);
        if cell == 0 {
            return Err(CosegError::invalid(
                "image",
                format!(
                    "{width}x{height} is too small for {} cells per axis",
                    params.cells_per_axis
                ),
            ));
        }
        Ok(Self {
            params,
            cell,
            cells_x: cols / cell,
            cells_y: rows / cell,
        })
    }

    /// Cell side in pixels.
    pub fn cell_size(&self) -> usize {
        self.cell
    }

    fn blocks_along(&self, cells: usize) -> usize {
        (cells - self.params.cells_per_block) / self.params.cells_per_stride + 1
    }

    /// Length of every descriptor produced by this geometry.
    pub fn descriptor_len(&self) -> usize {
        let per_block = self.params.cells_per_block * self.params.cells_per_block * self.params.bins;
        self.blocks_along(self.cells_x) * self.blocks_along(self.cells_y) * per_block
    }

    fn cell_histograms(&self, img: &RgbImage) -> Vec<f64> {
        let bins = self.params.bins;
        let bin_width = PI / bins as f64;
        let grad = color_gradients(img);
        let mut hist = vec![0.0f64; self.cells_x * self.cells_y * bins];

        for y in 0..self.cells_y * self.cell {
            let cy = y / self.cell;
            for x in 0..self.cells_x * self.cell {
                let cx = x / self.cell;
                let mag = grad.mag.get(x, y);
                if mag == 0.0 {
                    continue;
                }
                // Bin centers sit at (k + 0.5) · bin_width.
                let pos = grad.ori.get(x, y) / bin_width - 0.5;
                let lo = pos.floor();
                let frac = pos - lo;
                let b0 = (lo as isize).rem_euclid(bins as isize) as usize;
                let b1 = (b0 + 1) % bins;
                let base = (cy * self.cells_x + cx) * bins;
                hist[base + b0] += mag * (1.0 - frac);
                hist[base + b1] += mag * frac;
            }
        }
        hist
    }
}

impl FeatureExtractor for HogDescriptor {
    fn extract(&self, img: &RgbImage) -> Result<Vec<f64>> {
        let min_w = self.cells_x * self.cell;
        let min_h = self.cells_y * self.cell;
        if img.w < min_w || img.h < min_h {
            return Err(CosegError::ShapeMismatch {
                context: "hog input",
                expected: (min_w, min_h),
                actual: (img.w, img.h),
            });
        }
        let bins = self.params.bins;
        let cells = self.cell_histograms(img);
        let block = self.params.cells_per_block;
        let stride = self.params.cells_per_stride;

        let mut out = Vec::with_capacity(self.descriptor_len());
        for by in 0..self.blocks_along(self.cells_y) {
            for bx in 0..self.blocks_along(self.cells_x) {
                let start = out.len();
                for cy in by * stride..by * stride + block {
                    for cx in bx * stride..bx * stride + block {
                        let base = (cy * self.cells_x + cx) * bins;
                        out.extend_from_slice(&cells[base..base + bins]);
                    }
                }
                l2_hys(&mut out[start..]);
            }
        }
        Ok(out)
    }
}

fn l2_hys(v: &mut [f64]) {
    let normalize = |v: &mut [f64]| {
        let norm = (v.iter().map(|x| x * x).sum::<f64>() + NORM_EPS * NORM_EPS).sqrt();
        for x in v.iter_mut() {
            *x /= norm;
        }
    };
    normalize(v);
    for x in v.iter_mut() {
        *x = x.min(L2HYS_CLIP);
    }
    normalize(v);
}
