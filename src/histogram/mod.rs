//! Foreground/background color histograms over quantized bins.
//!
//! A [`HistogramPair`] splits the pixels of a [`QuantizedImage`] by a mask:
//! mask-true pixels count into `fore`, the rest into `back`. Histograms that
//! will denominate a probability are regularized by adding one to every bin,
//! so that [`fidelity::pixel_nll`] never takes `ln(0)`.
//!
//! The training-set aggregate ([`global_histograms`]) sums *raw* counts and
//! applies the +1 floor exactly once at the end.

pub mod fidelity;

pub use fidelity::{fidelity, pixel_nll};

use crate::error::{ensure_same_shape, CosegError, Result};
use crate::image::{ImageView, Mask};
use crate::quantize::QuantizedImage;
use serde::{Deserialize, Serialize};

/// Bin-count vector of length `qbins³`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Histogram {
    pub bins: Vec<u64>,
}

impl Histogram {
    pub fn zeros(total_bins: usize) -> Self {
        Self {
            bins: vec![0; total_bins],
        }
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Total mass.
    pub fn sum(&self) -> u64 {
        self.bins.iter().sum()
    }

    /// Adds one to every bin.
    pub fn regularize(&mut self) {
        for b in &mut self.bins {
            *b += 1;
        }
    }

    /// Bin-wise accumulation of `other` into `self`.
    pub fn accumulate(&mut self, other: &Histogram) {
        debug_assert_eq!(self.bins.len(), other.bins.len());
        for (dst, &src) in self.bins.iter_mut().zip(&other.bins) {
            *dst += src;
        }
    }

    /// `true` when no bin is zero, i.e. safe as a probability denominator.
    pub fn has_no_empty_bins(&self) -> bool {
        self.bins.iter().all(|&b| b > 0)
    }
}

/// Foreground and background histograms built from the same image/mask split.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistogramPair {
    pub fore: Histogram,
    pub back: Histogram,
}

impl HistogramPair {
    pub fn zeros(total_bins: usize) -> Self {
        Self {
            fore: Histogram::zeros(total_bins),
            back: Histogram::zeros(total_bins),
        }
    }

    pub fn regularize(&mut self) {
        self.fore.regularize();
        self.back.regularize();
    }

    pub fn accumulate(&mut self, other: &HistogramPair) {
        self.fore.accumulate(&other.fore);
        self.back.accumulate(&other.back);
    }
}

/// Split the bins of `qimage` by `mask` into foreground/background counts.
///
/// With `regularize` every bin of both histograms is incremented by one.
pub fn histogram(
    qimage: &QuantizedImage,
    mask: &Mask,
    total_bins: usize,
    regularize: bool,
) -> Result<HistogramPair> {
    ensure_same_shape("histogram mask", qimage.shape(), mask.shape())?;
    let mut pair = HistogramPair::zeros(total_bins);
    for (&bin, &fg) in qimage.as_slice().iter().zip(mask.as_slice()) {
        let bin = bin as usize;
        if bin >= total_bins {
            return Err(CosegError::invalid(
                "total_bins",
                format!("bin {bin} out of range for {total_bins} bins"),
            ));
        }
        if fg {
            pair.fore.bins[bin] += 1;
        } else {
            pair.back.bins[bin] += 1;
        }
    }
    if regularize {
        pair.regularize();
    }
    Ok(pair)
}

/// Training-set histograms: raw per-image counts summed, then floored once.
pub fn global_histograms(
    qimages: &[QuantizedImage],
    masks: &[Mask],
    total_bins: usize,
) -> Result<HistogramPair> {
    if qimages.len() != masks.len() {
        return Err(CosegError::invalid(
            "masks",
            format!("{} quantized images but {} masks", qimages.len(), masks.len()),
        ));
    }
    let mut global = HistogramPair::zeros(total_bins);
    for (qimage, mask) in qimages.iter().zip(masks) {
        global.accumulate(&histogram(qimage, mask, total_bins, false)?);
    }
    global.regularize();
    Ok(global)
}
