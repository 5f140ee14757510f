//! Per-image data derived once per training run.
//!
//! [`TrainingSet`] validates the loaded images and masks eagerly (every pair
//! must share one canonical shape) and caches everything the kernel engine
//! and the potential builder read: quantized images, feature vectors, the
//! global histograms and each image's fidelity to them. Nothing here is
//! mutated after construction, so both parallel phases share it by reference.
use crate::error::{ensure_same_shape, CosegError, Result};
use crate::features::FeatureExtractor;
use crate::histogram::{fidelity, global_histograms, HistogramPair};
use crate::image::{ImageView, Mask, RgbImage};
use crate::parallel::run_tasks;
use crate::quantize::{quantize, total_bins, QuantizedImage};
use log::debug;
use sha2::{Digest, Sha256};

/// One image with its ground-truth mask and labeled region.
#[derive(Clone, Debug)]
pub struct Sample {
    pub image: RgbImage,
    pub mask: Mask,
    pub labeled: Mask,
}

impl Sample {
    /// Pair an image with its masks, rejecting shape mismatches.
    pub fn new(image: RgbImage, mask: Mask, labeled: Mask) -> Result<Self> {
        ensure_same_shape("sample mask", image.shape(), mask.shape())?;
        ensure_same_shape("sample labeled region", image.shape(), labeled.shape())?;
        Ok(Self {
            image,
            mask,
            labeled,
        })
    }

    /// Sample whose every pixel is labeled.
    pub fn fully_labeled(image: RgbImage, mask: Mask) -> Result<Self> {
        let labeled = Mask::filled(image.w, image.h, true);
        Self::new(image, mask, labeled)
    }
}

/// Immutable cache of per-image training data.
pub struct TrainingSet {
    shape: (usize, usize),
    qbins: u32,
    pub(crate) images: Vec<RgbImage>,
    pub(crate) masks: Vec<Mask>,
    pub(crate) qimages: Vec<QuantizedImage>,
    pub(crate) features: Vec<Vec<f64>>,
    pub(crate) global: HistogramPair,
    pub(crate) global_fidelity: Vec<f64>,
    fingerprint: String,
}

impl TrainingSet {
    /// Quantize, embed and histogram the training samples.
    ///
    /// Per-image work runs on `workers` threads.
    pub fn build(
        samples: &[Sample],
        qbins: u32,
        extractor: &dyn FeatureExtractor,
        workers: usize,
    ) -> Result<Self> {
        let first = samples
            .first()
            .ok_or_else(|| CosegError::Dataset("training set is empty".to_string()))?;
        let shape = first.image.shape();
        for s in samples {
            ensure_same_shape("training image", shape, s.image.shape())?;
            ensure_same_shape("training mask", shape, s.mask.shape())?;
        }
        let bins = total_bins(qbins);

        let derived = run_tasks(workers, samples, |s| {
            let q = quantize(&s.image, qbins)?;
            let f = extractor.extract(&s.image)?;
            Ok((q, f))
        })?;
        let (qimages, features): (Vec<_>, Vec<_>) = derived.into_iter().unzip();
        if let Some(len) = features.first().map(Vec::len) {
            if features.iter().any(|f| f.len() != len) {
                return Err(CosegError::invalid(
                    "features",
                    "feature extractor produced vectors of different lengths",
                ));
            }
        }

        let masks: Vec<Mask> = samples.iter().map(|s| s.mask.clone()).collect();
        let global = global_histograms(&qimages, &masks, bins)?;
        let global_fidelity = qimages
            .iter()
            .zip(&masks)
            .map(|(q, m)| fidelity(q, m, &global.fore, &global.back).map(|(score, _)| score))
            .collect::<Result<Vec<f64>>>()?;
        debug!(
            "TrainingSet::build n={} shape={:?} qbins={} feature_len={}",
            samples.len(),
            shape,
            qbins,
            features.first().map_or(0, Vec::len)
        );

        let fingerprint = content_fingerprint(&qimages, &masks, &features);

        Ok(Self {
            shape,
            qbins,
            fingerprint,
            images: samples.iter().map(|s| s.image.clone()).collect(),
            masks,
            qimages,
            features,
            global,
            global_fidelity,
        })
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Canonical (width, height) shared by all training images.
    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    pub fn qbins(&self) -> u32 {
        self.qbins
    }

    pub fn total_bins(&self) -> usize {
        total_bins(self.qbins)
    }

    pub fn masks(&self) -> &[Mask] {
        &self.masks
    }

    pub fn qimages(&self) -> &[QuantizedImage] {
        &self.qimages
    }

    pub fn features(&self) -> &[Vec<f64>] {
        &self.features
    }

    /// Training-set foreground/background histograms (floored once).
    pub fn global_histograms(&self) -> &HistogramPair {
        &self.global
    }

    /// Each image's fidelity to the global histograms.
    pub fn global_fidelity(&self) -> &[f64] {
        &self.global_fidelity
    }

    /// "sha256:<hex>" over every image's quantized pixels, mask and features.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

fn content_fingerprint(
    qimages: &[QuantizedImage],
    masks: &[Mask],
    features: &[Vec<f64>],
) -> String {
    let mut h = Sha256::new();
    for ((q, m), f) in qimages.iter().zip(masks).zip(features) {
        h.update((q.w as u64).to_le_bytes());
        h.update((q.h as u64).to_le_bytes());
        for &bin in &q.data {
            h.update(bin.to_le_bytes());
        }
        h.update(m.data.iter().map(|&b| u8::from(b)).collect::<Vec<u8>>());
        h.update((f.len() as u64).to_le_bytes());
        for &v in f {
            h.update(v.to_bits().to_le_bytes());
        }
    }
    format!("sha256:{:x}", h.finalize())
}
