//! Per-pixel unary potentials of a new image from the weighted support set.
//!
//! For every support image `k` with coefficient `α_k` the target receives
//!
//! ```text
//! fore += α_k θ_k [ β₁·mask_k     + β₂·L(x | B_k) + β₃·L(x | B_G)·γ_k ]
//! back += α_k θ_k [ β₁·(1−mask_k) + β₂·L(x | F_k) + β₃·L(x | F_G)·γ_k ]
//! ```
//!
//! where `θ_k` is the appearance affinity between target and support image,
//! `(F_k, B_k)` are the target's own colors split by the support mask
//! (regularized), `(F_G, B_G)` the global training histograms, `L` the
//! per-pixel negative log-likelihood and `γ_k` the support image's fidelity
//! to the global histograms.
//!
//! `fore` is evidence for foreground: it is the cost paid when the pixel is
//! labeled background, and vice versa.
use crate::error::{ensure_same_shape, CosegError, Result};
use crate::features::FeatureExtractor;
use crate::gram::Betas;
use crate::histogram::{histogram, pixel_nll};
use crate::image::{ImageView, ImageViewMut, PixelMap, RgbImage};
use crate::kernels::{check_sigma, theta};
use crate::quantize::quantize;
use crate::svm::SupportVectorSet;
use crate::training::TrainingSet;
use log::debug;

/// Foreground/background cost maps for one target image.
#[derive(Clone, Debug, PartialEq)]
pub struct UnaryPotentials {
    pub fore: PixelMap,
    pub back: PixelMap,
}

impl UnaryPotentials {
    pub fn shape(&self) -> (usize, usize) {
        self.fore.shape()
    }

    /// `true` when both maps are free of NaN/inf.
    pub fn is_finite(&self) -> bool {
        self.fore.is_finite() && self.back.is_finite()
    }
}

/// Trained support set bound to the training data it indexes into.
pub struct SupportModel<'a> {
    set: &'a TrainingSet,
    extractor: &'a dyn FeatureExtractor,
    support: SupportVectorSet,
    /// Fidelity of each support image to the global histograms, in support order.
    gammas: Vec<f64>,
    sigma: f64,
}

impl<'a> SupportModel<'a> {
    pub fn new(
        set: &'a TrainingSet,
        extractor: &'a dyn FeatureExtractor,
        support: SupportVectorSet,
        sigma: f64,
    ) -> Result<Self> {
        check_sigma(sigma)?;
        if support.is_empty() {
            return Err(CosegError::EmptySupport);
        }
        if let Some(&bad) = support.indices.iter().find(|&&k| k >= set.len()) {
            return Err(CosegError::invalid(
                "support",
                format!("index {bad} outside training set of {}", set.len()),
            ));
        }
        let gammas = support
            .indices
            .iter()
            .map(|&k| set.global_fidelity()[k])
            .collect();
        Ok(Self {
            set,
            extractor,
            support,
            gammas,
            sigma,
        })
    }

    pub fn support(&self) -> &SupportVectorSet {
        &self.support
    }

    pub fn training_set(&self) -> &TrainingSet {
        self.set
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Unary potentials of `target` (already at the training resolution).
    pub fn unary_potentials(&self, target: &RgbImage, betas: Betas) -> Result<UnaryPotentials> {
        ensure_same_shape("target image", self.set.shape(), target.shape())?;
        if !betas.is_finite() {
            return Err(CosegError::invalid("betas", format!("{betas:?} not finite")));
        }
        let bins = self.set.total_bins();
        let q = quantize(target, self.set.qbins())?;
        let feat = self.extractor.extract(target)?;
        let global = self.set.global_histograms();
        let nll_global_back = pixel_nll(&q, &global.back)?;
        let nll_global_fore = pixel_nll(&q, &global.fore)?;

        let (w, h) = target.shape();
        let mut fore = PixelMap::new(w, h);
        let mut back = PixelMap::new(w, h);

        for ((k, alpha), &gamma) in self.support.iter().zip(&self.gammas) {
            let weight = alpha * theta(&feat, &self.set.features()[k], self.sigma);
            let mask_k = &self.set.masks()[k];
            let cross = histogram(&q, mask_k, bins, true)?;
            let nll_back = pixel_nll(&q, &cross.back)?;
            let nll_fore = pixel_nll(&q, &cross.fore)?;

            let pixels = fore
                .as_mut_slice()
                .iter_mut()
                .zip(back.as_mut_slice().iter_mut())
                .enumerate();
            for (p, (f, b)) in pixels {
                let m = if mask_k.data[p] { 1.0 } else { 0.0 };
                *f += weight
                    * (betas.beta1 * m
                        + betas.beta2 * nll_back.data[p]
                        + betas.beta3 * nll_global_back.data[p] * gamma);
                *b += weight
                    * (betas.beta1 * (1.0 - m)
                        + betas.beta2 * nll_fore.data[p]
                        + betas.beta3 * nll_global_fore.data[p] * gamma);
            }
        }
        debug!(
            "unary potentials over {} supports: mean fore={:.4} back={:.4}",
            self.support.len(),
            fore.mean(),
            back.mean()
        );

        let out = UnaryPotentials { fore, back };
        if !out.is_finite() {
            return Err(CosegError::InvalidEnergy(
                "unary potentials contain non-finite values".to_string(),
            ));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::Mask;
    use crate::training::Sample;
    use approx::assert_relative_eq;

    struct MeanColor;

    impl FeatureExtractor for MeanColor {
        fn extract(&self, img: &RgbImage) -> Result<Vec<f64>> {
            let n = img.data.len().max(1) as f64;
            let mut acc = [0.0; 3];
            for px in &img.data {
                for c in 0..3 {
                    acc[c] += px[c] as f64 / 255.0;
                }
            }
            Ok(acc.iter().map(|v| v / n).collect())
        }
    }

    fn left_half_set() -> TrainingSet {
        let image = RgbImage::filled(8, 8, [120, 120, 120]);
        let mask = Mask::from_fn(8, 8, |x, _| x < 4);
        let sample = Sample::fully_labeled(image, mask).unwrap();
        TrainingSet::build(&[sample], 2, &MeanColor, 1).unwrap()
    }

    #[test]
    fn left_half_support_favors_left_foreground() {
        let set = left_half_set();
        let support = SupportVectorSet::new(vec![0], vec![1.0], 0.0).unwrap();
        let model = SupportModel::new(&set, &MeanColor, support, 0.25).unwrap();
        let target = RgbImage::filled(8, 8, [120, 120, 120]);
        let pots = model
            .unary_potentials(&target, Betas::new(0.2, 1.0, 0.16))
            .unwrap();
        assert_eq!(pots.shape(), (8, 8));
        for y in 0..8 {
            assert!(pots.fore.get(1, y) > pots.fore.get(6, y));
            assert!(pots.back.get(6, y) > pots.back.get(1, y));
        }
        // Identical colors on both sides: only the mask term differs.
        assert_relative_eq!(
            pots.fore.get(1, 0) - pots.fore.get(6, 0),
            0.2,
            epsilon = 1e-9
        );
    }

    #[test]
    fn target_must_match_training_shape() {
        let set = left_half_set();
        let support = SupportVectorSet::new(vec![0], vec![1.0], 0.0).unwrap();
        let model = SupportModel::new(&set, &MeanColor, support, 0.25).unwrap();
        let target = RgbImage::filled(4, 8, [0, 0, 0]);
        assert!(matches!(
            model.unary_potentials(&target, Betas::new(1.0, 1.0, 1.0)),
            Err(CosegError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn support_index_must_exist() {
        let set = left_half_set();
        let support = SupportVectorSet::new(vec![3], vec![1.0], 0.0).unwrap();
        assert!(SupportModel::new(&set, &MeanColor, support, 0.25).is_err());
    }
}
