//! Per-pixel negative log-likelihood under a histogram and the mask
//! fidelity built on top of it.
use super::Histogram;
use crate::error::{ensure_same_shape, CosegError, Result};
use crate::image::{ImageView, ImageViewMut, Mask, PixelMap};
use crate::quantize::QuantizedImage;

/// `-ln(hist[bin] / Σ hist)` for every pixel of `qimage`.
///
/// The histogram must be regularized: a zero total or a zero bin hit by the
/// image fails with [`CosegError::DegenerateHistogram`].
pub fn pixel_nll(qimage: &QuantizedImage, hist: &Histogram) -> Result<PixelMap> {
    let total = hist.sum();
    if total == 0 {
        return Err(CosegError::DegenerateHistogram(
            "histogram mass is zero".to_string(),
        ));
    }
    let total = total as f64;
    // Cache -ln(p) per bin: images are much larger than the bins they touch.
    let mut table = vec![f64::NAN; hist.len()];
    let mut out = PixelMap::new(qimage.w, qimage.h);
    for (dst, &bin) in out.as_mut_slice().iter_mut().zip(qimage.as_slice()) {
        let bin = bin as usize;
        let count = *hist.bins.get(bin).ok_or_else(|| {
            CosegError::DegenerateHistogram(format!(
                "bin {bin} outside histogram of {} bins",
                hist.len()
            ))
        })?;
        if count == 0 {
            return Err(CosegError::DegenerateHistogram(format!(
                "bin {bin} is empty; histogram was not regularized"
            )));
        }
        let cached = &mut table[bin];
        if cached.is_nan() {
            *cached = -(count as f64 / total).ln();
        }
        *dst = *cached;
    }
    Ok(out)
}

/// Mean surprise of `mask`'s labeling of `qimage` under the opposite-class
/// histograms.
///
/// Masked (foreground) pixels are scored against `back`, unmasked pixels
/// against `fore`. Returns the mean together with the per-pixel map.
pub fn fidelity(
    qimage: &QuantizedImage,
    mask: &Mask,
    fore: &Histogram,
    back: &Histogram,
) -> Result<(f64, PixelMap)> {
    ensure_same_shape("fidelity mask", qimage.shape(), mask.shape())?;
    let back_nll = pixel_nll(qimage, back)?;
    let fore_nll = pixel_nll(qimage, fore)?;
    let mut map = PixelMap::new(qimage.w, qimage.h);
    for (i, dst) in map.as_mut_slice().iter_mut().enumerate() {
        *dst = if mask.data[i] {
            back_nll.data[i]
        } else {
            fore_nll.data[i]
        };
    }
    Ok((map.mean(), map))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::histogram::histogram;
    use crate::image::RgbImage;
    use crate::quantize::{quantize, total_bins};
    use approx::assert_relative_eq;

    #[test]
    fn nll_matches_bin_proportion() {
        let q = quantize(&RgbImage::filled(2, 2, [0, 0, 0]), 2).unwrap();
        let hist = Histogram {
            bins: vec![1, 3, 0, 0, 0, 0, 0, 0],
        };
        let nll = pixel_nll(&q, &hist).unwrap();
        for v in nll.as_slice() {
            assert_relative_eq!(*v, -(0.25f64).ln(), epsilon = 1e-12);
        }
    }

    #[test]
    fn zero_mass_and_empty_bins_are_errors() {
        let q = quantize(&RgbImage::filled(2, 2, [255, 255, 255]), 2).unwrap();
        let empty = Histogram::zeros(total_bins(2));
        assert!(matches!(
            pixel_nll(&q, &empty),
            Err(CosegError::DegenerateHistogram(_))
        ));
        let mut unregularized = Histogram::zeros(total_bins(2));
        unregularized.bins[0] = 5;
        assert!(matches!(
            pixel_nll(&q, &unregularized),
            Err(CosegError::DegenerateHistogram(_))
        ));
    }

    #[test]
    fn fidelity_scores_masked_pixels_against_background() {
        // Left half black, right half white.
        let img = RgbImage::from_fn(4, 2, |x, _| if x < 2 { [0; 3] } else { [255; 3] });
        let q = quantize(&img, 2).unwrap();
        let mask = Mask::from_fn(4, 2, |x, _| x < 2);
        let pair = histogram(&q, &mask, total_bins(2), true).unwrap();
        let (score, map) = fidelity(&q, &mask, &pair.fore, &pair.back).unwrap();

        // Black pixels are rare in the background histogram (1 of 12).
        assert_relative_eq!(map.get(0, 0), -(1.0f64 / 12.0).ln(), epsilon = 1e-12);
        assert_relative_eq!(map.get(3, 1), -(1.0f64 / 12.0).ln(), epsilon = 1e-12);
        assert_relative_eq!(score, map.mean(), epsilon = 1e-12);
    }
}
