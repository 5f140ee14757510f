//! The four pairwise kernel channels between training images.
//!
//! | channel  | meaning                                             | symmetric |
//! |----------|-----------------------------------------------------|-----------|
//! | `theta`  | RBF affinity of the feature vectors                 | yes       |
//! | `omega1` | fraction of pixels where the two masks agree        | yes       |
//! | `omega2` | fidelity of image i's mask under i's colors split by j's mask | no |
//! | `omega3` | product of both images' fidelity to the global histograms | yes |
use crate::error::{ensure_same_shape, CosegError, Result};
use crate::histogram::{fidelity, histogram};
use crate::image::{ImageView, Mask};
use crate::quantize::QuantizedImage;
use serde::{Deserialize, Serialize};

/// Kernel channels for one ordered image pair `(i, j)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct KernelEntry {
    pub theta: f64,
    pub omega1: f64,
    pub omega2: f64,
    pub omega3: f64,
}

/// Dense `n × n` grid of [`KernelEntry`] in row-major order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KernelMatrix {
    n: usize,
    entries: Vec<KernelEntry>,
}

impl KernelMatrix {
    pub fn from_entries(n: usize, entries: Vec<KernelEntry>) -> Result<Self> {
        if entries.len() != n * n {
            return Err(CosegError::invalid(
                "entries",
                format!("expected {} kernel entries for n={n}, got {}", n * n, entries.len()),
            ));
        }
        Ok(Self { n, entries })
    }

    /// Number of training images.
    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> &KernelEntry {
        &self.entries[i * self.n + j]
    }

    pub fn row(&self, i: usize) -> &[KernelEntry] {
        &self.entries[i * self.n..(i + 1) * self.n]
    }

    pub fn entries(&self) -> &[KernelEntry] {
        &self.entries
    }

    pub(crate) fn entries_mut(&mut self) -> &mut [KernelEntry] {
        &mut self.entries
    }
}

/// Gaussian RBF on the Euclidean feature distance: `exp(-‖a − b‖ / (2σ²))`.
///
/// The exponent uses the distance itself, not its square.
pub fn theta(a: &[f64], b: &[f64], sigma: f64) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    let dist = a
        .iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt();
    (-dist / (2.0 * sigma * sigma)).exp()
}

/// Rejects bandwidths for which [`theta`] is undefined.
pub fn check_sigma(sigma: f64) -> Result<()> {
    if sigma.is_finite() && sigma > 0.0 {
        Ok(())
    } else {
        Err(CosegError::invalid("sigma", format!("{sigma} is not a positive bandwidth")))
    }
}

/// Fraction of pixel positions where both masks carry the same label.
pub fn omega1(a: &Mask, b: &Mask) -> Result<f64> {
    ensure_same_shape("omega1", a.shape(), b.shape())?;
    if a.is_empty() {
        return Err(CosegError::invalid("mask", "empty mask"));
    }
    let same = a
        .as_slice()
        .iter()
        .zip(b.as_slice())
        .filter(|(x, y)| x == y)
        .count();
    Ok(same as f64 / a.len() as f64)
}

/// Fidelity of `own_mask` over `qimage` against the regularized histograms
/// of `qimage` split by `other_mask`.
///
/// Direction matters: only image i's colors are used, scored against image j's
/// mask.
pub fn omega2(
    qimage: &QuantizedImage,
    own_mask: &Mask,
    other_mask: &Mask,
    total_bins: usize,
) -> Result<f64> {
    let cross = histogram(qimage, other_mask, total_bins, true)?;
    let (score, _) = fidelity(qimage, own_mask, &cross.fore, &cross.back)?;
    Ok(score)
}

/// Product of the two images' cached fidelities to the global histograms.
#[inline]
pub fn omega3(global_fidelity_i: f64, global_fidelity_j: f64) -> f64 {
    global_fidelity_i * global_fidelity_j
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::RgbImage;
    use crate::quantize::{quantize, total_bins};
    use approx::assert_relative_eq;

    #[test]
    fn theta_is_symmetric_and_one_on_the_diagonal() {
        let a = [0.1, 0.5, 0.9, 0.0];
        let b = [0.3, 0.2, 0.9, 0.7];
        for sigma in [0.1, 0.25, 1.0, 3.0] {
            assert_eq!(theta(&a, &b, sigma), theta(&b, &a, sigma));
            assert_eq!(theta(&a, &a, sigma), 1.0);
            assert!(theta(&a, &b, sigma) < 1.0);
        }
    }

    #[test]
    fn theta_uses_unsquared_distance() {
        let a = [0.0, 0.0];
        let b = [3.0, 4.0];
        assert_relative_eq!(theta(&a, &b, 1.0), (-2.5f64).exp(), epsilon = 1e-12);
    }

    #[test]
    fn omega1_is_symmetric_and_one_on_the_diagonal() {
        let a = Mask::from_fn(5, 4, |x, _| x < 2);
        let b = Mask::from_fn(5, 4, |_, y| y < 1);
        assert_eq!(omega1(&a, &b).unwrap(), omega1(&b, &a).unwrap());
        assert_eq!(omega1(&a, &a).unwrap(), 1.0);
        assert_eq!(omega1(&a, &a.inverted()).unwrap(), 0.0);
        // Agreement: (x<2, y<1) both-true 2 cells, both-false 3*3 = 9 cells.
        assert_relative_eq!(omega1(&a, &b).unwrap(), 11.0 / 20.0);
    }

    #[test]
    fn omega2_is_direction_dependent() {
        let img_i = RgbImage::from_fn(6, 6, |x, _| if x < 3 { [250, 10, 10] } else { [10, 10, 250] });
        let q = quantize(&img_i, 2).unwrap();
        let mask_i = Mask::from_fn(6, 6, |x, _| x < 3);
        let mask_j = Mask::from_fn(6, 6, |_, y| y < 3);
        let bins = total_bins(2);

        let matched = omega2(&q, &mask_i, &mask_i, bins).unwrap();
        let crossed = omega2(&q, &mask_i, &mask_j, bins).unwrap();
        // A mask that separates the colors makes its own labeling surprising
        // under the opposite class (high score) compared with an unrelated split.
        assert!(matched > crossed, "matched={matched} crossed={crossed}");
    }

    #[test]
    fn sigma_must_be_positive() {
        assert!(check_sigma(0.25).is_ok());
        assert!(check_sigma(0.0).is_err());
        assert!(check_sigma(f64::NAN).is_err());
    }
}
