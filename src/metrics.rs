//! Segmentation accuracy restricted to the labeled region.
use crate::error::{ensure_same_shape, CosegError, Result};
use crate::image::{ImageView, Mask};
use serde::{Deserialize, Serialize};

fn check(pred: &Mask, truth: &Mask, labeled: &Mask) -> Result<()> {
    ensure_same_shape("predicted mask", truth.shape(), pred.shape())?;
    ensure_same_shape("labeled region", truth.shape(), labeled.shape())
}

/// Fraction of labeled pixels where the prediction agrees with the truth.
pub fn pixel_accuracy(pred: &Mask, truth: &Mask, labeled: &Mask) -> Result<f64> {
    check(pred, truth, labeled)?;
    let mut total = 0usize;
    let mut same = 0usize;
    for ((&p, &t), &l) in pred.data.iter().zip(&truth.data).zip(&labeled.data) {
        if l {
            total += 1;
            if p == t {
                same += 1;
            }
        }
    }
    if total == 0 {
        return Err(CosegError::invalid("labeled", "no labeled pixels to score"));
    }
    Ok(same as f64 / total as f64)
}

/// Intersection over union of prediction and truth inside the labeled region.
///
/// Returns 1.0 when both are empty there.
pub fn overlap_accuracy(pred: &Mask, truth: &Mask, labeled: &Mask) -> Result<f64> {
    check(pred, truth, labeled)?;
    let mut both = 0usize;
    let mut either = 0usize;
    for ((&p, &t), &l) in pred.data.iter().zip(&truth.data).zip(&labeled.data) {
        if l {
            both += usize::from(p && t);
            either += usize::from(p || t);
        }
    }
    if either == 0 {
        return Ok(1.0);
    }
    Ok(both as f64 / either as f64)
}

/// Both accuracies of one predicted mask.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Accuracy {
    pub pixel: f64,
    pub overlap: f64,
}

impl Accuracy {
    pub fn measure(pred: &Mask, truth: &Mask, labeled: &Mask) -> Result<Self> {
        Ok(Self {
            pixel: pixel_accuracy(pred, truth, labeled)?,
            overlap: overlap_accuracy(pred, truth, labeled)?,
        })
    }

    /// Component-wise mean; zero for an empty slice.
    pub fn mean(items: &[Accuracy]) -> Self {
        if items.is_empty() {
            return Self::default();
        }
        let n = items.len() as f64;
        Self {
            pixel: items.iter().map(|a| a.pixel).sum::<f64>() / n,
            overlap: items.iter().map(|a| a.overlap).sum::<f64>() / n,
        }
    }

    /// Search objective `(s_a + s_o) / 2`.
    pub fn score(&self) -> f64 {
        (self.pixel + self.overlap) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn identical_masks_score_one() {
        let m = Mask::from_fn(5, 4, |x, y| x > y);
        let all = Mask::filled(5, 4, true);
        assert_eq!(pixel_accuracy(&m, &m, &all).unwrap(), 1.0);
        assert_eq!(overlap_accuracy(&m, &m, &all).unwrap(), 1.0);
    }

    #[test]
    fn disjoint_masks_score_zero() {
        let a = Mask::from_fn(4, 4, |x, _| x < 2);
        let all = Mask::filled(4, 4, true);
        let b = a.inverted();
        assert_eq!(pixel_accuracy(&a, &b, &all).unwrap(), 0.0);
        assert_eq!(overlap_accuracy(&a, &b, &all).unwrap(), 0.0);
    }

    #[test]
    fn unlabeled_pixels_are_ignored() {
        let truth = Mask::from_fn(4, 1, |x, _| x < 2);
        let pred = Mask::from_fn(4, 1, |x, _| x < 3);
        let labeled = Mask::from_fn(4, 1, |x, _| x != 2);
        assert_eq!(pixel_accuracy(&pred, &truth, &labeled).unwrap(), 1.0);
        let everything = Mask::filled(4, 1, true);
        assert_relative_eq!(pixel_accuracy(&pred, &truth, &everything).unwrap(), 0.75);
        assert_relative_eq!(overlap_accuracy(&pred, &truth, &everything).unwrap(), 2.0 / 3.0);
        let acc = Accuracy::measure(&pred, &truth, &everything).unwrap();
        assert_relative_eq!(acc.score(), (0.75 + 2.0 / 3.0) / 2.0);
    }

    #[test]
    fn empty_label_region_is_an_error() {
        let m = Mask::filled(2, 2, true);
        let none = Mask::filled(2, 2, false);
        assert!(pixel_accuracy(&m, &m, &none).is_err());
        assert_eq!(overlap_accuracy(&m, &m, &none).unwrap(), 1.0);
    }
}
