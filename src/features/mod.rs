//! Image embeddings used by the appearance kernel.
//!
//! The pipeline only relies on a [`FeatureExtractor`] being deterministic and
//! producing a fixed-length vector for a fixed input size. The bundled
//! [`HogDescriptor`] is a histogram of oriented gradients over a 5×5 cell grid
//! with 3×3-cell blocks, a 2-cell stride and 9 orientation bins.

pub mod grad;
pub mod hog;

pub use grad::{color_gradients, Grad};
pub use hog::{HogDescriptor, HogParams};

use crate::error::Result;
use crate::image::RgbImage;

/// Fixed-length real embedding of an image.
pub trait FeatureExtractor: Send + Sync {
    fn extract(&self, img: &RgbImage) -> Result<Vec<f64>>;
}
