#![doc = include_str!("../README.md")]

// Building blocks
pub mod error;
pub mod features;
pub mod histogram;
pub mod image;
pub mod quantize;

// Model
pub mod gram;
pub mod kernels;
pub mod potentials;
pub mod svm;
pub mod training;

// Segmentation and evaluation
pub mod graphcut;
pub mod metrics;
pub mod search;

// Experiment plumbing
pub mod config;
pub mod dataset;
pub mod diagnostics;
pub mod experiment;
pub mod parallel;

// --- High-level re-exports -------------------------------------------------

pub use crate::error::{CosegError, Result};
pub use crate::experiment::{run_experiment, TrainedModel};
pub use crate::potentials::{SupportModel, UnaryPotentials};
pub use crate::training::{Sample, TrainingSet};

// --- Prelude ---------------------------------------------------------------

/// Small prelude for quick experiments.
///
/// ```no_run
/// use cosegment::prelude::*;
///
/// # fn main() -> cosegment::Result<()> {
/// let samples: Vec<Sample> = (0..4)
///     .map(|k| {
///         let img = RgbImage::from_fn(64, 64, |x, _| if x < 32 { [200, 30, 30] } else { [20, 20, 20 + k] });
///         let mask = Mask::from_fn(64, 64, |x, _| x < 32);
///         Sample::fully_labeled(img, mask)
///     })
///     .collect::<Result<_>>()?;
///
/// let hog = HogDescriptor::for_image(64, 64)?;
/// let set = TrainingSet::build(&samples, 4, &hog, 2)?;
/// let kernels = compute_kernels(&set, 0.25, 2)?;
/// let betas = Betas::new(0.28, 1.0, 0.05);
/// let support = SmoOneClass::default().fit(&gram(&kernels, betas), 0.5)?;
///
/// let model = SupportModel::new(&set, &hog, support, 0.25)?;
/// let unary = model.unary_potentials(&samples[0].image, betas)?;
/// let mask = segment(&samples[0].image, &unary, 0.18, &Dinic)?;
/// println!("foreground pixels: {}", mask.count());
/// # Ok(())
/// # }
/// ```
pub mod prelude {
    pub use crate::features::{FeatureExtractor, HogDescriptor};
    pub use crate::gram::{gram, Betas};
    pub use crate::graphcut::{segment, Dinic, MaxFlowSolver};
    pub use crate::image::{ImageView, Mask, RgbImage};
    pub use crate::kernels::compute_kernels;
    pub use crate::svm::{OneClassSolver, SmoOneClass};
    pub use crate::{Result, Sample, SupportModel, TrainingSet};
}
