//! Dataset profiles: directory layout, mask encoding and default parameters.
use crate::gram::Betas;
use crate::image::{Mask, RgbImage};
use serde::{Deserialize, Serialize};

/// Supported image collections.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetProfile {
    /// Oxford flowers; segments mark the flower in pure red, unlabeled pixels in black.
    Flowers,
    /// Weizmann horses; segments are bright where the horse is, every pixel labeled.
    Horses,
}

/// Starting hyperparameters of a profile.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProfileDefaults {
    pub betas: Betas,
    pub nu: f64,
    pub lambda: f64,
    pub sigma: f64,
    pub qbins: u32,
}

impl DatasetProfile {
    /// Canonical `(width, height)` every image is resized to.
    pub fn image_size(self) -> (usize, usize) {
        (256, 256)
    }

    pub fn image_dir(self) -> &'static str {
        match self {
            DatasetProfile::Flowers => "flower_images",
            DatasetProfile::Horses => "horse_images",
        }
    }

    pub fn segment_dir(self) -> &'static str {
        match self {
            DatasetProfile::Flowers => "flower_segments",
            DatasetProfile::Horses => "horse_segments",
        }
    }

    /// Extension of the segment file paired with an image of the same stem.
    pub fn mask_extension(self) -> &'static str {
        match self {
            DatasetProfile::Flowers => "png",
            DatasetProfile::Horses => "jpg",
        }
    }

    /// Foreground mask encoded in a segment image.
    pub fn decode_mask(self, segment: &RgbImage) -> Mask {
        let rule: fn([u8; 3]) -> bool = match self {
            DatasetProfile::Flowers => |[r, g, _]| r == 128 && g == 0,
            DatasetProfile::Horses => |[_, _, b]| b > 128,
        };
        Mask {
            w: segment.w,
            h: segment.h,
            data: segment.data.iter().map(|&px| rule(px)).collect(),
        }
    }

    /// Pixels that carry ground truth.
    pub fn labeled_region(self, segment: &RgbImage) -> Mask {
        match self {
            DatasetProfile::Flowers => Mask {
                w: segment.w,
                h: segment.h,
                data: segment.data.iter().map(|&px| px != [0, 0, 0]).collect(),
            },
            DatasetProfile::Horses => Mask::filled(segment.w, segment.h, true),
        }
    }

    pub fn defaults(self) -> ProfileDefaults {
        let (betas, nu, lambda) = match self {
            DatasetProfile::Flowers => (Betas::new(0.2, 1.0, 0.16), 0.45, 0.24),
            DatasetProfile::Horses => (Betas::new(0.28, 1.0, 0.05), 0.24, 0.18),
        };
        ProfileDefaults {
            betas,
            nu,
            lambda,
            sigma: 0.25,
            qbins: 16,
        }
    }
}
