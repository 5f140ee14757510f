//! Owned image containers used by the co-segmentation pipeline.
//!
//! - [`RgbImage`]: interleaved 8-bit color image at the canonical resolution.
//! - [`Mask`]: boolean grid (foreground masks, labeled regions, predictions).
//! - [`PixelMap`]: per-pixel `f64` values (negative log-likelihoods, potentials).
//!
//! All containers are row-major with `stride == width` and expose rows
//! through [`ImageView`].
pub mod io;
pub mod map;
pub mod mask;
pub mod rgb;
pub mod traits;

pub use self::map::PixelMap;
pub use self::mask::Mask;
pub use self::rgb::RgbImage;
pub use self::traits::{ImageView, ImageViewMut, Rows};
