//! I/O helpers for color images, segment images, masks and JSON.
//!
//! - `load_rgb_resized`: read a PNG/JPEG/etc. and resize it to the canonical size.
//! - `load_segment_resized`: same, but nearest-neighbor so label colors survive.
//! - `save_mask_png`: write a boolean mask as a black/white PNG.
//! - `save_overlay_png`: write an image with pixels outside a mask dimmed.
//! - `write_json_file`: pretty-print a serializable value to disk.
use super::{ImageView, Mask, RgbImage};
use crate::error::{ensure_same_shape, CosegError, Result};
use image::imageops::FilterType;
use image::{GrayImage, Luma, Rgb};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Load an image from disk as RGB and resize it to `size` (width, height).
pub fn load_rgb_resized(path: &Path, size: (usize, usize)) -> Result<RgbImage> {
    load_resized(path, size, FilterType::Triangle)
}

/// Load a ground-truth segment image; nearest-neighbor keeps label colors exact.
pub fn load_segment_resized(path: &Path, size: (usize, usize)) -> Result<RgbImage> {
    load_resized(path, size, FilterType::Nearest)
}

fn load_resized(path: &Path, size: (usize, usize), filter: FilterType) -> Result<RgbImage> {
    let (w, h) = size;
    if w == 0 || h == 0 {
        return Err(CosegError::invalid("size", "target size must be positive"));
    }
    let img = image::open(path)
        .map_err(|source| CosegError::Image {
            path: path.to_path_buf(),
            source,
        })?
        .into_rgb8();
    let resized = if img.width() as usize == w && img.height() as usize == h {
        img
    } else {
        image::imageops::resize(&img, w as u32, h as u32, filter)
    };
    RgbImage::from_interleaved(w, h, resized.as_raw())
}

/// Save a mask to a grayscale PNG (foreground = 255).
pub fn save_mask_png(mask: &Mask, path: &Path) -> Result<()> {
    ensure_parent_dir(path)?;
    let mut out = GrayImage::new(mask.w as u32, mask.h as u32);
    for (y, row) in mask.rows().enumerate() {
        for (x, &fg) in row.iter().enumerate() {
            out.put_pixel(x as u32, y as u32, Luma([if fg { 255 } else { 0 }]));
        }
    }
    out.save(path).map_err(|source| CosegError::Image {
        path: path.to_path_buf(),
        source,
    })
}

/// Save `image` with every pixel outside `mask` dimmed to a tenth of its value.
pub fn save_overlay_png(image: &RgbImage, mask: &Mask, path: &Path) -> Result<()> {
    ensure_same_shape("overlay mask", image.shape(), mask.shape())?;
    ensure_parent_dir(path)?;
    let mut out = image::RgbImage::new(image.w as u32, image.h as u32);
    for (x, y, px) in out.enumerate_pixels_mut() {
        let (x, y) = (x as usize, y as usize);
        let [r, g, b] = image.get(x, y);
        *px = if mask.get(x, y) {
            Rgb([r, g, b])
        } else {
            Rgb([r / 10, g / 10, b / 10])
        };
    }
    out.save(path).map_err(|source| CosegError::Image {
        path: path.to_path_buf(),
        source,
    })
}

/// Serialize a value as pretty JSON to `path`, creating parent directories.
pub fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    ensure_parent_dir(path)?;
    let json = serde_json::to_string_pretty(value).map_err(|source| CosegError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, json).map_err(|e| CosegError::io(path, e))
}

pub(crate) fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| CosegError::io(parent, e))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_png_round_trips_through_segment_loader() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested/mask.png");
        let mask = Mask::from_fn(6, 4, |x, _| x < 3);
        save_mask_png(&mask, &path).expect("save");

        let seg = load_segment_resized(&path, (6, 4)).expect("load");
        assert_eq!(seg.get(0, 0), [255, 255, 255]);
        assert_eq!(seg.get(5, 3), [0, 0, 0]);
    }

    #[test]
    fn overlay_dims_pixels_outside_the_mask() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("overlay.png");
        let img = RgbImage::filled(4, 2, [200, 100, 55]);
        let mask = Mask::from_fn(4, 2, |x, _| x < 2);
        save_overlay_png(&img, &mask, &path).expect("save");

        let back = load_rgb_resized(&path, (4, 2)).expect("load");
        assert_eq!(back.get(0, 1), [200, 100, 55]);
        assert_eq!(back.get(3, 0), [20, 10, 5]);
        assert!(save_overlay_png(&img, &Mask::filled(2, 2, true), &path).is_err());
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load_rgb_resized(Path::new("/definitely/not/here.png"), (4, 4)).unwrap_err();
        assert!(err.to_string().contains("here.png"), "{err}");
    }
}
