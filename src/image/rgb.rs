//! Owned 3-channel 8-bit image in row-major layout.
use crate::error::{CosegError, Result};

/// Interleaved color image; channel order is whatever the loader produced
/// (RGB for [`crate::image::io`]).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RgbImage {
    /// Image width in pixels
    pub w: usize,
    /// Image height in pixels
    pub h: usize,
    /// Pixels in row-major order
    pub data: Vec<[u8; 3]>,
}

impl RgbImage {
    /// Wrap `data` as a `w × h` image, checking the pixel count.
    pub fn new(w: usize, h: usize, data: Vec<[u8; 3]>) -> Result<Self> {
        if data.len() != w * h {
            return Err(CosegError::invalid(
                "data",
                format!("expected {} pixels for {w}x{h}, got {}", w * h, data.len()),
            ));
        }
        Ok(Self { w, h, data })
    }

    /// Build from a tightly packed `[c0, c1, c2, c0, ...]` byte buffer.
    pub fn from_interleaved(w: usize, h: usize, raw: &[u8]) -> Result<Self> {
        if raw.len() != w * h * 3 {
            return Err(CosegError::invalid(
                "raw",
                format!("expected {} bytes for {w}x{h}x3, got {}", w * h * 3, raw.len()),
            ));
        }
        let data = raw.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect();
        Ok(Self { w, h, data })
    }

    /// Uniformly colored image.
    pub fn filled(w: usize, h: usize, color: [u8; 3]) -> Self {
        Self {
            w,
            h,
            data: vec![color; w * h],
        }
    }

    /// Build an image by evaluating `f(x, y)` for every pixel.
    pub fn from_fn(w: usize, h: usize, mut f: impl FnMut(usize, usize) -> [u8; 3]) -> Self {
        let mut data = Vec::with_capacity(w * h);
        for y in 0..h {
            for x in 0..w {
                data.push(f(x, y));
            }
        }
        Self { w, h, data }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> [u8; 3] {
        self.data[y * self.w + x]
    }
}

crate::image::traits::impl_owned_view!(RgbImage, [u8; 3]);
