//! Joint color quantization.
//!
//! Each 8-bit channel is split into `qbins` uniform levels and the three
//! levels are combined into a single mixed-radix bin index:
//!
//! `index = Σ_c floor(qbins · v_c / 256) · qbins^c`
//!
//! so every index lies in `[0, qbins³)`.
use crate::error::{CosegError, Result};
use crate::image::{ImageView, RgbImage};

/// Normalization base for byte channels (max representable value + 1).
const CHANNEL_BASE: u32 = u8::MAX as u32 + 1;

/// Grid of joint color bins, same shape as the source image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuantizedImage {
    pub w: usize,
    pub h: usize,
    /// Levels per channel used to build the indices.
    pub qbins: u32,
    pub data: Vec<u32>,
}

impl QuantizedImage {
    /// Total number of joint bins (`qbins³`).
    pub fn total_bins(&self) -> usize {
        total_bins(self.qbins)
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u32 {
        self.data[y * self.w + x]
    }
}

crate::image::traits::impl_owned_view!(QuantizedImage, u32);

/// `qbins³`, the histogram length for a given per-channel level count.
pub fn total_bins(qbins: u32) -> usize {
    let q = qbins as usize;
    q * q * q
}

/// Bin index of a single pixel.
#[inline]
pub fn quantize_pixel(px: [u8; 3], qbins: u32) -> u32 {
    let mut index = 0u32;
    let mut radix = 1u32;
    for &v in &px {
        let level = qbins * v as u32 / CHANNEL_BASE;
        index += level * radix;
        radix *= qbins;
    }
    index
}

/// Quantize every pixel of `image` into `qbins` levels per channel.
pub fn quantize(image: &RgbImage, qbins: u32) -> Result<QuantizedImage> {
    if qbins == 0 {
        return Err(CosegError::invalid("qbins", "must be positive"));
    }
    // qbins³ must fit the u32 index space.
    if (qbins as u64).pow(3) > u32::MAX as u64 {
        return Err(CosegError::invalid("qbins", format!("{qbins}³ bins overflow")));
    }
    let data = image
        .as_slice()
        .iter()
        .map(|&px| quantize_pixel(px, qbins))
        .collect();
    Ok(QuantizedImage {
        w: image.w,
        h: image.h,
        qbins,
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_stay_below_total_bins() {
        for qbins in [1u32, 2, 3, 7, 16] {
            let img = RgbImage::from_fn(16, 16, |x, y| {
                [(x * 17) as u8, (y * 16) as u8, ((x + y) * 8) as u8]
            });
            let q = quantize(&img, qbins).unwrap();
            let total = total_bins(qbins) as u32;
            assert!(q.data.iter().all(|&b| b < total), "qbins={qbins}");
        }
        let extremes = RgbImage::new(2, 1, vec![[0, 0, 0], [255, 255, 255]]).unwrap();
        let q = quantize(&extremes, 16).unwrap();
        assert_eq!(q.data, vec![0, 16 * 16 * 16 - 1]);
    }

    #[test]
    fn same_bucket_assignment_gives_same_index() {
        // 0..=127 and 128..=255 fall into the two buckets when qbins = 2.
        assert_eq!(quantize_pixel([0, 130, 255], 2), quantize_pixel([127, 200, 128], 2));
        assert_eq!(quantize_pixel([0, 130, 255], 2), 6);
        assert_ne!(quantize_pixel([128, 0, 0], 2), quantize_pixel([0, 128, 0], 2));
    }

    #[test]
    fn zero_bins_are_rejected() {
        let img = RgbImage::filled(2, 2, [1, 2, 3]);
        assert!(quantize(&img, 0).is_err());
    }
}
