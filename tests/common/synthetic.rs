use cosegment::features::FeatureExtractor;
use cosegment::image::{Mask, RgbImage};
use cosegment::training::Sample;
use cosegment::Result;

/// Mean color in `[0, 1]`; a tiny deterministic embedding for small images.
pub struct MeanColor;

impl FeatureExtractor for MeanColor {
    fn extract(&self, img: &RgbImage) -> Result<Vec<f64>> {
        let n = img.data.len().max(1) as f64;
        let mut acc = [0.0f64; 3];
        for px in &img.data {
            for (a, &v) in acc.iter_mut().zip(px) {
                *a += v as f64 / 255.0;
            }
        }
        Ok(acc.iter().map(|a| a / n).collect())
    }
}

/// Uniform image with a mask covering the given columns.
pub fn solid(w: usize, h: usize, color: [u8; 3], fg_cols: std::ops::Range<usize>) -> Sample {
    let image = RgbImage::filled(w, h, color);
    let mask = Mask::from_fn(w, h, |x, _| fg_cols.contains(&x));
    Sample::fully_labeled(image, mask).expect("consistent shapes")
}

/// Image split vertically at `split`: `left` color on the left, `right` on the right.
pub fn two_tone(w: usize, h: usize, split: usize, left: [u8; 3], right: [u8; 3]) -> RgbImage {
    RgbImage::from_fn(w, h, |x, _| if x < split { left } else { right })
}

/// Square object of `fg` color on a `bg` background; the mask marks the square.
pub fn square_sample(size: usize, lo: usize, hi: usize, fg: [u8; 3], bg: [u8; 3]) -> Sample {
    let inside = |x: usize, y: usize| (lo..hi).contains(&x) && (lo..hi).contains(&y);
    let image = RgbImage::from_fn(size, size, |x, y| if inside(x, y) { fg } else { bg });
    let mask = Mask::from_fn(size, size, inside);
    Sample::fully_labeled(image, mask).expect("consistent shapes")
}

/// Small family of square samples with slightly varying colors.
pub fn square_family(count: usize, size: usize) -> Vec<Sample> {
    (0..count)
        .map(|k| {
            let k = k as u8;
            square_sample(
                size,
                size / 4,
                3 * size / 4,
                [200 + 5 * k, 30, 30],
                [30, 30 + 3 * k, 70 + 4 * k],
            )
        })
        .collect()
}
