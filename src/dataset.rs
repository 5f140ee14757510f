//! Image/segment pairs on disk and their train/test/validation split.
use crate::config::DatasetProfile;
use crate::error::{CosegError, Result};
use crate::image::io::{load_rgb_resized, load_segment_resized};
use crate::parallel::{run_tasks, task_error};
use crate::training::Sample;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::fs;
use std::path::{Path, PathBuf};

/// Photo and the segment image holding its ground truth.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImagePair {
    pub image: PathBuf,
    pub segment: PathBuf,
}

/// Pairs under `root` for `profile`, sorted by image path.
///
/// Images without a segment file of the same stem are skipped.
pub fn list_pairs(root: &Path, profile: DatasetProfile) -> Result<Vec<ImagePair>> {
    let image_dir = root.join(profile.image_dir());
    let segment_dir = root.join(profile.segment_dir());
    let entries = fs::read_dir(&image_dir).map_err(|e| CosegError::io(&image_dir, e))?;

    let mut pairs = Vec::new();
    let mut skipped = 0usize;
    for entry in entries {
        let path = entry.map_err(|e| CosegError::io(&image_dir, e))?.path();
        if !path.is_file() {
            continue;
        }
        let Some(stem) = path.file_stem() else {
            continue;
        };
        let mut name = stem.to_os_string();
        name.push(".");
        name.push(profile.mask_extension());
        let segment = segment_dir.join(name);
        if segment.is_file() {
            pairs.push(ImagePair {
                image: path,
                segment,
            });
        } else {
            skipped += 1;
        }
    }
    pairs.sort_by(|a, b| a.image.cmp(&b.image));
    debug!(
        "{} pairs in {} ({skipped} images without segment)",
        pairs.len(),
        image_dir.display()
    );
    Ok(pairs)
}

/// Deterministic permutation of `items` for `seed`.
pub fn shuffle_seeded<T>(items: &mut [T], seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    items.shuffle(&mut rng);
}

/// Disjoint partitions, taken in the order train, test, validation.
#[derive(Clone, Debug, PartialEq)]
pub struct DatasetSplit<T> {
    pub train: Vec<T>,
    pub test: Vec<T>,
    pub valid: Vec<T>,
}

impl<T> DatasetSplit<T> {
    pub fn split(items: Vec<T>, n_train: usize, n_test: usize, n_valid: usize) -> Result<Self> {
        let needed = n_train + n_test + n_valid;
        if items.len() < needed {
            return Err(CosegError::Dataset(format!(
                "need {needed} pairs ({n_train} train, {n_test} test, {n_valid} valid), found {}",
                items.len()
            )));
        }
        let mut it = items.into_iter();
        let train = it.by_ref().take(n_train).collect();
        let test = it.by_ref().take(n_test).collect();
        let valid = it.take(n_valid).collect();
        Ok(Self { train, test, valid })
    }

    pub fn try_map<U>(self, mut f: impl FnMut(Vec<T>) -> Result<Vec<U>>) -> Result<DatasetSplit<U>> {
        Ok(DatasetSplit {
            train: f(self.train)?,
            test: f(self.test)?,
            valid: f(self.valid)?,
        })
    }
}

/// Load one pair at the profile's canonical size.
pub fn load_sample(pair: &ImagePair, profile: DatasetProfile) -> Result<Sample> {
    let size = profile.image_size();
    let image = load_rgb_resized(&pair.image, size)?;
    let segment = load_segment_resized(&pair.segment, size)?;
    Sample::new(
        image,
        profile.decode_mask(&segment),
        profile.labeled_region(&segment),
    )
}

/// Load `pairs` on `workers` threads, keeping their order.
pub fn load_samples(
    pairs: &[ImagePair],
    profile: DatasetProfile,
    workers: usize,
) -> Result<Vec<Sample>> {
    let samples = run_tasks(workers, pairs, |pair| {
        load_sample(pair, profile).map_err(|e| task_error(pair.image.display().to_string(), e))
    })?;
    info!("loaded {} {:?} samples", samples.len(), profile);
    Ok(samples)
}
