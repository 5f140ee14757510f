//! End-to-end experiment: load, train, sweep, test, report.
//!
//! ```text
//! pairs ─ split ─┬─ train ─ TrainingSet ─ kernels (cache) ─ gram ─ SVM ─┐
//!                ├─ valid ───────────────────────────── cross_validate ─┤
//!                └─ test ─────────────────────────────────── segment ───┴─ report
//! ```
use crate::config::{DatasetProfile, ExperimentConfig, ModelParams};
use crate::dataset::{list_pairs, load_samples, shuffle_seeded, DatasetSplit, ImagePair};
use crate::diagnostics::{
    elapsed_ms, ExperimentReport, ImageScore, SplitSizes, TestStage, TimingBreakdown,
    TrainingStage,
};
use crate::error::{CosegError, Result};
use crate::features::HogDescriptor;
use crate::gram::gram;
use crate::graphcut::{Dinic, MaxFlowSolver};
use crate::image::Mask;
use crate::image::io::{save_mask_png, save_overlay_png, write_json_file};
use crate::kernels::{compute_kernels, load_or_compute, KernelSource};
use crate::metrics::Accuracy;
use crate::parallel::{run_tasks, task_error};
use crate::potentials::SupportModel;
use crate::search::{cross_validate, segment_sample, SegmentParams};
use crate::svm::{OneClassSolver, SmoOneClass, SupportVectorSet};
use crate::training::{Sample, TrainingSet};
use log::info;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Training set with its descriptor and the fitted support set.
pub struct TrainedModel {
    pub set: TrainingSet,
    pub descriptor: HogDescriptor,
    pub support: SupportVectorSet,
    pub params: ModelParams,
    pub kernel_source: KernelSource,
    pub gram_asymmetry: f64,
}

impl TrainedModel {
    /// Build the training set, evaluate (or reuse) the kernels and fit the SVM.
    pub fn fit(
        samples: &[Sample],
        params: ModelParams,
        kernel_cache: Option<&Path>,
        solver: &dyn OneClassSolver,
        workers: usize,
        timing: &mut TimingBreakdown,
    ) -> Result<Self> {
        let first = samples
            .first()
            .ok_or_else(|| CosegError::Dataset("no training samples".to_string()))?;
        let descriptor = HogDescriptor::for_image(first.image.w, first.image.h)?;

        let set = timing.measure("training set", || {
            TrainingSet::build(samples, params.qbins, &descriptor, workers)
        })?;
        let (kernels, kernel_source) = timing.measure("kernels", || match kernel_cache {
            Some(path) => load_or_compute(path, &set, params.sigma, workers),
            None => {
                compute_kernels(&set, params.sigma, workers).map(|k| (k, KernelSource::Computed))
            }
        })?;
        let gram = gram(&kernels, params.segment.betas);
        let gram_asymmetry = gram.asymmetry();
        let support = timing.measure("svm", || solver.fit(&gram, params.nu))?;
        info!(
            "trained on {} images: {} support vectors ({:?} kernels)",
            set.len(),
            support.len(),
            kernel_source
        );

        Ok(Self {
            set,
            descriptor,
            support,
            params,
            kernel_source,
            gram_asymmetry,
        })
    }

    /// Potential builder borrowing this model.
    pub fn model(&self) -> Result<SupportModel<'_>> {
        SupportModel::new(
            &self.set,
            &self.descriptor,
            self.support.clone(),
            self.params.sigma,
        )
    }
}

/// Sorted (and optionally shuffled) pairs split train/test/validation.
pub fn split_pairs(config: &ExperimentConfig) -> Result<DatasetSplit<ImagePair>> {
    let mut pairs = list_pairs(&config.data_root, config.profile)?;
    if config.split.shuffle {
        shuffle_seeded(&mut pairs, config.split.seed);
    }
    let s = &config.split;
    DatasetSplit::split(pairs, s.n_train, s.n_test, s.n_valid)
}

fn mask_file(dir: &Path, image: &Path, suffix: &str) -> PathBuf {
    let stem = image.file_stem().unwrap_or(image.as_os_str());
    let mut name = stem.to_os_string();
    name.push(suffix);
    name.push(".png");
    dir.join(name)
}

/// Predicted mask plus prediction and ground-truth overlays for one image.
fn save_outputs(dir: &Path, pair: &ImagePair, sample: &Sample, pred: &Mask) -> Result<PathBuf> {
    let path = mask_file(dir, &pair.image, "");
    save_mask_png(pred, &path)?;
    save_overlay_png(&sample.image, pred, &mask_file(dir, &pair.image, "_pred"))?;
    save_overlay_png(&sample.image, &sample.mask, &mask_file(dir, &pair.image, "_truth"))?;
    Ok(path)
}

/// Segment and score the test samples.
///
/// With `mask_dir` set, each image gets `<stem>.png` (binary mask) plus
/// `<stem>_pred.png` and `<stem>_truth.png`, the photo dimmed outside the
/// predicted and the true foreground.
pub fn test_model(
    model: &SupportModel<'_>,
    pairs: &[ImagePair],
    samples: &[Sample],
    params: &SegmentParams,
    solver: &dyn MaxFlowSolver,
    mask_dir: Option<&Path>,
    workers: usize,
) -> Result<TestStage> {
    if samples.is_empty() {
        return Err(CosegError::Dataset("test split is empty".to_string()));
    }
    let tasks: Vec<(&ImagePair, &Sample)> = pairs.iter().zip(samples).collect();
    let images = run_tasks(workers, &tasks, |&(pair, sample)| {
        let label = pair.image.display().to_string();
        let pred = segment_sample(model, sample, params, solver)
            .map_err(|e| task_error(label.clone(), e))?;
        let accuracy = Accuracy::measure(&pred, &sample.mask, &sample.labeled)
            .map_err(|e| task_error(label.clone(), e))?;
        let mask_path = match mask_dir {
            Some(dir) => Some(
                save_outputs(dir, pair, sample, &pred).map_err(|e| task_error(label, e))?,
            ),
            None => None,
        };
        Ok(ImageScore {
            image: pair.image.clone(),
            accuracy,
            mask_path,
        })
    })?;
    let per_image: Vec<Accuracy> = images.iter().map(|s| s.accuracy).collect();
    let mean = Accuracy::mean(&per_image);
    Ok(TestStage {
        mean,
        score: mean.score(),
        images,
    })
}

fn load_split(
    split: DatasetSplit<ImagePair>,
    profile: DatasetProfile,
    workers: usize,
) -> Result<(DatasetSplit<ImagePair>, DatasetSplit<Sample>)> {
    let samples = split
        .clone()
        .try_map(|pairs| load_samples(&pairs, profile, workers))?;
    Ok((split, samples))
}

/// Run the configured experiment and write its JSON report.
pub fn run_experiment(config: &ExperimentConfig) -> Result<ExperimentReport> {
    let t0 = Instant::now();
    let mut timing = TimingBreakdown::default();
    let workers = config.runtime.workers;
    if config.split.n_test == 0 {
        return Err(CosegError::Dataset(
            "n_test must be positive to score the model".to_string(),
        ));
    }
    let params = config.model.resolve(config.profile);
    info!("{:?} experiment with {params:?}", config.profile);

    let split = timing.measure("split", || split_pairs(config))?;
    let (pairs, samples) =
        timing.measure("load", || load_split(split, config.profile, workers))?;

    let smo = SmoOneClass::default();
    let trained = TrainedModel::fit(
        &samples.train,
        params,
        config.output.kernel_cache.as_deref(),
        &smo,
        workers,
        &mut timing,
    )?;
    let model = trained.model()?;
    let solver = Dinic;

    let search = if samples.valid.is_empty() || config.search.is_empty() {
        info!("no validation candidates; keeping base parameters");
        None
    } else {
        Some(timing.measure("cross validation", || {
            cross_validate(
                &model,
                &samples.valid,
                params.segment,
                &config.search,
                &solver,
                workers,
            )
        })?)
    };
    let selected = search.as_ref().map_or(params.segment, |s| s.selected);

    let test = timing.measure("test", || {
        test_model(
            &model,
            &pairs.test,
            &samples.test,
            &selected,
            &solver,
            config.output.mask_dir.as_deref(),
            workers,
        )
    })?;
    timing.total_ms = elapsed_ms(t0);

    let report = ExperimentReport {
        profile: config.profile,
        split: SplitSizes {
            train: samples.train.len(),
            test: samples.test.len(),
            valid: samples.valid.len(),
        },
        model: params,
        training: TrainingStage {
            support_count: trained.support.len(),
            support_indices: trained.support.indices.clone(),
            rho: trained.support.rho,
            gram_asymmetry: trained.gram_asymmetry,
            kernel_source: trained.kernel_source,
        },
        search,
        selected,
        test,
        timings: timing,
    };
    write_json_file(&config.output.report_json, &report)?;
    info!("{}", report.summary());
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_test_split_is_rejected() {
        let json = r#"{
            "profile": "flowers",
            "data_root": "/nonexistent",
            "split": { "n_test": 0 },
            "output": { "report_json": "unused.json" }
        }"#;
        let config: ExperimentConfig = serde_json::from_str(json).unwrap();
        let err = run_experiment(&config).unwrap_err();
        assert!(matches!(err, CosegError::Dataset(_)), "{err}");
        assert!(err.to_string().contains("n_test"), "{err}");
    }

    #[test]
    fn output_names_keep_the_image_stem() {
        let dir = Path::new("out");
        let image = Path::new("photos/image_0003.v2.jpg");
        assert_eq!(mask_file(dir, image, ""), Path::new("out/image_0003.v2.png"));
        assert_eq!(mask_file(dir, image, "_truth"), Path::new("out/image_0003.v2_truth.png"));
    }
}
