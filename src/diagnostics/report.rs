use crate::config::{DatasetProfile, ModelParams};
use crate::diagnostics::TimingBreakdown;
use crate::kernels::KernelSource;
use crate::metrics::Accuracy;
use crate::search::{SearchOutcome, SegmentParams};
use serde::Serialize;
use std::path::PathBuf;

/// Result of [`run_experiment`](crate::experiment::run_experiment), written as JSON.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentReport {
    pub profile: DatasetProfile,
    pub split: SplitSizes,
    /// Parameters the model was trained with.
    pub model: ModelParams,
    pub training: TrainingStage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<SearchOutcome>,
    /// Parameters the test set was segmented with.
    pub selected: SegmentParams,
    pub test: TestStage,
    pub timings: TimingBreakdown,
}

#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitSizes {
    pub train: usize,
    pub test: usize,
    pub valid: usize,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingStage {
    pub support_count: usize,
    pub support_indices: Vec<usize>,
    pub rho: f64,
    /// Largest `|g_ij − g_ji|` of the Gram matrix.
    pub gram_asymmetry: f64,
    pub kernel_source: KernelSource,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestStage {
    pub mean: Accuracy,
    pub score: f64,
    pub images: Vec<ImageScore>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageScore {
    pub image: PathBuf,
    pub accuracy: Accuracy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mask_path: Option<PathBuf>,
}

impl ExperimentReport {
    /// One-line human summary for tool output.
    pub fn summary(&self) -> String {
        format!(
            "{:?}: support={} s_a={:.4} s_o={:.4} beta1={} beta3={} lambda={} total_ms={:.1}",
            self.profile,
            self.training.support_count,
            self.test.mean.pixel,
            self.test.mean.overlap,
            self.selected.betas.beta1,
            self.selected.betas.beta3,
            self.selected.lambda,
            self.timings.total_ms
        )
    }
}
