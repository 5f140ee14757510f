use super::profile::DatasetProfile;
use crate::error::{CosegError, Result};
use crate::gram::Betas;
use crate::search::{SearchCandidates, SegmentParams};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ExperimentConfig {
    pub profile: DatasetProfile,
    /// Directory holding the profile's image and segment directories.
    pub data_root: PathBuf,
    #[serde(default)]
    pub split: SplitConfig,
    #[serde(default)]
    pub model: ModelOverrides,
    #[serde(default)]
    pub search: SearchCandidates,
    #[serde(default)]
    pub runtime: RuntimeConfig,
    pub output: OutputConfig,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct SplitConfig {
    pub n_train: usize,
    pub n_test: usize,
    pub n_valid: usize,
    /// Shuffle the sorted pairs before splitting.
    pub shuffle: bool,
    pub seed: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            n_train: 50,
            n_test: 50,
            n_valid: 50,
            shuffle: true,
            seed: 20,
        }
    }
}

/// Optional overrides of the profile defaults.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ModelOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qbins: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sigma: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nu: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub betas: Option<Betas>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lambda: Option<f64>,
}

/// Fully resolved model parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelParams {
    pub qbins: u32,
    pub sigma: f64,
    pub nu: f64,
    pub segment: SegmentParams,
}

impl ModelOverrides {
    pub fn resolve(&self, profile: DatasetProfile) -> ModelParams {
        let d = profile.defaults();
        ModelParams {
            qbins: self.qbins.unwrap_or(d.qbins),
            sigma: self.sigma.unwrap_or(d.sigma),
            nu: self.nu.unwrap_or(d.nu),
            segment: SegmentParams {
                betas: self.betas.unwrap_or(d.betas),
                lambda: self.lambda.unwrap_or(d.lambda),
            },
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Worker threads for kernel rows and the sweep; `0` uses every core.
    pub workers: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self { workers: 4 }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct OutputConfig {
    pub report_json: PathBuf,
    #[serde(default)]
    pub kernel_cache: Option<PathBuf>,
    /// Predicted test masks are written here as PNG when set.
    #[serde(default)]
    pub mask_dir: Option<PathBuf>,
}

pub fn load_config(path: &Path) -> Result<ExperimentConfig> {
    let data = fs::read_to_string(path).map_err(|e| CosegError::io(path, e))?;
    serde_json::from_str(&data).map_err(|source| CosegError::Json {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_takes_profile_defaults() {
        let json = r#"{
            "profile": "flowers",
            "data_root": "/data",
            "output": { "report_json": "out/report.json" }
        }"#;
        let cfg: ExperimentConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.split.seed, 20);
        assert_eq!(cfg.runtime.workers, 4);
        assert_eq!(cfg.search.lambda, vec![0.1, 0.2]);
        let params = cfg.model.resolve(cfg.profile);
        assert_eq!(params.qbins, 16);
        assert_eq!(params.nu, 0.45);
        assert_eq!(params.segment.betas, Betas::new(0.2, 1.0, 0.16));
    }

    #[test]
    fn overrides_replace_single_values() {
        let json = r#"{
            "profile": "horses",
            "data_root": "/data",
            "model": { "lambda": 0.5, "qbins": 8 },
            "split": { "n_train": 10 },
            "output": { "report_json": "r.json", "kernel_cache": "k.json" }
        }"#;
        let cfg: ExperimentConfig = serde_json::from_str(json).unwrap();
        let params = cfg.model.resolve(cfg.profile);
        assert_eq!(params.segment.lambda, 0.5);
        assert_eq!(params.qbins, 8);
        assert_eq!(params.nu, 0.24);
        assert_eq!(cfg.split.n_train, 10);
        assert_eq!(cfg.split.n_valid, 50);
        assert!(cfg.output.kernel_cache.is_some());
    }
}
