//! JSON configuration of the experiment tools.

pub mod experiment;
pub mod profile;

pub use experiment::{
    load_config, ExperimentConfig, ModelOverrides, ModelParams, OutputConfig, RuntimeConfig,
    SplitConfig,
};
pub use profile::{DatasetProfile, ProfileDefaults};
