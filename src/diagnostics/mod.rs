//! Serializable run reports and stage timings.

pub mod report;
pub mod timing;

pub use report::{ExperimentReport, ImageScore, SplitSizes, TestStage, TrainingStage};
pub use timing::{elapsed_ms, StageTiming, TimingBreakdown};
