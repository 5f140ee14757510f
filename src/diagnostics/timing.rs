use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Wall-clock time spent in one named stage of an experiment run.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageTiming {
    pub label: String,
    pub elapsed_ms: f64,
}

impl StageTiming {
    pub fn new(label: impl Into<String>, elapsed_ms: f64) -> Self {
        Self {
            label: label.into(),
            elapsed_ms,
        }
    }
}

/// Ordered stage timings of a run plus the total.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingBreakdown {
    pub total_ms: f64,
    pub stages: Vec<StageTiming>,
}

impl TimingBreakdown {
    pub fn push(&mut self, label: impl Into<String>, elapsed_ms: f64) {
        self.stages.push(StageTiming::new(label, elapsed_ms));
    }

    /// Run `f`, record its duration under `label` and pass its result through.
    pub fn measure<T>(&mut self, label: impl Into<String>, f: impl FnOnce() -> T) -> T {
        let t0 = Instant::now();
        let out = f();
        self.push(label, elapsed_ms(t0));
        out
    }

    pub fn stage(&self, label: &str) -> Option<&StageTiming> {
        self.stages.iter().find(|s| s.label == label)
    }
}

/// Milliseconds since `t0`.
pub fn elapsed_ms(t0: Instant) -> f64 {
    t0.elapsed().as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn measure_records_stage_and_returns_value() {
        let mut timing = TimingBreakdown::default();
        let v = timing.measure("kernels", || 41 + 1);
        assert_eq!(v, 42);
        let stage = timing.stage("kernels").expect("stage recorded");
        assert!(stage.elapsed_ms >= 0.0);
        assert!(timing.stage("svm").is_none());
    }

    #[test]
    fn serializes_in_camel_case() {
        let mut timing = TimingBreakdown::default();
        timing.push("gram", 1.5);
        timing.total_ms = 2.0;
        let json = serde_json::to_string(&timing).unwrap();
        assert!(json.contains("\"totalMs\":2.0"), "{json}");
        assert!(json.contains("\"elapsedMs\":1.5"), "{json}");
    }
}
