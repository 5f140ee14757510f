use cosegment::config::ExperimentConfig;
use cosegment::dataset::load_samples;
use cosegment::diagnostics::TimingBreakdown;
use cosegment::experiment::{split_pairs, TrainedModel};
use cosegment::graphcut::{segment, Dinic};
use cosegment::image::io::{load_rgb_resized, save_mask_png, write_json_file};
use cosegment::search::SegmentParams;
use cosegment::svm::SmoOneClass;
use env_logger::{Builder, Env};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Trains on the experiment's training split and segments one new image.
#[derive(Debug, Deserialize)]
struct SegmentToolConfig {
    #[serde(flatten)]
    experiment: ExperimentConfig,
    target: TargetConfig,
}

#[derive(Debug, Deserialize)]
struct TargetConfig {
    input: PathBuf,
    mask_out: PathBuf,
    #[serde(default)]
    summary_json: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SegmentSummary {
    input: PathBuf,
    width: usize,
    height: usize,
    params: SegmentParams,
    support_count: usize,
    foreground_pixels: usize,
    timings: TimingBreakdown,
}

fn load_config(path: &Path) -> Result<SegmentToolConfig, String> {
    let data = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config {}: {e}", path.display()))?;
    serde_json::from_str(&data)
        .map_err(|e| format!("Failed to parse config {}: {e}", path.display()))
}

fn main() {
    Builder::from_env(Env::default().default_filter_or("info")).init();
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let config_path = env::args().nth(1).ok_or_else(usage)?;
    let config = load_config(Path::new(&config_path))?;
    let exp = &config.experiment;
    let workers = exp.runtime.workers;
    let params = exp.model.resolve(exp.profile);
    let mut timing = TimingBreakdown::default();

    let split = split_pairs(exp).map_err(|e| e.to_string())?;
    let train = load_samples(&split.train, exp.profile, workers).map_err(|e| e.to_string())?;
    let trained = TrainedModel::fit(
        &train,
        params,
        exp.output.kernel_cache.as_deref(),
        &SmoOneClass::default(),
        workers,
        &mut timing,
    )
    .map_err(|e| e.to_string())?;
    let model = trained.model().map_err(|e| e.to_string())?;

    let target = load_rgb_resized(&config.target.input, exp.profile.image_size())
        .map_err(|e| e.to_string())?;
    let mask = timing
        .measure("segment", || {
            let unary = model.unary_potentials(&target, params.segment.betas)?;
            segment(&target, &unary, params.segment.lambda, &Dinic)
        })
        .map_err(|e| e.to_string())?;
    save_mask_png(&mask, &config.target.mask_out).map_err(|e| e.to_string())?;
    timing.total_ms = timing.stages.iter().map(|s| s.elapsed_ms).sum();

    let summary = SegmentSummary {
        input: config.target.input.clone(),
        width: mask.w,
        height: mask.h,
        params: params.segment,
        support_count: trained.support.len(),
        foreground_pixels: mask.count(),
        timings: timing,
    };
    println!(
        "Segmented {} ({}x{}): {} foreground pixels, {} support vectors",
        summary.input.display(),
        summary.width,
        summary.height,
        summary.foreground_pixels,
        summary.support_count
    );
    println!("Mask written to {}", config.target.mask_out.display());
    if let Some(path) = &config.target.summary_json {
        write_json_file(path, &summary).map_err(|e| e.to_string())?;
        println!("JSON summary written to {}", path.display());
    }
    Ok(())
}

fn usage() -> String {
    "Usage: coseg_segment <config.json>".to_string()
}
