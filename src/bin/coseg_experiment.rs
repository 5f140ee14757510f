use cosegment::config::load_config;
use cosegment::experiment::run_experiment;
use env_logger::{Builder, Env};
use std::env;
use std::path::Path;

fn main() {
    Builder::from_env(Env::default().default_filter_or("info")).init();
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let config_path = env::args().nth(1).ok_or_else(usage)?;
    let config = load_config(Path::new(&config_path)).map_err(|e| e.to_string())?;

    let report = run_experiment(&config).map_err(|e| e.to_string())?;

    println!("Experiment summary");
    println!("  profile: {:?}", report.profile);
    println!(
        "  split: train={} test={} valid={}",
        report.split.train, report.split.test, report.split.valid
    );
    println!(
        "  support vectors: {} (rho={:.4}, kernels {:?})",
        report.training.support_count, report.training.rho, report.training.kernel_source
    );
    if let Some(search) = &report.search {
        for c in &search.candidates {
            println!(
                "  candidate {:?}={:<6} s_a={:.4} s_o={:.4} score={:.4}",
                c.family, c.value, c.accuracy.pixel, c.accuracy.overlap, c.score
            );
        }
    }
    println!(
        "  selected: beta1={} beta2={} beta3={} lambda={}",
        report.selected.betas.beta1,
        report.selected.betas.beta2,
        report.selected.betas.beta3,
        report.selected.lambda
    );
    println!(
        "  test: s_a={:.4} s_o={:.4} over {} images",
        report.test.mean.pixel,
        report.test.mean.overlap,
        report.test.images.len()
    );
    for stage in &report.timings.stages {
        println!("  {:<18} {:>10.1} ms", stage.label, stage.elapsed_ms);
    }
    println!("JSON report written to {}", config.output.report_json.display());
    Ok(())
}

fn usage() -> String {
    "Usage: coseg_experiment <config.json>".to_string()
}
