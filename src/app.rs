//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - generates synthetic resonance samples
//! - runs rebin/normalize/fit per series
//! - prints reports/plots
//! - writes optional exports

use clap::Parser;

use crate::cli::{Command, CommonArgs, FitArgs, OverlayArgs};
use crate::domain::FitConfig;
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `respeaks` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Fit(args) => handle_fit(args),
        Command::Overlay(args) => handle_overlay(args),
    }
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let config = fit_config_from_args(vec![args.peak], &args.common);
    execute(&config)
}

fn handle_overlay(args: OverlayArgs) -> Result<(), AppError> {
    let config = fit_config_from_args(args.peaks, &args.common);
    execute(&config)
}

fn execute(config: &FitConfig) -> Result<(), AppError> {
    let run = pipeline::run(config)?;

    println!("{}", crate::report::format_run_summary(config));
    for series in &run.series {
        println!("{}", crate::report::format_series(series));
    }
    if run.series.len() > 1 {
        println!("{}", crate::report::format_overlay_table(&run.series));
    }

    if config.plot {
        let overlay = pipeline::build_overlay(&run.series);
        let plot =
            crate::plot::render_overlay_plot(&overlay, config.plot_width, config.plot_height);
        println!("{plot}");
    }

    if let Some(path) = &config.export {
        crate::io::write_results_json(path, config, &run.series)?;
        println!("Results written to {}", path.display());
    }

    Ok(())
}

pub fn fit_config_from_args(peaks: Vec<f64>, common: &CommonArgs) -> FitConfig {
    FitConfig {
        peaks,
        true_width: common.width,
        model: common.model,
        events: common.events,
        seed: common.seed,
        background_fraction: common.background,
        domain_min: common.domain_min,
        domain_max: common.domain_max,
        raw_bin_width: common.bin_width,
        target_bin_width: common.rebin,
        normalize: !common.no_normalize,
        max_iterations: common.iterations,
        min_window_bins: common.min_window_bins,
        scale_min: common.scale_min,
        scale_max: common.scale_max,
        plot: common.plot && !common.no_plot,
        plot_width: common.plot_width,
        plot_height: common.plot_height,
        export: common.export.clone(),
    }
}
