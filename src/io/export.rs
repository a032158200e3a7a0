//! Write run results to a JSON file.
//!
//! The export is the "portable" representation of a run:
//! - run metadata (tool, timestamp, model, rebin target)
//! - per-series fit results (parameters, errors, windows, flags)
//! - a precomputed fitted-curve grid for quick downstream plotting
//!
//! Histogram *input* I/O stays with the external store; only computed
//! results leave this process.

use std::fs::File;
use std::path::Path;

use chrono::Local;
use serde::Serialize;

use crate::app::pipeline::SeriesOutput;
use crate::domain::{CurveGrid, FitConfig, FitResult, ModelKind};
use crate::error::AppError;
use crate::models::evaluate;

#[derive(Serialize)]
struct ResultsFile<'a> {
    tool: &'static str,
    generated: String,
    model: ModelKind,
    target_bin_width: f64,
    normalized: bool,
    series: Vec<SeriesRecord<'a>>,
}

#[derive(Serialize)]
struct SeriesRecord<'a> {
    label: &'a str,
    n_bins: usize,
    bin_width: f64,
    integral: f64,
    rebin_factor: usize,
    truncated_bins: usize,
    fit: &'a FitResult,
    curve: CurveGrid,
}

/// Write per-series fit results and sampled curves to a JSON file.
pub fn write_results_json(
    path: &Path,
    config: &FitConfig,
    series: &[SeriesOutput],
) -> Result<(), AppError> {
    let file = File::create(path).map_err(|e| {
        AppError::usage(format!(
            "Failed to create results JSON '{}': {e}",
            path.display()
        ))
    })?;

    let records: Vec<SeriesRecord<'_>> = series
        .iter()
        .map(|s| {
            let (lo, hi) = s.dist.domain();
            SeriesRecord {
                label: &s.label,
                n_bins: s.dist.n_bins(),
                bin_width: s.dist.bin_width(),
                integral: s.dist.integral(),
                rebin_factor: s.rebin_factor,
                truncated_bins: s.truncated_bins,
                fit: &s.fit,
                curve: sample_curve(&s.fit, lo, hi, 101),
            }
        })
        .collect();

    let results = ResultsFile {
        tool: "respeaks",
        generated: Local::now().to_rfc3339(),
        model: config.model,
        target_bin_width: config.target_bin_width,
        normalized: config.normalize,
        series: records,
    };

    serde_json::to_writer_pretty(file, &results)
        .map_err(|e| AppError::usage(format!("Failed to write results JSON: {e}")))?;

    Ok(())
}

/// Sample the fitted curve on a regular grid over `[lo, hi]`.
fn sample_curve(fit: &FitResult, lo: f64, hi: f64, n: usize) -> CurveGrid {
    let n = n.max(2);
    let params = fit.params_vec();
    let mut x = Vec::with_capacity(n);
    let mut y = Vec::with_capacity(n);
    for i in 0..n {
        let u = i as f64 / (n as f64 - 1.0);
        let xi = lo + u * (hi - lo);
        x.push(xi);
        y.push(evaluate(fit.model, xi, &params));
    }
    CurveGrid { x, y }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::pipeline;

    #[test]
    fn exported_json_round_trips_key_fields() {
        let config = FitConfig {
            peaks: vec![2000.0],
            true_width: 150.0,
            model: ModelKind::Gaussian,
            events: 10_000,
            seed: 3,
            background_fraction: 0.0,
            domain_min: 0.0,
            domain_max: 4000.0,
            raw_bin_width: 20.0,
            target_bin_width: 100.0,
            normalize: true,
            max_iterations: 3,
            min_window_bins: 3,
            scale_min: 10.0,
            scale_max: 1000.0,
            plot: false,
            plot_width: 80,
            plot_height: 20,
            export: None,
        };
        let out = pipeline::run(&config).unwrap();

        let path = std::env::temp_dir().join(format!(
            "res-peaks-export-test-{}.json",
            std::process::id()
        ));
        write_results_json(&path, &config, &out.series).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(value["tool"], "respeaks");
        assert_eq!(value["model"], "gaussian");
        let series = value["series"].as_array().unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0]["label"], "m=2000");
        assert_eq!(series[0]["curve"]["x"].as_array().unwrap().len(), 101);
        assert!(series[0]["fit"]["parameters"]["mean"].as_f64().unwrap() > 0.0);
    }
}
