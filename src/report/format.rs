//! Formatted terminal output for fit runs.
//!
//! We keep formatting code in one place so:
//! - the math/fitting code stays clean and testable
//! - output changes are localized (important for future snapshot tests)

use crate::app::pipeline::SeriesOutput;
use crate::domain::{FitConfig, FitFlag};

/// Format the run header (configuration echo).
pub fn format_run_summary(config: &FitConfig) -> String {
    let mut out = String::new();

    out.push_str("=== respeaks - resonance peak fit ===\n");
    out.push_str(&format!("Model: {}\n", config.model.display_name()));
    out.push_str(&format!(
        "Peaks: {} | true width: {:.1}\n",
        fmt_vec(&config.peaks),
        config.true_width
    ));
    out.push_str(&format!(
        "Sample: n={} events | background={:.1}% | seed={}\n",
        config.events,
        100.0 * config.background_fraction,
        config.seed
    ));
    out.push_str(&format!(
        "Domain: [{:.0}, {:.0}] | raw bin width {:.1} -> target {:.1} | normalize={}\n",
        config.domain_min,
        config.domain_max,
        config.raw_bin_width,
        config.target_bin_width,
        config.normalize
    ));
    out.push_str(&format!(
        "Engine: {} narrowing iterations | min window bins {} | scale bounds [{:.0}, {:.0}]\n",
        config.max_iterations, config.min_window_bins, config.scale_min, config.scale_max
    ));

    out
}

/// Format the detailed per-series diagnostics block.
pub fn format_series(s: &SeriesOutput) -> String {
    let mut out = String::new();
    let fit = &s.fit;
    let scale_name = fit.model.scale_name();

    out.push_str(&format!("--- {} ---\n", s.label));
    out.push_str(&format!(
        "Bins: {} raw -> {} fitted (factor {})",
        s.raw_bins,
        s.dist.n_bins(),
        s.rebin_factor
    ));
    if s.truncated_bins > 0 {
        out.push_str(&format!(
            " | warning: {} trailing raw bin(s) truncated",
            s.truncated_bins
        ));
    }
    out.push('\n');
    if s.skipped_zero_integral {
        out.push_str("Normalization skipped: zero integral.\n");
    }

    out.push_str(&format!(
        "mean = {:.2} +/- {:.2}, {} = {:.2} +/- {:.2}, resolution ({}/mean) = {:.4}\n",
        fit.mean(),
        fit.parameter_errors.get("mean").copied().unwrap_or(f64::NAN),
        scale_name,
        fit.scale(),
        fit.scale_error(),
        scale_name,
        fit.resolution
    ));
    out.push_str(&format!(
        "chi2/ndf = {:.3e} ({} points) | converged = {} | iterations = {}\n",
        fit.quality.reduced_chi2, fit.quality.n_points, fit.converged, fit.iterations_used
    ));
    out.push_str(&format!(
        "final window = [{:.1}, {:.1}]\n",
        fit.final_window.low, fit.final_window.high
    ));
    if !fit.flags.is_empty() {
        out.push_str(&format!("flags: {}\n", fmt_flags(&fit.flags)));
    }

    out
}

/// Format the aligned comparison table across all overlay members.
pub fn format_overlay_table(series: &[SeriesOutput]) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "{:<12} {:>10} {:>10} {:>10} {:>6} {:>6}  flags\n",
        "series", "mean", "width", "res", "conv", "iters"
    ));
    for s in series {
        out.push_str(&format!(
            "{:<12} {:>10.2} {:>10.2} {:>10.4} {:>6} {:>6}  {}\n",
            s.label,
            s.fit.mean(),
            s.fit.scale(),
            s.fit.resolution,
            if s.fit.converged { "yes" } else { "no" },
            s.fit.iterations_used,
            fmt_flags(&s.fit.flags)
        ));
    }

    out
}

fn fmt_flags(flags: &[FitFlag]) -> String {
    if flags.is_empty() {
        return "-".to_string();
    }
    let parts: Vec<&str> = flags
        .iter()
        .map(|f| match f {
            FitFlag::ZeroIntegral => "zero-integral",
            FitFlag::NonConvergence => "non-convergence",
            FitFlag::DegenerateWindow => "degenerate-window",
            FitFlag::ClampedInitialScale => "clamped-initial-scale",
            FitFlag::UndefinedResolution => "undefined-resolution",
        })
        .collect();
    parts.join(",")
}

fn fmt_vec(values: &[f64]) -> String {
    let parts: Vec<String> = values.iter().map(|v| format!("{v:.0}")).collect();
    format!("[{}]", parts.join(", "))
}
