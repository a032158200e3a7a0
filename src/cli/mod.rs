//! Command-line parsing for the resonance peak fitter.
//!
//! The goal of this module is to keep **argument parsing** and **command
//! dispatch** separate from the modeling/math code.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::ModelKind;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "respeaks",
    version,
    about = "Iterative resonance peak fitter with normalized overlay comparison"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit a single synthetic peak and print full diagnostics.
    Fit(FitArgs),
    /// Fit several peak hypotheses and compare them side by side.
    Overlay(OverlayArgs),
}

/// Single-peak fit.
#[derive(Debug, Parser, Clone)]
pub struct FitArgs {
    /// True peak location for the generated sample.
    #[arg(long, default_value_t = 2000.0)]
    pub peak: f64,

    #[command(flatten)]
    pub common: CommonArgs,
}

/// Multi-peak overlay comparison.
#[derive(Debug, Parser, Clone)]
pub struct OverlayArgs {
    /// Peak location hypotheses, one series each (draw order = list order).
    #[arg(long = "peaks", num_args = 1.., default_values_t = [1000.0, 2000.0, 3000.0])]
    pub peaks: Vec<f64>,

    #[command(flatten)]
    pub common: CommonArgs,
}

/// Options shared by both commands.
#[derive(Debug, Parser, Clone)]
pub struct CommonArgs {
    /// Peak shape to generate and fit.
    #[arg(long, value_enum, default_value_t = ModelKind::Gaussian)]
    pub model: ModelKind,

    /// True peak scale for sample generation (sigma or FWHM).
    #[arg(long, default_value_t = 150.0)]
    pub width: f64,

    /// Events per generated sample.
    #[arg(short = 'n', long, default_value_t = 50_000)]
    pub events: usize,

    /// Base random seed (each series derives its own stream).
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Flat background fraction in [0, 1).
    #[arg(long, default_value_t = 0.10)]
    pub background: f64,

    /// Lower domain bound.
    #[arg(long, default_value_t = 0.0)]
    pub domain_min: f64,

    /// Upper domain bound.
    #[arg(long, default_value_t = 4000.0)]
    pub domain_max: f64,

    /// Raw histogram bin width.
    #[arg(long, default_value_t = 20.0)]
    pub bin_width: f64,

    /// Target bin width for rebinning before the fit.
    #[arg(long, default_value_t = 100.0)]
    pub rebin: f64,

    /// Skip unit-integral normalization.
    #[arg(long)]
    pub no_normalize: bool,

    /// Number of window-narrowing iterations.
    #[arg(long, default_value_t = 3)]
    pub iterations: usize,

    /// Minimum bins a narrowed window must hold.
    #[arg(long, default_value_t = 3)]
    pub min_window_bins: usize,

    /// Lower bound on the initial scale guess.
    #[arg(long, default_value_t = 10.0)]
    pub scale_min: f64,

    /// Upper bound on the initial scale guess.
    #[arg(long, default_value_t = 1000.0)]
    pub scale_max: f64,

    /// Render an ASCII plot in the terminal (enabled by default).
    #[arg(long, default_value_t = true)]
    pub plot: bool,

    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub plot_width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub plot_height: usize,

    /// Export per-series results to JSON.
    #[arg(long)]
    pub export: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn overlay_accepts_multiple_peaks() {
        let cli = Cli::parse_from([
            "respeaks", "overlay", "--peaks", "1200", "2400", "--model", "breit-wigner",
        ]);
        match cli.command {
            Command::Overlay(args) => {
                assert_eq!(args.peaks, vec![1200.0, 2400.0]);
                assert_eq!(args.common.model, ModelKind::BreitWigner);
            }
            _ => panic!("expected overlay subcommand"),
        }
    }
}
