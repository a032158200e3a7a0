//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during rebinning/fitting
//! - exported to JSON
//! - reloaded later for comparisons across runs

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Parametric peak shape fitted to a binned distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// `norm * exp(-0.5 * ((x - mean) / sigma)^2)`
    Gaussian,
    /// `norm * (width/2)^2 / ((x - mean)^2 + (width/2)^2)`
    ///
    /// `width` is the full width at half maximum (FWHM).
    BreitWigner,
}

impl ModelKind {
    /// Human-readable label for terminal output.
    pub fn display_name(self) -> &'static str {
        match self {
            ModelKind::Gaussian => "Gaussian",
            ModelKind::BreitWigner => "Breit-Wigner",
        }
    }

    /// Ordered parameter names. The scale parameter is always last.
    pub fn param_names(self) -> [&'static str; 3] {
        match self {
            ModelKind::Gaussian => ["norm", "mean", "sigma"],
            ModelKind::BreitWigner => ["norm", "mean", "width"],
        }
    }

    /// Name of the scale (peak width) parameter.
    pub fn scale_name(self) -> &'static str {
        self.param_names()[2]
    }

    /// Half-width multiplier `k` for window narrowing: the refit window is
    /// `mean ± k * scale`.
    ///
    /// The Breit-Wigner factor is wider because its tails carry
    /// proportionally more weight; a `±1.5 Γ` window loses identifiability.
    pub fn window_factor(self) -> f64 {
        match self {
            ModelKind::Gaussian => 1.5,
            ModelKind::BreitWigner => 2.0,
        }
    }
}

/// A histogram: `n + 1` increasing edges and `n` non-negative counts.
///
/// Immutable after construction. Rebinning and normalization produce new
/// instances instead of mutating in place, so a distribution can be reused
/// across overlays without aliasing surprises.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinnedDistribution {
    edges: Vec<f64>,
    counts: Vec<f64>,
    label: Option<String>,
}

impl BinnedDistribution {
    /// Construct a distribution, validating the histogram invariants.
    ///
    /// Structural violations (too few edges, non-increasing edges, length
    /// mismatch, negative or non-finite counts) fail fast; they are caller
    /// bugs, not recoverable fit conditions.
    pub fn new(
        edges: Vec<f64>,
        counts: Vec<f64>,
        label: Option<String>,
    ) -> Result<Self, AppError> {
        if edges.len() < 2 {
            return Err(AppError::data("Histogram needs at least one bin (two edges)."));
        }
        if counts.len() != edges.len() - 1 {
            return Err(AppError::data(format!(
                "Histogram shape mismatch: {} edges require {} counts, got {}.",
                edges.len(),
                edges.len() - 1,
                counts.len()
            )));
        }
        if edges.iter().any(|e| !e.is_finite()) {
            return Err(AppError::data("Histogram edges must be finite."));
        }
        if edges.windows(2).any(|w| w[1] <= w[0]) {
            return Err(AppError::data("Histogram edges must be strictly increasing."));
        }
        if counts.iter().any(|c| !c.is_finite() || *c < 0.0) {
            return Err(AppError::data("Histogram counts must be finite and non-negative."));
        }
        Ok(Self { edges, counts, label })
    }

    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    pub fn counts(&self) -> &[f64] {
        &self.counts
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Replace the label, keeping bins intact.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn n_bins(&self) -> usize {
        self.counts.len()
    }

    /// Domain bounds `(low, high)`.
    pub fn domain(&self) -> (f64, f64) {
        (self.edges[0], self.edges[self.edges.len() - 1])
    }

    /// Width of the first bin. Bins are uniform in this pipeline; the first
    /// bin is the convention used throughout.
    pub fn bin_width(&self) -> f64 {
        self.edges[1] - self.edges[0]
    }

    /// Bin centers, one per count.
    pub fn centers(&self) -> Vec<f64> {
        self.edges
            .windows(2)
            .map(|w| 0.5 * (w[0] + w[1]))
            .collect()
    }

    /// Sum of all counts.
    pub fn integral(&self) -> f64 {
        self.counts.iter().sum()
    }

    /// Largest bin count.
    pub fn max_count(&self) -> f64 {
        self.counts.iter().copied().fold(0.0, f64::max)
    }

    /// Count-weighted mean over bin centers.
    ///
    /// A zero-integral histogram has no defined moments; the domain midpoint
    /// is returned instead (the value is only ever used as an optimizer seed).
    pub fn mean(&self) -> f64 {
        let total = self.integral();
        if total <= 0.0 {
            let (lo, hi) = self.domain();
            return 0.5 * (lo + hi);
        }
        let weighted: f64 = self
            .centers()
            .iter()
            .zip(self.counts.iter())
            .map(|(c, n)| c * n)
            .sum();
        weighted / total
    }

    /// Count-weighted RMS around the mean. Falls back to a quarter of the
    /// domain span for zero-integral histograms.
    pub fn rms(&self) -> f64 {
        let total = self.integral();
        let (lo, hi) = self.domain();
        if total <= 0.0 {
            return 0.25 * (hi - lo);
        }
        let mean = self.mean();
        let var: f64 = self
            .centers()
            .iter()
            .zip(self.counts.iter())
            .map(|(c, n)| n * (c - mean) * (c - mean))
            .sum::<f64>()
            / total;
        var.max(0.0).sqrt()
    }
}

/// A fit domain restriction `[low, high]`, always kept inside the original
/// distribution bounds via [`FitWindow::clip`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitWindow {
    pub low: f64,
    pub high: f64,
}

impl FitWindow {
    pub fn new(low: f64, high: f64) -> Self {
        if low <= high {
            Self { low, high }
        } else {
            Self { low: high, high: low }
        }
    }

    pub fn width(self) -> f64 {
        self.high - self.low
    }

    pub fn contains(self, x: f64) -> bool {
        x >= self.low && x <= self.high
    }

    /// Clip to the given domain bounds.
    pub fn clip(self, lo: f64, hi: f64) -> Self {
        Self {
            low: self.low.max(lo),
            high: self.high.min(hi),
        }
    }
}

/// Non-fatal conditions recorded on a fit result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FitFlag {
    /// The distribution had zero integral; nothing was fitted.
    ZeroIntegral,
    /// The optimizer failed to converge at some stage.
    NonConvergence,
    /// A narrowed window held fewer bins than the configured minimum.
    DegenerateWindow,
    /// The RMS seed fell outside the configured scale bounds and was clamped.
    ClampedInitialScale,
    /// `mean == 0`, so the resolution diagnostic is reported as 0.
    UndefinedResolution,
}

/// Goodness-of-fit diagnostics from the final fit stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitQuality {
    /// Sum of squared residuals over the final window.
    pub chi2: f64,
    /// `chi2 / (n_points - n_params)`, or `chi2` when underdetermined.
    pub reduced_chi2: f64,
    pub n_points: usize,
    pub n_params: usize,
}

/// Outcome of an iterative peak fit. Immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitResult {
    pub model: ModelKind,
    pub parameters: BTreeMap<String, f64>,
    pub parameter_errors: BTreeMap<String, f64>,
    pub converged: bool,
    /// Completed narrowing iterations (excludes the initial full-domain fit).
    pub iterations_used: usize,
    pub final_window: FitWindow,
    /// Window used at each narrowing iteration, in order.
    pub windows: Vec<FitWindow>,
    /// `|scale / mean|`, or 0 when the mean is exactly zero.
    pub resolution: f64,
    pub quality: FitQuality,
    pub flags: Vec<FitFlag>,
}

impl FitResult {
    pub fn norm(&self) -> f64 {
        self.param("norm")
    }

    pub fn mean(&self) -> f64 {
        self.param("mean")
    }

    /// The scale (width) parameter: sigma for Gaussian, FWHM for Breit-Wigner.
    pub fn scale(&self) -> f64 {
        self.param(self.model.scale_name())
    }

    pub fn scale_error(&self) -> f64 {
        self.parameter_errors
            .get(self.model.scale_name())
            .copied()
            .unwrap_or(f64::NAN)
    }

    pub fn has_flag(&self, flag: FitFlag) -> bool {
        self.flags.contains(&flag)
    }

    /// Parameter vector in `ModelKind::param_names` order, as expected by
    /// `models::evaluate`.
    pub fn params_vec(&self) -> Vec<f64> {
        self.model
            .param_names()
            .iter()
            .map(|name| self.param(name))
            .collect()
    }

    fn param(&self, name: &str) -> f64 {
        self.parameters.get(name).copied().unwrap_or(f64::NAN)
    }
}

/// A fitted curve sampled on a regular grid (for exports).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurveGrid {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct FitConfig {
    /// Peak location hypotheses, one synthetic distribution per entry.
    pub peaks: Vec<f64>,
    /// True scale used when generating samples (sigma or FWHM).
    pub true_width: f64,
    pub model: ModelKind,
    pub events: usize,
    pub seed: u64,
    /// Fraction of generated events drawn from a flat background.
    pub background_fraction: f64,

    pub domain_min: f64,
    pub domain_max: f64,
    /// Bin width of the raw (pre-rebin) histogram.
    pub raw_bin_width: f64,
    /// Target bin width passed to the rebinner.
    pub target_bin_width: f64,
    /// Rescale each distribution to unit integral before fitting/overlay.
    pub normalize: bool,

    pub max_iterations: usize,
    pub min_window_bins: usize,
    pub scale_min: f64,
    pub scale_max: f64,

    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,
    pub export: Option<PathBuf>,
}
