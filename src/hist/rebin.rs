//! Merge adjacent bins to reach a target bin width.

use crate::domain::BinnedDistribution;
use crate::error::AppError;

/// Outcome of a rebin, including what was merged and what was dropped.
#[derive(Debug, Clone)]
pub struct RebinOutcome {
    pub dist: BinnedDistribution,
    /// Number of raw bins merged into each output bin.
    pub factor: usize,
    /// Raw bins dropped from the tail when the bin count was not divisible
    /// by `factor`. The report layer warns when this is non-zero.
    pub truncated_bins: usize,
}

/// Rebin to approximately `target_width` by merging runs of adjacent bins.
///
/// `factor = max(1, floor(target_width / bin_width))`; the output bin width
/// is exactly `factor` times the input width. A trailing group shorter than
/// `factor` is truncated rather than summed into a ragged last bin, and the
/// number of dropped raw bins is reported on the outcome. Factor 1 returns
/// an identical distribution.
pub fn rebin(dist: &BinnedDistribution, target_width: f64) -> Result<RebinOutcome, AppError> {
    if !(target_width.is_finite() && target_width > 0.0) {
        return Err(AppError::usage(format!(
            "Invalid target bin width {target_width}: must be finite and > 0."
        )));
    }

    let width = dist.bin_width();
    let factor = ((target_width / width).floor() as usize).max(1);
    if factor == 1 {
        return Ok(RebinOutcome {
            dist: dist.clone(),
            factor: 1,
            truncated_bins: 0,
        });
    }

    let n_out = dist.n_bins() / factor;
    let truncated_bins = dist.n_bins() - n_out * factor;
    if n_out == 0 {
        return Err(AppError::data(format!(
            "Target width {target_width} merges all {} bins away.",
            dist.n_bins()
        )));
    }

    let mut counts = Vec::with_capacity(n_out);
    for group in 0..n_out {
        let start = group * factor;
        counts.push(dist.counts()[start..start + factor].iter().sum());
    }
    let edges: Vec<f64> = dist
        .edges()
        .iter()
        .step_by(factor)
        .take(n_out + 1)
        .copied()
        .collect();

    let rebinned =
        BinnedDistribution::new(edges, counts, dist.label().map(str::to_string))?;
    Ok(RebinOutcome {
        dist: rebinned,
        factor,
        truncated_bins,
    })
}
