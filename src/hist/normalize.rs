//! Rescale a distribution to unit integral.

use crate::domain::BinnedDistribution;

/// Outcome of a normalization pass.
#[derive(Debug, Clone)]
pub struct NormalizeOutcome {
    pub dist: BinnedDistribution,
    /// True when the input had zero integral and was returned unchanged.
    /// Skip-and-flag policy: an empty histogram is not a fatal condition.
    pub skipped_zero_integral: bool,
}

/// Rescale counts so they sum to 1. A zero-integral input is returned
/// unchanged with the skip flag set.
pub fn normalize(dist: &BinnedDistribution) -> NormalizeOutcome {
    let total = dist.integral();
    if total <= 0.0 {
        return NormalizeOutcome {
            dist: dist.clone(),
            skipped_zero_integral: true,
        };
    }

    let counts: Vec<f64> = dist.counts().iter().map(|c| c / total).collect();
    let scaled = BinnedDistribution::new(
        dist.edges().to_vec(),
        counts,
        dist.label().map(str::to_string),
    )
    // Scaling non-negative finite counts by a positive constant cannot break
    // the histogram invariants.
    .unwrap_or_else(|_| dist.clone());

    NormalizeOutcome {
        dist: scaled,
        skipped_zero_integral: false,
    }
}
