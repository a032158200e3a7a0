//! Assemble multiple distributions (plus optional fitted curves) into one
//! ordered series set ready for rendering.
//!
//! The builder is pure assembly: insertion order is the draw order (first
//! added is the bottom layer), and rendering belongs to whatever consumes
//! the built series. Callers are responsible for rebinning all members to a
//! consistent target width before comparison; `check_consistent_binning` is
//! the validation hook for that, deliberately not enforced on `add`.

use serde::Serialize;

use crate::domain::{BinnedDistribution, FitResult};

/// One overlay member: a distribution, an optional fitted curve, and its
/// position in the draw order.
#[derive(Debug, Clone, Serialize)]
pub struct OverlaySeries {
    pub label: String,
    pub dist: BinnedDistribution,
    pub fit: Option<FitResult>,
    /// Index in the draw order; assigned by the builder at insertion.
    pub draw_order: usize,
}

/// Order-preserving collector of overlay members.
#[derive(Debug, Clone, Default)]
pub struct OverlayBuilder {
    series: Vec<OverlaySeries>,
}

impl OverlayBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a series; its `draw_order` is the insertion index.
    pub fn add(
        &mut self,
        label: impl Into<String>,
        dist: BinnedDistribution,
        fit: Option<FitResult>,
    ) -> &mut Self {
        let draw_order = self.series.len();
        self.series.push(OverlaySeries {
            label: label.into(),
            dist,
            fit,
            draw_order,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Finish assembly, yielding members in insertion order.
    pub fn build(self) -> Vec<OverlaySeries> {
        self.series
    }
}

/// True when every member shares one bin width (relative agreement 1e-9).
///
/// An overlay of mixed bin widths is not statistically comparable; this hook
/// lets callers validate before rendering. Empty and single-member sets are
/// trivially consistent.
pub fn check_consistent_binning(series: &[OverlaySeries]) -> bool {
    let Some(first) = series.first() else {
        return true;
    };
    let reference = first.dist.bin_width();
    series.iter().all(|s| {
        let w = s.dist.bin_width();
        (w - reference).abs() <= 1e-9 * reference.abs().max(1.0)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hist(bin_width: f64) -> BinnedDistribution {
        let edges: Vec<f64> = (0..=5).map(|i| i as f64 * bin_width).collect();
        BinnedDistribution::new(edges, vec![1.0; 5], None).unwrap()
    }

    #[test]
    fn build_preserves_insertion_order() {
        let mut builder = OverlayBuilder::new();
        builder
            .add("zulu", hist(10.0), None)
            .add("alpha", hist(10.0), None)
            .add("mike", hist(10.0), None);

        let series = builder.build();
        let labels: Vec<&str> = series.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["zulu", "alpha", "mike"]);
        let orders: Vec<usize> = series.iter().map(|s| s.draw_order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
    }

    #[test]
    fn consistent_binning_check() {
        let mut builder = OverlayBuilder::new();
        builder.add("a", hist(10.0), None).add("b", hist(10.0), None);
        let same = builder.build();
        assert!(check_consistent_binning(&same));

        let mut builder = OverlayBuilder::new();
        builder.add("a", hist(10.0), None).add("b", hist(25.0), None);
        let mixed = builder.build();
        assert!(!check_consistent_binning(&mixed));

        assert!(check_consistent_binning(&[]));
    }
}
