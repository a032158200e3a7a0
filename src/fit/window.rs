//! Narrowing-window helpers.

use crate::domain::{BinnedDistribution, FitWindow};

/// Window `mean ± k * |scale|`, clipped to the distribution's domain.
pub fn narrowing_window(mean: f64, scale: f64, k: f64, dist: &BinnedDistribution) -> FitWindow {
    let half = k * scale.abs();
    let (lo, hi) = dist.domain();
    FitWindow::new(mean - half, mean + half).clip(lo, hi)
}

/// Indices of bins whose centers fall inside the window (inclusive bounds).
pub fn bins_in_window(dist: &BinnedDistribution, window: FitWindow) -> Vec<usize> {
    dist.centers()
        .iter()
        .enumerate()
        .filter_map(|(i, &c)| window.contains(c).then_some(i))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hist() -> BinnedDistribution {
        // Bins of width 100 over [0, 1000), centers 50, 150, ..., 950.
        let edges: Vec<f64> = (0..=10).map(|i| i as f64 * 100.0).collect();
        BinnedDistribution::new(edges, vec![1.0; 10], None).unwrap()
    }

    #[test]
    fn window_is_clipped_to_domain() {
        let h = hist();
        let w = narrowing_window(100.0, 200.0, 1.5, &h);
        assert!((w.low - 0.0).abs() < 1e-12);
        assert!((w.high - 400.0).abs() < 1e-12);
    }

    #[test]
    fn selects_bins_by_center() {
        let h = hist();
        let w = FitWindow::new(150.0, 420.0);
        // Boundary center 150 is included.
        assert_eq!(bins_in_window(&h, w), vec![1, 2, 3]);
    }
}
