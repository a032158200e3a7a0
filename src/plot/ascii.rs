//! ASCII overlay plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - histogram bin values: one marker glyph per series (`o`, `x`, `+`, ...)
//! - fitted curves: `.` traces
//!
//! Series are drawn in their overlay draw order, first at the bottom; later
//! series overwrite earlier glyphs where they collide, matching the layer
//! semantics of the overlay.

use crate::models::evaluate;
use crate::overlay::OverlaySeries;

const MARKERS: [char; 6] = ['o', 'x', '+', '#', '%', '@'];

/// Render the overlay as a fixed-size character grid with a header line and
/// a legend footer.
pub fn render_overlay_plot(series: &[OverlaySeries], width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let Some(first) = series.first() else {
        return "(empty overlay)\n".to_string();
    };
    let (x_min, x_max) = first.dist.domain();

    let (y_min, y_max) = pad_range(y_range(series), 0.05);

    let mut grid = vec![vec![' '; width]; height];

    for s in series {
        // Curve first so the observed bins overlay it.
        if let Some(fit) = &s.fit {
            let params = fit.params_vec();
            for col in 0..width {
                let u = col as f64 / (width as f64 - 1.0);
                let x = x_min + u * (x_max - x_min);
                let y = evaluate(fit.model, x, &params);
                if let Some(row) = map_y(y, y_min, y_max, height) {
                    grid[row][col] = '.';
                }
            }
        }

        let marker = MARKERS[s.draw_order % MARKERS.len()];
        for (&center, &count) in s.dist.centers().iter().zip(s.dist.counts().iter()) {
            let col = map_x(center, x_min, x_max, width);
            if let Some(row) = map_y(count, y_min, y_max, height) {
                grid[row][col] = marker;
            }
        }
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: x=[{x_min:.1}, {x_max:.1}] | y=[{y_min:.3e}, {y_max:.3e}]\n"
    ));
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }

    // Legend footer: marker -> label, in draw order.
    let legend: Vec<String> = series
        .iter()
        .map(|s| format!("{} {}", MARKERS[s.draw_order % MARKERS.len()], s.label))
        .collect();
    out.push_str(&legend.join(" | "));
    out.push('\n');

    out
}

fn y_range(series: &[OverlaySeries]) -> (f64, f64) {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for s in series {
        for &c in s.dist.counts() {
            lo = lo.min(c);
            hi = hi.max(c);
        }
        if let Some(fit) = &s.fit {
            // The fitted peak can exceed every bin value.
            hi = hi.max(fit.norm());
        }
    }
    if !(lo.is_finite() && hi.is_finite()) {
        (0.0, 1.0)
    } else {
        (lo.min(0.0), hi)
    }
}

fn pad_range((lo, hi): (f64, f64), frac: f64) -> (f64, f64) {
    let span = (hi - lo).max(1e-12);
    (lo - frac * span, hi + frac * span)
}

fn map_x(x: f64, x_min: f64, x_max: f64, width: usize) -> usize {
    let u = ((x - x_min) / (x_max - x_min)).clamp(0.0, 1.0);
    ((u * (width as f64 - 1.0)).round() as usize).min(width - 1)
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> Option<usize> {
    if !y.is_finite() {
        return None;
    }
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    let row = (u * (height as f64 - 1.0)).round() as usize;
    Some(height - 1 - row.min(height - 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BinnedDistribution;
    use crate::overlay::OverlayBuilder;

    fn overlay() -> Vec<OverlaySeries> {
        let edges: Vec<f64> = (0..=8).map(|i| i as f64 * 10.0).collect();
        let a = BinnedDistribution::new(
            edges.clone(),
            vec![0.0, 1.0, 4.0, 9.0, 4.0, 1.0, 0.0, 0.0],
            None,
        )
        .unwrap();
        let b = BinnedDistribution::new(
            edges,
            vec![0.0, 0.0, 1.0, 3.0, 8.0, 3.0, 1.0, 0.0],
            None,
        )
        .unwrap();
        let mut builder = OverlayBuilder::new();
        builder.add("a", a, None).add("b", b, None);
        builder.build()
    }

    #[test]
    fn renders_deterministic_grid_with_legend() {
        let series = overlay();
        let first = render_overlay_plot(&series, 40, 12);
        let second = render_overlay_plot(&series, 40, 12);
        assert_eq!(first, second);

        assert!(first.starts_with("Plot: x=[0.0, 80.0]"));
        assert!(first.contains('o'));
        assert!(first.contains('x'));
        assert!(first.trim_end().ends_with("o a | x b"));
        // Header + grid rows + legend.
        assert_eq!(first.lines().count(), 1 + 12 + 1);
    }

    #[test]
    fn empty_overlay_is_handled() {
        assert_eq!(render_overlay_plot(&[], 40, 12), "(empty overlay)\n");
    }
}
