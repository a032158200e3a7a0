//! Model evaluation for the Gaussian and Breit-Wigner peak shapes.
//!
//! The fit engine relies on three primitive operations:
//! - evaluate the density at a point (for residuals/curves)
//! - fill a Jacobian row of analytic partials (for the optimizer)
//! - derive an initial parameter guess from a distribution's moments
//!
//! Parameters are ordered `[norm, mean, scale]` for both shapes; `scale` is
//! sigma for the Gaussian and the FWHM for the Breit-Wigner.

use crate::domain::{BinnedDistribution, ModelKind};

/// Evaluate the model density at `x`.
///
/// A non-positive scale makes both shapes ill-defined; the evaluation guards
/// with a tiny floor so the optimizer can recover rather than seeing NaN.
pub fn evaluate(model: ModelKind, x: f64, params: &[f64]) -> f64 {
    let norm = params[0];
    let mean = params[1];
    let scale = params[2].abs().max(f64::MIN_POSITIVE);
    match model {
        ModelKind::Gaussian => {
            let z = (x - mean) / scale;
            norm * (-0.5 * z * z).exp()
        }
        ModelKind::BreitWigner => {
            let half = 0.5 * scale;
            let d = x - mean;
            norm * half * half / (d * d + half * half)
        }
    }
}

/// Fill one Jacobian row with `∂f/∂norm`, `∂f/∂mean`, `∂f/∂scale` at `x`.
///
/// # Panics
/// Panics if `out` or `params` have length other than 3. Callers size these
/// arrays from `ModelKind::param_names`.
pub fn fill_jacobian_row(model: ModelKind, x: f64, params: &[f64], out: &mut [f64]) {
    let norm = params[0];
    let mean = params[1];
    let scale = params[2].abs().max(f64::MIN_POSITIVE);
    match model {
        ModelKind::Gaussian => {
            let z = (x - mean) / scale;
            let e = (-0.5 * z * z).exp();
            out[0] = e;
            out[1] = norm * e * z / scale;
            out[2] = norm * e * z * z / scale;
        }
        ModelKind::BreitWigner => {
            let half = 0.5 * scale;
            let h = half * half;
            let d = x - mean;
            let denom = d * d + h;
            out[0] = h / denom;
            // ∂f/∂mean = norm * h * 2d / denom^2
            out[1] = norm * h * 2.0 * d / (denom * denom);
            // With h = (scale/2)^2: ∂f/∂scale = norm * d^2 / denom^2 * scale/2
            out[2] = norm * d * d / (denom * denom) * half;
        }
    }
}

/// Initial guess derived from the distribution's moments:
/// - `norm` from the histogram maximum (1.0 for an empty histogram)
/// - `mean` from the count-weighted mean
/// - scale from the count-weighted RMS, clamped into `[scale_min, scale_max]`
///
/// The returned flag is true when the RMS had to be clamped; an out-of-bounds
/// seed is a recoverable condition, never an error.
pub fn initial_guess(
    model: ModelKind,
    dist: &BinnedDistribution,
    scale_min: f64,
    scale_max: f64,
) -> (Vec<f64>, bool) {
    let _ = model; // same seeding rule for both shapes
    let norm = if dist.max_count() > 0.0 {
        dist.max_count()
    } else {
        1.0
    };
    let mean = dist.mean();
    let rms = dist.rms();
    let clamped = rms < scale_min || rms > scale_max;
    let scale = rms.clamp(scale_min, scale_max);
    (vec![norm, mean, scale], clamped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BinnedDistribution;

    #[test]
    fn gaussian_peak_value_and_symmetry() {
        let p = [2.0, 100.0, 10.0];
        assert!((evaluate(ModelKind::Gaussian, 100.0, &p) - 2.0).abs() < 1e-12);
        let left = evaluate(ModelKind::Gaussian, 90.0, &p);
        let right = evaluate(ModelKind::Gaussian, 110.0, &p);
        assert!((left - right).abs() < 1e-12);
        assert!((left - 2.0 * (-0.5f64).exp()).abs() < 1e-12);
    }

    #[test]
    fn breit_wigner_fwhm_is_width() {
        // At mean ± width/2 the density is half its peak value.
        let p = [3.0, 500.0, 80.0];
        let peak = evaluate(ModelKind::BreitWigner, 500.0, &p);
        assert!((peak - 3.0).abs() < 1e-12);
        let half = evaluate(ModelKind::BreitWigner, 540.0, &p);
        assert!((half - 1.5).abs() < 1e-12);
    }

    #[test]
    fn jacobian_matches_finite_differences() {
        let p = [2.5, 120.0, 30.0];
        let eps = 1e-6;
        for model in [ModelKind::Gaussian, ModelKind::BreitWigner] {
            for &x in &[80.0, 120.0, 151.0] {
                let mut row = [0.0; 3];
                fill_jacobian_row(model, x, &p, &mut row);
                for j in 0..3 {
                    let mut up = p;
                    let mut dn = p;
                    up[j] += eps;
                    dn[j] -= eps;
                    let fd = (evaluate(model, x, &up) - evaluate(model, x, &dn)) / (2.0 * eps);
                    assert!(
                        (row[j] - fd).abs() < 1e-5,
                        "{model:?} param {j} at x={x}: analytic={} fd={fd}",
                        row[j]
                    );
                }
            }
        }
    }

    #[test]
    fn initial_guess_clamps_scale() {
        // A single spike has RMS 0, below any sensible scale_min.
        let edges = vec![0.0, 10.0, 20.0, 30.0];
        let dist = BinnedDistribution::new(edges, vec![0.0, 5.0, 0.0], None).unwrap();
        let (params, clamped) = initial_guess(ModelKind::Gaussian, &dist, 10.0, 1000.0);
        assert!(clamped);
        assert!((params[0] - 5.0).abs() < 1e-12);
        assert!((params[1] - 15.0).abs() < 1e-12);
        assert!((params[2] - 10.0).abs() < 1e-12);
    }
}
