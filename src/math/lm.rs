//! Damped nonlinear least squares (Levenberg-Marquardt).
//!
//! The peak models are nonlinear in their parameters, so each fit stage
//! solves:
//!
//! ```text
//! minimize Σ (y_i - f(x_i, p))^2
//! ```
//!
//! Implementation choices:
//! - Each step solves the damped normal equations as an *augmented*
//!   least-squares system `[J; sqrt(λ) I] δ = [r; 0]` via SVD, which stays
//!   well-behaved when the Jacobian is nearly rank-deficient (e.g. a window
//!   that barely brackets the peak).
//! - The damping factor λ shrinks on accepted steps and grows on rejected
//!   ones; with 3 parameters and at most a few hundred bins per window the
//!   cost is negligible.
//! - Failure is reported as `None`, never as a panic or error: the fit
//!   engine translates it into a non-convergence flag and keeps going.

use nalgebra::{DMatrix, DVector};

/// Optimizer knobs. The defaults are sufficient for every peak fit in this
/// crate; they are only exposed so the engine can tighten iteration budgets
/// in tests.
#[derive(Debug, Clone)]
pub struct LmOptions {
    pub max_iterations: usize,
    pub lambda_init: f64,
    /// Relative chi-square improvement below which the fit is converged.
    pub tolerance: f64,
}

impl Default for LmOptions {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            lambda_init: 1e-3,
            tolerance: 1e-10,
        }
    }
}

/// Result of one optimizer run.
#[derive(Debug, Clone)]
pub struct LmOutcome {
    pub params: Vec<f64>,
    /// One-sigma parameter uncertainties from the covariance diagonal.
    pub errors: Vec<f64>,
    pub chi2: f64,
    pub iterations: usize,
    pub converged: bool,
}

/// Fit `f(x, p)` to `(xs, ys)` starting from `init`.
///
/// `jac` fills one Jacobian row with the partial derivatives `∂f/∂p_j` at a
/// given `x`. Returns `None` when the inputs are unusable or no step is ever
/// accepted.
pub fn fit_curve<F, J>(
    xs: &[f64],
    ys: &[f64],
    f: F,
    jac: J,
    init: &[f64],
    opts: &LmOptions,
) -> Option<LmOutcome>
where
    F: Fn(f64, &[f64]) -> f64,
    J: Fn(f64, &[f64], &mut [f64]),
{
    let n = xs.len();
    let p = init.len();
    if n == 0 || p == 0 || n < p || ys.len() != n {
        return None;
    }
    if xs.iter().chain(ys.iter()).any(|v| !v.is_finite()) {
        return None;
    }
    if init.iter().any(|v| !v.is_finite()) {
        return None;
    }

    let mut params = init.to_vec();
    let mut chi2 = chi_square(xs, ys, &f, &params)?;
    let mut lambda = opts.lambda_init.max(1e-12);
    let mut converged = false;
    let mut iterations = 0;

    let mut row = vec![0.0; p];
    for _ in 0..opts.max_iterations {
        iterations += 1;

        // Augmented system: n residual rows plus p damping rows.
        let mut a = DMatrix::<f64>::zeros(n + p, p);
        let mut b = DVector::<f64>::zeros(n + p);
        for i in 0..n {
            jac(xs[i], &params, &mut row);
            for j in 0..p {
                a[(i, j)] = row[j];
            }
            b[i] = ys[i] - f(xs[i], &params);
        }
        let damp = lambda.sqrt();
        for j in 0..p {
            a[(n + j, j)] = damp;
        }

        let Some(delta) = solve_least_squares(&a, &b) else {
            // Singular step: stiffen the damping and retry.
            lambda *= 10.0;
            if lambda > 1e12 {
                break;
            }
            continue;
        };

        let trial: Vec<f64> = params
            .iter()
            .zip(delta.iter())
            .map(|(v, d)| v + d)
            .collect();
        match chi_square(xs, ys, &f, &trial) {
            Some(trial_chi2) if trial_chi2 <= chi2 => {
                let improvement = chi2 - trial_chi2;
                params = trial;
                chi2 = trial_chi2;
                lambda = (lambda * 0.1).max(1e-12);
                if improvement <= opts.tolerance * (chi2 + opts.tolerance) {
                    converged = true;
                    break;
                }
            }
            _ => {
                lambda *= 10.0;
                if lambda > 1e12 {
                    break;
                }
            }
        }
    }

    let errors = parameter_errors(xs, &jac, &params, chi2, n, p);
    Some(LmOutcome {
        params,
        errors,
        chi2,
        iterations,
        converged,
    })
}

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
/// Progressively looser tolerances are tried before giving up; near-collinear
/// Jacobian columns are common when a fit window barely brackets the peak.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

fn chi_square<F>(xs: &[f64], ys: &[f64], f: &F, params: &[f64]) -> Option<f64>
where
    F: Fn(f64, &[f64]) -> f64,
{
    let mut sum = 0.0;
    for (&x, &y) in xs.iter().zip(ys.iter()) {
        let r = y - f(x, params);
        sum += r * r;
    }
    sum.is_finite().then_some(sum)
}

/// One-sigma uncertainties from `(JᵀJ)⁻¹` scaled by the reduced chi-square.
///
/// Entries are NaN when the information matrix cannot be inverted.
fn parameter_errors<J>(
    xs: &[f64],
    jac: &J,
    params: &[f64],
    chi2: f64,
    n: usize,
    p: usize,
) -> Vec<f64>
where
    J: Fn(f64, &[f64], &mut [f64]),
{
    let mut j_mat = DMatrix::<f64>::zeros(n, p);
    let mut row = vec![0.0; p];
    for i in 0..n {
        jac(xs[i], params, &mut row);
        for j in 0..p {
            j_mat[(i, j)] = row[j];
        }
    }

    let jtj = j_mat.transpose() * &j_mat;
    let Ok(cov) = jtj.svd(true, true).pseudo_inverse(1e-12) else {
        return vec![f64::NAN; p];
    };

    let dof = n.saturating_sub(p).max(1) as f64;
    let scale = (chi2 / dof).max(0.0);
    (0..p)
        .map(|j| {
            let v = cov[(j, j)] * scale;
            if v.is_finite() && v >= 0.0 {
                v.sqrt()
            } else {
                f64::NAN
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn recovers_exponential_decay_parameters() {
        // y = a * exp(-b x) with a=4, b=0.5; nonlinear in b.
        let xs: Vec<f64> = (0..30).map(|i| i as f64 * 0.2).collect();
        let ys: Vec<f64> = xs.iter().map(|&x| 4.0 * (-0.5 * x).exp()).collect();

        let f = |x: f64, p: &[f64]| p[0] * (-p[1] * x).exp();
        let jac = |x: f64, p: &[f64], out: &mut [f64]| {
            let e = (-p[1] * x).exp();
            out[0] = e;
            out[1] = -p[0] * x * e;
        };

        let out = fit_curve(&xs, &ys, f, jac, &[1.0, 1.0], &LmOptions::default()).unwrap();
        assert!(out.converged);
        assert!((out.params[0] - 4.0).abs() < 1e-6);
        assert!((out.params[1] - 0.5).abs() < 1e-6);
        assert!(out.chi2 < 1e-12);
    }

    #[test]
    fn rejects_degenerate_inputs() {
        let f = |_x: f64, p: &[f64]| p[0];
        let jac = |_x: f64, _p: &[f64], out: &mut [f64]| out[0] = 1.0;

        // Fewer points than parameters.
        assert!(fit_curve(&[], &[], f, jac, &[0.0], &LmOptions::default()).is_none());
        // Non-finite observation.
        assert!(
            fit_curve(&[1.0], &[f64::NAN], f, jac, &[0.0], &LmOptions::default()).is_none()
        );
    }
}
