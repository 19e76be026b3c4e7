// ============================================================
// Layer 5 - Bayesian Ridge Regression
// ============================================================
// Linear regression with Gaussian priors whose precisions are
// learned by maximising the evidence (MacKay, 1992):
//
//   y = Xw + ε,   ε ~ N(0, 1/α),   w ~ N(0, 1/λ)
//   α ~ Gamma(α₁, α₂),  λ ~ Gamma(λ₁, λ₂)
//
// Fixed-point iteration:
//   w     = (XᵀX + (λ/α) I)⁻¹ Xᵀy
//   γ     = Σ α·eᵢ / (λ + α·eᵢ)           eᵢ = eigenvalues of XᵀX
//   λ_new = (γ + 2λ₁) / (‖w‖² + 2λ₂)
//   α_new = (n - γ + 2α₁) / (‖y - Xw‖² + 2α₂)
// until the L1 change of w drops below `tol`.
//
// The eigendecomposition is computed once per fit on whichever
// Gram matrix is smaller (XᵀX or XXᵀ); both share their non-zero
// spectrum, and every iteration afterwards is a cheap rescale.
//
// The intercept is handled by centring X and y.
//
// Reference: Tipping (2001), Sparse Bayesian Learning
//            Bishop (2006), PRML §3.5

use anyhow::{bail, Result};
use nalgebra::{DMatrix, DVector};
use ndarray::{Array1, ArrayView1, ArrayView2, Axis};

use crate::ml::estimator::Regressor;

#[derive(Debug, Clone)]
pub struct BayesianRidge {
    pub max_iter: usize,
    pub tol:      f64,
    pub alpha_1:  f64,
    pub alpha_2:  f64,
    pub lambda_1: f64,
    pub lambda_2: f64,
    coef:         Array1<f64>,
    intercept:    f64,
    /// Learned noise precision
    alpha:        f64,
    /// Learned weight precision
    lambda:       f64,
}

impl Default for BayesianRidge {
    fn default() -> Self {
        Self {
            max_iter:  300,
            tol:       1e-3,
            alpha_1:   1e-6,
            alpha_2:   1e-6,
            lambda_1:  1e-6,
            lambda_2:  1e-6,
            coef:      Array1::zeros(0),
            intercept: 0.0,
            alpha:     1.0,
            lambda:    1.0,
        }
    }
}

/// Spectral form of the ridge solution for a fixed design.
struct RidgeSpectrum {
    /// Non-negligible eigenvalues of the Gram matrix
    eigenvalues: Vec<f64>,
    /// Matching eigenvectors (columns)
    vectors:     DMatrix<f64>,
    /// Eigenvectors projected onto the targets
    projection:  DVector<f64>,
    /// true: Gram = XᵀX, false: Gram = XXᵀ
    primal:      bool,
}

impl RidgeSpectrum {
    fn new(x: &DMatrix<f64>, y: &DVector<f64>) -> Self {
        let (n, d) = x.shape();
        let primal = n > d;
        let gram   = if primal { x.tr_mul(x) } else { x * x.transpose() };
        let eigen  = gram.symmetric_eigen();

        // Directions with (numerically) zero eigenvalue contribute exactly
        // nothing to the ridge solution; dropping them avoids 0·∞ noise.
        let max_eig = eigen.eigenvalues.iter().cloned().fold(0.0, f64::max);
        let cutoff  = max_eig * (n.max(d) as f64) * f64::EPSILON;
        let keep: Vec<usize> = (0..eigen.eigenvalues.len())
            .filter(|&i| eigen.eigenvalues[i] > cutoff)
            .collect();

        let eigenvalues = keep.iter().map(|&i| eigen.eigenvalues[i]).collect();
        let vectors     = eigen.eigenvectors.select_columns(keep.iter());
        let projection  = if primal {
            vectors.tr_mul(&x.tr_mul(y))
        } else {
            vectors.tr_mul(y)
        };

        Self { eigenvalues, vectors, projection, primal }
    }

    /// w = (XᵀX + ratio·I)⁻¹ Xᵀy
    fn coef(&self, x: &DMatrix<f64>, ratio: f64) -> DVector<f64> {
        let scaled = DVector::from_iterator(
            self.eigenvalues.len(),
            self.eigenvalues
                .iter()
                .zip(self.projection.iter())
                .map(|(e, p)| p / (e + ratio)),
        );
        let v = &self.vectors * scaled;
        if self.primal { v } else { x.tr_mul(&v) }
    }
}

impl BayesianRidge {
    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    /// Noise precision α after the last fit
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Weight precision λ after the last fit
    pub fn lambda(&self) -> f64 {
        self.lambda
    }
}

impl Regressor for BayesianRidge {
    fn fit(&mut self, x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>) -> Result<()> {
        let (n, d) = x.dim();
        if n == 0 {
            bail!("cannot fit on zero observations");
        }
        if y.len() != n {
            bail!("{} observations but {} targets", n, y.len());
        }

        // ── Centre ────────────────────────────────────────────────────────────
        let x_offset = x.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(d));
        let y_offset = y.sum() / n as f64;
        let xc = DMatrix::from_fn(n, d, |i, j| x[[i, j]] - x_offset[j]);
        let yc = DVector::from_iterator(n, y.iter().map(|v| v - y_offset));

        // ── Evidence maximisation ─────────────────────────────────────────────
        let spectrum = RidgeSpectrum::new(&xc, &yc);
        let var_y    = yc.norm_squared() / n as f64;

        let mut alpha  = 1.0 / (var_y + f64::EPSILON);
        let mut lambda = 1.0;
        let mut coef_old: Option<DVector<f64>> = None;

        for iter in 0..self.max_iter {
            let coef = spectrum.coef(&xc, lambda / alpha);
            let rmse = (&yc - &xc * &coef).norm_squared();

            let gamma: f64 = spectrum
                .eigenvalues
                .iter()
                .map(|e| alpha * e / (lambda + alpha * e))
                .sum();
            lambda = (gamma + 2.0 * self.lambda_1) / (coef.norm_squared() + 2.0 * self.lambda_2);
            alpha  = (n as f64 - gamma + 2.0 * self.alpha_1) / (rmse + 2.0 * self.alpha_2);

            if let Some(old) = &coef_old {
                if (old - &coef).abs().sum() < self.tol {
                    tracing::trace!("Bayesian ridge converged after {} iterations", iter);
                    break;
                }
            }
            coef_old = Some(coef);
        }

        // final weights with the last hyper-parameters
        let coef = spectrum.coef(&xc, lambda / alpha);

        self.coef      = Array1::from_iter(coef.iter().copied());
        self.intercept = y_offset - x_offset.dot(&self.coef);
        self.alpha     = alpha;
        self.lambda    = lambda;
        Ok(())
    }

    fn predict(&self, x: ArrayView1<'_, f64>) -> f64 {
        x.dot(&self.coef) + self.intercept
    }

    fn coef(&self) -> ArrayView1<'_, f64> {
        self.coef.view()
    }
}
