// ============================================================
// Layer 5 - Logistic Regression
// ============================================================
// Binary logistic regression with an L2 penalty on the weights
// (the intercept is not penalised):
//
//   min_w,b  C · Σ_i [ log(1 + e^{z_i}) - y_i z_i ]  +  ½‖w‖²
//   z_i = x_i·w + b
//
// The objective is strictly convex in w, so L-BFGS from zero
// reaches the same optimum regardless of the solver path.
//
// Two pseudo-observations at the origin labelled 0 and 1 give
// w = 0, b = 0, i.e. p = 0.5 for every input. The category
// learner uses exactly that before it has seen both classes.
//
// Reference: Hastie, Tibshirani & Friedman (2009), ESL §4.4

use anyhow::{bail, Result};
use nalgebra::{DMatrix, DVector};
use ndarray::{Array1, ArrayView1, ArrayView2};

use crate::ml::estimator::Classifier;
use crate::ml::optim::{minimize, LbfgsConfig};

#[derive(Debug, Clone)]
pub struct LogisticRegression {
    /// Inverse regularisation strength
    pub c:        f64,
    pub max_iter: usize,
    coef:         Array1<f64>,
    intercept:    f64,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new(1.0, 4000)
    }
}

/// log(1 + e^z) without overflow
fn softplus(z: f64) -> f64 {
    if z > 0.0 {
        z + (-z).exp().ln_1p()
    } else {
        z.exp().ln_1p()
    }
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

impl LogisticRegression {
    pub fn new(c: f64, max_iter: usize) -> Self {
        Self { c, max_iter, coef: Array1::zeros(0), intercept: 0.0 }
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    fn decision(&self, x: ArrayView1<'_, f64>) -> f64 {
        x.dot(&self.coef) + self.intercept
    }
}

impl Classifier for LogisticRegression {
    fn fit(&mut self, x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>) -> Result<()> {
        let (n, d) = x.dim();
        if y.len() != n {
            bail!("{} observations but {} labels", n, y.len());
        }
        if y.iter().any(|&v| v != 0.0 && v != 1.0) {
            bail!("logistic regression labels must be 0 or 1");
        }

        let xm = DMatrix::from_fn(n, d, |i, j| x[[i, j]]);
        let yv = DVector::from_iterator(n, y.iter().copied());
        let c  = self.c;

        // θ = [w; b]
        let objective = |theta: &DVector<f64>| {
            let w = theta.rows(0, d);
            let b = theta[d];
            let z = &xm * w + DVector::from_element(n, b);

            let mut loss     = 0.0;
            let mut residual = DVector::zeros(n);
            for i in 0..n {
                loss        += softplus(z[i]) - yv[i] * z[i];
                residual[i]  = sigmoid(z[i]) - yv[i];
            }

            let grad_w = xm.tr_mul(&residual) * c + w;
            let mut grad = DVector::zeros(d + 1);
            grad.rows_mut(0, d).copy_from(&grad_w);
            grad[d] = c * residual.sum();

            (c * loss + 0.5 * w.norm_squared(), grad)
        };

        let cfg = LbfgsConfig { max_iter: self.max_iter, ..LbfgsConfig::default() };
        let min = minimize(objective, DVector::zeros(d + 1), &cfg);
        if min.converged {
            tracing::debug!(
                "Logistic regression converged in {} iterations, loss {:.6}",
                min.iterations,
                min.value
            );
        } else {
            tracing::debug!(
                "Logistic regression stopped after {} iterations without converging, loss {:.6}",
                min.iterations,
                min.value
            );
        }

        self.coef      = Array1::from_iter(min.x.rows(0, d).iter().copied());
        self.intercept = min.x[d];
        Ok(())
    }

    fn predict_proba(&self, x: ArrayView1<'_, f64>) -> [f64; 2] {
        let p = sigmoid(self.decision(x));
        [1.0 - p, p]
    }

    fn coef(&self) -> ArrayView1<'_, f64> {
        self.coef.view()
    }
}
