// ============================================================
// Layer 5 - Estimator Traits
// ============================================================
// The sequential learners only need three things from a model:
// fit on a batch, predict one observation, expose coefficients.
// Any linear model implementing these traits can be dropped in.
//
// `fit` always starts from scratch: no state from a previous
// fit may leak into the next one. The learners refit after
// every trial and rely on that.

use anyhow::Result;
use ndarray::{ArrayView1, ArrayView2};

/// Binary classifier over labels {0, 1}.
///
/// Implementations:
///   - LogisticRegression
pub trait Classifier {
    fn fit(&mut self, x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>) -> Result<()>;

    /// [p(label = 0), p(label = 1)] for one observation
    fn predict_proba(&self, x: ArrayView1<'_, f64>) -> [f64; 2];

    /// Feature weights of the last fit
    fn coef(&self) -> ArrayView1<'_, f64>;
}

/// Scalar regressor.
///
/// Implementations:
///   - BayesianRidge
pub trait Regressor {
    fn fit(&mut self, x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>) -> Result<()>;

    fn predict(&self, x: ArrayView1<'_, f64>) -> f64;

    fn coef(&self) -> ArrayView1<'_, f64>;
}
