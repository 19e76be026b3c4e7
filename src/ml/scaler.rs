// ============================================================
// Layer 5 - Standard Scaler
// ============================================================
// z = (x - mean) / std, per feature.
//
// std is the population standard deviation (ddof = 0). A
// feature that is constant in the training data has std 0;
// it is divided by 1 instead, which maps it to exactly 0.

use anyhow::{anyhow, Result};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    mean: Array1<f64>,
    std:  Array1<f64>,
}

impl StandardScaler {
    /// The no-op scaling used before anything has been observed
    pub fn identity(n_features: usize) -> Self {
        Self {
            mean: Array1::zeros(n_features),
            std:  Array1::ones(n_features),
        }
    }

    /// Estimate mean and std from the rows of `x`.
    pub fn fit(x: ArrayView2<'_, f64>) -> Result<Self> {
        let mean = x
            .mean_axis(Axis(0))
            .ok_or_else(|| anyhow!("cannot fit a scaler on zero observations"))?;
        let std = x
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s == 0.0 { 1.0 } else { s });
        Ok(Self { mean, std })
    }

    pub fn mean(&self) -> ArrayView1<'_, f64> {
        self.mean.view()
    }

    pub fn std(&self) -> ArrayView1<'_, f64> {
        self.std.view()
    }

    pub fn transform_row(&self, x: ArrayView1<'_, f64>) -> Array1<f64> {
        (&x - &self.mean) / &self.std
    }

    pub fn transform(&self, x: ArrayView2<'_, f64>) -> Array2<f64> {
        (&x - &self.mean) / &self.std
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_population_std_and_constant_column() {
        let x = array![[1.0, 5.0], [3.0, 5.0]];
        let s = StandardScaler::fit(x.view()).unwrap();

        assert_eq!(s.mean(), array![2.0, 5.0].view());
        assert_eq!(s.std(), array![1.0, 1.0].view());
        assert_eq!(s.transform(x.view()), array![[-1.0, 0.0], [1.0, 0.0]]);
    }

    #[test]
    fn test_identity_is_noop() {
        let s = StandardScaler::identity(3);
        let x = array![1.5, -2.0, 0.0];
        assert_eq!(s.transform_row(x.view()), x);
    }

    #[test]
    fn test_empty_input_rejected() {
        let x = Array2::<f64>::zeros((0, 2));
        assert!(StandardScaler::fit(x.view()).is_err());
    }
}
