// ============================================================
// Layer 5 - Linear CKA
// ============================================================
// Centred kernel alignment between two representations of the
// same n observations (Kornblith et al., 2019):
//
//   X, Y column-centred
//   CKA = ‖YᵀX‖²_F / sqrt(‖XᵀX‖²_F · ‖YᵀY‖²_F)
//
// Invariant to orthogonal transforms and isotropic scaling of
// either side, so representations of different widths compare
// directly. Result lies in [0, 1].
//
// Reference: Kornblith et al. (2019) Similarity of Neural Network
//            Representations Revisited

use anyhow::{bail, Result};
use ndarray::{Array2, ArrayView2, Axis};

fn centre(x: ArrayView2<'_, f64>) -> Array2<f64> {
    match x.mean_axis(Axis(0)) {
        Some(mean) => &x - &mean,
        None       => x.to_owned(),
    }
}

fn frobenius_sq(m: &Array2<f64>) -> f64 {
    m.iter().map(|v| v * v).sum()
}

/// Linear CKA of two [observations, features] matrices.
pub fn cka(x: ArrayView2<'_, f64>, y: ArrayView2<'_, f64>) -> Result<f64> {
    if x.nrows() != y.nrows() {
        bail!(
            "CKA needs the same observations on both sides, got {} and {} rows",
            x.nrows(),
            y.nrows()
        );
    }

    let x = centre(x);
    let y = centre(y);

    let xtx = x.t().dot(&x);
    let yty = y.t().dot(&y);
    let ytx = y.t().dot(&x);

    Ok(frobenius_sq(&ytx) / (frobenius_sq(&xtx) * frobenius_sq(&yty)).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn sample() -> Array2<f64> {
        array![
            [1.0, 0.3, -2.0],
            [0.5, 1.2, 0.1],
            [-1.0, 0.0, 0.7],
            [2.2, -0.4, 1.5],
            [0.1, 0.9, -0.3],
        ]
    }

    #[test]
    fn test_self_similarity_is_one() {
        let x = sample();
        assert!((cka(x.view(), x.view()).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_invariant_to_scale_and_shift() {
        let x = sample();
        let y = &x * 3.5 + 10.0;
        assert!((cka(x.view(), y.view()).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_invariant_to_rotation() {
        let x = sample();
        let (c, s) = (0.6_f64, 0.8_f64);
        let rot = array![[c, -s, 0.0], [s, c, 0.0], [0.0, 0.0, 1.0]];
        let y = x.dot(&rot);
        assert!((cka(x.view(), y.view()).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_symmetric_and_bounded() {
        let x = sample();
        let y = array![[1.0], [0.0], [2.0], [-1.0], [0.5]];
        let a = cka(x.view(), y.view()).unwrap();
        let b = cka(y.view(), x.view()).unwrap();
        assert!((a - b).abs() < 1e-12);
        assert!((0.0..=1.0).contains(&a));
    }

    #[test]
    fn test_row_mismatch() {
        let x = sample();
        let y = Array2::<f64>::zeros((4, 2));
        assert!(cka(x.view(), y.view()).is_err());
    }
}
