// ============================================================
// Layer 5 - Intrinsic Dimensionality (TwoNN)
// ============================================================
// Estimates the dimension of the manifold a point cloud lies on
// from nearest-neighbour distance ratios (Facco et al., 2017).
//
// Pipeline:
//   1. drop duplicate rows (a zero first-neighbour distance
//      would make the ratio infinite)
//   2. min-max scale every column to [0, 1]
//   3. μ_i = r₂(i) / r₁(i), the ratio of the distances to the
//      second and first nearest neighbour
//   4. sort μ, keep the smallest ⌊N·(1 - f)⌋
//   5. F_emp(i) = i / N
//   6. d = slope through the origin of  -ln(1 - F_emp)  on  ln μ
//
// Nearest neighbours are found by brute force; rows are
// processed in parallel with rayon.
//
// Reference: Facco et al. (2017) Estimating the intrinsic dimension
//            of datasets by a minimal neighborhood information

use anyhow::{bail, Result};
use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use rayon::prelude::*;
use std::collections::HashSet;

/// Unique rows of `x`, in first-seen order.
fn unique_rows(x: ArrayView2<'_, f64>) -> Array2<f64> {
    let mut keys = HashSet::with_capacity(x.nrows());
    let mut seen: Vec<ArrayView1<'_, f64>> = Vec::new();
    for row in x.rows() {
        // + 0.0 folds -0.0 into 0.0
        let key: Vec<u64> = row.iter().map(|v| (v + 0.0).to_bits()).collect();
        if keys.insert(key) {
            seen.push(row);
        }
    }

    let mut out = Array2::zeros((seen.len(), x.ncols()));
    for (mut dst, src) in out.rows_mut().into_iter().zip(seen) {
        dst.assign(&src);
    }
    out
}

/// Scale every column to [0, 1]; constant columns become 0.
fn min_max_scale(mut x: Array2<f64>) -> Array2<f64> {
    for mut col in x.axis_iter_mut(Axis(1)) {
        let min = col.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = col.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let range = max - min;
        if range > 0.0 {
            col.mapv_inplace(|v| (v - min) / range);
        } else {
            col.fill(0.0);
        }
    }
    x
}

fn squared_distance(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// r₂ / r₁ for every row.
fn neighbour_ratios(x: &Array2<f64>) -> Vec<f64> {
    (0..x.nrows())
        .into_par_iter()
        .map(|i| {
            let (mut r1, mut r2) = (f64::INFINITY, f64::INFINITY);
            for j in 0..x.nrows() {
                if i == j {
                    continue;
                }
                let d = squared_distance(x.row(i), x.row(j));
                if d < r1 {
                    r2 = r1;
                    r1 = d;
                } else if d < r2 {
                    r2 = d;
                }
            }
            (r2 / r1).sqrt()
        })
        .collect()
}

/// TwoNN intrinsic dimension of the rows of `x`.
pub fn intrinsic_dimension(x: ArrayView2<'_, f64>, discard_fraction: f64) -> Result<f64> {
    if !(0.0..1.0).contains(&discard_fraction) {
        bail!("discard fraction must lie in [0, 1), got {discard_fraction}");
    }

    let data = min_max_scale(unique_rows(x));
    let n    = data.nrows();
    if n < 3 {
        bail!("TwoNN needs at least 3 distinct observations, got {n}");
    }

    let mut mu = neighbour_ratios(&data);
    mu.sort_by(|a, b| a.total_cmp(b));

    let keep = (n as f64 * (1.0 - discard_fraction)) as usize;
    let (mut sxy, mut sxx) = (0.0, 0.0);
    for (i, ratio) in mu.iter().take(keep).enumerate() {
        let f_emp = i as f64 / n as f64;
        let xi = ratio.ln();
        let yi = -(1.0 - f_emp).ln();
        sxy += xi * yi;
        sxx += xi * xi;
    }

    tracing::debug!("TwoNN on {} unique points, {} ratios kept", n, keep);
    Ok(sxy / sxx)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn random_cloud(n: usize, intrinsic: usize, ambient: usize, seed: u64) -> Array2<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        let latent = Array2::from_shape_fn((n, intrinsic), |_| rng.gen::<f64>());
        // embed linearly into a larger space
        let embed = Array2::from_shape_fn((intrinsic, ambient), |_| rng.gen::<f64>() - 0.5);
        latent.dot(&embed)
    }

    #[test]
    fn test_plane_in_higher_space() {
        let x = random_cloud(800, 2, 6, 7);
        let d = intrinsic_dimension(x.view(), 0.1).unwrap();
        assert!((d - 2.0).abs() < 0.4, "estimated {d}");
    }

    #[test]
    fn test_higher_intrinsic_dimension_estimates_higher() {
        let low  = intrinsic_dimension(random_cloud(600, 2, 8, 1).view(), 0.1).unwrap();
        let high = intrinsic_dimension(random_cloud(600, 5, 8, 1).view(), 0.1).unwrap();
        assert!(high > low + 1.5, "low {low}, high {high}");
    }

    #[test]
    fn test_duplicates_are_removed() {
        let x = array![[0.0, 0.0], [1.0, 0.0], [1.0, 0.0], [0.0, 2.0], [3.0, 1.0]];
        assert_eq!(unique_rows(x.view()), array![[0.0, 0.0], [1.0, 0.0], [0.0, 2.0], [3.0, 1.0]]);
        assert!(intrinsic_dimension(x.view(), 0.1).unwrap().is_finite());
    }

    #[test]
    fn test_signed_zero_rows_are_duplicates() {
        let x = array![[-0.0, 1.0], [2.0, 2.0], [0.0, 1.0]];
        assert_eq!(unique_rows(x.view()), array![[-0.0, 1.0], [2.0, 2.0]]);
    }

    #[test]
    fn test_min_max_scale_constant_column() {
        let x = min_max_scale(array![[1.0, 5.0], [3.0, 5.0], [2.0, 5.0]]);
        assert_eq!(x, array![[0.0, 0.0], [1.0, 0.0], [0.5, 0.0]]);
    }

    #[test]
    fn test_too_few_points() {
        let x = array![[0.0, 1.0], [1.0, 0.0], [0.0, 1.0]];
        assert!(intrinsic_dimension(x.view(), 0.1).is_err());
    }
}
