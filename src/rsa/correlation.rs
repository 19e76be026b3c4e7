// ============================================================
// Layer 5 - Rank Correlation
// ============================================================
// Spearman's ρ between two similarity vectors: the Pearson
// correlation of their ranks, with tied values sharing the
// average of the ranks they span.

use anyhow::{bail, Result};
use ndarray::{Array2, ArrayView1, ArrayView2};

/// Average ranks (1-based) of the values in `v`.
pub fn rank(v: ArrayView1<'_, f64>) -> Vec<f64> {
    let mut order: Vec<usize> = (0..v.len()).collect();
    order.sort_by(|&a, &b| v[a].total_cmp(&v[b]));

    let mut ranks = vec![0.0; v.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && v[order[end]] == v[order[start]] {
            end += 1;
        }
        // positions start..end hold ranks start+1 ..= end
        let avg = (start + 1 + end) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = avg;
        }
        start = end;
    }
    ranks
}

fn pearson(a: &[f64], b: &[f64]) -> f64 {
    let n      = a.len() as f64;
    let mean_a = a.iter().sum::<f64>() / n;
    let mean_b = b.iter().sum::<f64>() / n;

    let (mut cov, mut var_a, mut var_b) = (0.0, 0.0, 0.0);
    for (x, y) in a.iter().zip(b) {
        let (dx, dy) = (x - mean_a, y - mean_b);
        cov   += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }
    cov / (var_a * var_b).sqrt()
}

/// Spearman rank correlation. NaN when either side is constant.
pub fn spearman(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> Result<f64> {
    if a.len() != b.len() {
        bail!("cannot correlate vectors of length {} and {}", a.len(), b.len());
    }
    if a.len() < 2 {
        bail!("rank correlation needs at least two values");
    }
    Ok(pearson(&rank(a), &rank(b)))
}

/// Entries strictly below the diagonal, row by row.
pub fn lower_triangle(m: ArrayView2<'_, f64>) -> Vec<f64> {
    let mut out = Vec::with_capacity(m.nrows() * m.nrows().saturating_sub(1) / 2);
    for i in 0..m.nrows() {
        for j in 0..i.min(m.ncols()) {
            out.push(m[[i, j]]);
        }
    }
    out
}

/// Pairwise cosine similarity between the rows of `x`.
pub fn cosine_similarity_matrix(x: ArrayView2<'_, f64>) -> Array2<f64> {
    let norms: Vec<f64> = x.rows().into_iter().map(|r| r.dot(&r).sqrt()).collect();
    let gram = x.dot(&x.t());
    Array2::from_shape_fn(gram.dim(), |(i, j)| {
        let norm = norms[i] * norms[j];
        if norm == 0.0 { 0.0 } else { gram[[i, j]] / norm }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_average_ranks_for_ties() {
        assert_eq!(rank(array![10.0, 20.0, 10.0, 5.0].view()), vec![2.5, 4.0, 2.5, 1.0]);
    }

    #[test]
    fn test_spearman_monotonic() {
        let a = array![1.0, 2.0, 3.0, 4.0, 5.0];
        let b = a.mapv(|v: f64| v.powi(3));
        assert!((spearman(a.view(), b.view()).unwrap() - 1.0).abs() < 1e-12);
        let c = a.mapv(|v| -v);
        assert!((spearman(a.view(), c.view()).unwrap() + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_spearman_with_ties() {
        // ranks a = [1, 2.5, 2.5, 4], b = [1, 2, 3, 4]
        let a = array![0.1, 0.5, 0.5, 0.9];
        let b = array![1.0, 2.0, 3.0, 4.0];
        let rho = spearman(a.view(), b.view()).unwrap();
        assert!((rho - 4.5 / (4.5f64 * 5.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_lower_triangle_order() {
        let m = array![[0.0, 9.0, 9.0], [1.0, 0.0, 9.0], [2.0, 3.0, 0.0]];
        assert_eq!(lower_triangle(m.view()), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_cosine_similarity_matrix() {
        let x = array![[1.0, 0.0], [1.0, 1.0], [0.0, 0.0]];
        let s = cosine_similarity_matrix(x.view());
        assert!((s[[0, 0]] - 1.0).abs() < 1e-12);
        assert!((s[[0, 1]] - 1.0 / 2f64.sqrt()).abs() < 1e-12);
        assert_eq!(s[[2, 1]], 0.0);
    }
}
