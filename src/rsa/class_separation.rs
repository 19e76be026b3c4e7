// ============================================================
// Layer 5 - Class Separation R²
// ============================================================
// How much of the cosine-distance structure of a representation
// is explained by class membership (Kornblith et al., 2021):
//
//   d_within = Σ_k  Σ_{i<j ∈ k} d(i,j)        / (K · n_k²)
//   d_total  = Σ_k Σ_l Σ_{i∈k, j∈l} d(i,j)    / (K² · n_k · n_l)
//   R²       = 1 - d_within / d_total
//
// with d the cosine distance 1 - cos(x_i, x_j).
//
// The pairwise sums never materialise an n×n distance matrix.
// With unit rows u and class sums s_k = Σ_{i∈k} u_i:
//
//   Σ_{i∈k, j∈l} d(i,j) = n_k·n_l - s_k·s_l
//   Σ_{i<j ∈ k}  d(i,j) = (n_k² - ‖s_k‖²) / 2
//
// so the cost is one pass over the rows plus K² dot products.
// A zero row has no direction; its NaN propagates to the result.
//
// Reference: Kornblith et al. (2021) Why Do Better Loss Functions
//            Lead to Less Transferable Features?

use anyhow::{bail, Result};
use ndarray::{Array1, ArrayView1, ArrayView2};
use std::{cmp::Ordering, collections::BTreeMap};

/// Class-separation R² of the rows of `x` under `labels`.
pub fn class_separation(x: ArrayView2<'_, f64>, labels: &[usize]) -> Result<f64> {
    if labels.len() != x.nrows() {
        bail!("{} observations but {} class labels", x.nrows(), labels.len());
    }
    if x.nrows() == 0 {
        bail!("class separation needs at least one observation");
    }

    // ── Per-class sums of unit vectors ───────────────────────────────────────
    let mut classes: BTreeMap<usize, (f64, Array1<f64>)> = BTreeMap::new();
    for (row, &label) in x.rows().into_iter().zip(labels) {
        let norm = row.dot(&row).sqrt();
        let unit = &row / norm;
        let entry = classes
            .entry(label)
            .or_insert_with(|| (0.0, Array1::zeros(x.ncols())));
        entry.0 += 1.0;
        entry.1 += &unit;
    }

    let k = classes.len() as f64;
    let groups: Vec<&(f64, Array1<f64>)> = classes.values().collect();

    // ── Within ───────────────────────────────────────────────────────────────
    let d_within: f64 = groups
        .iter()
        .map(|(n, s)| (n * n - s.dot(s)) / 2.0 / (k * n * n))
        .sum();

    // ── Total ────────────────────────────────────────────────────────────────
    let mut d_total = 0.0;
    for (n1, s1) in &groups {
        for (n2, s2) in &groups {
            d_total += (n1 * n2 - s1.dot(s2)) / (k * k * n1 * n2);
        }
    }

    Ok(1.0 - d_within / d_total)
}

fn compare_rows(a: &ArrayView1<'_, f64>, b: &ArrayView1<'_, f64>) -> Ordering {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| x.total_cmp(y))
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
}

/// Label every row by the index of its value among the sorted unique rows.
///
/// Objects share their task-embedding row, so this turns the task
/// embedding into object-class labels.
pub fn labels_from_unique_rows(task: ArrayView2<'_, f64>) -> Vec<usize> {
    let mut unique: Vec<ArrayView1<'_, f64>> = task.rows().into_iter().collect();
    unique.sort_by(compare_rows);
    unique.dedup_by(|a, b| compare_rows(a, b).is_eq());

    task.rows()
        .into_iter()
        .map(|row| {
            unique
                .binary_search_by(|probe| compare_rows(probe, &row))
                .unwrap_or_default()
        })
        .collect()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    fn cosine_distance(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
        1.0 - a.dot(&b) / (a.dot(&a).sqrt() * b.dot(&b).sqrt())
    }

    /// Direct evaluation of the pairwise sums
    fn brute_force(x: &Array2<f64>, labels: &[usize]) -> f64 {
        let mut classes: Vec<usize> = labels.to_vec();
        classes.sort_unstable();
        classes.dedup();
        let k = classes.len() as f64;
        let members = |c: usize| -> Vec<usize> {
            (0..labels.len()).filter(|&i| labels[i] == c).collect()
        };

        let mut within = 0.0;
        for &c in &classes {
            let m = members(c);
            let n = m.len() as f64;
            let mut sum = 0.0;
            for a in 0..m.len() {
                for b in a + 1..m.len() {
                    sum += cosine_distance(x.row(m[a]), x.row(m[b]));
                }
            }
            within += sum / (k * n * n);
        }

        let mut total = 0.0;
        for &c1 in &classes {
            for &c2 in &classes {
                let (m1, m2) = (members(c1), members(c2));
                let mut sum = 0.0;
                for &i in &m1 {
                    for &j in &m2 {
                        sum += cosine_distance(x.row(i), x.row(j));
                    }
                }
                total += sum / (k * k * m1.len() as f64 * m2.len() as f64);
            }
        }
        1.0 - within / total
    }

    #[test]
    fn test_matches_pairwise_definition() {
        let x = Array2::from_shape_fn((9, 4), |(i, j)| ((i * 4 + j) as f64 * 1.3).sin() + 0.2);
        let labels = [0, 0, 1, 2, 1, 0, 2, 2, 1];
        let fast = class_separation(x.view(), &labels).unwrap();
        assert!((fast - brute_force(&x, &labels)).abs() < 1e-10);
    }

    #[test]
    fn test_orthogonal_clusters_fully_separated() {
        let x = array![[1.0, 0.0], [2.0, 0.0], [0.0, 1.0], [0.0, 3.0]];
        let r2 = class_separation(x.view(), &[0, 0, 1, 1]).unwrap();
        assert!((r2 - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_row_gives_nan() {
        let x = array![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]];
        assert!(class_separation(x.view(), &[0, 0, 1]).unwrap().is_nan());
    }

    #[test]
    fn test_label_count_mismatch() {
        let x = array![[1.0, 0.0], [0.0, 1.0]];
        assert!(class_separation(x.view(), &[0]).is_err());
    }

    #[test]
    fn test_labels_from_unique_rows_sorted() {
        let task = array![[0.5, 1.0], [0.1, 2.0], [0.5, 1.0], [0.5, 0.0]];
        // sorted unique rows: [0.1,2.0], [0.5,0.0], [0.5,1.0]
        assert_eq!(labels_from_unique_rows(task.view()), vec![2, 0, 2, 1]);
    }
}
