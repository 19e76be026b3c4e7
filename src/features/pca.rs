// ============================================================
// Layer 4 - Pixel PCA Backend ("pca")
// ============================================================
// A representation with no learning in it: the raw pixels of
// every stimulus, projected onto their first principal
// components. It has as many dimensions as the task embedding
// so the two can be compared on equal footing.
//
//   1. decode, resize to size×size (bicubic), convert to RGB
//   2. flatten → one row of size·size·3 values per image
//   3. randomised PCA (Halko et al., 2011):
//        Ω  ~ random [d, k + p]
//        Q  = orth(Xc Ω), refined by power iterations
//        B  = Qᵀ Xc,  B Bᵀ = U S² Uᵀ
//        scores = Q U S
//
// Xc (the column-centred pixels) is never formed; products
// with it subtract the mean on the fly. Pixels stay f32.
//
// Component signs follow the loading vector: its largest
// absolute entry is made positive.
//
// Reference: Halko, Martinsson & Tropp (2011) Finding Structure
//            with Randomness

use anyhow::{anyhow, bail, Context, Result};
use image::imageops::FilterType;
use nalgebra::DMatrix;
use ndarray::{Array1, Array2, Axis};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rayon::prelude::*;
use std::path::{Path, PathBuf};

use crate::application::config::StudyConfig;
use crate::data::stimuli::{read_file_names, strip_after};
use crate::features::FeatureBackend;
use crate::infra::project_root::ProjectRoot;

/// Extra random directions sampled beyond the requested components
const OVERSAMPLES: usize = 10;
const POWER_ITERATIONS: usize = 7;
const SEED: u64 = 0;

pub struct PixelPca {
    images:     Vec<PathBuf>,
    size:       u32,
    components: usize,
}

impl PixelPca {
    pub fn new(root: &ProjectRoot, cfg: &StudyConfig) -> Result<Self> {
        let images = read_file_names(&root.file_names())?
            .iter()
            .map(|line| resolve_image(root, line, &cfg.stimulus_marker))
            .collect();
        Ok(Self { images, size: cfg.pca_image_size, components: cfg.pca_components })
    }
}

/// Paths in file_names.txt may come from another machine; fall back
/// to the part after the marker, relative to the project root.
fn resolve_image(root: &ProjectRoot, line: &str, marker: &str) -> PathBuf {
    let path = PathBuf::from(line);
    if path.exists() {
        path
    } else {
        root.path().join(strip_after(line, marker))
    }
}

fn load_pixels(path: &Path, size: u32) -> Result<Vec<f32>> {
    let img = image::open(path)
        .with_context(|| format!("Cannot decode image '{}'", path.display()))?;
    let rgb = img.resize_exact(size, size, FilterType::CatmullRom).to_rgb8();
    Ok(rgb.into_raw().into_iter().map(f32::from).collect())
}

impl FeatureBackend for PixelPca {
    fn extract(&self) -> Result<Array2<f64>> {
        tracing::info!("Loading {} images at {}x{}", self.images.len(), self.size, self.size);

        let rows: Vec<Vec<f32>> = self
            .images
            .par_iter()
            .map(|p| load_pixels(p, self.size))
            .collect::<Result<_>>()?;

        let width  = (self.size * self.size * 3) as usize;
        let pixels = Array2::from_shape_vec((rows.len(), width), rows.into_iter().flatten().collect())?;

        tracing::info!("Running PCA with {} components", self.components);
        pca_scores(&pixels, self.components, SEED)
    }
}

// ─── Randomised PCA ───────────────────────────────────────────────────────────

/// Xc · M for f32 data X with column means `mean`.
fn centred_mul(x: &Array2<f32>, mean: &Array1<f32>, m: &Array2<f64>) -> Array2<f64> {
    let m32    = m.mapv(|v| v as f32);
    let offset = mean.dot(&m32).mapv(f64::from);
    x.dot(&m32).mapv(f64::from) - &offset
}

/// Xcᵀ · Q for f32 data X with column means `mean`.
fn centred_tmul(x: &Array2<f32>, mean: &Array1<f32>, q: &Array2<f64>) -> Array2<f64> {
    let q32    = q.mapv(|v| v as f32);
    let colsum = q.sum_axis(Axis(0)).insert_axis(Axis(0));
    let mean64 = mean.mapv(f64::from).insert_axis(Axis(1));
    x.t().dot(&q32).mapv(f64::from) - &(&mean64 * &colsum)
}

/// Orthonormal basis of the column space (thin QR).
fn orthonormal(a: &Array2<f64>) -> Array2<f64> {
    let (r, c) = a.dim();
    let q = DMatrix::from_fn(r, c, |i, j| a[[i, j]]).qr().q();
    Array2::from_shape_fn((q.nrows(), q.ncols()), |(i, j)| q[(i, j)])
}

/// Scores of the rows of `x` on its first `k` principal components.
pub fn pca_scores(x: &Array2<f32>, k: usize, seed: u64) -> Result<Array2<f64>> {
    let (n, d) = x.dim();
    if k == 0 || k > n.min(d) {
        bail!("cannot take {k} components of a {n}x{d} matrix");
    }

    let mean = x
        .mean_axis(Axis(0))
        .ok_or_else(|| anyhow!("PCA needs at least one observation"))?;
    let l = (k + OVERSAMPLES).min(n.min(d));

    // ── Range finder ─────────────────────────────────────────────────────────
    let mut rng = StdRng::seed_from_u64(seed);
    let omega   = Array2::from_shape_fn((d, l), |_| rng.gen::<f64>() * 2.0 - 1.0);
    let mut q   = orthonormal(&centred_mul(x, &mean, &omega));
    for _ in 0..POWER_ITERATIONS {
        let z = orthonormal(&centred_tmul(x, &mean, &q));
        q = orthonormal(&centred_mul(x, &mean, &z));
    }

    // ── Small eigenproblem ───────────────────────────────────────────────────
    // bt = Bᵀ = Xcᵀ Q,  B Bᵀ = btᵀ bt
    let bt    = centred_tmul(x, &mean, &q);
    let small = bt.t().dot(&bt);
    let eigen = DMatrix::from_fn(l, l, |i, j| small[[i, j]]).symmetric_eigen();

    let mut order: Vec<usize> = (0..l).collect();
    order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));

    let mut scores = Array2::zeros((n, k));
    for (c, &idx) in order.iter().take(k).enumerate() {
        let u = Array1::from_shape_fn(l, |i| eigen.eigenvectors[(i, idx)]);
        let s = eigen.eigenvalues[idx].max(0.0).sqrt();

        let mut column = q.dot(&u) * s;

        // loading vector ∝ Bᵀ u; only its sign pattern matters here
        let loading = bt.dot(&u);
        let largest = loading
            .iter()
            .copied()
            .max_by(|a, b| a.abs().total_cmp(&b.abs()))
            .unwrap_or(0.0);
        if largest < 0.0 {
            column.mapv_inplace(|v| -v);
        }
        scores.column_mut(c).assign(&column);
    }
    Ok(scores)
}
