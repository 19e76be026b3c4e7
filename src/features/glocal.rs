// ============================================================
// Layer 4 - gLocal Backend ("gLocal_<base>")
// ============================================================
// Applies a learned alignment transform to an already cached
// representation:
//
//   features = ((X - mean) / std) · W  (+ bias)
//
// X is data/features/<base>.npy, the parameters come from
// data/gLocal/<base>.npz with members mean, std, weights and an
// optional bias. mean/std/bias may be stored as [d] or [1, d].
//
// Reference: Muttenthaler et al. (2023) Improving neural network
//            representations using human similarity judgments

use anyhow::{anyhow, bail, Result};
use ndarray::{Array1, Array2, ArrayD, Ix2};
use std::path::PathBuf;

use crate::features::FeatureBackend;
use crate::infra::{
    feature_store::{load_matrix, NpzArchive},
    project_root::{feature_file_stem, ProjectRoot},
};

pub struct GLocalTransform {
    base:       String,
    features:   PathBuf,
    parameters: PathBuf,
}

impl GLocalTransform {
    pub fn new(root: &ProjectRoot, base: &str) -> Self {
        Self {
            base:       base.to_string(),
            features:   root.feature_path(base),
            parameters: root
                .data()
                .join("gLocal")
                .join(format!("{}.npz", feature_file_stem(base))),
        }
    }
}

/// Flatten a [d] or [1, d] array into a vector.
fn as_vector(name: &str, array: ArrayD<f64>) -> Result<Array1<f64>> {
    let shape = array.shape().to_vec();
    match shape.as_slice() {
        [_] | [1, _] => Ok(Array1::from_iter(array.iter().copied())),
        _ => bail!("gLocal '{name}' must be a vector, got shape {shape:?}"),
    }
}

impl FeatureBackend for GLocalTransform {
    fn extract(&self) -> Result<Array2<f64>> {
        if !self.features.is_file() {
            bail!(
                "gLocal needs the base features '{}'. Extract them first.",
                self.base
            );
        }
        let x = load_matrix(&self.features)?;

        let mut archive = NpzArchive::open(&self.parameters)?;
        let mean    = as_vector("mean", archive.array("mean")?)?;
        let std     = as_vector("std", archive.array("std")?)?;
        let weights = archive
            .array("weights")?
            .into_dimensionality::<Ix2>()
            .map_err(|_| anyhow!("gLocal 'weights' must be a matrix"))?;
        let bias = archive
            .optional_array("bias")?
            .map(|b| as_vector("bias", b))
            .transpose()?;

        if mean.len() != x.ncols() || std.len() != x.ncols() || weights.nrows() != x.ncols() {
            bail!(
                "gLocal parameters for '{}' do not fit {} feature dimensions",
                self.base,
                x.ncols()
            );
        }

        let mut out = ((&x - &mean) / &std).dot(&weights);
        if let Some(bias) = bias {
            if bias.len() != out.ncols() {
                bail!("gLocal bias has {} entries, expected {}", bias.len(), out.ncols());
            }
            out += &bias;
        }

        tracing::info!(
            "gLocal transform of '{}': {} → {} dimensions",
            self.base,
            x.ncols(),
            out.ncols()
        );
        Ok(out)
    }
}
