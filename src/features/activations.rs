// ============================================================
// Layer 4 - Pretrained Model Backend
// ============================================================
// Vision and language models are run by an external extractor
// that writes one activation array per stimulus into
//
//   data/temp/<save name>/<...><image number>.npy
//
// This backend checks the model against data/model_configs.json,
// then assembles those dumps into one [images, features] matrix:
//
//   1. order the dumps by the number formed by all digits in
//      their file name (image 2 before image 10)
//   2. keep the first token of every dump:
//        [batch, tokens, d] → [0, 0, :]   (CLS of a transformer)
//        [batch, d]         → [0, :]
//        [d]                → as is
//   3. require exactly one dump per stimulus
//
// A mismatched count leaves the dumps in place and saves nothing.

use anyhow::{anyhow, bail, Context, Result};
use ndarray::{s, Array1, Array2, ArrayD};
use serde::Deserialize;
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use crate::data::stimuli::read_file_names;
use crate::domain::feature_name::ModelSpec;
use crate::features::FeatureBackend;
use crate::infra::{feature_store::load_array, project_root::ProjectRoot};

/// Entry of data/model_configs.json
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// Model zoo the extractor loads from, e.g. "torchvision" or "custom"
    pub source:      String,
    /// Layer whose activations are dumped
    pub module_name: String,
}

pub fn load_model_configs(path: &Path) -> Result<HashMap<String, ModelConfig>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Cannot read model configs '{}'", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Invalid model configs '{}'", path.display()))
}

pub struct ModelActivations {
    spec:       ModelSpec,
    config:     ModelConfig,
    temp_dir:   PathBuf,
    file_names: PathBuf,
}

impl ModelActivations {
    pub fn new(root: &ProjectRoot, spec: ModelSpec) -> Result<Self> {
        let configs = load_model_configs(&root.data().join("model_configs.json"))?;
        let config  = configs
            .get(&spec.config_key)
            .cloned()
            .ok_or_else(|| anyhow!("'{}' is not listed in model_configs.json", spec.config_key))?;

        Ok(Self {
            temp_dir:   root.temp_dir(&spec.save_name),
            file_names: root.file_names(),
            spec,
            config,
        })
    }
}

/// Number formed by every digit in the file name ("img_0012.npy" → 12).
fn digit_key(path: &Path) -> u128 {
    path.file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default()
        .chars()
        .filter(char::is_ascii_digit)
        .fold(0u128, |acc, c| {
            acc.wrapping_mul(10).wrapping_add(u128::from(c as u8 - b'0'))
        })
}

/// Dumps in `dir`, ordered by image number.
fn sorted_dumps(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut dumps: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("Cannot read activation dumps in '{}'", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("npy"))
        .collect();
    dumps.sort_by_key(|p| digit_key(p));
    Ok(dumps)
}

/// First token of one activation dump.
fn first_token(array: &ArrayD<f64>) -> Result<Array1<f64>> {
    let row = match array.ndim() {
        1 => array.iter().copied().collect(),
        2 => array.slice(s![0, ..]).to_owned(),
        3 => array.slice(s![0, 0, ..]).to_owned(),
        n => bail!("unexpected activation rank {n}"),
    };
    Ok(row)
}

impl FeatureBackend for ModelActivations {
    fn extract(&self) -> Result<Array2<f64>> {
        tracing::info!(
            "Model '{}': family {}, parameters {:?}, source {}, module {}",
            self.spec.config_key,
            self.spec.family,
            self.spec.parameters,
            self.config.source,
            self.config.module_name
        );
        if self.spec.is_slip() {
            tracing::info!("SLIP checkpoint: weights from embedding_weights_and_binaries/{}.pth", self.spec.config_key);
        }

        if !self.temp_dir.is_dir() {
            bail!(
                "No activation dumps in '{}'. Run the extractor for '{}' (module {}) first.",
                self.temp_dir.display(),
                self.spec.config_key,
                self.config.module_name
            );
        }

        let expected = read_file_names(&self.file_names)?.len();
        assemble_dumps(&self.temp_dir, expected)
    }
}

/// Stack the first token of every dump in `dir` into an
/// [expected, features] matrix, in image-number order.
pub(super) fn assemble_dumps(dir: &Path, expected: usize) -> Result<Array2<f64>> {
    let dumps = sorted_dumps(dir)?;
    if dumps.len() != expected {
        bail!(
            "There are features for only {} images, expected {}. \
             Dumps in '{}' are kept and nothing is saved.",
            dumps.len(),
            expected,
            dir.display()
        );
    }

    let mut rows: Vec<Array1<f64>> = Vec::with_capacity(dumps.len());
    for (i, dump) in dumps.iter().enumerate() {
        let row = first_token(&load_array(dump)?)
            .with_context(|| format!("In '{}'", dump.display()))?;
        if let Some(first) = rows.first() {
            if first.len() != row.len() {
                bail!(
                    "'{}' has {} features, earlier dumps have {}",
                    dump.display(),
                    row.len(),
                    first.len()
                );
            }
        }
        rows.push(row);
        if (i + 1) % 5000 == 0 {
            tracing::info!("Assembled {}/{} activation dumps", i + 1, dumps.len());
        }
    }

    let width = rows.first().map_or(0, |r| r.len());
    let mut features = Array2::zeros((rows.len(), width));
    for (mut dst, src) in features.rows_mut().into_iter().zip(&rows) {
        dst.assign(src);
    }
    Ok(features)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array3};
    use ndarray_npy::write_npy;

    fn project(n_images: usize) -> (tempfile::TempDir, ProjectRoot) {
        let dir  = tempfile::tempdir().unwrap();
        let root = ProjectRoot::new(dir.path());
        fs::create_dir_all(root.features_dir()).unwrap();
        let lines: String = (0..n_images).map(|i| format!("/s/obj/img_{i}.jpg\n")).collect();
        fs::write(root.file_names(), lines).unwrap();
        fs::write(
            root.data().join("model_configs.json"),
            r#"{ "clip_ViT-B/32": { "source": "custom", "module_name": "visual" } }"#,
        )
        .unwrap();
        (dir, root)
    }

    #[test]
    fn test_assembles_first_tokens_in_numeric_order() {
        let (_dir, root) = project(3);
        let spec = ModelSpec::parse("clip_ViT-B/32");
        let temp = root.temp_dir(&spec.save_name);
        fs::create_dir_all(&temp).unwrap();

        for i in [0usize, 2, 10] {
            // [batch 1, tokens 2, d 2]; token 0 carries the image number
            let dump = Array3::from_shape_fn((1, 2, 2), |(_, t, f)| if t == 0 { i as f32 + f as f32 } else { -1.0 });
            write_npy(temp.join(format!("features_{i}.npy")), &dump).unwrap();
        }

        let features = ModelActivations::new(&root, spec).unwrap().extract().unwrap();
        assert_eq!(features, array![[0.0, 1.0], [2.0, 3.0], [10.0, 11.0]]);
    }

    #[test]
    fn test_count_mismatch_is_error() {
        let (_dir, root) = project(3);
        let spec = ModelSpec::parse("clip_ViT-B/32");
        let temp = root.temp_dir(&spec.save_name);
        fs::create_dir_all(&temp).unwrap();
        write_npy(temp.join("features_0.npy"), &array![[1.0f64, 2.0]]).unwrap();

        let err = ModelActivations::new(&root, spec).unwrap().extract().unwrap_err();
        assert!(err.to_string().contains("only 1 images"));
        assert!(temp.join("features_0.npy").exists());
    }

    #[test]
    fn test_unknown_model() {
        let (_dir, root) = project(1);
        assert!(ModelActivations::new(&root, ModelSpec::parse("resnet50")).is_err());
    }

    #[test]
    fn test_digit_key() {
        assert_eq!(digit_key(Path::new("temp/a/img_0012.npy")), 12);
        assert!(digit_key(Path::new("x/2.npy")) < digit_key(Path::new("x/10.npy")));
    }
}
