// ============================================================
// Layer 6 - Feature Store
// ============================================================
// Reads and writes the cached feature arrays.
//
// Every representation in the study (model activations, the
// task embedding, the pixel baseline, ...) is stored as one
// NumPy array of shape [images, features] in data/features/.
// Row i always belongs to line i of file_names.txt.
//
// Arrays written by Python tooling are often float32, so the
// readers accept both f32 and f64 and always hand back f64.
//
// File layout:
//   data/features/
//     task.npy
//     clip_ViT-B_32.npy
//     gLocal_clip_ViT-B_32.npy
//     ...
//   data/gLocal/
//     clip_ViT-B_32.npz   ← mean, std, weights, (bias)
//
// Reference: NumPy .npy format specification
//            ndarray-npy crate documentation

use anyhow::{anyhow, bail, Context, Result};
use ndarray::{Array2, ArrayD, Ix2};
use ndarray_npy::{read_npy, write_npy, NpzReader};
use std::{
    fs::{self, File},
    path::{Path, PathBuf},
};

/// Read an array of any rank, accepting f64 or f32 element types.
pub fn load_array(path: &Path) -> Result<ArrayD<f64>> {
    if let Ok(array) = read_npy::<_, ArrayD<f64>>(path) {
        return Ok(array);
    }

    // Fall back to single precision, the default dtype of most extractors
    let array: ArrayD<f32> = read_npy(path)
        .with_context(|| format!("Cannot read feature array '{}'", path.display()))?;
    Ok(array.mapv(f64::from))
}

/// Read a 2-D [observations, features] array.
pub fn load_matrix(path: &Path) -> Result<Array2<f64>> {
    let array = load_array(path)?;
    let shape = array.shape().to_vec();
    array
        .into_dimensionality::<Ix2>()
        .map_err(|_| {
            anyhow!(
                "'{}' has shape {:?}, expected a 2-D [images, features] array",
                path.display(),
                shape
            )
        })
}

/// Write a 2-D array as f64 .npy, creating the parent directory.
pub fn save_matrix(path: &Path, array: &Array2<f64>) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create '{}'", parent.display()))?;
    }
    write_npy(path, array)
        .with_context(|| format!("Cannot write feature array '{}'", path.display()))?;

    tracing::debug!(
        "Saved {}x{} array to '{}'",
        array.nrows(),
        array.ncols(),
        path.display()
    );
    Ok(())
}

/// All `.npy` files of a directory as (stem, path), sorted by stem.
pub fn list_features(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut features = Vec::new();

    for entry in fs::read_dir(dir)
        .with_context(|| format!("Cannot read directory '{}'", dir.display()))?
    {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("npy") {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            features.push((stem.to_string(), path.clone()));
        }
    }

    features.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(features)
}

// ─── NpzArchive ───────────────────────────────────────────────────────────────
/// A `.npz` archive of named arrays (np.savez output).
pub struct NpzArchive {
    path:   PathBuf,
    reader: NpzReader<File>,
    names:  Vec<String>,
}

impl NpzArchive {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Cannot open archive '{}'", path.display()))?;
        let mut reader = NpzReader::new(file)
            .with_context(|| format!("'{}' is not a valid .npz archive", path.display()))?;
        let names = reader.names()?;
        Ok(Self { path: path.to_path_buf(), reader, names })
    }

    /// Archive members are stored as "<name>.npy"; accept either spelling.
    fn member_name(&self, name: &str) -> Option<String> {
        let with_ext = format!("{name}.npy");
        self.names
            .iter()
            .find(|n| n.as_str() == name || *n == &with_ext)
            .cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.member_name(name).is_some()
    }

    /// Read a member as f64, accepting f32 storage.
    pub fn array(&mut self, name: &str) -> Result<ArrayD<f64>> {
        let Some(member) = self.member_name(name) else {
            bail!("'{}' has no array named '{}'", self.path.display(), name);
        };

        if let Ok(array) = self.reader.by_name::<ndarray::OwnedRepr<f64>, ndarray::IxDyn>(&member) {
            return Ok(array);
        }
        let array = self
            .reader
            .by_name::<ndarray::OwnedRepr<f32>, ndarray::IxDyn>(&member)
            .with_context(|| {
                format!("Cannot read '{}' from '{}'", member, self.path.display())
            })?;
        Ok(array.mapv(f64::from))
    }

    /// Like `array`, but a missing member is `None` instead of an error.
    pub fn optional_array(&mut self, name: &str) -> Result<Option<ArrayD<f64>>> {
        if self.contains(name) {
            self.array(name).map(Some)
        } else {
            Ok(None)
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_matrix_survives_disk() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("feat.npy");
        let m    = array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]];

        save_matrix(&path, &m).unwrap();
        assert_eq!(load_matrix(&path).unwrap(), m);
    }

    #[test]
    fn test_reads_single_precision() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("f32.npy");
        let m: Array2<f32> = array![[0.5, 1.5], [2.5, 3.5]];
        write_npy(&path, &m).unwrap();

        let loaded = load_matrix(&path).unwrap();
        assert_eq!(loaded[[1, 0]], 2.5);
    }

    #[test]
    fn test_rejects_wrong_rank() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("vec.npy");
        write_npy(&path, &array![1.0f64, 2.0, 3.0]).unwrap();
        assert!(load_matrix(&path).is_err());
    }

    #[test]
    fn test_list_features_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        let m   = array![[1.0]];
        save_matrix(&dir.path().join("b.npy"), &m).unwrap();
        save_matrix(&dir.path().join("a.npy"), &m).unwrap();
        fs::write(dir.path().join("file_names.txt"), "x\n").unwrap();

        let names: Vec<String> = list_features(dir.path())
            .unwrap()
            .into_iter()
            .map(|(stem, _)| stem)
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
