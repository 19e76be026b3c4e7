// ============================================================
// Layer 4 - Peterson Similarity Datasets
// ============================================================
// Human pairwise similarity ratings for three natural-image
// categories (Peterson et al., 2018). Per category: the image
// file names and a square similarity matrix in the same order.
//
// Expected file: data/peterson/datasets_peterson.json
//   { "fruits": { "fnames": [...], "similarity": [[...], ...] },
//     "vegetables": {...}, "animals": {...} }

use anyhow::{bail, Context, Result};
use ndarray::Array2;
use serde::Deserialize;
use std::{collections::BTreeMap, fs, path::Path};

/// Categories averaged into the reported correlation
pub const CATEGORIES: [&str; 3] = ["fruits", "vegetables", "animals"];

#[derive(Debug, Clone, Deserialize)]
struct RawCategory {
    fnames:     Vec<String>,
    similarity: Vec<Vec<f64>>,
}

/// One category: images and their human similarity matrix
#[derive(Debug, Clone)]
pub struct SimilarityDataset {
    pub file_names: Vec<String>,
    pub similarity: Array2<f64>,
}

pub fn load_datasets(path: &Path) -> Result<BTreeMap<String, SimilarityDataset>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Cannot read '{}'", path.display()))?;
    let raw: BTreeMap<String, RawCategory> = serde_json::from_str(&text)
        .with_context(|| format!("Invalid similarity datasets in '{}'", path.display()))?;

    let mut datasets = BTreeMap::new();
    for (name, category) in raw {
        let n = category.fnames.len();
        if category.similarity.len() != n || category.similarity.iter().any(|r| r.len() != n) {
            bail!("'{name}': similarity matrix is not {n}x{n}");
        }

        let flat: Vec<f64> = category.similarity.into_iter().flatten().collect();
        let similarity = Array2::from_shape_vec((n, n), flat)?;
        datasets.insert(name, SimilarityDataset { file_names: category.fnames, similarity });
    }
    Ok(datasets)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loads_square_matrices() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("d.json");
        fs::write(
            &path,
            r#"{ "fruits": { "fnames": ["a.jpg", "b.jpg"], "similarity": [[1, 0.2], [0.2, 1]] } }"#,
        )
        .unwrap();

        let d = load_datasets(&path).unwrap();
        assert_eq!(d["fruits"].similarity[[0, 1]], 0.2);
        assert_eq!(d["fruits"].file_names[1], "b.jpg");
    }

    #[test]
    fn test_rejects_ragged_matrix() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("d.json");
        fs::write(&path, r#"{ "animals": { "fnames": ["a"], "similarity": [[1, 2]] } }"#).unwrap();
        assert!(load_datasets(&path).is_err());
    }
}
