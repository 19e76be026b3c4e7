// ============================================================
// Layer 4 - Task Embedding Backend ("task")
// ============================================================
// The 49-dimensional SPoSE embedding of the THINGS objects,
// learned from human odd-one-out judgements. Every stimulus
// gets the embedding row of the object it depicts.
//
// Inputs:
//   data/THINGS/unique_id.csv                 column "id", one object per row
//   data/THINGS/spose_embedding_49d_sorted.txt whitespace matrix, same row order
//
// The object of a stimulus is its folder name, digits and
// underscores kept ("ice_cream2"), which is how unique_id.csv
// spells the IDs.

use anyhow::{anyhow, bail, Context, Result};
use ndarray::Array2;
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use crate::data::stimuli::{folder_to_word, read_file_names};
use crate::features::FeatureBackend;
use crate::infra::project_root::ProjectRoot;

pub struct TaskEmbedding {
    file_names: PathBuf,
    ids:        PathBuf,
    embedding:  PathBuf,
}

impl TaskEmbedding {
    pub fn new(root: &ProjectRoot) -> Self {
        let things = root.data().join("THINGS");
        Self {
            file_names: root.file_names(),
            ids:        things.join("unique_id.csv"),
            embedding:  things.join("spose_embedding_49d_sorted.txt"),
        }
    }
}

/// Values of the `id` column, in file order.
fn read_ids(path: &Path) -> Result<Vec<String>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Cannot read THINGS IDs '{}'", path.display()))?;
    let column = reader
        .headers()?
        .iter()
        .position(|h| h == "id")
        .ok_or_else(|| anyhow!("'{}' has no 'id' column", path.display()))?;

    let mut ids = Vec::new();
    for record in reader.records() {
        let record = record?;
        ids.push(record.get(column).unwrap_or_default().to_string());
    }
    Ok(ids)
}

/// Parse a whitespace-separated numeric matrix (np.savetxt format).
fn read_text_matrix(path: &Path) -> Result<Array2<f64>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Cannot read embedding '{}'", path.display()))?;

    let mut rows: Vec<Vec<f64>> = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let row = line
            .split_whitespace()
            .map(str::parse::<f64>)
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("'{}' line {}: not a number", path.display(), line_no + 1))?;
        rows.push(row);
    }

    let width = rows.first().map_or(0, Vec::len);
    if rows.iter().any(|r| r.len() != width) {
        bail!("'{}' has rows of different length", path.display());
    }
    let height = rows.len();
    Ok(Array2::from_shape_vec((height, width), rows.into_iter().flatten().collect())?)
}

impl FeatureBackend for TaskEmbedding {
    fn extract(&self) -> Result<Array2<f64>> {
        let objects   = folder_to_word(&read_file_names(&self.file_names)?, false);
        let ids       = read_ids(&self.ids)?;
        let embedding = read_text_matrix(&self.embedding)?;

        if ids.len() != embedding.nrows() {
            bail!(
                "{} THINGS IDs but {} embedding rows",
                ids.len(),
                embedding.nrows()
            );
        }

        // first occurrence wins, like a list lookup
        let mut row_of: HashMap<&str, usize> = HashMap::with_capacity(ids.len());
        for (i, id) in ids.iter().enumerate() {
            row_of.entry(id.as_str()).or_insert(i);
        }

        let mut features = Array2::zeros((objects.len(), embedding.ncols()));
        for (i, object) in objects.iter().enumerate() {
            let row = row_of
                .get(object.as_str())
                .ok_or_else(|| anyhow!("Object '{object}' has no THINGS embedding"))?;
            features.row_mut(i).assign(&embedding.row(*row));
        }

        tracing::info!(
            "Task embedding: {} stimuli, {} dimensions",
            features.nrows(),
            features.ncols()
        );
        Ok(features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_rows_follow_stimulus_objects() {
        let dir  = tempfile::tempdir().unwrap();
        let root = ProjectRoot::new(dir.path());
        fs::create_dir_all(root.features_dir()).unwrap();
        fs::create_dir_all(root.data().join("THINGS")).unwrap();

        fs::write(
            root.file_names(),
            "/x/naturalcogsci/stimuli/bat2/bat_01.jpg\n\
             /x/naturalcogsci/stimuli/aardvark/aardvark_01.jpg\n\
             /x/naturalcogsci/stimuli/bat2/bat_02.jpg\n",
        )
        .unwrap();
        fs::write(root.data().join("THINGS/unique_id.csv"), "id,name\naardvark,Aardvark\nbat2,Bat\n").unwrap();
        fs::write(
            root.data().join("THINGS/spose_embedding_49d_sorted.txt"),
            "0.1 0.2\n0.3 0.4\n",
        )
        .unwrap();

        let features = TaskEmbedding::new(&root).extract().unwrap();
        assert_eq!(features, array![[0.3, 0.4], [0.1, 0.2], [0.3, 0.4]]);
    }

    #[test]
    fn test_unknown_object() {
        let dir  = tempfile::tempdir().unwrap();
        let root = ProjectRoot::new(dir.path());
        fs::create_dir_all(root.features_dir()).unwrap();
        fs::create_dir_all(root.data().join("THINGS")).unwrap();

        fs::write(root.file_names(), "/s/zebra/zebra_01.jpg\n").unwrap();
        fs::write(root.data().join("THINGS/unique_id.csv"), "id\naardvark\n").unwrap();
        fs::write(root.data().join("THINGS/spose_embedding_49d_sorted.txt"), "1.0\n").unwrap();

        let err = TaskEmbedding::new(&root).extract().unwrap_err();
        assert!(err.to_string().contains("zebra"));
    }

    #[test]
    fn test_text_matrix_ragged_rows() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.txt");
        fs::write(&path, "1 2\n3\n").unwrap();
        assert!(read_text_matrix(&path).is_err());
    }
}
