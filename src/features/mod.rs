// ============================================================
// Layer 4 - Feature Extraction
// ============================================================
// Turns a feature name into an [images, features] array cached
// at data/features/<name>.npy. Row i always describes line i of
// data/features/file_names.txt.
//
//   task_embedding.rs - "task": SPoSE embedding of the objects
//   pca.rs            - "pca": pixel-space PCA baseline
//   glocal.rs         - "gLocal_<base>": aligned transform of a
//                       cached base feature
//   text.rs           - language models (bert, fasttext, ...):
//                       per-prompt dumps of an external embedder
//   activations.rs    - every other name: a pretrained model
//                       listed in data/model_configs.json whose
//                       activations were dumped per image
//
// Text models embed a caption (or object word) per stimulus;
// write_prompts produces those inputs for the external embedder.
//
// Reference: Rust Book §17 (Trait Objects)

pub mod task_embedding;
pub mod pca;
pub mod glocal;
pub mod activations;
pub mod text;

use anyhow::{Context, Result};
use ndarray::Array2;
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::application::config::StudyConfig;
use crate::data::stimuli::{folder_to_word, read_file_names};
use crate::domain::feature_name::{FeatureSource, TextInput};
use crate::infra::{feature_store::save_matrix, project_root::ProjectRoot};

use activations::ModelActivations;
use glocal::GLocalTransform;
use pca::PixelPca;
use task_embedding::TaskEmbedding;
use text::TextEmbeddings;

/// A source of one representation of the stimulus set.
pub trait FeatureBackend {
    /// Compute the [images, features] array.
    fn extract(&self) -> Result<Array2<f64>>;
}

/// Pick the backend a feature name dispatches to.
pub fn backend_for(
    root:         &ProjectRoot,
    cfg:          &StudyConfig,
    feature_name: &str,
) -> Result<Box<dyn FeatureBackend>> {
    let backend: Box<dyn FeatureBackend> = match FeatureSource::parse(feature_name) {
        FeatureSource::Task           => Box::new(TaskEmbedding::new(root)),
        FeatureSource::Pca            => Box::new(PixelPca::new(root, cfg)?),
        FeatureSource::GLocal { base } => Box::new(GLocalTransform::new(root, &base)),
        FeatureSource::Text(spec)     => Box::new(TextEmbeddings::new(root, spec)),
        FeatureSource::Model(spec)    => Box::new(ModelActivations::new(root, spec)?),
    };
    Ok(backend)
}

/// Extract `feature_name` and cache it.
///
/// Returns `None` when a cached array exists and `use_cached` is set,
/// otherwise the path the new array was written to.
pub fn extract_features(
    root:         &ProjectRoot,
    cfg:          &StudyConfig,
    feature_name: &str,
    use_cached:   bool,
) -> Result<Option<PathBuf>> {
    let path = root.feature_path(feature_name);
    if use_cached && root.is_cached(feature_name) {
        tracing::info!("'{}' already extracted at '{}'", feature_name, path.display());
        return Ok(None);
    }

    let features = backend_for(root, cfg, feature_name)?
        .extract()
        .with_context(|| format!("Extracting '{feature_name}' failed"))?;
    save_matrix(&path, &features)?;

    tracing::info!(
        "Saved '{}' ({}x{}) to '{}'",
        feature_name,
        features.nrows(),
        features.ncols(),
        path.display()
    );
    Ok(Some(path))
}

/// One caption per stimulus for text embedders.
pub fn prompts(file_names: &[String]) -> Vec<String> {
    folder_to_word(file_names, true)
        .into_iter()
        .map(|object| format!("A photo of a {object}"))
        .collect()
}

/// Object name per stimulus for word-level models.
pub fn words(file_names: &[String]) -> Vec<String> {
    folder_to_word(file_names, true)
}

fn write_lines(path: &Path, lines: &[String]) -> Result<()> {
    let mut text = lines.join("\n");
    text.push('\n');
    fs::write(path, text).with_context(|| format!("Cannot write '{}'", path.display()))
}

/// Write the captions to data/features/prompts.txt and the object
/// names to data/features/words.txt, one per stimulus.
pub fn write_prompts(root: &ProjectRoot) -> Result<PathBuf> {
    let file_names = read_file_names(&root.file_names())?;
    let captions   = prompts(&file_names);
    let path       = root.features_dir().join(TextInput::Prompt.file_name());

    write_lines(&path, &captions)?;
    write_lines(&root.features_dir().join(TextInput::Word.file_name()), &words(&file_names))?;

    tracing::info!("Wrote {} prompts to '{}'", captions.len(), path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn project() -> (tempfile::TempDir, ProjectRoot) {
        let dir  = tempfile::tempdir().unwrap();
        let root = ProjectRoot::new(dir.path());
        fs::create_dir_all(root.features_dir()).unwrap();
        fs::write(
            root.file_names(),
            "/x/naturalcogsci/stimuli/ice_cream2/a.jpg\n/x/naturalcogsci/stimuli/dog/b.jpg\n",
        )
        .unwrap();
        (dir, root)
    }

    #[test]
    fn test_prompts() {
        let (_dir, root) = project();
        let path = write_prompts(&root).unwrap();
        assert_eq!(
            fs::read_to_string(path).unwrap(),
            "A photo of a ice cream\nA photo of a dog\n"
        );
        assert_eq!(
            fs::read_to_string(root.features_dir().join("words.txt")).unwrap(),
            "ice cream\ndog\n"
        );
    }

    #[test]
    fn test_cached_feature_is_not_recomputed() {
        let (_dir, root) = project();
        let cfg = StudyConfig::default();
        save_matrix(&root.feature_path("task"), &array![[1.0], [2.0]]).unwrap();

        // THINGS files are missing, so any recomputation would fail
        assert_eq!(extract_features(&root, &cfg, "task", true).unwrap(), None);
        assert!(extract_features(&root, &cfg, "task", false).is_err());
    }

    #[test]
    fn test_extract_writes_cache() {
        let (_dir, root) = project();
        let cfg = StudyConfig::default();
        fs::create_dir_all(root.data().join("THINGS")).unwrap();
        fs::write(root.data().join("THINGS/unique_id.csv"), "id\ndog\nice_cream2\n").unwrap();
        fs::write(root.data().join("THINGS/spose_embedding_49d_sorted.txt"), "1 0\n0 1\n").unwrap();

        let path = extract_features(&root, &cfg, "task", true).unwrap().unwrap();
        assert_eq!(path, root.feature_path("task"));
        assert_eq!(
            crate::infra::feature_store::load_matrix(&path).unwrap(),
            array![[0.0, 1.0], [1.0, 0.0]]
        );
    }
}
