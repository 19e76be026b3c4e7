// ============================================================
// Layer 4 - Text Model Backend
// ============================================================
// Language models embed a caption (or the bare object name) per
// stimulus instead of the image. `prompts` writes the inputs:
//
//   data/features/prompts.txt   "A photo of a <object>"
//   data/features/words.txt     "<object>"        (fasttext)
//
// The external embedder writes one dump per input line into
// data/temp/<save name>/, numbered like the activation dumps,
// and the same assembly applies. Text models are not listed in
// model_configs.json.

use anyhow::{bail, Context, Result};
use ndarray::Array2;
use std::path::PathBuf;

use crate::data::stimuli::read_file_names;
use crate::domain::feature_name::TextSpec;
use crate::features::{activations::assemble_dumps, FeatureBackend};
use crate::infra::project_root::ProjectRoot;

pub struct TextEmbeddings {
    spec:       TextSpec,
    inputs:     PathBuf,
    file_names: PathBuf,
    temp_dir:   PathBuf,
}

impl TextEmbeddings {
    pub fn new(root: &ProjectRoot, spec: TextSpec) -> Self {
        Self {
            inputs:     root.features_dir().join(spec.input.file_name()),
            file_names: root.file_names(),
            temp_dir:   root.temp_dir(&spec.save_name),
            spec,
        }
    }
}

impl FeatureBackend for TextEmbeddings {
    fn extract(&self) -> Result<Array2<f64>> {
        tracing::info!("Text model '{}' over {:?} inputs", self.spec.name, self.spec.input);

        let inputs = read_file_names(&self.inputs)
            .with_context(|| format!("Run `prompts` before extracting '{}'", self.spec.name))?;
        let stimuli = read_file_names(&self.file_names)?.len();
        if inputs.len() != stimuli {
            bail!(
                "'{}' has {} lines but {} stimuli are listed. Run `prompts` again.",
                self.inputs.display(),
                inputs.len(),
                stimuli
            );
        }

        if !self.temp_dir.is_dir() {
            bail!(
                "No embeddings in '{}'. Embed '{}' with '{}' first.",
                self.temp_dir.display(),
                self.inputs.display(),
                self.spec.name
            );
        }
        assemble_dumps(&self.temp_dir, inputs.len())
    }
}
