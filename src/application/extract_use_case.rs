// ============================================================
// Layer 2 - ExtractUseCase
// ============================================================
// Extracts one or more feature arrays into data/features/.
//
//   Step 1: check the stimulus list exists    (Layer 6 - infra)
//   Step 2: per feature name, dispatch to the
//           matching backend and cache it      (Layer 4 - features)
//
// Already cached names are skipped unless a rerun is requested.

use anyhow::{bail, Result};
use std::path::PathBuf;

use crate::application::config::Study;
use crate::features::{extract_features, write_prompts};

#[derive(Debug, Clone)]
pub struct ExtractRequest {
    pub features:   Vec<String>,
    /// Skip names whose array already exists
    pub use_cached: bool,
}

/// Outcome of one extraction run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractReport {
    pub extracted: Vec<PathBuf>,
    pub cached:    Vec<String>,
}

pub struct ExtractUseCase<'a> {
    study:   &'a Study,
    request: ExtractRequest,
}

impl<'a> ExtractUseCase<'a> {
    pub fn new(study: &'a Study, request: ExtractRequest) -> Self {
        Self { study, request }
    }

    pub fn execute(&self) -> Result<ExtractReport> {
        let root = &self.study.root;
        if !root.file_names().is_file() {
            bail!(
                "'{}' is missing. It lists the stimuli in row order and must exist before extraction.",
                root.file_names().display()
            );
        }

        let mut report = ExtractReport::default();
        for (i, name) in self.request.features.iter().enumerate() {
            tracing::info!("[{}/{}] {}", i + 1, self.request.features.len(), name);
            match extract_features(root, &self.study.config, name, self.request.use_cached)? {
                Some(path) => report.extracted.push(path),
                None       => report.cached.push(name.clone()),
            }
        }
        Ok(report)
    }
}

/// Write the text-model captions; see `features::write_prompts`.
pub fn prompts(study: &Study) -> Result<PathBuf> {
    write_prompts(&study.root)
}
