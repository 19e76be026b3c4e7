// ============================================================
// Layer 6 - Project Root
// ============================================================
// Every input and output of the study lives under one directory,
// located through the NATURALCOGSCI_ROOT environment variable.
//
// Layout used by the commands:
//
//   <root>/
//     naturalcogsci.json              ← optional StudyConfig overrides
//     stimuli/                        ← image set
//     experiments/<task>/             ← raw behavioural logs
//     data/
//       features/<name>.npy           ← cached feature arrays
//       features/file_names.txt      ← one stimulus path per line
//       human_behavioural/<task>/     ← tidy tables (all.csv, above_chance.csv)
//       temp/<model>/                 ← per-image activation dumps
//       cka/ r2/ ID/ nights/ ...      ← analysis results
//
// Reference: Rust Book §12 (Working with Environment Variables)

use anyhow::{bail, Result};
use std::path::{Path, PathBuf};

use crate::domain::task::Task;

/// Name of the environment variable pointing at the project root
pub const ROOT_ENV_VAR: &str = "NATURALCOGSCI_ROOT";

/// Resolved project root with helpers for the well-known sub-paths.
#[derive(Debug, Clone)]
pub struct ProjectRoot {
    root: PathBuf,
}

impl ProjectRoot {
    /// Use an explicit directory as the project root
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Read the project root from NATURALCOGSCI_ROOT.
    /// An unset or empty variable is an error rather than a silent default,
    /// so results never land in the working directory by accident.
    pub fn from_env() -> Result<Self> {
        match std::env::var(ROOT_ENV_VAR) {
            Ok(value) if !value.trim().is_empty() => Ok(Self::new(value)),
            _ => bail!(
                "{ROOT_ENV_VAR} is not set. Point it at the project directory \
                 (or pass --root)."
            ),
        }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn data(&self) -> PathBuf {
        self.root.join("data")
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join("naturalcogsci.json")
    }

    pub fn features_dir(&self) -> PathBuf {
        self.data().join("features")
    }

    /// Path of the cached array for a feature name.
    /// Model names such as "OpenCLIP_ViT-L-14_laion2b/s32b" contain slashes,
    /// which are flattened to underscores on disk.
    pub fn feature_path(&self, feature_name: &str) -> PathBuf {
        self.features_dir()
            .join(format!("{}.npy", feature_file_stem(feature_name)))
    }

    pub fn is_cached(&self, feature_name: &str) -> bool {
        self.feature_path(feature_name).is_file()
    }

    /// `data/features/file_names.txt` - the stimulus order of every feature array
    pub fn file_names(&self) -> PathBuf {
        self.features_dir().join("file_names.txt")
    }

    /// Tidy behavioural tables for a task
    pub fn behavioural_dir(&self, task: Task) -> PathBuf {
        self.data().join("human_behavioural").join(task.dir_name())
    }

    /// Raw experiment logs and condition files for a task
    pub fn experiment_dir(&self, task: Task) -> PathBuf {
        self.root.join("experiments").join(task.dir_name())
    }

    /// Scratch directory holding the activation dumps of one model
    pub fn temp_dir(&self, save_name: &str) -> PathBuf {
        self.data().join("temp").join(save_name)
    }

    /// Directory for one kind of analysis result, e.g. "cka" or "ID"
    pub fn results_dir(&self, kind: &str) -> PathBuf {
        self.data().join(kind)
    }
}

/// File stem used on disk for a feature name
pub fn feature_file_stem(feature_name: &str) -> String {
    feature_name.replace('/', "_")
}
