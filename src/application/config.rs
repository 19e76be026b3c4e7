// ============================================================
// Layer 2 - Study Configuration
// ============================================================
// The constants that describe how the experiments were run.
// Defaults reproduce the published study; a JSON file at
// <root>/naturalcogsci.json may override any subset of them,
// e.g. to re-run the pipeline on a pilot with fewer trials.
//
// Example naturalcogsci.json:
//   { "reward_trials": 30, "nights_min_votes": 5 }
//
// Reference: serde documentation (#[serde(default)])

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::infra::project_root::ProjectRoot;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StudyConfig {
    /// Trials per reward-learning session
    pub reward_trials:       usize,
    /// Trials per category-learning session
    pub category_trials:     usize,
    /// Fixed pay subtracted from the final payout to get the bonus
    pub reward_base_pay:     f64,
    pub category_base_pay:   f64,
    /// Participants at or below this accuracy are dropped
    pub chance_threshold:    f64,
    /// Category name encoded as 1 in true_category_binary
    pub positive_category:   String,
    /// Stimulus paths in file_names.txt are cut after this marker
    pub stimulus_marker:     String,
    /// Triplets with fewer human votes are ignored
    pub nights_min_votes:    u32,
    /// Prefix stripped from NIGHTS feature file names
    pub nights_path_prefix:  String,
    /// Dimensionality of the pixel PCA baseline
    pub pca_components:      usize,
    /// Side length stimuli are resized to before PCA
    pub pca_image_size:      u32,
    /// Fraction of the largest TwoNN ratios discarded
    pub id_discard_fraction: f64,
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            reward_trials:       60,
            category_trials:     120,
            reward_base_pay:     2.0,
            category_base_pay:   1.5,
            chance_threshold:    0.5,
            positive_category:   "Julty".to_string(),
            stimulus_marker:     "naturalcogsci/".to_string(),
            nights_min_votes:    6,
            nights_path_prefix:  "dataset/nights/".to_string(),
            // matches the 49 dimensions of the task embedding
            pca_components:      49,
            pca_image_size:      224,
            id_discard_fraction: 0.1,
        }
    }
}

impl StudyConfig {
    /// Load overrides from `path`, or the defaults when it does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config at '{}', using defaults", path.display());
            return Ok(Self::default());
        }

        let json = fs::read_to_string(path)
            .with_context(|| format!("Cannot read config '{}'", path.display()))?;
        let cfg: Self = serde_json::from_str(&json)
            .with_context(|| format!("Invalid config '{}'", path.display()))?;

        tracing::info!("Loaded study config from '{}'", path.display());
        Ok(cfg)
    }
}

// ─── Study ────────────────────────────────────────────────────────────────────
/// Everything a use case needs to locate and interpret the data.
#[derive(Debug, Clone)]
pub struct Study {
    pub root:   ProjectRoot,
    pub config: StudyConfig,
}

impl Study {
    /// Load the config from `config_path`, or from <root>/naturalcogsci.json.
    pub fn open(root: ProjectRoot, config_path: Option<PathBuf>) -> Result<Self> {
        let path   = config_path.unwrap_or_else(|| root.config_file());
        let config = StudyConfig::load_or_default(&path)?;
        Ok(Self { root, config })
    }
}
