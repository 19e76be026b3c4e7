// ============================================================
// Layer 2 - Representational Similarity Use Cases
// ============================================================
// Batch analyses over the cached feature arrays:
//
//   CkaUseCase             every (or one) feature vs a target
//                          → data/cka/target_<target>.csv
//   ClassSeparationUseCase R² of one feature, object classes taken
//                          from the task embedding
//                          → data/r2/<features>.csv
//   IntrinsicDimUseCase    TwoNN estimate per feature file
//                          → data/ID/<features>.csv
//
// Class separation and intrinsic dimension are slow on the full
// image set, so an existing result file is never recomputed.

use anyhow::{bail, Result};
use serde::Serialize;
use std::path::PathBuf;

use crate::application::config::Study;
use crate::infra::{
    feature_store::{list_features, load_matrix},
    project_root::feature_file_stem,
    results::write_csv,
};
use crate::rsa::{
    cka::cka,
    class_separation::{class_separation, labels_from_unique_rows},
    intrinsic_dim::intrinsic_dimension,
};

/// Feature name the object classes are derived from
const TASK_FEATURES: &str = "task";

/// (stem, path) of one named feature, or of every cached feature.
fn feature_files(study: &Study, features: Option<&str>) -> Result<Vec<(String, PathBuf)>> {
    match features {
        Some(name) => {
            let path = study.root.feature_path(name);
            if !path.is_file() {
                bail!("'{}' has not been extracted ({} missing)", name, path.display());
            }
            Ok(vec![(feature_file_stem(name), path)])
        }
        None => list_features(&study.root.features_dir()),
    }
}

// ─── CKA ──────────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CkaRow {
    pub feature: String,
    pub cka:     f64,
}

#[derive(Debug, Clone)]
pub struct CkaRequest {
    /// None compares every cached feature
    pub features: Option<String>,
    pub target:   String,
}

pub struct CkaUseCase<'a> {
    study:   &'a Study,
    request: CkaRequest,
}

impl<'a> CkaUseCase<'a> {
    pub fn new(study: &'a Study, request: CkaRequest) -> Self {
        Self { study, request }
    }

    pub fn execute(&self) -> Result<(PathBuf, Vec<CkaRow>)> {
        let target = load_matrix(&self.study.root.feature_path(&self.request.target))?;
        let files  = feature_files(self.study, self.request.features.as_deref())?;

        let mut rows = Vec::with_capacity(files.len());
        for (stem, path) in files {
            let value = cka(load_matrix(&path)?.view(), target.view())?;
            tracing::info!("CKA({}, {}) = {:.4}", stem, self.request.target, value);
            rows.push(CkaRow { feature: stem, cka: value });
        }

        let out = self
            .study
            .root
            .results_dir("cka")
            .join(format!("target_{}.csv", feature_file_stem(&self.request.target)));
        write_csv(&out, &rows)?;
        Ok((out, rows))
    }
}

// ─── Class separation ─────────────────────────────────────────────────────────
#[derive(Debug, Clone, Serialize)]
struct R2Row {
    r2: f64,
}

pub struct ClassSeparationUseCase<'a> {
    study:    &'a Study,
    features: String,
}

impl<'a> ClassSeparationUseCase<'a> {
    pub fn new(study: &'a Study, features: String) -> Self {
        Self { study, features }
    }

    /// Some(R²) when computed, None when a result already exists.
    pub fn execute(&self) -> Result<Option<f64>> {
        let root = &self.study.root;
        let out  = root
            .results_dir("r2")
            .join(format!("{}.csv", feature_file_stem(&self.features)));
        if out.exists() {
            tracing::info!("{} already extracted", self.features);
            return Ok(None);
        }

        let features = load_matrix(&root.feature_path(&self.features))?;
        let task     = load_matrix(&root.feature_path(TASK_FEATURES))?;
        if task.nrows() != features.nrows() {
            bail!(
                "'{}' has {} rows but the task embedding has {}",
                self.features,
                features.nrows(),
                task.nrows()
            );
        }

        let labels = labels_from_unique_rows(task.view());
        let r2     = class_separation(features.view(), &labels)?;
        write_csv(&out, &[R2Row { r2 }])?;

        tracing::info!("{} class-separation done: R² = {:.4}", self.features, r2);
        Ok(Some(r2))
    }
}

// ─── Intrinsic dimension ──────────────────────────────────────────────────────
#[derive(Debug, Clone, Serialize)]
struct IdRow {
    #[serde(rename = "Feature")]
    feature:  String,
    #[serde(rename = "local ID")]
    local_id: f64,
}

pub struct IntrinsicDimUseCase<'a> {
    study:    &'a Study,
    features: Option<String>,
}

impl<'a> IntrinsicDimUseCase<'a> {
    pub fn new(study: &'a Study, features: Option<String>) -> Self {
        Self { study, features }
    }

    /// Estimates computed in this run; existing results are skipped.
    pub fn execute(&self) -> Result<Vec<(String, f64)>> {
        let out_dir  = self.study.root.results_dir("ID");
        let discard  = self.study.config.id_discard_fraction;
        let mut done = Vec::new();

        for (stem, path) in feature_files(self.study, self.features.as_deref())? {
            let out = out_dir.join(format!("{stem}.csv"));
            if out.exists() {
                tracing::info!("File '{}' already exists, skipping.", out.display());
                continue;
            }

            let local_id = intrinsic_dimension(load_matrix(&path)?.view(), discard)?;
            write_csv(&out, &[IdRow { feature: stem.clone(), local_id }])?;

            tracing::info!("{}: intrinsic dimension {:.2}", stem, local_id);
            done.push((stem, local_id));
        }
        Ok(done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::config::StudyConfig;
    use crate::infra::{feature_store::save_matrix, project_root::ProjectRoot};
    use ndarray::{array, Array2};
    use std::fs;

    fn study() -> (tempfile::TempDir, Study) {
        let dir   = tempfile::tempdir().unwrap();
        let study = Study { root: ProjectRoot::new(dir.path()), config: StudyConfig::default() };
        (dir, study)
    }

    #[test]
    fn test_cka_against_all_features() {
        let (_dir, study) = study();
        let x = array![[1.0, 0.0], [0.0, 1.0], [1.0, 1.0], [2.0, 0.5]];
        save_matrix(&study.root.feature_path("task"), &x).unwrap();
        save_matrix(&study.root.feature_path("scaled"), &(&x * 2.0)).unwrap();

        let request = CkaRequest { features: None, target: "task".into() };
        let (path, rows) = CkaUseCase::new(&study, request).execute().unwrap();

        assert_eq!(path, study.root.data().join("cka/target_task.csv"));
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| (r.cka - 1.0).abs() < 1e-12));
        let csv = fs::read_to_string(path).unwrap();
        assert!(csv.starts_with("feature,cka\n"));
    }

    #[test]
    fn test_class_separation_skips_existing() {
        let (_dir, study) = study();
        let task = array![[1.0, 0.0], [1.0, 0.0], [0.0, 1.0], [0.0, 1.0]];
        let feat = array![[1.0, 0.1], [2.0, 0.0], [0.0, 1.0], [0.1, 3.0]];
        save_matrix(&study.root.feature_path("task"), &task).unwrap();
        save_matrix(&study.root.feature_path("clip_ViT-B/32"), &feat).unwrap();

        let uc = ClassSeparationUseCase::new(&study, "clip_ViT-B/32".into());
        let r2 = uc.execute().unwrap().unwrap();
        assert!(r2 > 0.9 && r2 <= 1.0);
        assert!(study.root.data().join("r2/clip_ViT-B_32.csv").exists());
        assert_eq!(uc.execute().unwrap(), None);
    }

    #[test]
    fn test_intrinsic_dim_writes_one_file_per_feature() {
        let (_dir, study) = study();
        let line = Array2::from_shape_fn((60, 3), |(i, j)| {
            let t = (i as f64 * 0.37).sin() + i as f64 * 0.01;
            t * (j + 1) as f64
        });
        save_matrix(&study.root.feature_path("line"), &line).unwrap();

        let done = IntrinsicDimUseCase::new(&study, None).execute().unwrap();
        assert_eq!(done.len(), 1);
        let csv = fs::read_to_string(study.root.data().join("ID/line.csv")).unwrap();
        assert!(csv.starts_with("Feature,local ID\n"));

        // second run finds the result and skips
        assert!(IntrinsicDimUseCase::new(&study, None).execute().unwrap().is_empty());
    }
}
