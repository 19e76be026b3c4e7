// ============================================================
// Layer 2 - Human Judgement Benchmarks
// ============================================================
// Compares model representations with two external sets of
// human similarity judgements. Both keep their own feature
// folder because they use images outside the stimulus set.
//
//   NightsUseCase        data/nights_features/*.npy
//                        agreement with NIGHTS triplet votes
//                        → data/nights/nights.json
//
//   PetersonUseCase      data/peterson_features/*.npy
//                        mean Spearman ρ between model cosine
//                        similarities and human ratings over
//                        fruits, vegetables, animals
//                        → data/peterson/peterson_correlations.json
//
//   PruneNightsUseCase   deletes NIGHTS images no kept triplet
//                        refers to

use anyhow::{anyhow, Context, Result};
use ndarray::{Array1, Axis};
use std::{
    collections::{BTreeMap, HashSet},
    fs,
    path::{Path, PathBuf},
};
use walkdir::WalkDir;

use crate::application::config::Study;
use crate::data::{
    nights::{load_triplets, Triplet},
    peterson::{load_datasets, CATEGORIES},
    stimuli::{read_file_names, strip_after, StimulusIndex},
};
use crate::infra::{
    feature_store::{list_features, load_matrix},
    results::write_json,
};
use crate::rsa::{
    agreement::{agreement_rate, IndexedTriplet},
    correlation::{cosine_similarity_matrix, lower_triangle, spearman},
};

fn nights_dir(study: &Study) -> PathBuf {
    study.root.results_dir("nights")
}

fn kept_triplets(study: &Study) -> Result<Vec<Triplet>> {
    load_triplets(
        &nights_dir(study).join("data.csv"),
        study.config.nights_min_votes,
    )
}

// ─── NIGHTS agreement ─────────────────────────────────────────────────────────
pub struct NightsUseCase<'a> {
    study: &'a Study,
}

impl<'a> NightsUseCase<'a> {
    pub fn new(study: &'a Study) -> Self {
        Self { study }
    }

    /// Agreement rate per representation, keyed by file stem.
    pub fn execute(&self) -> Result<BTreeMap<String, f64>> {
        let features_dir = self.study.root.results_dir("nights_features");
        let triplets     = kept_triplets(self.study)?;

        let prefix = &self.study.config.nights_path_prefix;
        let names  = read_file_names(&features_dir.join("file_names.txt"))?
            .iter()
            .map(|line| strip_after(line, prefix))
            .collect();
        let index = StimulusIndex::from_names(names);

        let indexed = triplets
            .iter()
            .map(|t| {
                Ok(IndexedTriplet {
                    reference:  index.position(&t.ref_path)?,
                    left:       index.position(&t.left_path)?,
                    right:      index.position(&t.right_path)?,
                    human_left: t.human_left,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut results = BTreeMap::new();
        for (stem, path) in list_features(&features_dir)? {
            let embeddings = load_matrix(&path)?;
            let rate = agreement_rate(embeddings.view(), &indexed)
                .with_context(|| format!("In '{}'", path.display()))?;
            tracing::info!("{}: {:.3}", stem, rate);
            results.insert(stem, rate);
        }

        write_json(&nights_dir(self.study).join("nights.json"), &results)?;
        Ok(results)
    }
}

// ─── Peterson correlations ────────────────────────────────────────────────────
pub struct PetersonUseCase<'a> {
    study: &'a Study,
}

fn base_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}

impl<'a> PetersonUseCase<'a> {
    pub fn new(study: &'a Study) -> Self {
        Self { study }
    }

    /// Mean Spearman ρ over the categories, per representation.
    pub fn execute(&self) -> Result<BTreeMap<String, f64>> {
        let root         = &self.study.root;
        let features_dir = root.results_dir("peterson_features");
        let out_dir      = root.results_dir("peterson");

        let datasets = load_datasets(&out_dir.join("datasets_peterson.json"))?;
        let index    = StimulusIndex::from_names(
            read_file_names(&features_dir.join("file_names.txt"))?
                .iter()
                .map(|line| base_name(line))
                .collect(),
        );

        // rows and human similarities per category, resolved once
        let mut categories = Vec::with_capacity(CATEGORIES.len());
        for name in CATEGORIES {
            let dataset = datasets
                .get(name)
                .ok_or_else(|| anyhow!("Peterson datasets have no category '{name}'"))?;
            let rows  = index.positions(&dataset.file_names)?;
            let human = Array1::from(lower_triangle(dataset.similarity.view()));
            categories.push((rows, human));
        }

        let mut results = BTreeMap::new();
        for (stem, path) in list_features(&features_dir)? {
            let representation = load_matrix(&path)?;

            let mut correlations = Vec::with_capacity(categories.len());
            for (rows, human) in &categories {
                let subset = representation.select(Axis(0), rows);
                let model  = Array1::from(lower_triangle(cosine_similarity_matrix(subset.view()).view()));
                correlations.push(spearman(human.view(), model.view())?);
            }

            let mean = correlations.iter().sum::<f64>() / correlations.len() as f64;
            tracing::info!("{}: mean Spearman {:.3}", stem, mean);
            results.insert(stem, mean);
        }

        write_json(&out_dir.join("peterson_correlations.json"), &results)?;
        Ok(results)
    }
}

// ─── NIGHTS pruning ───────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneReport {
    pub kept:    usize,
    pub removed: usize,
}

pub struct PruneNightsUseCase<'a> {
    study:   &'a Study,
    dry_run: bool,
}

impl<'a> PruneNightsUseCase<'a> {
    pub fn new(study: &'a Study, dry_run: bool) -> Self {
        Self { study, dry_run }
    }

    /// Remove every .png under data/nights/ that no kept triplet uses.
    /// Triplet paths are relative to data/nights/.
    pub fn execute(&self) -> Result<PruneReport> {
        let image_root = nights_dir(self.study);
        let keep: HashSet<String> = kept_triplets(self.study)?
            .into_iter()
            .flat_map(|t| [t.ref_path, t.left_path, t.right_path])
            .collect();

        let mut report = PruneReport::default();
        for entry in WalkDir::new(&image_root) {
            let entry = entry?;
            let path  = entry.path();
            if !entry.file_type().is_file() || path.extension().and_then(|e| e.to_str()) != Some("png") {
                continue;
            }

            let relative = path
                .strip_prefix(&image_root)?
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");

            if keep.contains(&relative) {
                report.kept += 1;
                continue;
            }
            if self.dry_run {
                tracing::info!("Would remove '{}'", path.display());
            } else {
                fs::remove_file(path)
                    .with_context(|| format!("Cannot remove '{}'", path.display()))?;
            }
            report.removed += 1;
        }

        tracing::info!(
            "NIGHTS images: {} kept, {} {}",
            report.kept,
            report.removed,
            if self.dry_run { "to remove" } else { "removed" }
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::config::StudyConfig;
    use crate::infra::{feature_store::save_matrix, project_root::ProjectRoot};
    use ndarray::array;

    const DATA_CSV: &str = "ref_path,left_path,right_path,left_vote,votes,is_imagenet,split\n\
        ref/000.png,distort/000_0.png,distort/000_1.png,1.0,6,False,test\n\
        ref/001.png,distort/001_0.png,distort/001_1.png,0.0,8,False,test\n\
        ref/002.png,distort/002_0.png,distort/002_1.png,1.0,3,False,test\n";

    fn study() -> (tempfile::TempDir, Study) {
        let dir   = tempfile::tempdir().unwrap();
        let study = Study { root: ProjectRoot::new(dir.path()), config: StudyConfig::default() };
        fs::create_dir_all(nights_dir(&study)).unwrap();
        fs::write(nights_dir(&study).join("data.csv"), DATA_CSV).unwrap();
        (dir, study)
    }

    #[test]
    fn test_nights_agreement() {
        let (_dir, study) = study();
        let features = study.root.results_dir("nights_features");
        fs::create_dir_all(&features).unwrap();
        fs::write(
            features.join("file_names.txt"),
            "/lab/dataset/nights/ref/000.png\n/lab/dataset/nights/distort/000_0.png\n\
             /lab/dataset/nights/distort/000_1.png\n/lab/dataset/nights/ref/001.png\n\
             /lab/dataset/nights/distort/001_0.png\n/lab/dataset/nights/distort/001_1.png\n",
        )
        .unwrap();
        // triplet 0: left closer (humans: left) → agree
        // triplet 1: left closer (humans: right) → disagree
        let emb = array![[1.0, 0.0], [0.9, 0.1], [0.0, 1.0], [1.0, 0.0], [1.0, 0.1], [0.2, 1.0]];
        save_matrix(&features.join("model.npy"), &emb).unwrap();

        let results = NightsUseCase::new(&study).execute().unwrap();
        assert_eq!(results.len(), 1);
        assert!((results["model"] - 0.5).abs() < 1e-12);
        assert!(nights_dir(&study).join("nights.json").exists());
    }

    #[test]
    fn test_prune_keeps_referenced_images() {
        let (_dir, study) = study();
        let root = nights_dir(&study);
        for rel in ["ref/000.png", "distort/000_0.png", "ref/002.png", "distort/999_1.png"] {
            let path = root.join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, b"png").unwrap();
        }

        let dry = PruneNightsUseCase::new(&study, true).execute().unwrap();
        assert_eq!(dry, PruneReport { kept: 2, removed: 2 });
        assert!(root.join("ref/002.png").exists());

        let real = PruneNightsUseCase::new(&study, false).execute().unwrap();
        assert_eq!(real, PruneReport { kept: 2, removed: 2 });
        assert!(!root.join("ref/002.png").exists());
        assert!(!root.join("distort/999_1.png").exists());
        assert!(root.join("ref/000.png").exists());
        assert!(root.join("data.csv").exists());
    }

    #[test]
    fn test_peterson_mean_correlation() {
        let (_dir, study) = study();
        let features = study.root.results_dir("peterson_features");
        let out_dir  = study.root.results_dir("peterson");
        fs::create_dir_all(&features).unwrap();
        fs::create_dir_all(&out_dir).unwrap();

        // three images per category, nine in total
        let mut lines = String::new();
        let mut json  = serde_json::Map::new();
        for name in CATEGORIES {
            let fnames: Vec<String> = (0..3).map(|i| format!("{name}_{i}.png")).collect();
            for f in &fnames {
                lines.push_str(&format!("/imgs/{f}\n"));
            }
            json.insert(
                name.to_string(),
                serde_json::json!({
                    "fnames": fnames,
                    "similarity": [[1.0, 0.9, 0.1], [0.9, 1.0, 0.5], [0.1, 0.5, 1.0]],
                }),
            );
        }
        fs::write(features.join("file_names.txt"), lines).unwrap();
        fs::write(out_dir.join("datasets_peterson.json"), serde_json::Value::Object(json).to_string()).unwrap();

        // same geometry for every category: sim(0,1) > sim(1,2) > sim(0,2)
        let block = array![[1.0, 0.0], [0.95, 0.3], [0.2, 1.0]];
        let mut emb = ndarray::Array2::zeros((9, 2));
        for c in 0..3 {
            emb.slice_mut(ndarray::s![c * 3..c * 3 + 3, ..]).assign(&block);
        }
        save_matrix(&features.join("model.npy"), &emb).unwrap();

        let results = PetersonUseCase::new(&study).execute().unwrap();
        assert!((results["model"] - 1.0).abs() < 1e-12);
        assert!(out_dir.join("peterson_correlations.json").exists());
    }
}
