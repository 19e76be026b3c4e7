// ============================================================
// Layer 2 - SimulateUseCase
// ============================================================
// Replays every condition file of a task through a sequential
// learner that sees one feature representation of the images.
//
//   Step 1: above-chance table, stimulus index,
//           feature array                     (Layer 4 - data)
//   Step 2: per condition file, build X / y   (Layer 4 - training)
//   Step 3: fit the learner trial by trial    (Layer 5 - ml)
//   Step 4: write values and weights          (Layer 6 - infra)
//
// Output: data/simulations/<task>/<features>.csv
//         data/simulations/<task>/<features>_weights.npy
//           rows are (condition file, trial) in the CSV's order
//
// Condition files are independent, so they run in parallel.

use anyhow::{bail, Context, Result};
use ndarray::{concatenate, Array2, ArrayView2, Axis};
use rayon::prelude::*;
use serde::Serialize;
use std::path::PathBuf;

use crate::application::config::Study;
use crate::data::{
    stimuli::StimulusIndex,
    training::{condition_files, prepare_category, prepare_reward, read_table},
};
use crate::domain::{
    task::Task,
    trial::{CategoryTrial, RewardTrial},
};
use crate::infra::{
    feature_store::{load_matrix, save_matrix},
    project_root::feature_file_stem,
    results::write_csv,
};
use crate::ml::learners::{CategoryLearner, RewardLearner};

#[derive(Debug, Clone)]
pub struct SimulateRequest {
    pub task:     Task,
    pub features: String,
}

/// One simulated trial. For reward learning the values are the
/// predicted rewards of (left, right), for category learning the
/// probabilities of (category 0, category 1).
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SimulationRow {
    pub cond_file: i64,
    pub trial:     usize,
    pub value_0:   f64,
    pub value_1:   f64,
}

#[derive(Debug, Clone)]
pub struct SimulationReport {
    pub values_path:  PathBuf,
    pub weights_path: PathBuf,
    pub rows:         Vec<SimulationRow>,
}

/// Values and weights of one condition file
struct Replay {
    cond_file: i64,
    values:    Array2<f64>,
    weights:   Array2<f64>,
}

pub struct SimulateUseCase<'a> {
    study:   &'a Study,
    request: SimulateRequest,
}

impl<'a> SimulateUseCase<'a> {
    pub fn new(study: &'a Study, request: SimulateRequest) -> Self {
        Self { study, request }
    }

    pub fn execute(&self) -> Result<SimulationReport> {
        let root = &self.study.root;
        let cfg  = &self.study.config;
        let task = self.request.task;

        // ── Step 1: inputs ───────────────────────────────────────────────────
        let table     = root.behavioural_dir(task).join("above_chance.csv");
        let stimuli   = StimulusIndex::load(&root.file_names(), &cfg.stimulus_marker)?;
        if stimuli.is_empty() {
            bail!("'{}' lists no stimuli", root.file_names().display());
        }
        let embedding = load_matrix(&root.feature_path(&self.request.features))
            .with_context(|| format!("Extract '{}' first", self.request.features))?;
        if embedding.nrows() != stimuli.len() {
            bail!(
                "'{}' has {} rows but {} stimuli are listed",
                self.request.features,
                embedding.nrows(),
                stimuli.len()
            );
        }

        // ── Steps 2-3: replay each condition file ────────────────────────────
        let replays = match task {
            Task::RewardLearning => {
                let rows: Vec<RewardTrial> = read_table(&table)?;
                replay_all(&condition_files(&rows), |cond| {
                    let data = prepare_reward(&rows, cond, cfg.reward_trials, &stimuli, &embedding)?;
                    let mut learner = RewardLearner::default();
                    learner.fit(data.x.view(), data.y.view())?;
                    Ok((learner.values().to_owned(), learner.weights().to_owned()))
                })?
            }
            Task::CategoryLearning => {
                let rows: Vec<CategoryTrial> = read_table(&table)?;
                replay_all(&condition_files(&rows), |cond| {
                    let data = prepare_category(&rows, cond, cfg.category_trials, &stimuli, &embedding)?;
                    let mut learner = CategoryLearner::default();
                    learner.fit(data.x.view(), data.y.view())?;
                    Ok((learner.values().to_owned(), learner.weights().to_owned()))
                })?
            }
        };
        if replays.is_empty() {
            bail!("'{}' contains no condition files", table.display());
        }

        // ── Step 4: write ────────────────────────────────────────────────────
        let rows: Vec<SimulationRow> = replays
            .iter()
            .flat_map(|r| {
                r.values.outer_iter().enumerate().map(move |(trial, v)| SimulationRow {
                    cond_file: r.cond_file,
                    trial,
                    value_0:   v[0],
                    value_1:   v[1],
                })
            })
            .collect();
        let weight_views: Vec<ArrayView2<'_, f64>> = replays.iter().map(|r| r.weights.view()).collect();
        let weights = concatenate(Axis(0), &weight_views)?;

        let out_dir      = root.results_dir("simulations").join(task.dir_name());
        let stem         = feature_file_stem(&self.request.features);
        let values_path  = out_dir.join(format!("{stem}.csv"));
        let weights_path = out_dir.join(format!("{stem}_weights.npy"));
        write_csv(&values_path, &rows)?;
        save_matrix(&weights_path, &weights)?;

        tracing::info!(
            "Simulated {} condition files of {} with '{}'",
            replays.len(),
            task,
            self.request.features
        );
        Ok(SimulationReport { values_path, weights_path, rows })
    }
}

fn replay_all<F>(cond_files: &[i64], run: F) -> Result<Vec<Replay>>
where
    F: Fn(i64) -> Result<(Array2<f64>, Array2<f64>)> + Sync,
{
    cond_files
        .par_iter()
        .map(|&cond_file| {
            let (values, weights) =
                run(cond_file).with_context(|| format!("Condition file {cond_file}"))?;
            Ok(Replay { cond_file, values, weights })
        })
        .collect()
}
