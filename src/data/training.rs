// ============================================================
// Layer 4 - Training Arrays
// ============================================================
// Builds the observation/target arrays the sequential learners
// replay, for one condition file (= one stimulus sequence):
//
//   reward_learning
//     X: [trials, 2, features]   option 0 = left, 1 = right
//     y: [trials, 2]             reward of each option
//
//   category_learning
//     X: [trials, features]
//     y: [trials]                true_category_binary
//
// Rows come from above_chance.csv. All participants assigned to a
// condition file saw the same sequence, so the first `trials` rows
// of that condition file define it.

use anyhow::{bail, Context, Result};
use ndarray::{Array1, Array2, Array3, Axis};
use serde::de::DeserializeOwned;
use std::{collections::BTreeSet, path::Path};

use crate::data::stimuli::StimulusIndex;
use crate::domain::{
    traits::TrialRow,
    trial::{CategoryTrial, RewardTrial},
};

/// Read a tidy table written by the chance filter.
pub fn read_table<R: DeserializeOwned>(path: &Path) -> Result<Vec<R>> {
    let mut reader = csv::Reader::from_path(path).with_context(|| {
        format!("Cannot read '{}'. Run `parse` for this task first.", path.display())
    })?;
    reader
        .deserialize()
        .collect::<Result<Vec<R>, _>>()
        .with_context(|| format!("Malformed table '{}'", path.display()))
}

/// Distinct condition files present in a table, ascending.
pub fn condition_files<R: TrialRow>(rows: &[R]) -> Vec<i64> {
    rows.iter()
        .map(|r| r.cond_file())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// First `trials` rows of one condition file.
fn sequence<R: TrialRow>(rows: &[R], cond_file: i64, trials: usize) -> Result<Vec<&R>> {
    let seq: Vec<&R> = rows
        .iter()
        .filter(|r| r.cond_file() == cond_file)
        .take(trials)
        .collect();
    if seq.len() < trials {
        bail!(
            "Condition file {cond_file} has {} trials, expected {trials}",
            seq.len()
        );
    }
    Ok(seq)
}

/// Observations and rewards of the reward-learning task
#[derive(Debug, Clone)]
pub struct RewardTraining {
    pub x: Array3<f64>,
    pub y: Array2<f64>,
}

/// Observations and labels of the category-learning task
#[derive(Debug, Clone)]
pub struct CategoryTraining {
    pub x: Array2<f64>,
    pub y: Array1<f64>,
}

pub fn prepare_reward(
    rows:      &[RewardTrial],
    cond_file: i64,
    trials:    usize,
    stimuli:   &StimulusIndex,
    embedding: &Array2<f64>,
) -> Result<RewardTraining> {
    let seq = sequence(rows, cond_file, trials)?;

    let left:  Vec<&str> = seq.iter().map(|r| r.left_image.as_str()).collect();
    let right: Vec<&str> = seq.iter().map(|r| r.right_image.as_str()).collect();
    let left_rows  = embedding.select(Axis(0), &stimuli.positions(&left)?);
    let right_rows = embedding.select(Axis(0), &stimuli.positions(&right)?);

    let mut x = Array3::zeros((trials, 2, embedding.ncols()));
    x.index_axis_mut(Axis(1), 0).assign(&left_rows);
    x.index_axis_mut(Axis(1), 1).assign(&right_rows);

    let mut y = Array2::zeros((trials, 2));
    for (t, r) in seq.iter().enumerate() {
        y[[t, 0]] = r.left_reward;
        y[[t, 1]] = r.right_reward;
    }

    Ok(RewardTraining { x, y })
}

pub fn prepare_category(
    rows:      &[CategoryTrial],
    cond_file: i64,
    trials:    usize,
    stimuli:   &StimulusIndex,
    embedding: &Array2<f64>,
) -> Result<CategoryTraining> {
    let seq = sequence(rows, cond_file, trials)?;

    let images: Vec<&str> = seq.iter().map(|r| r.image.as_str()).collect();
    let x = embedding.select(Axis(0), &stimuli.positions(&images)?);
    let y = seq.iter().map(|r| f64::from(r.true_category_binary)).collect();

    Ok(CategoryTraining { x, y })
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn index() -> StimulusIndex {
        StimulusIndex::from_names(vec!["a".into(), "b".into(), "c".into()])
    }

    fn embedding() -> Array2<f64> {
        array![[1.0, 10.0], [2.0, 20.0], [3.0, 30.0]]
    }

    fn reward_row(cond_file: i64, trial: usize, left: &str, right: &str) -> RewardTrial {
        RewardTrial {
            left_image:      left.into(),
            right_image:     right.into(),
            dimension:       "0".into(),
            left_reward:     trial as f64,
            right_reward:    -(trial as f64),
            max_reward:      0.0,
            min_reward:      0.0,
            choice:          0,
            reward_received: 0.0,
            cond_file,
            trial,
            bonus_payment:   0.0,
            include:         1,
            participant:     "P".into(),
            regret:          0.0,
            chance_regret:   0.0,
            correct:         1,
        }
    }

    #[test]
    fn test_reward_arrays() {
        let rows = vec![
            reward_row(2, 0, "x", "x"),
            reward_row(1, 0, "a", "c"),
            reward_row(1, 1, "b", "a"),
        ];
        let t = prepare_reward(&rows, 1, 2, &index(), &embedding()).unwrap();

        assert_eq!(t.x.shape(), &[2, 2, 2]);
        assert_eq!(t.x[[0, 1, 1]], 30.0); // trial 0, right = c
        assert_eq!(t.x[[1, 0, 0]], 2.0);  // trial 1, left = b
        assert_eq!(t.y, array![[0.0, -0.0], [1.0, -1.0]]);
        assert_eq!(condition_files(&rows), vec![1, 2]);
    }

    #[test]
    fn test_short_sequence_rejected() {
        let rows = vec![reward_row(1, 0, "a", "b")];
        assert!(prepare_reward(&rows, 1, 2, &index(), &embedding()).is_err());
    }

    #[test]
    fn test_category_arrays_and_table_io() {
        let row = |image: &str, label: u8| CategoryTrial {
            image:                image.into(),
            choice:               0,
            true_category_name:   if label == 1 { "Julty".into() } else { "Grum".into() },
            true_category_binary: label,
            correct:              1,
            cond_file:            4,
            participant:          "P".into(),
            include:              1,
            bonus_payment:        0.5,
            dimension:            0,
            trial:                0,
        };
        let rows = vec![row("c", 1), row("a", 0), row("b", 1)];

        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("above_chance.csv");
        crate::infra::results::write_csv(&path, &rows).unwrap();
        let back: Vec<CategoryTrial> = read_table(&path).unwrap();
        assert_eq!(back, rows);

        let t = prepare_category(&back, 4, 2, &index(), &embedding()).unwrap();
        assert_eq!(t.x, array![[3.0, 30.0], [1.0, 10.0]]);
        assert_eq!(t.y, array![1.0, 0.0]);
    }

    #[test]
    fn test_unknown_stimulus() {
        let rows = vec![reward_row(1, 0, "zebra", "a")];
        assert!(prepare_reward(&rows, 1, 1, &index(), &embedding()).is_err());
    }
}
