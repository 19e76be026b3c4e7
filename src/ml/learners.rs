// ============================================================
// Layer 5 - Sequential Learners
// ============================================================
// Replay an experiment the way a participant experienced it:
//
//   for trial t:
//     1. predict trial t with the model fitted on trials < t
//     2. refit on trials <= t
//
// Features are standardised with statistics of the data seen so
// far, so the scaling is recomputed at every refit and the test
// observation of trial t is scaled with the statistics of < t.
//
// CategoryLearner
//   Before both categories have been observed a classifier cannot
//   be fitted. It starts from two zero pseudo-observations (one per
//   class), predicting 0.5/0.5, and keeps its previous fit until the
//   labels seen so far contain both classes.
//
// RewardLearner
//   Each trial shows two options. Both are predicted, then both are
//   added to the training set. Nothing has been learned before the
//   first trial, so its predictions stay at 0.

use anyhow::{bail, Result};
use ndarray::{concatenate, s, Array1, Array2, ArrayView1, ArrayView2, ArrayView3, Axis};

use crate::ml::bayesian_ridge::BayesianRidge;
use crate::ml::estimator::{Classifier, Regressor};
use crate::ml::logistic::LogisticRegression;
use crate::ml::scaler::StandardScaler;

// ─── CategoryLearner ──────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct CategoryLearner<C: Classifier> {
    estimator: C,
    scaler:    StandardScaler,
    /// [trials, 2] predicted class probabilities before each trial's feedback
    values:    Array2<f64>,
    /// [trials, features] coefficients after each trial
    weights:   Array2<f64>,
}

impl Default for CategoryLearner<LogisticRegression> {
    fn default() -> Self {
        Self::new(LogisticRegression::default())
    }
}

impl<C: Classifier> CategoryLearner<C> {
    pub fn new(estimator: C) -> Self {
        Self {
            estimator,
            scaler:  StandardScaler::identity(0),
            values:  Array2::zeros((0, 2)),
            weights: Array2::zeros((0, 0)),
        }
    }

    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    pub fn weights(&self) -> ArrayView2<'_, f64> {
        self.weights.view()
    }

    /// x: [trials, features], y: [trials] with labels 0/1
    pub fn fit(&mut self, x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>) -> Result<()> {
        let (trials, features) = x.dim();
        if y.len() != trials {
            bail!("{} trials of observations but {} labels", trials, y.len());
        }

        self.values  = Array2::zeros((trials, 2));
        self.weights = Array2::zeros((trials, features));
        self.scaler  = StandardScaler::identity(features);

        // pseudo-observations so the first trial can be predicted
        let pseudo_x = Array2::zeros((2, features));
        let pseudo_y = Array1::from(vec![0.0, 1.0]);
        self.estimator.fit(pseudo_x.view(), pseudo_y.view())?;

        for trial in 0..trials {
            self.predict(x, trial);
            self.learn(x, y, trial)?;
            self.weights.row_mut(trial).assign(&self.estimator.coef());
        }
        Ok(())
    }

    fn predict(&mut self, x: ArrayView2<'_, f64>, trial: usize) {
        let test  = self.scaler.transform_row(x.row(trial));
        let proba = self.estimator.predict_proba(test.view());
        self.values[[trial, 0]] = proba[0];
        self.values[[trial, 1]] = proba[1];
    }

    fn learn(&mut self, x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>, trial: usize) -> Result<()> {
        let seen_y = y.slice(s![..=trial]);
        let has_both = seen_y.iter().any(|&v| v == 0.0) && seen_y.iter().any(|&v| v == 1.0);
        if !has_both {
            return Ok(());
        }

        let seen_x  = x.slice(s![..=trial, ..]);
        self.scaler = StandardScaler::fit(seen_x)?;
        let scaled  = self.scaler.transform(seen_x);
        self.estimator.fit(scaled.view(), seen_y)
    }
}

// ─── RewardLearner ────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct RewardLearner<R: Regressor> {
    estimator: R,
    /// [trials, 2] predicted reward of each option before feedback
    values:    Array2<f64>,
    /// [trials, features] coefficients after each trial
    weights:   Array2<f64>,
}

impl Default for RewardLearner<BayesianRidge> {
    fn default() -> Self {
        Self::new(BayesianRidge::default())
    }
}

impl<R: Regressor> RewardLearner<R> {
    pub fn new(estimator: R) -> Self {
        Self {
            estimator,
            values:  Array2::zeros((0, 2)),
            weights: Array2::zeros((0, 0)),
        }
    }

    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    pub fn weights(&self) -> ArrayView2<'_, f64> {
        self.weights.view()
    }

    /// x: [trials, 2, features], y: [trials, 2]
    pub fn fit(&mut self, x: ArrayView3<'_, f64>, y: ArrayView2<'_, f64>) -> Result<()> {
        let (trials, options, features) = x.dim();
        if options != 2 || y.dim() != (trials, 2) {
            bail!(
                "expected observations [trials, 2, features] and rewards [trials, 2], got {:?} and {:?}",
                x.dim(),
                y.dim()
            );
        }

        self.values  = Array2::zeros((trials, 2));
        self.weights = Array2::zeros((trials, features));
        let mut scaler = StandardScaler::identity(features);

        for trial in 0..trials {
            if trial > 0 {
                for option in 0..2 {
                    let test = scaler.transform_row(x.slice(s![trial, option, ..]));
                    self.values[[trial, option]] = self.estimator.predict(test.view());
                }
            }

            let (train_x, train_y) = training_data(x, y, trial)?;
            scaler = StandardScaler::fit(train_x.view())?;
            let scaled = scaler.transform(train_x.view());

            self.estimator.fit(scaled.view(), train_y.view())?;
            self.weights.row_mut(trial).assign(&self.estimator.coef());
        }
        Ok(())
    }
}

/// Trials 0..=t with both options stacked: all left options first,
/// then all right options, rewards in the same order.
fn training_data(
    x:     ArrayView3<'_, f64>,
    y:     ArrayView2<'_, f64>,
    trial: usize,
) -> Result<(Array2<f64>, Array1<f64>)> {
    let train_x = concatenate(
        Axis(0),
        &[x.slice(s![..=trial, 0, ..]), x.slice(s![..=trial, 1, ..])],
    )?;
    let train_y = concatenate(
        Axis(0),
        &[y.slice(s![..=trial, 0]), y.slice(s![..=trial, 1])],
    )?;
    Ok((train_x, train_y))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array3};

    #[test]
    fn test_category_single_class_prefix_keeps_coin_flip() {
        // three trials of class 1 before the first class-0 trial
        let x = array![[1.0, 0.0], [2.0, 0.5], [1.5, 1.0], [-1.0, 0.2], [-2.0, 0.1]];
        let y = array![1.0, 1.0, 1.0, 0.0, 0.0];
        let mut learner = CategoryLearner::default();
        learner.fit(x.view(), y.view()).unwrap();

        let v = learner.values();
        for t in 0..4 {
            assert!((v[[t, 0]] - 0.5).abs() < 1e-9, "trial {t}: {:?}", v.row(t));
        }
        // first real fit happens after trial 3; trial 4 (x0 very negative) → class 0
        assert!(v[[4, 0]] > 0.5);
        assert!(learner.weights().row(2).iter().all(|w| w.abs() < 1e-9));
        assert!(learner.weights().row(3).iter().any(|w| w.abs() > 1e-6));
    }

    #[test]
    fn test_category_probabilities_sum_to_one() {
        let x = Array2::from_shape_fn((12, 3), |(i, j)| ((i * 3 + j) as f64 * 0.37).sin());
        let y = Array1::from_shape_fn(12, |i| (i % 2) as f64);
        let mut learner = CategoryLearner::default();
        learner.fit(x.view(), y.view()).unwrap();

        for row in learner.values().rows() {
            assert!((row[0] + row[1] - 1.0).abs() < 1e-12);
        }
        assert_eq!(learner.weights().dim(), (12, 3));
    }

    #[test]
    fn test_category_prediction_uses_only_past_trials() {
        // changing the label of the last trial must not change any prediction
        let x = Array2::from_shape_fn((8, 2), |(i, j)| (i as f64 + 1.0) * if j == 0 { 1.0 } else { -0.3 });
        let mut y = array![0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0];

        let mut a = CategoryLearner::default();
        a.fit(x.view(), y.view()).unwrap();
        y[7] = 0.0;
        let mut b = CategoryLearner::default();
        b.fit(x.view(), y.view()).unwrap();

        assert_eq!(a.values(), b.values());
    }

    fn reward_task(trials: usize) -> (Array3<f64>, Array2<f64>) {
        // reward = 2·feature0 + 1 for every option
        let x = Array3::from_shape_fn((trials, 2, 2), |(t, o, f)| {
            let base = (t * 2 + o) as f64;
            if f == 0 { (base * 0.9).sin() * 2.0 } else { (base * 0.4).cos() }
        });
        let y = Array2::from_shape_fn((trials, 2), |(t, o)| 2.0 * x[[t, o, 0]] + 1.0);
        (x, y)
    }

    #[test]
    fn test_reward_first_trial_is_zero_and_later_trials_track_reward() {
        let (x, y) = reward_task(20);
        let mut learner = RewardLearner::default();
        learner.fit(x.view(), y.view()).unwrap();

        let v = learner.values();
        assert_eq!(v.row(0), array![0.0, 0.0].view());
        for t in 10..20 {
            for o in 0..2 {
                assert!((v[[t, o]] - y[[t, o]]).abs() < 0.1, "trial {t} option {o}");
            }
        }
        assert_eq!(learner.weights().dim(), (20, 2));
    }

    #[test]
    fn test_reward_training_data_layout() {
        let (x, y) = reward_task(3);
        let (tx, ty) = training_data(x.view(), y.view(), 1).unwrap();

        assert_eq!(tx.nrows(), 4);
        assert_eq!(tx.row(0), x.slice(s![0, 0, ..]));
        assert_eq!(tx.row(1), x.slice(s![1, 0, ..]));
        assert_eq!(tx.row(2), x.slice(s![0, 1, ..]));
        assert_eq!(ty, array![y[[0, 0]], y[[1, 0]], y[[0, 1]], y[[1, 1]]]);
    }

    #[test]
    fn test_reward_shape_mismatch() {
        let x = Array3::<f64>::zeros((4, 3, 2));
        let y = Array2::<f64>::zeros((4, 2));
        assert!(RewardLearner::default().fit(x.view(), y.view()).is_err());
    }
}
