// ============================================================
// Layer 5 - ML / Learning Layer
// ============================================================
// All model fitting lives here. Other layers hand over plain
// ndarray matrices and read back predictions and weights.
//
//   estimator.rs      - Classifier / Regressor traits the
//                       sequential learners are generic over
//
//   scaler.rs         - per-feature standardisation
//
//   optim.rs          - L-BFGS minimiser
//
//   logistic.rs       - L2 logistic regression (category task)
//
//   bayesian_ridge.rs - Bayesian ridge regression (reward task)
//
//   learners.rs       - trial-by-trial replay of an experiment:
//                       predict trial t from trials < t, then
//                       refit on trials <= t
//
// Reference: Bishop (2006) Pattern Recognition and Machine Learning
//            Nocedal & Wright (2006) Numerical Optimization

/// Estimator traits
pub mod estimator;

/// Standardisation of features
pub mod scaler;

pub mod optim;

/// Logistic regression fitted with L-BFGS
pub mod logistic;

/// Bayesian ridge regression with evidence maximisation
pub mod bayesian_ridge;

/// CategoryLearner and RewardLearner
pub mod learners;
