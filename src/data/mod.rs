// ============================================================
// Layer 4 - Data Pipeline
// ============================================================
// Everything between raw files on disk and the arrays the
// learners and metrics consume.
//
//   experiments/<task>/        raw logs
//       │
//       ▼
//   RewardLogParser / CategoryLogParser   → tidy rows
//       │
//       ▼
//   chance_filter              → all.csv, above_chance.csv
//       │
//       ▼
//   training                   → X, y arrays per condition file
//
// plus the lookup tables used by the similarity analyses
// (stimulus index, NIGHTS triplets, Peterson datasets).

/// file_names.txt lookups and object words
pub mod stimuli;

/// Reward-learning JSON logs → RewardTrial rows
pub mod reward_parser;

/// Category-learning jsPsych CSVs → CategoryTrial rows
pub mod category_parser;

/// Accuracy/inclusion filter and table writing
pub mod chance_filter;

/// Observation/target arrays for the sequential learners
pub mod training;

/// NIGHTS perceptual similarity triplets
pub mod nights;

/// Peterson et al. human similarity matrices
pub mod peterson;
