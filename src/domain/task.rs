// ============================================================
// Layer 3 - Task
// ============================================================
// The study ran two online experiments:
//
//   reward_learning   - 60 trials, pick the better of two images,
//                       reward depends on one latent feature dimension
//   category_learning - 120 trials, sort single images into two
//                       made-up categories ("Julty" vs the other)
//
// Every path, trial count and table shape depends on which one
// we are working with, so the task is an enum rather than a string.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Task {
    RewardLearning,
    CategoryLearning,
}

impl Task {
    /// Directory name used under experiments/ and data/human_behavioural/
    pub fn dir_name(self) -> &'static str {
        match self {
            Task::RewardLearning   => "reward_learning",
            Task::CategoryLearning => "category_learning",
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

impl FromStr for Task {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "reward_learning"   => Ok(Task::RewardLearning),
            "category_learning" => Ok(Task::CategoryLearning),
            other => bail!(
                "'{other}' must be one of [\"reward_learning\", \"category_learning\"]"
            ),
        }
    }
}
