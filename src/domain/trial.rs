// ============================================================
// Layer 3 - Tidy Trial Rows
// ============================================================
// One struct per task, one instance per (participant, trial).
// Field order is the column order of the written CSV tables,
// so downstream analysis scripts can rely on it.
//
// Both tables share the columns the chance filter needs:
// participant, include, correct (see TrialRow).

use serde::{Deserialize, Serialize};

use crate::domain::traits::TrialRow;

// ─── Reward learning ──────────────────────────────────────────────────────────
/// One reward-learning trial: two images shown side by side,
/// each worth a reward determined by the condition file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardTrial {
    pub left_image:      String,
    pub right_image:     String,
    /// Latent feature dimension the rewards were generated from
    pub dimension:       String,
    pub left_reward:     f64,
    pub right_reward:    f64,
    pub max_reward:      f64,
    pub min_reward:      f64,
    /// 0 = left, 1 = right
    pub choice:          i64,
    pub reward_received: f64,
    pub cond_file:       i64,
    pub trial:           usize,
    pub bonus_payment:   f64,
    pub include:         u8,
    pub participant:     String,
    /// max_reward - reward_received
    pub regret:          f64,
    /// Expected regret of choosing at random
    pub chance_regret:   f64,
    /// 1 when the better option was chosen (zero regret)
    pub correct:         u8,
}

impl TrialRow for RewardTrial {
    fn participant(&self) -> &str { &self.participant }
    fn included(&self) -> bool { self.include == 1 }
    fn correct(&self) -> f64 { f64::from(self.correct) }
    fn cond_file(&self) -> i64 { self.cond_file }
}

// ─── Category learning ────────────────────────────────────────────────────────
/// One category-learning trial: a single image, a binary category judgement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTrial {
    pub image:                String,
    /// 1 when the participant pressed "j"
    pub choice:               u8,
    pub true_category_name:   String,
    pub true_category_binary: u8,
    pub correct:              u8,
    pub cond_file:            i64,
    pub participant:          String,
    pub include:              u8,
    pub bonus_payment:        f64,
    /// (cond_file - 1) mod 3
    pub dimension:            i64,
    pub trial:                usize,
}

impl TrialRow for CategoryTrial {
    fn participant(&self) -> &str { &self.participant }
    fn included(&self) -> bool { self.include == 1 }
    fn correct(&self) -> f64 { f64::from(self.correct) }
    fn cond_file(&self) -> i64 { self.cond_file }
}
