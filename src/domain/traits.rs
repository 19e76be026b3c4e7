// ============================================================
// Layer 3 - Core Traits (Abstractions)
// ============================================================
// The two experiments log very different raw formats (JSON
// per participant vs jsPsych CSV exports), but after parsing
// they are handled identically: filtered by accuracy, written
// as tidy tables, grouped by condition file.
//
// These traits are the seam between the task-specific parsers
// and the task-agnostic code that follows them.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;

// ─── TrialRow ─────────────────────────────────────────────────────────────────
/// A single row of a tidy behavioural table.
///
/// Implementations:
///   - RewardTrial
///   - CategoryTrial
pub trait TrialRow {
    /// Anonymised participant ID
    fn participant(&self) -> &str;

    /// Whether the participant asked for their data to be used
    fn included(&self) -> bool;

    /// 1.0 for a correct trial, 0.0 otherwise
    fn correct(&self) -> f64;

    /// Condition file (stimulus sequence) the participant was assigned
    fn cond_file(&self) -> i64;
}

// ─── BehaviourSource ──────────────────────────────────────────────────────────
/// Any component that can turn raw experiment logs into tidy rows.
///
/// Implementations:
///   - RewardLogParser   → experiments/reward_learning/
///   - CategoryLogParser → experiments/category_learning/
pub trait BehaviourSource {
    type Row: TrialRow;

    /// Parse every participant found by this source.
    fn load_all(&self) -> Result<Vec<Self::Row>>;
}
