// ============================================================
// Layer 4 - Reward-Learning Log Parser
// ============================================================
// Turns the raw reward-learning logs into tidy RewardTrial rows.
//
// Input layout:
//   experiments/reward_learning/
//     data/<n>.json              ← one participant
//       { "choices": [..], "points": [..],
//         "money": "3.41", "include": "yes" }
//     condition_files/<n>.json   ← what that participant saw
//       { "arm_0_image":  { "0": "...", "1": "...", ... },
//         "arm_1_image":  { ... },
//         "reward_dimension", "arm_0_reward", "arm_1_reward",
//         "max_reward", "min_reward" }
//
// The condition files are pandas column dictionaries keyed by
// the trial index as a string. JSON objects are unordered, so
// the keys are sorted numerically to recover trial order.
//
// A participant whose files are missing or malformed is logged
// and skipped; one bad upload must not sink the whole parse.
//
// Reference: serde_json documentation (Value)
//            Rust Book §9 (Error Handling)

use anyhow::{anyhow, bail, Context, Result};
use serde_json::Value;
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::domain::{traits::BehaviourSource, trial::RewardTrial};
use crate::infra::ids::{participant_id, ID_LEN};

/// Parses every participant under experiments/reward_learning/.
pub struct RewardLogParser {
    /// experiments/reward_learning
    experiment_dir: PathBuf,
    trials:         usize,
    base_pay:       f64,
}

impl RewardLogParser {
    pub fn new(experiment_dir: impl Into<PathBuf>, trials: usize, base_pay: f64) -> Self {
        Self { experiment_dir: experiment_dir.into(), trials, base_pay }
    }

    /// Parse one participant's behaviour file together with its condition file.
    pub fn parse_participant(&self, beh_path: &Path) -> Result<Vec<RewardTrial>> {
        let stem = beh_path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| anyhow!("Unusable file name '{}'", beh_path.display()))?;
        let cond_file: i64 = stem
            .parse()
            .with_context(|| format!("Condition file number '{stem}' is not an integer"))?;

        let beh  = read_json(beh_path)?;
        let cond = read_json(
            &self
                .experiment_dir
                .join("condition_files")
                .join(format!("{stem}.json")),
        )?;

        let left_image   = column(&cond, "arm_0_image")?;
        let right_image  = column(&cond, "arm_1_image")?;
        let dimension    = column(&cond, "reward_dimension")?;
        let left_reward  = column(&cond, "arm_0_reward")?;
        let right_reward = column(&cond, "arm_1_reward")?;
        let max_reward   = column(&cond, "max_reward")?;
        let min_reward   = column(&cond, "min_reward")?;
        let choices      = array_field(&beh, "choices")?;
        let points       = array_field(&beh, "points")?;

        for (name, len) in [
            ("arm_0_image", left_image.len()),
            ("arm_1_image", right_image.len()),
            ("reward_dimension", dimension.len()),
            ("arm_0_reward", left_reward.len()),
            ("arm_1_reward", right_reward.len()),
            ("max_reward", max_reward.len()),
            ("min_reward", min_reward.len()),
            ("choices", choices.len()),
            ("points", points.len()),
        ] {
            if len != self.trials {
                bail!("'{name}' has {len} entries, expected {}", self.trials);
            }
        }

        let money = beh
            .get("money")
            .map(as_f64)
            .transpose()?
            .ok_or_else(|| anyhow!("missing 'money'"))?;
        let include = u8::from(beh.get("include").and_then(Value::as_str) == Some("yes"));
        let participant = participant_id(ID_LEN);

        (0..self.trials)
            .map(|t| {
                let max_r      = as_f64(&max_reward[t])?;
                let min_r      = as_f64(&min_reward[t])?;
                let received   = as_f64(&points[t])?;
                let regret     = max_r - received;

                Ok(RewardTrial {
                    left_image:      as_text(&left_image[t]),
                    right_image:     as_text(&right_image[t]),
                    dimension:       as_text(&dimension[t]),
                    left_reward:     as_f64(&left_reward[t])?,
                    right_reward:    as_f64(&right_reward[t])?,
                    max_reward:      max_r,
                    min_reward:      min_r,
                    choice:          as_f64(&choices[t])? as i64,
                    reward_received: received,
                    cond_file,
                    trial:           t,
                    bonus_payment:   money - self.base_pay,
                    include,
                    participant:     participant.clone(),
                    regret,
                    chance_regret:   (max_r - min_r) / 2.0,
                    correct:         u8::from(regret == 0.0),
                })
            })
            .collect()
    }
}

impl BehaviourSource for RewardLogParser {
    type Row = RewardTrial;

    fn load_all(&self) -> Result<Vec<RewardTrial>> {
        let data_dir = self.experiment_dir.join("data");
        let files    = files_with_extension(&data_dir, "json")?;

        let mut rows = Vec::new();
        for path in files {
            match self.parse_participant(&path) {
                Ok(mut participant_rows) => {
                    tracing::debug!("Parsed '{}'", path.display());
                    rows.append(&mut participant_rows);
                }
                Err(e) => tracing::warn!("Skipping '{}': {:#}", path.display(), e),
            }
        }

        tracing::info!(
            "Parsed {} reward-learning participants",
            rows.len() / self.trials.max(1)
        );
        Ok(rows)
    }
}

// ─── JSON helpers ─────────────────────────────────────────────────────────────

fn read_json(path: &Path) -> Result<Value> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Cannot read '{}'", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid JSON in '{}'", path.display()))
}

/// Sorted list of files in `dir` with the given extension.
pub(crate) fn files_with_extension(dir: &Path, ext: &str) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("Cannot read directory '{}'", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some(ext))
        .collect();
    files.sort();
    Ok(files)
}

/// A pandas column dictionary in trial order.
/// Plain JSON arrays are accepted as well.
fn column(cond: &Value, key: &str) -> Result<Vec<Value>> {
    match cond.get(key) {
        Some(Value::Array(values)) => Ok(values.clone()),
        Some(Value::Object(map)) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            if entries.iter().all(|(k, _)| k.parse::<u64>().is_ok()) {
                entries.sort_by_key(|(k, _)| k.parse::<u64>().unwrap_or(u64::MAX));
            }
            Ok(entries.into_iter().map(|(_, v)| v.clone()).collect())
        }
        Some(_) => bail!("condition column '{key}' is neither an object nor an array"),
        None    => bail!("condition file has no column '{key}'"),
    }
}

fn array_field<'a>(value: &'a Value, key: &str) -> Result<&'a Vec<Value>> {
    value
        .get(key)
        .and_then(Value::as_array)
        .ok_or_else(|| anyhow!("missing array '{key}'"))
}

/// Numbers may be logged as JSON numbers or numeric strings.
pub(crate) fn as_f64(value: &Value) -> Result<f64> {
    match value {
        Value::Number(n) => n.as_f64().ok_or_else(|| anyhow!("'{n}' is not a finite number")),
        Value::String(s) => s
            .trim()
            .parse()
            .with_context(|| format!("'{s}' is not a number")),
        Value::Bool(b)   => Ok(f64::from(u8::from(*b))),
        other            => bail!("expected a number, found {other}"),
    }
}

fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other            => other.to_string(),
    }
}
