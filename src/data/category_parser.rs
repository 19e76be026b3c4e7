// ============================================================
// Layer 4 - Category-Learning Log Parser
// ============================================================
// Turns jsPsych CSV exports into tidy CategoryTrial rows.
//
// Input layout:
//   experiments/category_learning/data/task_<id>.csv
//
// A jsPsych export has one row per screen (instructions,
// fixation, trials, survey, ...). We need:
//   - rows with trial_type == "image-keyboard-response"
//       stimulus, response ("j"/"f"), trueCategory,
//       correct, cond_file_no
//   - the final row (exit survey)
//       response     → JSON string with an "include" answer
//       current_pay  → payout including the base pay
//
// cond_file_no is blank on non-trial rows, so pandas may have
// written it as a float ("3.0"); it is parsed through f64.
//
// Reference: csv crate documentation (StringRecord, headers)

use anyhow::{anyhow, bail, Context, Result};
use csv::StringRecord;
use std::path::{Path, PathBuf};

use crate::data::reward_parser::files_with_extension;
use crate::domain::{traits::BehaviourSource, trial::CategoryTrial};
use crate::infra::ids::{participant_id, ID_LEN};

const TRIAL_TYPE: &str = "image-keyboard-response";

/// Parses every participant under experiments/category_learning/.
pub struct CategoryLogParser {
    experiment_dir:    PathBuf,
    trials:            usize,
    base_pay:          f64,
    positive_category: String,
}

/// Column lookup by header name for one CSV file
struct Columns {
    headers: StringRecord,
}

impl Columns {
    fn get<'r>(&self, record: &'r StringRecord, name: &str) -> Result<&'r str> {
        let idx = self
            .headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| anyhow!("missing column '{name}'"))?;
        Ok(record.get(idx).unwrap_or(""))
    }
}

impl CategoryLogParser {
    pub fn new(
        experiment_dir:    impl Into<PathBuf>,
        trials:            usize,
        base_pay:          f64,
        positive_category: impl Into<String>,
    ) -> Self {
        Self {
            experiment_dir:    experiment_dir.into(),
            trials,
            base_pay,
            positive_category: positive_category.into(),
        }
    }

    pub fn parse_participant(&self, path: &Path) -> Result<Vec<CategoryTrial>> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .with_context(|| format!("Cannot open '{}'", path.display()))?;
        let cols = Columns { headers: reader.headers()?.clone() };

        let records: Vec<StringRecord> = reader.records().collect::<Result<_, _>>()?;
        let last = records.last().ok_or_else(|| anyhow!("file has no rows"))?;

        // ── Exit survey ──────────────────────────────────────────────────────
        let survey: serde_json::Value = serde_json::from_str(cols.get(last, "response")?)
            .context("final 'response' is not a JSON survey answer")?;
        let include = u8::from(survey.get("include").and_then(|v| v.as_str()) == Some("Yes"));

        let current_pay: f64 = cols
            .get(last, "current_pay")?
            .trim()
            .parse()
            .context("final 'current_pay' is not a number")?;
        let bonus_payment = ((current_pay - self.base_pay) * 100.0).round() / 100.0;

        // ── Trials ───────────────────────────────────────────────────────────
        let trial_rows: Vec<&StringRecord> = records
            .iter()
            .filter(|r| cols.get(r, "trial_type").map(|t| t == TRIAL_TYPE).unwrap_or(false))
            .collect();
        if trial_rows.len() != self.trials {
            bail!("{} trials logged, expected {}", trial_rows.len(), self.trials);
        }

        let participant = participant_id(ID_LEN);

        trial_rows
            .into_iter()
            .enumerate()
            .map(|(t, r)| {
                let true_category = cols.get(r, "trueCategory")?.to_string();
                let cond_file     = parse_int(cols.get(r, "cond_file_no")?)
                    .context("bad 'cond_file_no'")?;

                Ok(CategoryTrial {
                    image:                cols.get(r, "stimulus")?.to_string(),
                    choice:               u8::from(cols.get(r, "response")? == "j"),
                    true_category_binary: u8::from(true_category == self.positive_category),
                    true_category_name:   true_category,
                    correct:              parse_flag(cols.get(r, "correct")?)?,
                    cond_file,
                    participant:          participant.clone(),
                    include,
                    bonus_payment,
                    dimension:            (cond_file - 1).rem_euclid(3),
                    trial:                t,
                })
            })
            .collect()
    }
}

impl BehaviourSource for CategoryLogParser {
    type Row = CategoryTrial;

    fn load_all(&self) -> Result<Vec<CategoryTrial>> {
        let data_dir = self.experiment_dir.join("data");
        let files: Vec<PathBuf> = files_with_extension(&data_dir, "csv")?
            .into_iter()
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.starts_with("task_"))
                    .unwrap_or(false)
            })
            .collect();

        let mut rows = Vec::new();
        for path in files {
            match self.parse_participant(&path) {
                Ok(mut participant_rows) => rows.append(&mut participant_rows),
                Err(e) => tracing::warn!("Skipping '{}': {:#}", path.display(), e),
            }
        }

        tracing::info!(
            "Parsed {} category-learning participants",
            rows.len() / self.trials.max(1)
        );
        Ok(rows)
    }
}

/// Integers that may have been written as floats ("3.0")
fn parse_int(text: &str) -> Result<i64> {
    let value: f64 = text.trim().parse()?;
    if value.fract() != 0.0 {
        bail!("'{text}' is not a whole number");
    }
    Ok(value as i64)
}

/// jsPsych booleans: true/false in any case, or 1/0
fn parse_flag(text: &str) -> Result<u8> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "1.0"  => Ok(1),
        "false" | "0" | "0.0" => Ok(0),
        other => bail!("'{other}' is not a boolean"),
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_task(dir: &Path, name: &str, trials: usize, include: &str) {
        let data = dir.join("data");
        fs::create_dir_all(&data).unwrap();

        let mut csv = String::from("trial_type,stimulus,response,trueCategory,correct,cond_file_no,current_pay\n");
        csv.push_str("instructions,,,,,,\n");
        for t in 0..trials {
            let (resp, cat, correct) = if t % 2 == 0 {
                ("j", "Julty", "true")
            } else {
                ("f", "Grum", "false")
            };
            csv.push_str(&format!(
                "image-keyboard-response,stimuli/x/{t}.jpg,{resp},{cat},{correct},5.0,\n"
            ));
        }
        csv.push_str(&format!(
            "survey-text,,\"{{\"\"include\"\": \"\"{include}\"\"}}\",,,,2.456\n"
        ));
        fs::write(data.join(name), csv).unwrap();
    }

    #[test]
    fn test_parses_trials_and_survey() {
        let dir = tempfile::tempdir().unwrap();
        write_task(dir.path(), "task_abc.csv", 4, "Yes");

        let parser = CategoryLogParser::new(dir.path(), 4, 1.5, "Julty");
        let rows   = parser.load_all().unwrap();
        assert_eq!(rows.len(), 4);

        assert_eq!(rows[0].image, "stimuli/x/0.jpg");
        assert_eq!(rows[0].choice, 1);
        assert_eq!(rows[0].true_category_binary, 1);
        assert_eq!(rows[1].choice, 0);
        assert_eq!(rows[1].true_category_name, "Grum");
        assert_eq!(rows[1].correct, 0);
        assert_eq!(rows[3].trial, 3);
        assert_eq!(rows[0].cond_file, 5);
        assert_eq!(rows[0].dimension, 1);
        assert_eq!(rows[0].include, 1);
        assert!((rows[0].bonus_payment - 0.96).abs() < 1e-9);
    }

    #[test]
    fn test_exclusion_answer() {
        let dir = tempfile::tempdir().unwrap();
        write_task(dir.path(), "task_no.csv", 2, "No");

        let rows = CategoryLogParser::new(dir.path(), 2, 1.5, "Julty").load_all().unwrap();
        assert!(rows.iter().all(|r| r.include == 0));
    }

    #[test]
    fn test_only_task_files_with_full_length() {
        let dir = tempfile::tempdir().unwrap();
        write_task(dir.path(), "task_ok.csv", 3, "Yes");
        write_task(dir.path(), "task_short.csv", 2, "Yes");
        write_task(dir.path(), "pilot.csv", 3, "Yes");

        let rows = CategoryLogParser::new(dir.path(), 3, 1.5, "Julty").load_all().unwrap();
        assert_eq!(rows.len(), 3);
    }

    #[test]
    fn test_flag_parsing() {
        assert_eq!(parse_flag("True").unwrap(), 1);
        assert_eq!(parse_flag("0").unwrap(), 0);
        assert!(parse_flag("maybe").is_err());
        assert_eq!(parse_int("3.0").unwrap(), 3);
        assert!(parse_int("3.5").is_err());
    }
}
