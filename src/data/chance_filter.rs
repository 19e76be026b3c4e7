// ============================================================
// Layer 4 - Chance Filter
// ============================================================
// Writes the two tidy tables of a task:
//
//   all.csv           every parsed participant
//   above_chance.csv  participants with p(correct) > threshold
//                     who also agreed to have their data used
//
// Both experiments are two-alternative, so chance is 0.5.
// Row order of the input is preserved in both outputs.

use anyhow::Result;
use serde::Serialize;
use std::{
    collections::{HashMap, HashSet},
    path::Path,
};

use crate::domain::traits::TrialRow;
use crate::infra::results::write_csv;

/// Summary of one filtering run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterSummary {
    pub participants: usize,
    pub kept:         usize,
}

/// Participants whose mean accuracy exceeds `threshold` and who opted in.
pub fn above_chance_participants<R: TrialRow>(rows: &[R], threshold: f64) -> HashSet<String> {
    // participant → (sum correct, trials, included)
    let mut stats: HashMap<&str, (f64, usize, bool)> = HashMap::new();

    for row in rows {
        let entry = stats.entry(row.participant()).or_insert((0.0, 0, true));
        entry.0 += row.correct();
        entry.1 += 1;
        entry.2 &= row.included();
    }

    stats
        .into_iter()
        .filter(|(_, (sum, n, included))| *included && sum / *n as f64 > threshold)
        .map(|(p, _)| p.to_string())
        .collect()
}

/// Keep only the rows of above-chance, opted-in participants.
pub fn filter_chance<R: TrialRow + Clone>(rows: &[R], threshold: f64) -> Vec<R> {
    let keep = above_chance_participants(rows, threshold);
    rows.iter()
        .filter(|r| keep.contains(r.participant()))
        .cloned()
        .collect()
}

/// Write all.csv and above_chance.csv into `out_dir`.
pub fn write_tables<R>(rows: &[R], out_dir: &Path, threshold: f64) -> Result<FilterSummary>
where
    R: TrialRow + Clone + Serialize,
{
    write_csv(&out_dir.join("all.csv"), rows)?;

    let kept_rows = filter_chance(rows, threshold);
    write_csv(&out_dir.join("above_chance.csv"), &kept_rows)?;

    let participants = rows.iter().map(|r| r.participant()).collect::<HashSet<_>>().len();
    let kept = kept_rows.iter().map(|r| r.participant()).collect::<HashSet<_>>().len();

    tracing::info!(
        "{} of {} participants above chance, tables in '{}'",
        kept,
        participants,
        out_dir.display()
    );
    Ok(FilterSummary { participants, kept })
}
