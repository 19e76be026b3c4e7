// ============================================================
// Layer 4 - NIGHTS Triplets
// ============================================================
// NIGHTS is a set of image triplets (reference, left, right) with
// human two-alternative votes for which distortion looks closer
// to the reference.
//
// Only confident, held-out, non-ImageNet triplets are analysed:
//   votes >= min_votes  AND  split == "test"  AND  !is_imagenet
//
// data.csv is a pandas export, so booleans arrive as "True"/"False"
// and integer columns may be floats.

use anyhow::Result;
use serde::Deserialize;
use std::path::Path;

use crate::data::training::read_table;

/// Raw row of data/nights/data.csv (extra columns are ignored)
#[derive(Debug, Clone, Deserialize)]
struct RawTriplet {
    ref_path:    String,
    left_path:   String,
    right_path:  String,
    left_vote:   f64,
    votes:       f64,
    is_imagenet: String,
    split:       String,
}

/// One human similarity judgement
#[derive(Debug, Clone, PartialEq)]
pub struct Triplet {
    pub ref_path:   String,
    pub left_path:  String,
    pub right_path: String,
    /// The majority of raters picked the left image
    pub human_left: bool,
}

fn python_bool(text: &str) -> bool {
    matches!(text.trim(), "True" | "true" | "1" | "1.0")
}

/// Load and filter the triplets used in the agreement analysis.
pub fn load_triplets(path: &Path, min_votes: u32) -> Result<Vec<Triplet>> {
    let raw: Vec<RawTriplet> = read_table(path)?;
    let total = raw.len();

    let triplets: Vec<Triplet> = raw
        .into_iter()
        .filter(|t| t.votes >= f64::from(min_votes) && !python_bool(&t.is_imagenet) && t.split == "test")
        .map(|t| Triplet {
            ref_path:   t.ref_path,
            left_path:  t.left_path,
            right_path: t.right_path,
            human_left: t.left_vote == 1.0,
        })
        .collect();

    tracing::info!("Kept {} of {} NIGHTS triplets", triplets.len(), total);
    Ok(triplets)
}
