// ============================================================
// Layer 5 - Human-Model Agreement
// ============================================================
// For a triplet (ref, left, right) the model "chooses" the
// image whose embedding has the higher cosine similarity with
// the reference. Agreement is the fraction of triplets where
// that choice matches the human majority vote.
//
// Ties go to the right image.

use anyhow::{bail, Result};
use ndarray::{ArrayView1, ArrayView2};

/// Cosine similarity; 0 when either vector has zero length.
pub fn cosine_similarity(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    let norm = a.dot(&a).sqrt() * b.dot(&b).sqrt();
    if norm == 0.0 {
        0.0
    } else {
        a.dot(&b) / norm
    }
}

/// A triplet resolved to embedding rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexedTriplet {
    pub reference:  usize,
    pub left:       usize,
    pub right:      usize,
    pub human_left: bool,
}

/// Does the model prefer the left image of this triplet?
pub fn model_prefers_left(embeddings: ArrayView2<'_, f64>, t: &IndexedTriplet) -> bool {
    let reference = embeddings.row(t.reference);
    let left_sim  = cosine_similarity(reference, embeddings.row(t.left));
    let right_sim = cosine_similarity(reference, embeddings.row(t.right));
    left_sim > right_sim
}

/// Fraction of triplets where model and humans pick the same image.
pub fn agreement_rate(embeddings: ArrayView2<'_, f64>, triplets: &[IndexedTriplet]) -> Result<f64> {
    if triplets.is_empty() {
        bail!("no triplets to compare against");
    }
    let n = embeddings.nrows();
    if let Some(t) = triplets.iter().find(|t| t.reference.max(t.left).max(t.right) >= n) {
        bail!("triplet {:?} indexes past the {} embedding rows", t, n);
    }

    let agreed = triplets
        .iter()
        .filter(|t| model_prefers_left(embeddings, t) == t.human_left)
        .count();
    Ok(agreed as f64 / triplets.len() as f64)
}
