// ============================================================
// Layer 4 - Stimulus Index
// ============================================================
// file_names.txt lists one stimulus path per line, in the row
// order of every feature array. Behavioural logs refer to the
// same images by a shorter relative path, so lookups go through
// this index.
//
// Example line:
//   /home/lab/naturalcogsci/stimuli/aardvark/aardvark_01b.jpg
// Index key (marker "naturalcogsci/"):
//   stimuli/aardvark/aardvark_01b.jpg
// Object word (folder name):
//   aardvark
//
// Reference: Rust Book §8 (Hash Maps)

use anyhow::{anyhow, Context, Result};
use std::{collections::HashMap, fs, path::Path};

/// Read the raw lines of a file-name list, dropping blank lines.
pub fn read_file_names(path: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(path).with_context(|| {
        format!(
            "Cannot read stimulus list '{}'. Extract features first.",
            path.display()
        )
    })?;

    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Keep the part of `path` after the first occurrence of `marker`.
/// Paths without the marker are returned unchanged.
pub fn strip_after(path: &str, marker: &str) -> String {
    if marker.is_empty() {
        return path.to_string();
    }
    match path.split_once(marker) {
        Some((_, tail)) => tail.to_string(),
        None            => path.to_string(),
    }
}

/// Object word per stimulus: the name of the folder holding the image.
///
/// With `remove_digit_underscore` the word is made readable for text
/// models ("ice_cream2" → "ice cream"); without it the folder name is
/// kept verbatim, which is what the THINGS ID table is keyed by.
pub fn folder_to_word(paths: &[String], remove_digit_underscore: bool) -> Vec<String> {
    paths
        .iter()
        .map(|p| {
            let folder = Path::new(p)
                .parent()
                .and_then(|d| d.file_name())
                .and_then(|n| n.to_str())
                .unwrap_or("")
                .to_string();

            if remove_digit_underscore {
                folder
                    .chars()
                    .filter(|c| !c.is_ascii_digit())
                    .map(|c| if c == '_' { ' ' } else { c })
                    .collect()
            } else {
                folder
            }
        })
        .collect()
}

// ─── StimulusIndex ────────────────────────────────────────────────────────────
/// Maps stimulus names to their row in the feature arrays.
#[derive(Debug, Clone)]
pub struct StimulusIndex {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl StimulusIndex {
    /// Build an index from already-shortened names.
    /// The first occurrence wins for duplicated names.
    pub fn from_names(names: Vec<String>) -> Self {
        let mut index = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            index.entry(name.clone()).or_insert(i);
        }
        Self { names, index }
    }

    /// Read `file_names.txt` and shorten every path at `marker`.
    pub fn load(path: &Path, marker: &str) -> Result<Self> {
        let names = read_file_names(path)?
            .iter()
            .map(|line| strip_after(line, marker))
            .collect();
        Ok(Self::from_names(names))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Row of `name` in the feature arrays.
    pub fn position(&self, name: &str) -> Result<usize> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| anyhow!("Stimulus '{name}' is not listed in file_names.txt"))
    }

    /// Rows of several names, failing on the first unknown one.
    pub fn positions<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<usize>> {
        names.iter().map(|n| self.position(n.as_ref())).collect()
    }
}
