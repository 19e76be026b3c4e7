// ============================================================
// Layer 6 - Result Writers
// ============================================================
// Every analysis ends by writing a small table or dictionary:
//
//   data/cka/target_<target>.csv      feature,cka
//   data/r2/<features>.csv            r2
//   data/ID/<features>.csv            Feature,local ID
//   data/nights/nights.json           { model: agreement }
//   data/peterson/...json             { model: spearman }
//   data/human_behavioural/<task>/    all.csv, above_chance.csv
//
// CSV rows are serde records so the header comes from the
// struct field names and stays in sync with the data.
//
// Reference: csv crate documentation (Writer::serialize)
//            Rust Book §9 (Error Handling)

use anyhow::{Context, Result};
use serde::Serialize;
use std::{fs, path::Path};

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create '{}'", parent.display()))?;
    }
    Ok(())
}

/// Write serde records to a CSV file with a header row.
///
/// The header comes from the first record, so an empty slice writes
/// nothing and removes any table left by an earlier run.
pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    if rows.is_empty() {
        if path.exists() {
            fs::remove_file(path)
                .with_context(|| format!("Cannot remove stale '{}'", path.display()))?;
        }
        tracing::warn!("No rows for '{}', nothing written", path.display());
        return Ok(());
    }
    ensure_parent(path)?;

    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Cannot create '{}'", path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    tracing::debug!("Wrote {} rows to '{}'", rows.len(), path.display());
    Ok(())
}

/// Write any serialisable value as pretty-printed JSON.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    ensure_parent(path)?;

    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)
        .with_context(|| format!("Cannot write '{}'", path.display()))?;

    tracing::debug!("Wrote '{}'", path.display());
    Ok(())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;
    use std::collections::BTreeMap;

    #[derive(Serialize)]
    struct Row {
        feature: String,
        cka:     f64,
    }

    #[test]
    fn test_csv_header_from_fields() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("cka").join("target_task.csv");
        let rows = vec![Row { feature: "clip".into(), cka: 0.5 }];

        write_csv(&path, &rows).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "feature,cka\nclip,0.5\n");
    }

    #[test]
    fn test_empty_rows_leave_no_headerless_file() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("above_chance.csv");

        write_csv::<Row>(&path, &[]).unwrap();
        assert!(!path.exists());

        write_csv(&path, &[Row { feature: "clip".into(), cka: 0.5 }]).unwrap();
        write_csv::<Row>(&path, &[]).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_json_written() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("nights.json");
        let mut m = BTreeMap::new();
        m.insert("clip", 0.75);

        write_json(&path, &m).unwrap();
        let back: BTreeMap<String, f64> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back["clip"], 0.75);
    }
}
