// src/io/writer.rs
use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::batch::{ScoredReview, TEXT_FIELD};
use crate::taxonomy::Category;

/// Fixed column order: row number, annotated text, five category scores.
pub const OUTPUT_HEADERS: [&str; 7] = [
    "Sl",
    TEXT_FIELD,
    "Sensory",
    "Affective",
    "Intellectual",
    "Behavior",
    "Recommend",
];

pub fn write_csv<W: Write>(w: W, rows: &[ScoredReview]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(w);
    wtr.write_record(OUTPUT_HEADERS)?;
    for r in rows {
        let mut record = Vec::with_capacity(OUTPUT_HEADERS.len());
        record.push(r.index.to_string());
        record.push(r.annotated_text.clone());
        record.extend(Category::ALL.iter().map(|c| r.scores.get(*c).to_string()));
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<W: Write>(w: W, rows: &[ScoredReview]) -> Result<()> {
    let mut w = BufWriter::new(w);
    serde_json::to_writer_pretty(&mut w, rows)?;
    w.write_all(b"\n")?;
    w.flush()?;
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".partial");
    path.with_file_name(name)
}

/// Write the full result set to `path` (`.json` → JSON, else CSV).
/// Data goes to a sibling temp file first and is renamed into place, so a
/// failed write never leaves a truncated output behind.
pub fn write_output(path: &Path, rows: &[ScoredReview]) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    let tmp = temp_sibling(path);
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();

    let written = File::create(&tmp)
        .with_context(|| format!("creating {}", tmp.display()))
        .and_then(|f| {
            if ext == "json" {
                write_json(f, rows)
            } else {
                write_csv(f, rows)
            }
        });
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp);
        return Err(e.context(format!("writing output {}", path.display())));
    }

    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(anyhow::Error::new(e).context(format!("moving {} into place", tmp.display())));
    }
    info!(path = %path.display(), rows = rows.len(), "output written");
    Ok(())
}
