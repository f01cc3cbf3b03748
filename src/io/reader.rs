// src/io/reader.rs
use anyhow::{anyhow, Context, Result};
use serde_json::Value;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

use crate::batch::{RawRecord, TEXT_FIELD};

/// Where the header sits and which column holds the review text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderOptions {
    /// 0-based record index of the header row; earlier rows are skipped.
    pub header_row: usize,
    pub text_column: String,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            header_row: 2,
            text_column: TEXT_FIELD.to_string(),
        }
    }
}

/// Read records from a file; `.json` is a JSON array, anything else CSV.
pub fn read_records(path: &Path, opts: &ReaderOptions) -> Result<Vec<RawRecord>> {
    let file = File::open(path).with_context(|| format!("opening input {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let records = if ext == "json" {
        read_records_json(file, opts)
    } else {
        read_records_csv(file, opts)
    }
    .with_context(|| format!("reading input {}", path.display()))?;
    debug!(path = %path.display(), rows = records.len(), "input loaded");
    Ok(records)
}

/// CSV with `header_row` leading rows before the header. Empty or absent cells
/// in the text column are null text. Cells that are not valid UTF-8 are
/// decoded lossily and flagged on the record rather than failing the read.
pub fn read_records_csv<R: Read>(rdr: R, opts: &ReaderOptions) -> Result<Vec<RawRecord>> {
    let mut csv_rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(rdr);

    let mut column: Option<usize> = None;
    let mut out = Vec::new();
    for (i, rec) in csv_rdr.byte_records().enumerate() {
        let rec = rec.with_context(|| format!("CSV record {}", i + 1))?;
        if i < opts.header_row {
            continue;
        }
        let Some(col) = column else {
            let wanted = opts.text_column.trim();
            let idx = rec
                .iter()
                .position(|h| String::from_utf8_lossy(h).trim() == wanted)
                .ok_or_else(|| anyhow!("column `{wanted}` not found in header row {}", opts.header_row))?;
            column = Some(idx);
            continue;
        };
        out.push(text_cell(rec.get(col)));
    }

    if column.is_none() {
        return Err(anyhow!("header row {} not found", opts.header_row));
    }
    Ok(out)
}

fn text_cell(cell: Option<&[u8]>) -> RawRecord {
    match cell.filter(|c| !c.is_empty()) {
        None => RawRecord::missing(),
        Some(bytes) => match std::str::from_utf8(bytes) {
            Ok(s) => RawRecord::new(s),
            Err(_) => RawRecord {
                text: Some(String::from_utf8_lossy(bytes).into_owned()),
                invalid_utf8: true,
                ..RawRecord::default()
            },
        },
    }
}

/// JSON array of objects; the text is taken from `text_column`, then `text`.
pub fn read_records_json<R: Read>(rdr: R, opts: &ReaderOptions) -> Result<Vec<RawRecord>> {
    let rows: Vec<Value> = serde_json::from_reader(rdr).context("expected a JSON array")?;
    rows.iter()
        .enumerate()
        .map(|(i, row)| {
            let obj = row
                .as_object()
                .ok_or_else(|| anyhow!("JSON row {} is not an object", i + 1))?;
            let value = obj
                .get(opts.text_column.as_str())
                .or_else(|| obj.get("text"))
                .unwrap_or(&Value::Null);
            Ok(RawRecord::from_json_value(value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHEET: &str = "\
Survey export,,
Generated 2024,,
Id,Review Text,Rating
1,Clear sound,5
2,,3
3,\"Quoted, with comma\",4
";

    #[test]
    fn skips_preamble_and_selects_column() {
        let v = read_records_csv(SHEET.as_bytes(), &ReaderOptions::default()).unwrap();
        assert_eq!(v.len(), 3);
        assert_eq!(v[0].text.as_deref(), Some("Clear sound"));
        assert_eq!(v[1].text, None);
        assert_eq!(v[2].text.as_deref(), Some("Quoted, with comma"));
    }

    #[test]
    fn missing_column_is_an_error() {
        let opts = ReaderOptions {
            header_row: 2,
            text_column: "Comment".into(),
        };
        let err = read_records_csv(SHEET.as_bytes(), &opts).unwrap_err();
        assert!(err.to_string().contains("Comment"));
    }

    #[test]
    fn header_beyond_input_is_an_error() {
        let opts = ReaderOptions {
            header_row: 40,
            ..Default::default()
        };
        assert!(read_records_csv(SHEET.as_bytes(), &opts).is_err());
    }

    #[test]
    fn latin1_cell_is_decoded_lossily() {
        let mut sheet = b"a,,\nb,,\nId,Review Text\n1,caf".to_vec();
        sheet.push(0xE9); // Latin-1 'é'
        sheet.extend_from_slice(b" sound was clear\n2,fine\n");

        let v = read_records_csv(sheet.as_slice(), &ReaderOptions::default()).unwrap();
        assert_eq!(v.len(), 2);
        assert_eq!(v[0].text.as_deref(), Some("caf\u{FFFD} sound was clear"));
        assert!(v[0].invalid_utf8);
        assert_eq!(v[1].text.as_deref(), Some("fine"));
        assert!(!v[1].invalid_utf8);
    }

    #[test]
    fn json_rows_coerce_values() {
        let src = r#"[{"Review Text": "clear"}, {"text": 7}, {"other": 1}]"#;
        let v = read_records_json(src.as_bytes(), &ReaderOptions::default()).unwrap();
        assert_eq!(v[0].text.as_deref(), Some("clear"));
        assert_eq!(v[1].text.as_deref(), Some("7"));
        assert_eq!(v[1].coerced_from, Some("number"));
        assert_eq!(v[2].text, None);
    }
}
