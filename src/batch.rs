// src/batch.rs
//! Batch driver: records in, scored reviews out, one-to-one and in input order.
//!
//! The whole batch is validated before any row is scored. A record without
//! text aborts the run with its 1-based row index; nothing partial is returned.

use metrics::counter;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::annotate::Mark;
use crate::debug::{anon_hash, dev_log_review};
use crate::error::ScoreError;
use crate::scoring::{CategoryScores, Scorer};

/// Name of the text field in tabular input and error messages.
pub const TEXT_FIELD: &str = "Review Text";

/// One input row as delivered by a reader. `text == None` is a null cell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(default)]
    pub text: Option<String>,
    /// Set when a non-string source value was turned into text.
    #[serde(skip)]
    pub coerced_from: Option<&'static str>,
    /// Set when the source bytes were not valid UTF-8 and were decoded lossily.
    #[serde(skip)]
    pub invalid_utf8: bool,
}

impl RawRecord {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn missing() -> Self {
        Self::default()
    }

    /// Build from a JSON value: strings as-is, `null` as missing, anything
    /// else rendered to text and flagged as coerced.
    pub fn from_json_value(value: &Value) -> Self {
        let (text, coerced_from) = match value {
            Value::Null => (None, None),
            Value::String(s) => (Some(s.clone()), None),
            Value::Bool(b) => (Some(b.to_string()), Some("bool")),
            Value::Number(n) => (Some(n.to_string()), Some("number")),
            Value::Array(_) => (Some(value.to_string()), Some("array")),
            Value::Object(_) => (Some(value.to_string()), Some("object")),
        };
        Self {
            text,
            coerced_from,
            invalid_utf8: false,
        }
    }
}

impl From<&str> for RawRecord {
    fn from(s: &str) -> Self {
        RawRecord::new(s)
    }
}

impl From<String> for RawRecord {
    fn from(s: String) -> Self {
        RawRecord::new(s)
    }
}

impl From<Option<String>> for RawRecord {
    fn from(text: Option<String>) -> Self {
        Self {
            text,
            ..Self::default()
        }
    }
}

/// A validated record with its stable 1-based position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Review {
    pub index: usize,
    pub text: String,
}

/// Output row: `index`, annotated text, marker positions and five scores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoredReview {
    pub index: usize,
    pub annotated_text: String,
    #[serde(default)]
    pub marks: Vec<Mark>,
    pub scores: CategoryScores,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Score rows on the rayon pool. Output order is unaffected.
    pub parallel: bool,
}

/// Non-fatal oddities in otherwise usable text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingAnomaly {
    /// Control characters other than tab, newline and carriage return.
    ControlCharacters { count: usize },
    /// A non-string value was rendered to text.
    Coerced { from: &'static str },
    /// Invalid UTF-8 replaced with U+FFFD.
    InvalidUtf8,
}

pub fn detect_anomaly(text: &str) -> Option<EncodingAnomaly> {
    let count = text
        .chars()
        .filter(|c| c.is_control() && !matches!(c, '\t' | '\n' | '\r'))
        .count();
    (count > 0).then_some(EncodingAnomaly::ControlCharacters { count })
}

/// Every anomaly of one record, in a stable order.
pub fn record_anomalies(rec: &RawRecord, text: &str) -> Vec<EncodingAnomaly> {
    let mut out = Vec::new();
    if rec.invalid_utf8 {
        out.push(EncodingAnomaly::InvalidUtf8);
    }
    if let Some(from) = rec.coerced_from {
        out.push(EncodingAnomaly::Coerced { from });
    }
    out.extend(detect_anomaly(text));
    out
}

/// One warning per anomaly; the counter moves once per affected row.
fn report_anomalies(row: usize, text: &str, anomalies: &[EncodingAnomaly]) {
    if anomalies.is_empty() {
        return;
    }
    counter!("encoding_anomalies_total").increment(1);
    let id = anon_hash(text);
    for anomaly in anomalies {
        match *anomaly {
            EncodingAnomaly::ControlCharacters { count } => {
                warn!(row, %id, count, "control characters in review text; scoring as literal text")
            }
            EncodingAnomaly::Coerced { from } => {
                warn!(row, %id, from, "non-text value coerced to text")
            }
            EncodingAnomaly::InvalidUtf8 => {
                warn!(row, %id, "invalid UTF-8 in review text; decoded lossily")
            }
        }
    }
}

/// Validate records and assign indexes. Fails on the first missing text.
pub fn reviews_from_records(records: &[RawRecord]) -> Result<Vec<Review>, ScoreError> {
    records
        .iter()
        .enumerate()
        .map(|(i, rec)| {
            let index = i + 1;
            let text = rec
                .text
                .as_ref()
                .ok_or_else(|| ScoreError::missing_text(index))?;
            report_anomalies(index, text, &record_anomalies(rec, text));
            Ok(Review {
                index,
                text: text.clone(),
            })
        })
        .collect()
}

pub fn score_review(scorer: &Scorer, review: &Review) -> ScoredReview {
    let report = scorer.analyze(&review.text);
    counter!("reviews_scored_total").increment(1);

    let keywords: Vec<String> = report
        .annotation
        .marks
        .iter()
        .map(|m| m.keyword.clone())
        .collect();
    dev_log_review(review.index, &review.text, &report.scores, &keywords);

    ScoredReview {
        index: review.index,
        annotated_text: report.annotation.text,
        marks: report.annotation.marks,
        scores: report.scores,
    }
}

/// Score every record. Output has exactly one row per input row, in order,
/// with `index == position + 1`.
pub fn run(
    scorer: &Scorer,
    records: &[RawRecord],
    opts: RunOptions,
) -> Result<Vec<ScoredReview>, ScoreError> {
    let reviews = reviews_from_records(records)?;
    info!(
        rows = reviews.len(),
        parallel = opts.parallel,
        affective_fusion = scorer.estimator().is_some(),
        "scoring batch"
    );

    // Indexed parallel collect keeps input order.
    let scored = if opts.parallel {
        reviews.par_iter().map(|r| score_review(scorer, r)).collect()
    } else {
        reviews.iter().map(|r| score_review(scorer, r)).collect()
    };
    Ok(scored)
}
