// src/annotate.rs
//! Annotated text: the original review with every matched keyword wrapped in
//! a delimiter pair that encodes its bucket.
//!
//! Marker contract for writers (stable):
//! - default delimiters: positive `{..}`, neutral `{..}`, negative `[..]`
//! - one bucket per marker; markers never nest or cross
//! - `Annotation::marks` gives exact byte ranges of every delimiter and its
//!   content, so a writer can style the content and drop the delimiters
//!   without re-parsing (`Annotation::segments`)
//!
//! The output is rebuilt from immutable spans; nothing is spliced in place.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Range;
use tracing::debug;

use crate::error::ScoreError;
use crate::matcher::{CategoryMatches, MatchSpan};
use crate::taxonomy::{Category, Polarity};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarkerStyle {
    pub open: String,
    pub close: String,
}

impl MarkerStyle {
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Self {
        Self {
            open: open.into(),
            close: close.into(),
        }
    }

    /// Bytes added around one wrapped span.
    pub fn overhead(&self) -> usize {
        self.open.len() + self.close.len()
    }
}

/// Bucket defaults plus optional per-(category, polarity) overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerScheme {
    positive: MarkerStyle,
    negative: MarkerStyle,
    neutral: MarkerStyle,
    overrides: BTreeMap<(Category, Polarity), MarkerStyle>,
}

impl Default for MarkerScheme {
    fn default() -> Self {
        Self {
            positive: MarkerStyle::new("{", "}"),
            negative: MarkerStyle::new("[", "]"),
            neutral: MarkerStyle::new("{", "}"),
            overrides: BTreeMap::new(),
        }
    }
}

impl MarkerScheme {
    pub fn style(&self, category: Category, polarity: Polarity) -> &MarkerStyle {
        if let Some(s) = self.overrides.get(&(category, polarity)) {
            return s;
        }
        match polarity {
            Polarity::Positive => &self.positive,
            Polarity::Negative => &self.negative,
            Polarity::Neutral => &self.neutral,
        }
    }

    pub fn set_bucket(&mut self, polarity: Polarity, style: MarkerStyle) {
        match polarity {
            Polarity::Positive => self.positive = style,
            Polarity::Negative => self.negative = style,
            Polarity::Neutral => self.neutral = style,
        }
    }

    pub fn set_override(&mut self, category: Category, polarity: Polarity, style: MarkerStyle) {
        self.overrides.insert((category, polarity), style);
    }

    /// Delimiters must be non-empty, otherwise a marked span is invisible.
    pub fn validate(&self) -> Result<(), ScoreError> {
        let defaults = [
            ("positive".to_string(), &self.positive),
            ("negative".to_string(), &self.negative),
            ("neutral".to_string(), &self.neutral),
        ];
        let overrides = self
            .overrides
            .iter()
            .map(|((c, p), s)| (format!("{}.{}", c.key(), p.key()), s));
        for (name, style) in defaults.into_iter().chain(overrides) {
            if style.open.is_empty() || style.close.is_empty() {
                return Err(ScoreError::config(format!(
                    "marker `{name}` needs non-empty open and close delimiters"
                )));
            }
        }
        Ok(())
    }
}

/// One wrapped keyword. All ranges index into `Annotation::text`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mark {
    pub category: Category,
    pub polarity: Polarity,
    pub keyword: String,
    pub open: Range<usize>,
    pub content: Range<usize>,
    pub close: Range<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Annotation {
    pub text: String,
    pub marks: Vec<Mark>,
}

/// A run of annotated output: either plain text or the content of a mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment<'a> {
    pub text: &'a str,
    pub bucket: Option<(Category, Polarity)>,
}

impl Annotation {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Remove every delimiter, yielding the original text.
    pub fn strip(&self) -> String {
        let mut out = String::with_capacity(self.text.len());
        let mut cursor = 0;
        for m in &self.marks {
            out.push_str(&self.text[cursor..m.open.start]);
            out.push_str(&self.text[m.content.clone()]);
            cursor = m.close.end;
        }
        out.push_str(&self.text[cursor..]);
        out
    }

    /// Plain and marked runs in order, delimiters excluded.
    pub fn segments(&self) -> Vec<Segment<'_>> {
        let mut out = Vec::with_capacity(self.marks.len() * 2 + 1);
        let mut cursor = 0;
        for m in &self.marks {
            if cursor < m.open.start {
                out.push(Segment {
                    text: &self.text[cursor..m.open.start],
                    bucket: None,
                });
            }
            out.push(Segment {
                text: &self.text[m.content.clone()],
                bucket: Some((m.category, m.polarity)),
            });
            cursor = m.close.end;
        }
        if cursor < self.text.len() {
            out.push(Segment {
                text: &self.text[cursor..],
                bucket: None,
            });
        }
        out
    }
}

fn span_fits(text: &str, span: &MatchSpan) -> bool {
    span.start < span.end
        && span.end <= text.len()
        && text.is_char_boundary(span.start)
        && text.is_char_boundary(span.end)
}

/// Merge spans across categories: categories in the given order, and a span
/// overlapping any already accepted span is dropped. Result is ordered by start.
pub fn merge_spans<'a>(text: &str, matches: &'a [CategoryMatches]) -> Vec<(Category, &'a MatchSpan)> {
    let mut accepted: Vec<(Category, &MatchSpan)> = Vec::new();
    for cm in matches {
        for span in &cm.spans {
            if !span_fits(text, span) {
                debug!(
                    category = cm.category.key(),
                    start = span.start,
                    end = span.end,
                    "skipping span outside text"
                );
                continue;
            }
            if accepted.iter().any(|(_, a)| a.overlaps(span)) {
                continue;
            }
            accepted.push((cm.category, span));
        }
    }
    accepted.sort_by_key(|(_, s)| s.start);
    accepted
}

/// Rebuild `text` with every accepted span wrapped in its marker.
pub fn annotate(text: &str, matches: &[CategoryMatches], scheme: &MarkerScheme) -> Annotation {
    let spans = merge_spans(text, matches);
    let overhead: usize = spans
        .iter()
        .map(|(c, s)| scheme.style(*c, s.polarity).overhead())
        .sum();

    let mut out = String::with_capacity(text.len() + overhead);
    let mut marks = Vec::with_capacity(spans.len());
    let mut cursor = 0;

    for (category, span) in spans {
        let style = scheme.style(category, span.polarity);
        out.push_str(&text[cursor..span.start]);

        let open_start = out.len();
        out.push_str(&style.open);
        let content_start = out.len();
        out.push_str(span.as_str(text));
        let close_start = out.len();
        out.push_str(&style.close);

        marks.push(Mark {
            category,
            polarity: span.polarity,
            keyword: span.keyword.clone(),
            open: open_start..content_start,
            content: content_start..close_start,
            close: close_start..out.len(),
        });
        cursor = span.end;
    }
    out.push_str(&text[cursor..]);

    Annotation { text: out, marks }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(start: usize, end: usize, polarity: Polarity) -> MatchSpan {
        MatchSpan {
            start,
            end,
            keyword: String::new(),
            polarity,
        }
    }

    fn cm(category: Category, spans: Vec<MatchSpan>) -> CategoryMatches {
        CategoryMatches { category, spans }
    }

    #[test]
    fn wraps_by_bucket() {
        let text = "clear but noisy";
        let matches = vec![cm(
            Category::Sensory,
            vec![span(0, 5, Polarity::Positive), span(10, 15, Polarity::Negative)],
        )];
        let a = annotate(text, &matches, &MarkerScheme::default());
        assert_eq!(a.as_str(), "{clear} but [noisy]");
        assert_eq!(a.strip(), text);
        assert_eq!(a.text.len(), text.len() + 4);
    }

    #[test]
    fn cross_category_conflict_keeps_first_category() {
        let text = "an engaging talk";
        let matches = vec![
            cm(Category::Sensory, vec![span(3, 11, Polarity::Positive)]),
            cm(Category::Behavior, vec![span(3, 11, Polarity::Negative)]),
        ];
        let a = annotate(text, &matches, &MarkerScheme::default());
        assert_eq!(a.as_str(), "an {engaging} talk");
        assert_eq!(a.marks.len(), 1);
        assert_eq!(a.marks[0].category, Category::Sensory);
    }

    #[test]
    fn per_category_override_and_segments() {
        let mut scheme = MarkerScheme::default();
        scheme.set_override(Category::Recommend, Polarity::Positive, MarkerStyle::new("<<", ">>"));
        let text = "highly clear";
        let matches = vec![
            cm(Category::Sensory, vec![span(7, 12, Polarity::Positive)]),
            cm(Category::Recommend, vec![span(0, 6, Polarity::Positive)]),
        ];
        let a = annotate(text, &matches, &scheme);
        assert_eq!(a.as_str(), "<<highly>> {clear}");
        let segs: Vec<_> = a.segments().iter().map(|s| s.text).collect();
        assert_eq!(segs, vec!["highly", " ", "clear"]);
        assert_eq!(a.segments()[0].bucket, Some((Category::Recommend, Polarity::Positive)));
    }

    #[test]
    fn invalid_spans_are_ignored() {
        let text = "héllo";
        // 2 is inside the two-byte 'é'.
        let matches = vec![cm(
            Category::Sensory,
            vec![span(0, 2, Polarity::Positive), span(3, 99, Polarity::Positive)],
        )];
        let a = annotate(text, &matches, &MarkerScheme::default());
        assert_eq!(a.as_str(), text);
        assert!(a.marks.is_empty());
    }

    #[test]
    fn strip_survives_marker_chars_in_source() {
        let text = "{clear} [x]";
        let matches = vec![cm(Category::Sensory, vec![span(1, 6, Polarity::Positive)])];
        let a = annotate(text, &matches, &MarkerScheme::default());
        assert_eq!(a.as_str(), "{{clear}} [x]");
        assert_eq!(a.strip(), text);
    }

    #[test]
    fn empty_marker_is_rejected() {
        let mut scheme = MarkerScheme::default();
        scheme.set_bucket(Polarity::Negative, MarkerStyle::new("", "]"));
        assert!(scheme.validate().is_err());
    }
}
