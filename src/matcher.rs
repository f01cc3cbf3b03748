// src/matcher.rs
//! Whole-word, case-insensitive keyword matching with non-overlapping spans.
//!
//! Every keyword is compiled once into a literal regex (escaped, `(?i)`).
//! Word boundaries are checked by hand against Unicode word chars, so
//! keywords that start or end with punctuation follow the same rule as plain
//! words. Apostrophes inside a keyword accept `'`, `‘` and `’`.
//!
//! Scan order is keyword by keyword, each pass left to right. A candidate that
//! overlaps a span claimed earlier in the same scan is dropped.

use regex::Regex;
use serde::Serialize;

use crate::error::ScoreError;
use crate::taxonomy::{Category, KeywordTaxonomy, Polarity};

/// A matched keyword: half-open byte range `[start, end)` into the source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchSpan {
    pub start: usize,
    pub end: usize,
    pub keyword: String,
    pub polarity: Polarity,
}

impl MatchSpan {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn overlaps(&self, other: &MatchSpan) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// The matched slice of `text` (the text the span was produced from).
    pub fn as_str<'a>(&self, text: &'a str) -> &'a str {
        &text[self.start..self.end]
    }
}

#[inline]
pub(crate) fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[inline]
fn is_apostrophe(c: char) -> bool {
    matches!(c, '\'' | '‘' | '’')
}

fn keyword_pattern(keyword: &str) -> String {
    let mut pat = String::with_capacity(keyword.len() + 8);
    pat.push_str("(?i)");
    let mut buf = [0u8; 4];
    for ch in keyword.chars() {
        if is_apostrophe(ch) {
            pat.push_str("['‘’]");
        } else {
            pat.push_str(&regex::escape(ch.encode_utf8(&mut buf)));
        }
    }
    pat
}

fn is_whole_word(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
}

fn next_char_boundary(text: &str, at: usize) -> usize {
    text[at..]
        .chars()
        .next()
        .map(|c| at + c.len_utf8())
        .unwrap_or(text.len() + 1)
}

#[derive(Debug)]
struct CompiledKeyword {
    keyword: String,
    re: Regex,
}

impl CompiledKeyword {
    /// One keyword's own pass: non-overlapping whole-word occurrences, left to right.
    fn scan(&self, text: &str, polarity: Polarity, claimed: &mut Vec<MatchSpan>) {
        let mut at = 0;
        while at <= text.len() {
            let Some(m) = self.re.find_at(text, at) else {
                break;
            };
            if m.start() == m.end() {
                at = next_char_boundary(text, m.start());
                continue;
            }
            if !is_whole_word(text, m.start(), m.end()) {
                // Retry one char further; a later alignment may still be a whole word.
                at = next_char_boundary(text, m.start());
                continue;
            }
            let span = MatchSpan {
                start: m.start(),
                end: m.end(),
                keyword: self.keyword.clone(),
                polarity,
            };
            if !claimed.iter().any(|c| c.overlaps(&span)) {
                claimed.push(span);
            }
            at = m.end();
        }
    }
}

/// A single keyword list, compiled. All spans it yields carry `polarity`.
#[derive(Debug)]
pub struct CompiledGroup {
    polarity: Polarity,
    keywords: Vec<CompiledKeyword>,
}

impl CompiledGroup {
    pub fn compile<S: AsRef<str>>(polarity: Polarity, keywords: &[S]) -> Result<Self, ScoreError> {
        let keywords = keywords
            .iter()
            .map(|k| {
                let keyword = k.as_ref().to_string();
                if keyword.is_empty() {
                    return Err(ScoreError::config("empty keyword"));
                }
                let re = Regex::new(&keyword_pattern(&keyword))
                    .map_err(|e| ScoreError::config(format!("keyword `{keyword}`: {e}")))?;
                Ok(CompiledKeyword { keyword, re })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { polarity, keywords })
    }

    pub fn polarity(&self) -> Polarity {
        self.polarity
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    /// All non-overlapping matches of this group in `text`, ordered by start.
    pub fn find_matches(&self, text: &str) -> Vec<MatchSpan> {
        let mut claimed = Vec::new();
        self.scan_into(text, &mut claimed);
        claimed.sort_by_key(|s| s.start);
        claimed
    }

    /// Scan while honoring spans already claimed by an earlier group.
    pub(crate) fn scan_into(&self, text: &str, claimed: &mut Vec<MatchSpan>) {
        for kw in &self.keywords {
            kw.scan(text, self.polarity, claimed);
        }
    }
}

/// Matches for one category, ordered by start offset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryMatches {
    pub category: Category,
    pub spans: Vec<MatchSpan>,
}

impl CategoryMatches {
    pub fn count(&self, polarity: Polarity) -> usize {
        self.spans.iter().filter(|s| s.polarity == polarity).count()
    }

    pub fn total(&self) -> usize {
        self.spans.len()
    }
}

/// One category's groups in scan order (positive, negative) or a single flat group.
#[derive(Debug)]
pub struct CompiledCategory {
    category: Category,
    polar: bool,
    groups: Vec<CompiledGroup>,
}

impl CompiledCategory {
    pub fn category(&self) -> Category {
        self.category
    }

    pub fn is_polar(&self) -> bool {
        self.polar
    }

    pub fn groups(&self) -> &[CompiledGroup] {
        &self.groups
    }

    /// Scan every group of the category with a shared claim set.
    pub fn find_matches(&self, text: &str) -> CategoryMatches {
        let mut claimed = Vec::new();
        for g in &self.groups {
            g.scan_into(text, &mut claimed);
        }
        claimed.sort_by_key(|s| s.start);
        CategoryMatches {
            category: self.category,
            spans: claimed,
        }
    }
}

/// Read-only compiled form of a `KeywordTaxonomy`, built once per run.
#[derive(Debug)]
pub struct CompiledTaxonomy {
    source: KeywordTaxonomy,
    categories: Vec<CompiledCategory>,
}

impl CompiledTaxonomy {
    pub fn compile(taxonomy: &KeywordTaxonomy) -> Result<Self, ScoreError> {
        let categories = Category::ALL
            .into_iter()
            .map(|cat| {
                let group = taxonomy.group(cat);
                let groups = group
                    .buckets()
                    .into_iter()
                    .map(|(polarity, keywords)| CompiledGroup::compile(polarity, keywords))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(CompiledCategory {
                    category: cat,
                    polar: group.is_polar(),
                    groups,
                })
            })
            .collect::<Result<Vec<_>, ScoreError>>()?;
        Ok(Self {
            source: taxonomy.clone(),
            categories,
        })
    }

    pub fn taxonomy(&self) -> &KeywordTaxonomy {
        &self.source
    }

    pub fn category(&self, category: Category) -> &CompiledCategory {
        &self.categories[category.index()]
    }

    pub fn categories(&self) -> &[CompiledCategory] {
        &self.categories
    }

    /// Per-category matches in the fixed category order.
    pub fn find_all(&self, text: &str) -> Vec<CategoryMatches> {
        self.categories.iter().map(|c| c.find_matches(text)).collect()
    }
}
