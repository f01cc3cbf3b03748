// src/taxonomy.rs
//! Keyword taxonomy: the five rubric categories and their keyword groups.
//!
//! A taxonomy is loaded once (TOML or JSON) and treated as read-only
//! configuration for the whole run. Accepted shapes per category:
//! - `sensory = ["a", "b"]`                  flat list
//! - `sensory = { keywords = ["a", "b"] }`   flat table
//! - `sensory = { positive = [..], negative = [..] }`   polar
//!
//! Optional `[markers]` section configures the annotation delimiters
//! (see `annotate::MarkerScheme`).

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::annotate::{MarkerScheme, MarkerStyle};
use crate::error::ScoreError;

// --- env defaults & names ---
pub const DEFAULT_TAXONOMY_PATH: &str = "config/taxonomy.toml";
pub const ENV_TAXONOMY_PATH: &str = "TAXONOMY_PATH";

static BUILTIN: Lazy<KeywordTaxonomy> = Lazy::new(|| {
    let raw = include_str!("../config/taxonomy.toml");
    KeywordTaxonomy::from_toml_str(raw).expect("valid built-in taxonomy")
});

/// One of the five fixed scoring dimensions. Declaration order is output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Sensory,
    Affective,
    Intellectual,
    Behavior,
    Recommend,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Sensory,
        Category::Affective,
        Category::Intellectual,
        Category::Behavior,
        Category::Recommend,
    ];

    /// Lowercase config key.
    pub fn key(self) -> &'static str {
        match self {
            Category::Sensory => "sensory",
            Category::Affective => "affective",
            Category::Intellectual => "intellectual",
            Category::Behavior => "behavior",
            Category::Recommend => "recommend",
        }
    }

    /// Column header label.
    pub fn label(self) -> &'static str {
        match self {
            Category::Sensory => "Sensory",
            Category::Affective => "Affective",
            Category::Intellectual => "Intellectual",
            Category::Behavior => "Behavior",
            Category::Recommend => "Recommend",
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = ScoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| c.key() == wanted)
            .ok_or_else(|| ScoreError::config(format!("unknown category `{}`", s.trim())))
    }
}

/// Evidence bucket a keyword belongs to. Flat groups are `Neutral`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    Positive,
    Negative,
    Neutral,
}

impl Polarity {
    pub fn key(self) -> &'static str {
        match self {
            Polarity::Positive => "positive",
            Polarity::Negative => "negative",
            Polarity::Neutral => "neutral",
        }
    }
}

/// A category's keywords, either undifferentiated or split by polarity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum KeywordGroup {
    Flat(Vec<String>),
    Polar {
        positive: Vec<String>,
        negative: Vec<String>,
    },
}

impl KeywordGroup {
    pub fn flat<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        KeywordGroup::Flat(keywords.into_iter().map(Into::into).collect())
    }

    pub fn polar<P, N, S>(positive: P, negative: N) -> Self
    where
        P: IntoIterator<Item = S>,
        N: IntoIterator<Item = S>,
        S: Into<String>,
    {
        KeywordGroup::Polar {
            positive: positive.into_iter().map(Into::into).collect(),
            negative: negative.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_polar(&self) -> bool {
        matches!(self, KeywordGroup::Polar { .. })
    }

    /// Groups in scan order: positive before negative; flat is a single neutral group.
    pub fn buckets(&self) -> Vec<(Polarity, &[String])> {
        match self {
            KeywordGroup::Flat(k) => vec![(Polarity::Neutral, k.as_slice())],
            KeywordGroup::Polar { positive, negative } => vec![
                (Polarity::Positive, positive.as_slice()),
                (Polarity::Negative, negative.as_slice()),
            ],
        }
    }
}

/// The full rubric: one keyword group per category plus annotation markers.
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordTaxonomy {
    groups: BTreeMap<Category, KeywordGroup>,
    markers: MarkerScheme,
}

impl KeywordTaxonomy {
    /// Build from explicit groups. Every category must be present.
    pub fn new(
        groups: impl IntoIterator<Item = (Category, KeywordGroup)>,
        markers: MarkerScheme,
    ) -> Result<Self, ScoreError> {
        let mut map = BTreeMap::new();
        for (cat, group) in groups {
            let cleaned = clean_group(cat, group)?;
            if map.insert(cat, cleaned).is_some() {
                return Err(ScoreError::config(format!(
                    "category `{}` defined twice",
                    cat.key()
                )));
            }
        }
        if let Some(missing) = Category::ALL.iter().find(|c| !map.contains_key(c)) {
            return Err(ScoreError::config(format!(
                "category `{}` is missing",
                missing.key()
            )));
        }
        markers.validate()?;
        Ok(Self {
            groups: map,
            markers,
        })
    }

    /// The taxonomy embedded at build time (`config/taxonomy.toml`).
    pub fn builtin() -> Self {
        BUILTIN.clone()
    }

    pub fn group(&self, category: Category) -> &KeywordGroup {
        // Construction guarantees every category is present.
        &self.groups[&category]
    }

    pub fn groups(&self) -> impl Iterator<Item = (Category, &KeywordGroup)> {
        self.groups.iter().map(|(c, g)| (*c, g))
    }

    pub fn markers(&self) -> &MarkerScheme {
        &self.markers
    }

    pub fn with_markers(mut self, markers: MarkerScheme) -> Result<Self, ScoreError> {
        markers.validate()?;
        self.markers = markers;
        Ok(self)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ScoreError> {
        let raw: RawTaxonomy = toml::from_str(s)?;
        raw.into_taxonomy()
    }

    pub fn from_json_str(s: &str) -> Result<Self, ScoreError> {
        let raw: RawTaxonomy = serde_json::from_str(s)?;
        raw.into_taxonomy()
    }

    /// Load from a file; `.json` is parsed as JSON, anything else as TOML.
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!("Failed to read taxonomy at {}: {}", path.display(), e)
        })?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let taxonomy = if ext == "json" {
            Self::from_json_str(&content)?
        } else {
            Self::from_toml_str(&content)?
        };
        Ok(taxonomy)
    }

    /// Resolve the taxonomy for a run:
    /// 1) `$TAXONOMY_PATH` (must exist)
    /// 2) `config/taxonomy.toml` in the working dir
    /// 3) the built-in taxonomy
    pub fn from_env() -> anyhow::Result<Self> {
        if let Ok(p) = std::env::var(ENV_TAXONOMY_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                anyhow::bail!("{ENV_TAXONOMY_PATH} points to non-existent path");
            }
            return Self::from_path(&pb);
        }
        let default = PathBuf::from(DEFAULT_TAXONOMY_PATH);
        if default.exists() {
            return Self::from_path(&default);
        }
        Ok(Self::builtin())
    }
}

/* ----------------------------
Raw config schema
---------------------------- */

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTaxonomy {
    categories: BTreeMap<String, RawGroup>,
    #[serde(default)]
    markers: Option<RawMarkers>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawGroup {
    List(Vec<String>),
    Flat(RawFlat),
    Polar(RawPolar),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawFlat {
    keywords: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPolar {
    positive: Vec<String>,
    negative: Vec<String>,
}

type RawPair = (String, String);

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawBuckets {
    positive: Option<RawPair>,
    negative: Option<RawPair>,
    neutral: Option<RawPair>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawMarkers {
    positive: Option<RawPair>,
    negative: Option<RawPair>,
    neutral: Option<RawPair>,
    #[serde(default)]
    overrides: BTreeMap<String, RawBuckets>,
}

impl RawBuckets {
    fn pairs(self) -> Vec<(Polarity, RawPair)> {
        [
            (Polarity::Positive, self.positive),
            (Polarity::Negative, self.negative),
            (Polarity::Neutral, self.neutral),
        ]
        .into_iter()
        .filter_map(|(p, pair)| pair.map(|v| (p, v)))
        .collect()
    }
}

impl RawTaxonomy {
    fn into_taxonomy(self) -> Result<KeywordTaxonomy, ScoreError> {
        let mut groups = Vec::with_capacity(self.categories.len());
        for (name, raw) in self.categories {
            let cat: Category = name.parse()?;
            let group = match raw {
                RawGroup::List(k) | RawGroup::Flat(RawFlat { keywords: k }) => KeywordGroup::Flat(k),
                RawGroup::Polar(RawPolar { positive, negative }) => {
                    KeywordGroup::Polar { positive, negative }
                }
            };
            groups.push((cat, group));
        }

        let mut markers = MarkerScheme::default();
        if let Some(raw) = self.markers {
            let defaults = RawBuckets {
                positive: raw.positive,
                negative: raw.negative,
                neutral: raw.neutral,
            };
            for (polarity, (open, close)) in defaults.pairs() {
                markers.set_bucket(polarity, MarkerStyle::new(open, close));
            }
            for (name, buckets) in raw.overrides {
                let cat: Category = name.parse()?;
                for (polarity, (open, close)) in buckets.pairs() {
                    markers.set_override(cat, polarity, MarkerStyle::new(open, close));
                }
            }
        }

        KeywordTaxonomy::new(groups, markers)
    }
}

/// Trim keywords, reject blanks, drop case-insensitive duplicates (first wins).
fn clean_group(cat: Category, group: KeywordGroup) -> Result<KeywordGroup, ScoreError> {
    let clean = |polarity: Polarity, items: Vec<String>| -> Result<Vec<String>, ScoreError> {
        let mut seen = HashSet::new();
        let mut out = Vec::with_capacity(items.len());
        for it in items {
            let t = it.trim();
            if t.is_empty() {
                return Err(ScoreError::config(format!(
                    "category `{}` has an empty {} keyword",
                    cat.key(),
                    polarity.key()
                )));
            }
            if seen.insert(t.to_lowercase()) {
                out.push(t.to_string());
            }
        }
        Ok(out)
    };

    Ok(match group {
        KeywordGroup::Flat(k) => KeywordGroup::Flat(clean(Polarity::Neutral, k)?),
        KeywordGroup::Polar { positive, negative } => KeywordGroup::Polar {
            positive: clean(Polarity::Positive, positive)?,
            negative: clean(Polarity::Negative, negative)?,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const FLAT_TOML: &str = r#"
[categories]
sensory = ["sound", "bright"]
affective = { keywords = ["love"] }
intellectual = []
behavior = ["use", " use ", "USE"]

[categories.recommend]
positive = ["highly"]
negative = ["avoid"]
"#;

    #[test]
    fn builtin_is_polar_for_every_category() {
        let t = KeywordTaxonomy::builtin();
        for cat in Category::ALL {
            assert!(t.group(cat).is_polar(), "{cat} should be polar");
        }
        match t.group(Category::Recommend) {
            KeywordGroup::Polar { negative, .. } => {
                assert!(negative.iter().any(|k| k == "advise against"));
                assert!(negative.iter().any(|k| k == "don’t"));
            }
            KeywordGroup::Flat(_) => unreachable!(),
        }
    }

    #[test]
    fn mixed_shapes_parse_and_dedup() {
        let t = KeywordTaxonomy::from_toml_str(FLAT_TOML).unwrap();
        assert_eq!(t.group(Category::Sensory), &KeywordGroup::flat(["sound", "bright"]));
        assert_eq!(t.group(Category::Affective), &KeywordGroup::flat(["love"]));
        assert_eq!(t.group(Category::Behavior), &KeywordGroup::flat(["use"]));
        assert!(t.group(Category::Recommend).is_polar());
    }

    #[test]
    fn json_shape_is_accepted() {
        let json = r#"{
            "categories": {
                "sensory": ["clear"],
                "affective": {"positive": ["love"], "negative": ["hate"]},
                "intellectual": [],
                "behavior": [],
                "recommend": {"keywords": ["recommend"]}
            },
            "markers": {"positive": ["<", ">"]}
        }"#;
        let t = KeywordTaxonomy::from_json_str(json).unwrap();
        assert_eq!(
            t.markers().style(Category::Affective, Polarity::Positive),
            &MarkerStyle::new("<", ">")
        );
    }

    #[test]
    fn malformed_configs_are_configuration_errors() {
        let cases = [
            // unknown category
            r#"[categories]
sensory = []
affective = []
intellectual = []
behavior = []
recommend = []
smell = []"#,
            // missing category
            r#"[categories]
sensory = []"#,
            // value is not a list of strings
            r#"[categories]
sensory = 5
affective = []
intellectual = []
behavior = []
recommend = []"#,
            // blank keyword
            r#"[categories]
sensory = ["  "]
affective = []
intellectual = []
behavior = []
recommend = []"#,
        ];
        for src in cases {
            let err = KeywordTaxonomy::from_toml_str(src).unwrap_err();
            assert!(
                matches!(err, ScoreError::Configuration { .. }),
                "expected configuration error for:\n{src}\ngot {err:?}"
            );
        }
    }

    #[test]
    fn category_parse_is_case_insensitive() {
        assert_eq!("Sensory".parse::<Category>().unwrap(), Category::Sensory);
        assert_eq!(" RECOMMEND ".parse::<Category>().unwrap(), Category::Recommend);
        assert!("taste".parse::<Category>().is_err());
    }
}
