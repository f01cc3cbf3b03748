// src/scoring.rs
//! Rubric scoring: match evidence per category reduced to a score in {1, 2, 3}.
//!
//! - Flat category:  count > 2 → 3, count in {1, 2} → 2, count == 0 → 1
//! - Polar category: any positive → 3, else any negative → 1, else 2.
//!   Positive evidence always wins over negative evidence.
//! - Affective fusion (optional): max(keyword score, polarity score), where the
//!   polarity signal p maps p > 0.5 → 3, 0 < p <= 0.5 → 2, p <= 0 → 1.
//!
//! All scoring is total: any string (including "") yields five valid scores.

use metrics::counter;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::annotate::{annotate, Annotation};
use crate::error::ScoreError;
use crate::matcher::{CategoryMatches, CompiledCategory, CompiledTaxonomy};
use crate::sentiment::PolarityEstimator;
use crate::taxonomy::{Category, KeywordTaxonomy, Polarity};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("category score must be 1, 2 or 3 (got {0})")]
pub struct InvalidScore(pub u8);

/// A rubric level. Only 1, 2 and 3 are representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct CategoryScore(u8);

impl CategoryScore {
    pub const LOW: Self = Self(1);
    pub const NEUTRAL: Self = Self(2);
    pub const HIGH: Self = Self(3);

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for CategoryScore {
    type Error = InvalidScore;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            1..=3 => Ok(Self(v)),
            _ => Err(InvalidScore(v)),
        }
    }
}

impl From<CategoryScore> for u8 {
    fn from(s: CategoryScore) -> u8 {
        s.0
    }
}

impl fmt::Display for CategoryScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Flat rule over the number of spans.
pub fn flat_score(count: usize) -> CategoryScore {
    match count {
        0 => CategoryScore::LOW,
        1 | 2 => CategoryScore::NEUTRAL,
        _ => CategoryScore::HIGH,
    }
}

/// Polar rule. Positive dominance is intentional.
pub fn polar_score(positive: usize, negative: usize) -> CategoryScore {
    if positive > 0 {
        CategoryScore::HIGH
    } else if negative > 0 {
        CategoryScore::LOW
    } else {
        CategoryScore::NEUTRAL
    }
}

/// Map a polarity signal in [-1, 1] onto the rubric.
pub fn polarity_score(polarity: f32) -> CategoryScore {
    if polarity > 0.5 {
        CategoryScore::HIGH
    } else if polarity > 0.0 {
        CategoryScore::NEUTRAL
    } else {
        CategoryScore::LOW
    }
}

/// Keyword evidence can only raise the sentiment-only estimate.
pub fn fuse_affective(keyword: CategoryScore, polarity: f32) -> CategoryScore {
    keyword.max(polarity_score(polarity))
}

/// Score for one category from its matches, using the category's shape.
pub fn keyword_score(category: &CompiledCategory, matches: &CategoryMatches) -> CategoryScore {
    if category.is_polar() {
        polar_score(
            matches.count(Polarity::Positive),
            matches.count(Polarity::Negative),
        )
    } else {
        flat_score(matches.total())
    }
}

/// The five scores of one text, in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryScores {
    pub sensory: CategoryScore,
    pub affective: CategoryScore,
    pub intellectual: CategoryScore,
    pub behavior: CategoryScore,
    pub recommend: CategoryScore,
}

impl CategoryScores {
    pub fn get(&self, category: Category) -> CategoryScore {
        match category {
            Category::Sensory => self.sensory,
            Category::Affective => self.affective,
            Category::Intellectual => self.intellectual,
            Category::Behavior => self.behavior,
            Category::Recommend => self.recommend,
        }
    }

    pub fn set(&mut self, category: Category, score: CategoryScore) {
        let slot = match category {
            Category::Sensory => &mut self.sensory,
            Category::Affective => &mut self.affective,
            Category::Intellectual => &mut self.intellectual,
            Category::Behavior => &mut self.behavior,
            Category::Recommend => &mut self.recommend,
        };
        *slot = score;
    }

    /// (category, score) pairs in output order.
    pub fn iter(&self) -> impl Iterator<Item = (Category, CategoryScore)> + '_ {
        Category::ALL.into_iter().map(|c| (c, self.get(c)))
    }
}

impl Default for CategoryScores {
    fn default() -> Self {
        Self {
            sensory: CategoryScore::NEUTRAL,
            affective: CategoryScore::NEUTRAL,
            intellectual: CategoryScore::NEUTRAL,
            behavior: CategoryScore::NEUTRAL,
            recommend: CategoryScore::NEUTRAL,
        }
    }
}

/// Everything derived from one text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextReport {
    pub scores: CategoryScores,
    pub matches: Vec<CategoryMatches>,
    pub annotation: Annotation,
}

/// Compiled taxonomy plus scoring options. Immutable once built and shareable
/// across threads.
#[derive(Debug, Clone)]
pub struct Scorer {
    taxonomy: Arc<CompiledTaxonomy>,
    estimator: Option<Arc<dyn PolarityEstimator>>,
    annotated: Vec<Category>,
}

impl Scorer {
    pub fn new(taxonomy: &KeywordTaxonomy) -> Result<Self, ScoreError> {
        Ok(Self {
            taxonomy: Arc::new(CompiledTaxonomy::compile(taxonomy)?),
            estimator: None,
            annotated: Category::ALL.to_vec(),
        })
    }

    /// Enable Affective fusion with the given polarity estimator.
    pub fn with_affective_fusion(mut self, estimator: Arc<dyn PolarityEstimator>) -> Self {
        self.estimator = Some(estimator);
        self
    }

    /// Restrict annotation to these categories (scoring still covers all five).
    pub fn with_annotated_categories(mut self, categories: impl IntoIterator<Item = Category>) -> Self {
        let mut cats: Vec<Category> = categories.into_iter().collect();
        cats.sort();
        cats.dedup();
        self.annotated = cats;
        self
    }

    pub fn taxonomy(&self) -> &CompiledTaxonomy {
        &self.taxonomy
    }

    pub fn estimator(&self) -> Option<&dyn PolarityEstimator> {
        self.estimator.as_deref()
    }

    pub fn annotated_categories(&self) -> &[Category] {
        &self.annotated
    }

    /// Score a single category of `text`.
    pub fn score(&self, text: &str, category: Category) -> CategoryScore {
        let compiled = self.taxonomy.category(category);
        let matches = compiled.find_matches(text);
        self.finish_score(text, compiled, &matches)
    }

    fn finish_score(
        &self,
        text: &str,
        compiled: &CompiledCategory,
        matches: &CategoryMatches,
    ) -> CategoryScore {
        let base = keyword_score(compiled, matches);
        match (&self.estimator, compiled.category()) {
            (Some(est), Category::Affective) => fuse_affective(base, est.polarity(text)),
            _ => base,
        }
    }

    /// Match, score and annotate `text`.
    pub fn analyze(&self, text: &str) -> TextReport {
        let matches = self.taxonomy.find_all(text);

        let mut scores = CategoryScores::default();
        for (compiled, m) in self.taxonomy.categories().iter().zip(&matches) {
            scores.set(compiled.category(), self.finish_score(text, compiled, m));
            for span in &m.spans {
                counter!(
                    "keyword_matches_total",
                    "category" => compiled.category().key(),
                    "polarity" => span.polarity.key()
                )
                .increment(1);
            }
        }

        let annotation = if self.annotated.len() == Category::ALL.len() {
            annotate(text, &matches, self.taxonomy.taxonomy().markers())
        } else {
            let subset: Vec<CategoryMatches> = matches
                .iter()
                .filter(|m| self.annotated.contains(&m.category))
                .cloned()
                .collect();
            annotate(text, &subset, self.taxonomy.taxonomy().markers())
        };

        TextReport {
            scores,
            matches,
            annotation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotate::MarkerScheme;
    use crate::sentiment::FixedPolarity;
    use crate::taxonomy::KeywordGroup;

    fn flat_taxonomy() -> KeywordTaxonomy {
        KeywordTaxonomy::new(
            [
                (Category::Sensory, KeywordGroup::flat(["sound", "clear"])),
                (Category::Affective, KeywordGroup::polar(["love"], ["hate"])),
                (Category::Intellectual, KeywordGroup::flat(Vec::<String>::new())),
                (Category::Behavior, KeywordGroup::flat(["use"])),
                (Category::Recommend, KeywordGroup::flat(["recommend", "highly"])),
            ],
            MarkerScheme::default(),
        )
        .unwrap()
    }

    #[test]
    fn flat_rule_thresholds() {
        assert_eq!(flat_score(0), CategoryScore::LOW);
        assert_eq!(flat_score(1), CategoryScore::NEUTRAL);
        assert_eq!(flat_score(2), CategoryScore::NEUTRAL);
        assert_eq!(flat_score(3), CategoryScore::HIGH);
        assert_eq!(flat_score(40), CategoryScore::HIGH);
    }

    #[test]
    fn polar_rule_positive_dominates() {
        assert_eq!(polar_score(0, 0), CategoryScore::NEUTRAL);
        assert_eq!(polar_score(0, 5), CategoryScore::LOW);
        assert_eq!(polar_score(1, 0), CategoryScore::HIGH);
        assert_eq!(polar_score(1, 9), CategoryScore::HIGH);
    }

    #[test]
    fn polarity_mapping_edges() {
        assert_eq!(polarity_score(0.51), CategoryScore::HIGH);
        assert_eq!(polarity_score(0.5), CategoryScore::NEUTRAL);
        assert_eq!(polarity_score(0.01), CategoryScore::NEUTRAL);
        assert_eq!(polarity_score(0.0), CategoryScore::LOW);
        assert_eq!(polarity_score(-1.0), CategoryScore::LOW);
    }

    #[test]
    fn fusion_only_raises() {
        assert_eq!(fuse_affective(CategoryScore::LOW, 0.9), CategoryScore::HIGH);
        assert_eq!(fuse_affective(CategoryScore::HIGH, -0.9), CategoryScore::HIGH);
        assert_eq!(fuse_affective(CategoryScore::NEUTRAL, -0.2), CategoryScore::NEUTRAL);
    }

    #[test]
    fn score_bounds_are_enforced() {
        assert!(CategoryScore::try_from(0).is_err());
        assert!(CategoryScore::try_from(4).is_err());
        assert_eq!(CategoryScore::try_from(2).unwrap(), CategoryScore::NEUTRAL);
        let json = serde_json::to_string(&CategoryScore::HIGH).unwrap();
        assert_eq!(json, "3");
        assert!(serde_json::from_str::<CategoryScore>("0").is_err());
    }

    #[test]
    fn flat_counts_occurrences() {
        let s = Scorer::new(&flat_taxonomy()).unwrap();
        assert_eq!(s.score("sound", Category::Sensory), CategoryScore::NEUTRAL);
        assert_eq!(s.score("sound, sound and clear", Category::Sensory), CategoryScore::HIGH);
        assert_eq!(s.score("nothing here", Category::Sensory), CategoryScore::LOW);
        assert_eq!(s.score("", Category::Intellectual), CategoryScore::LOW);
    }

    #[test]
    fn affective_fusion_uses_estimator() {
        let base = Scorer::new(&flat_taxonomy()).unwrap();
        assert_eq!(base.score("meh", Category::Affective), CategoryScore::NEUTRAL);

        let fused = base.clone().with_affective_fusion(Arc::new(FixedPolarity(0.8)));
        assert_eq!(fused.score("meh", Category::Affective), CategoryScore::HIGH);
        // Fusion never touches other categories.
        assert_eq!(fused.score("meh", Category::Sensory), CategoryScore::LOW);

        let gloomy = base.with_affective_fusion(Arc::new(FixedPolarity(-0.8)));
        assert_eq!(gloomy.score("I hate it", Category::Affective), CategoryScore::LOW);
        assert_eq!(gloomy.score("meh", Category::Affective), CategoryScore::NEUTRAL);
    }

    #[test]
    fn annotation_subset() {
        let s = Scorer::new(&KeywordTaxonomy::builtin())
            .unwrap()
            .with_annotated_categories([Category::Sensory]);
        let r = s.analyze("clear sound, I love it");
        assert_eq!(r.annotation.as_str(), "{clear} sound, I love it");
        assert_eq!(r.scores.affective, CategoryScore::HIGH);
    }
}
