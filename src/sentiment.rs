use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;

static LEXICON: Lazy<HashMap<String, i32>> = Lazy::new(|| {
    let raw = include_str!("../sentiment_lexicon.json");
    serde_json::from_str::<HashMap<String, i32>>(raw).expect("valid sentiment lexicon")
});

/// Normalization constant for the raw lexicon sum (`s / sqrt(s² + ALPHA)`).
const ALPHA: f32 = 15.0;

/// Narrow seam for the generic polarity signal used by Affective fusion.
/// Implementations must return a value in `[-1, 1]` for any input.
pub trait PolarityEstimator: Send + Sync + fmt::Debug {
    fn polarity(&self, text: &str) -> f32;
    fn name(&self) -> &'static str;
}

/// Lexicon-based estimator with short-range negation.
#[derive(Debug, Clone, Default)]
pub struct LexiconPolarity;

impl LexiconPolarity {
    pub fn new() -> Self {
        Self
    }

    #[inline]
    fn word_score(&self, w: &str) -> i32 {
        *LEXICON.get(w).unwrap_or(&0)
    }

    /// Raw lexicon sum. A negator among the previous 1..=3 tokens flips the word's valence.
    pub fn score_text(&self, text: &str) -> i32 {
        let tokens: Vec<String> = tokenize(text).collect();
        let mut score: i32 = 0;

        for i in 0..tokens.len() {
            let base = self.word_score(tokens[i].as_str());
            if base == 0 {
                continue;
            }
            let negated = (1..=3).any(|k| i >= k && is_negator(tokens[i - k].as_str()));
            score += if negated { -base } else { base };
        }

        score
    }
}

impl PolarityEstimator for LexiconPolarity {
    fn polarity(&self, text: &str) -> f32 {
        let raw = self.score_text(text);
        if raw == 0 {
            return 0.0;
        }
        let s = raw as f32;
        (s / (s * s + ALPHA).sqrt()).clamp(-1.0, 1.0)
    }

    fn name(&self) -> &'static str {
        "lexicon"
    }
}

/// Deterministic estimator for tests and dry runs.
#[derive(Debug, Clone, Copy)]
pub struct FixedPolarity(pub f32);

impl PolarityEstimator for FixedPolarity {
    fn polarity(&self, _text: &str) -> f32 {
        if self.0.is_nan() {
            0.0
        } else {
            self.0.clamp(-1.0, 1.0)
        }
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}

/// Lowercased word tokens; inner apostrophes are kept (normalized to `'`).
fn tokenize(s: &str) -> impl Iterator<Item = String> + '_ {
    s.split(|c: char| !(c.is_alphanumeric() || matches!(c, '\'' | '’')))
        .map(|t| t.trim_matches(|c| matches!(c, '\'' | '’')))
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase().replace('’', "'"))
}

fn is_negator(tok: &str) -> bool {
    matches!(
        tok,
        "not"
            | "no"
            | "never"
            | "isn't"
            | "wasn't"
            | "aren't"
            | "won't"
            | "can't"
            | "cannot"
            | "don't"
            | "doesn't"
            | "didn't"
            | "wouldn't"
            | "without"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neutral_and_empty_are_zero() {
        let p = LexiconPolarity::new();
        assert_eq!(p.polarity(""), 0.0);
        assert_eq!(p.polarity("the table is made of wood"), 0.0);
    }

    #[test]
    fn sign_follows_lexicon() {
        let p = LexiconPolarity::new();
        assert!(p.polarity("I love it, wonderful") > 0.5);
        assert!(p.polarity("terrible and boring") < 0.0);
    }

    #[test]
    fn negation_flips_valence() {
        let p = LexiconPolarity::new();
        let plain = p.score_text("it was good");
        let negated = p.score_text("it was not really good");
        assert_eq!(plain, 3);
        assert_eq!(negated, -3);
        let curly = p.score_text("I don’t like it");
        assert_eq!(curly, -2);
    }

    #[test]
    fn output_is_bounded() {
        let p = LexiconPolarity::new();
        let text = "superb ".repeat(200);
        let v = p.polarity(&text);
        assert!(v > 0.99 && v <= 1.0);
        assert_eq!(FixedPolarity(7.0).polarity("x"), 1.0);
        assert_eq!(FixedPolarity(f32::NAN).polarity("x"), 0.0);
    }
}
