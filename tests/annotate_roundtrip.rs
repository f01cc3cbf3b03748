// tests/annotate_roundtrip.rs
//
// Annotation must never lose, duplicate or reorder source text.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use review_scorer::{Category, KeywordTaxonomy, MarkerScheme, MarkerStyle, Polarity, Scorer};

const VOCAB: &[&str] = &[
    "clear", "Clear", "CRISP", "noisy", "love", "hate", "engaging", "advise against", "advise",
    "against", "don’t", "don't", "wouldn’t", "highly", "recommend", "unclear", "soundproof",
    "thought-provoking", "goal-oriented", "naïve", "café", "{", "}", "[", "]", "😀", "ß",
    "static", "content", "second", "back", "support",
];
const GLUE: &[&str] = &[" ", "  ", ", ", ". ", "-", "_", "\n", "'", "’", "", "\t", "!"];

fn random_text(rng: &mut StdRng) -> String {
    let words = rng.random_range(0..24);
    let mut s = String::new();
    for _ in 0..words {
        s.push_str(VOCAB[rng.random_range(0..VOCAB.len())]);
        s.push_str(GLUE[rng.random_range(0..GLUE.len())]);
    }
    s
}

#[test]
fn strip_restores_original_for_random_texts() {
    let scorer = Scorer::new(&KeywordTaxonomy::builtin()).unwrap();
    let scheme = MarkerScheme::default();
    let mut rng = StdRng::seed_from_u64(0x5eed);

    for _ in 0..500 {
        let text = random_text(&mut rng);
        let report = scorer.analyze(&text);
        let a = &report.annotation;

        assert_eq!(a.strip(), text, "round-trip failed for {text:?}");

        let overhead: usize = a
            .marks
            .iter()
            .map(|m| scheme.style(m.category, m.polarity).overhead())
            .sum();
        assert_eq!(a.text.len(), text.len() + overhead, "length for {text:?}");

        // Marks are ordered, disjoint and wrap exactly their keyword text.
        for pair in a.marks.windows(2) {
            assert!(pair[0].close.end <= pair[1].open.start, "crossing marks in {text:?}");
        }
        for m in &a.marks {
            assert_eq!(&a.text[m.open.clone()], scheme.style(m.category, m.polarity).open);
            assert_eq!(&a.text[m.close.clone()], scheme.style(m.category, m.polarity).close);
            let content = &a.text[m.content.clone()];
            assert!(
                content
                    .replace(['’', '‘'], "'")
                    .eq_ignore_ascii_case(&m.keyword.replace(['’', '‘'], "'")),
                "mark content {content:?} vs keyword {:?}",
                m.keyword
            );
        }
    }
}

#[test]
fn multi_char_markers_do_not_drift() {
    let mut scheme = MarkerScheme::default();
    scheme.set_bucket(Polarity::Positive, MarkerStyle::new("<pos>", "</pos>"));
    scheme.set_bucket(Polarity::Negative, MarkerStyle::new("<neg>", "</neg>"));
    let taxonomy = KeywordTaxonomy::builtin().with_markers(scheme).unwrap();
    let scorer = Scorer::new(&taxonomy).unwrap();

    let text = "Clear and crisp, not noisy; I love it but hate the box.";
    let r = scorer.analyze(text);
    assert_eq!(
        r.annotation.as_str(),
        "<pos>Clear</pos> and <pos>crisp</pos>, not <neg>noisy</neg>; \
         I <pos>love</pos> it but <neg>hate</neg> the box."
    );
    assert_eq!(r.annotation.strip(), text);
}

#[test]
fn shared_keyword_is_marked_once() {
    // "engaging" is positive for both Sensory and Behavior.
    let scorer = Scorer::new(&KeywordTaxonomy::builtin()).unwrap();
    let r = scorer.analyze("An engaging session");
    assert_eq!(r.annotation.as_str(), "An {engaging} session");
    assert_eq!(r.annotation.marks.len(), 1);
    assert_eq!(r.annotation.marks[0].category, Category::Sensory);
    // Both categories still count it.
    assert_eq!(r.scores.sensory.value(), 3);
    assert_eq!(r.scores.behavior.value(), 3);
}
