// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod annotate;
pub mod api;
pub mod batch;
pub mod debug;
pub mod error;
pub mod io;
pub mod matcher;
pub mod metrics;
pub mod scoring;
pub mod sentiment;
pub mod taxonomy;

// ---- Re-exports for stable public API ----
pub use crate::annotate::{annotate, Annotation, Mark, MarkerScheme, MarkerStyle};
pub use crate::api::router;
pub use crate::batch::{run, RawRecord, Review, RunOptions, ScoredReview};
pub use crate::error::ScoreError;
pub use crate::matcher::{CategoryMatches, CompiledGroup, CompiledTaxonomy, MatchSpan};
pub use crate::scoring::{CategoryScore, CategoryScores, Scorer, TextReport};
pub use crate::sentiment::{FixedPolarity, LexiconPolarity, PolarityEstimator};
pub use crate::taxonomy::{Category, KeywordGroup, KeywordTaxonomy, Polarity};
