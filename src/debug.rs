//! Dev-only diagnostics. Raw review text is never logged; rows are identified
//! by a short SHA-256 prefix instead.

use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use tracing::info;

use crate::scoring::CategoryScores;

pub const ENV_DEV_LOG: &str = "SCORER_DEV_LOG";
pub const ENV_SCORER_ENV: &str = "SCORER_ENV";

/// Dev logging gate: SCORER_DEV_LOG=1 AND dev env (debug build or SCORER_ENV in {local,development,dev}).
pub fn dev_logging_enabled() -> bool {
    let on = std::env::var(ENV_DEV_LOG).ok().as_deref() == Some("1");
    if !on {
        return false;
    }
    if cfg!(debug_assertions) {
        return true;
    }
    matches!(
        std::env::var(ENV_SCORER_ENV)
            .unwrap_or_default()
            .to_ascii_lowercase()
            .as_str(),
        "local" | "development" | "dev"
    )
}

/// First 6 bytes of SHA-256, hex encoded.
pub fn anon_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

pub(crate) fn truncate_vec<T: ToString>(v: &[T], max: usize) -> Vec<String> {
    v.iter().take(max).map(|x| x.to_string()).collect()
}

/// Per-row scoring trace.
pub fn dev_log_review(index: usize, text: &str, scores: &CategoryScores, keywords: &[String]) {
    if !dev_logging_enabled() {
        return;
    }
    let id = anon_hash(text);
    let keywords_short = truncate_vec(keywords, 5);
    info!(
        target: "review_scorer::dev",
        index,
        %id,
        sensory = scores.sensory.value(),
        affective = scores.affective.value(),
        intellectual = scores.intellectual.value(),
        behavior = scores.behavior.value(),
        recommend = scores.recommend.value(),
        keywords = ?keywords_short,
        "scored"
    );
}
