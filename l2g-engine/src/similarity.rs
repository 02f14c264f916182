//! Edit-distance similarity and best-candidate selection

use l2g_core::normalize::{comparison_key, slug};
use serde::{Deserialize, Serialize};
use strsim::normalized_levenshtein;

/// `1 - levenshtein(a, b) / max(len(a), len(b))`, counted in characters.
///
/// Returns 0 when either side is empty.
pub fn similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    normalized_levenshtein(a, b)
}

/// Something a free-text value can be matched against
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub key: String,
    pub display_name: String,
}

impl Candidate {
    pub fn new(key: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            display_name: display_name.into(),
        }
    }
}

/// Best candidate and its score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Match {
    pub index: usize,
    pub score: f64,
}

impl Match {
    pub fn is_exact(&self) -> bool {
        self.score >= 1.0
    }

    /// Exact matches are always accepted; others must beat `threshold`
    pub fn accepted(&self, threshold: f64) -> bool {
        self.is_exact() || self.score > threshold
    }
}

/// Pick the highest-scoring candidate for `target`.
///
/// Name and key are both compared on their compact normalized form. An exact
/// normalized or slug match short-circuits with score 1. Ties keep the first
/// candidate. Returns `None` when nothing scores above zero.
pub fn best_match(target: &str, candidates: &[Candidate]) -> Option<Match> {
    let target_key = comparison_key(target);
    let target_slug = slug(target);
    if target_key.is_empty() {
        return None;
    }

    let mut best: Option<Match> = None;
    for (index, candidate) in candidates.iter().enumerate() {
        let name_key = comparison_key(&candidate.display_name);
        let key_key = comparison_key(&candidate.key);

        if name_key == target_key || key_key == target_key || slug(&candidate.key) == target_slug {
            return Some(Match { index, score: 1.0 });
        }

        let score = similarity(&target_key, &name_key).max(similarity(&target_key, &key_key));
        if score > best.map(|m| m.score).unwrap_or(0.0) {
            best = Some(Match { index, score });
        }
    }

    best
}
