use crate::config::MatchingConfig;

pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.85;
pub const DEFAULT_MIN_FUZZY_LEN: usize = 4;

/// `1 - levenshtein(a, b) / max(len(a), len(b))`, lengths in chars. Two empty strings are
/// identical.
pub fn similarity_ratio(left: &str, right: &str) -> f64 {
    let longest = left.chars().count().max(right.chars().count());
    if longest == 0 {
        return 1.0;
    }
    let distance = strsim::levenshtein(left, right).min(longest);
    // Single division: 17/20 must compare equal to a configured 0.85.
    (longest - distance) as f64 / longest as f64
}

/// Precision/recall knobs for candidate evaluation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MatchPolicy {
    pub threshold: f64,
    pub min_fuzzy_len: usize,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self { threshold: DEFAULT_SIMILARITY_THRESHOLD, min_fuzzy_len: DEFAULT_MIN_FUZZY_LEN }
    }
}

impl From<&MatchingConfig> for MatchPolicy {
    fn from(config: &MatchingConfig) -> Self {
        Self { threshold: config.similarity_threshold, min_fuzzy_len: config.min_fuzzy_len }
    }
}

impl MatchPolicy {
    /// Short candidates are too ambiguous for edit-distance scoring.
    pub fn allows_fuzzy(&self, candidate: &str) -> bool {
        candidate.chars().count() >= self.min_fuzzy_len
    }

    pub fn accepts(&self, ratio: f64) -> bool {
        ratio >= self.threshold
    }
}
