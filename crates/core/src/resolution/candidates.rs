/// Longest contiguous word group considered as a tag candidate.
pub const MAX_NGRAM: usize = 3;

/// Every contiguous group of 1..=[`MAX_NGRAM`] words, unigrams first, words joined by a
/// single space. Blank words are skipped.
pub fn generate<S: AsRef<str>>(words: &[S]) -> Vec<String> {
    let words: Vec<&str> =
        words.iter().map(|word| word.as_ref().trim()).filter(|word| !word.is_empty()).collect();

    let mut candidates = Vec::with_capacity(expected_count(words.len()));
    for width in 1..=MAX_NGRAM {
        candidates.extend(words.windows(width).map(|window| window.join(" ")));
    }
    candidates
}

/// Number of candidates [`generate`] yields for `word_count` non-blank words.
pub fn expected_count(word_count: usize) -> usize {
    (1..=MAX_NGRAM).map(|width| (word_count + 1).saturating_sub(width)).sum()
}
