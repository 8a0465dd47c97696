//! Symmetric n-gram set overlap (Jaccard ratio).

use std::collections::HashSet;

/// Distinct contiguous windows of `size` tokens.
pub fn ngram_set<'a>(tokens: &'a [&'a str], size: usize) -> HashSet<&'a [&'a str]> {
    if size == 0 {
        return HashSet::new();
    }
    tokens.windows(size).collect()
}

/// |A ∩ B| / |A ∪ B| over the n-gram sets of both token lists.
///
/// Defined as 0 when the union is empty, i.e. both lists are shorter than
/// `size`.
pub fn jaccard_overlap(a: &[&str], b: &[&str], size: usize) -> f64 {
    let left = ngram_set(a, size);
    let right = ngram_set(b, size);
    let union = left.union(&right).count();
    if union == 0 {
        return 0.0;
    }
    left.intersection(&right).count() as f64 / union as f64
}
