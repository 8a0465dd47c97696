//! BLEU with a single reference per candidate.
//!
//! Sentence BLEU is the geometric mean of clipped 1..=4-gram precisions
//! times the brevity penalty. Corpus BLEU pools the clipped-match counts,
//! totals and lengths of every pair first, then applies the same formula
//! once, so it is not the mean of sentence scores.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub const MAX_ORDER: usize = 4;

/// Numerator used for zero-match orders under [`Smoothing::Epsilon`].
const EPSILON: f64 = 0.1;

/// Handling of n-gram orders with no clipped matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Smoothing {
    /// Any zero-match order makes the score 0.
    #[default]
    None,
    /// Replace zero numerators with a small epsilon.
    Epsilon,
}

/// Sufficient statistics for BLEU; adding two yields pooled counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BleuStats {
    pub matches: [u64; MAX_ORDER],
    pub totals: [u64; MAX_ORDER],
    pub candidate_len: u64,
    pub reference_len: u64,
}

fn ngram_counts<'a>(tokens: &'a [&'a str], n: usize) -> HashMap<&'a [&'a str], u64> {
    let mut counts = HashMap::new();
    for window in tokens.windows(n) {
        *counts.entry(window).or_insert(0) += 1;
    }
    counts
}

impl BleuStats {
    pub fn from_pair(candidate: &[&str], reference: &[&str]) -> Self {
        let mut stats = Self {
            candidate_len: candidate.len() as u64,
            reference_len: reference.len() as u64,
            ..Self::default()
        };
        for n in 1..=MAX_ORDER {
            let cand = ngram_counts(candidate, n);
            let refs = ngram_counts(reference, n);
            stats.matches[n - 1] = cand
                .iter()
                .map(|(gram, count)| (*count).min(refs.get(gram).copied().unwrap_or(0)))
                .sum();
            stats.totals[n - 1] = candidate.len().saturating_sub(n - 1) as u64;
        }
        stats
    }

    pub fn add(&mut self, other: &BleuStats) {
        for i in 0..MAX_ORDER {
            self.matches[i] += other.matches[i];
            self.totals[i] += other.totals[i];
        }
        self.candidate_len += other.candidate_len;
        self.reference_len += other.reference_len;
    }

    pub fn brevity_penalty(&self) -> f64 {
        if self.candidate_len == 0 {
            return 0.0;
        }
        if self.candidate_len > self.reference_len {
            1.0
        } else {
            (1.0 - self.reference_len as f64 / self.candidate_len as f64).exp()
        }
    }

    pub fn score(&self, smoothing: Smoothing) -> f64 {
        if self.candidate_len == 0 || self.matches[0] == 0 {
            return 0.0;
        }
        let mut log_sum = 0.0;
        for i in 0..MAX_ORDER {
            let precision = if self.matches[i] > 0 {
                self.matches[i] as f64 / self.totals[i] as f64
            } else {
                match smoothing {
                    Smoothing::None => return 0.0,
                    Smoothing::Epsilon => EPSILON / self.totals[i].max(1) as f64,
                }
            };
            log_sum += precision.ln() / MAX_ORDER as f64;
        }
        self.brevity_penalty() * log_sum.exp()
    }
}

/// BLEU of `candidate` against a single `reference`; 0 if either is empty.
pub fn sentence_bleu(candidate: &[&str], reference: &[&str], smoothing: Smoothing) -> f64 {
    if candidate.is_empty() || reference.is_empty() {
        return 0.0;
    }
    BleuStats::from_pair(candidate, reference).score(smoothing)
}

/// BLEU over many `(candidate, reference)` pairs with pooled counts.
pub fn corpus_bleu<'a, I>(pairs: I, smoothing: Smoothing) -> f64
where
    I: IntoIterator<Item = (&'a [&'a str], &'a [&'a str])>,
{
    let mut pooled = BleuStats::default();
    for (candidate, reference) in pairs {
        pooled.add(&BleuStats::from_pair(candidate, reference));
    }
    pooled.score(smoothing)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(text: &str) -> Vec<&str> {
        text.split_whitespace().collect()
    }

    #[test]
    fn test_identical_sentence_scores_one() {
        let a = toks("for item in items : total += item");
        assert!((sentence_bleu(&a, &a, Smoothing::None) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_sentence_scores_zero() {
        let a = toks("return x");
        assert_eq!(sentence_bleu(&[], &a, Smoothing::None), 0.0);
        assert_eq!(sentence_bleu(&a, &[], Smoothing::None), 0.0);
    }

    #[test]
    fn test_short_sentence_without_smoothing_is_zero() {
        let a = toks("return 1");
        assert_eq!(sentence_bleu(&a, &a, Smoothing::None), 0.0);
        assert!(sentence_bleu(&a, &a, Smoothing::Epsilon) > 0.0);
    }

    #[test]
    fn test_clipped_counts() {
        let cand = toks("the the the the");
        let reference = toks("the cat");
        let stats = BleuStats::from_pair(&cand, &reference);
        assert_eq!(stats.matches[0], 1);
        assert_eq!(stats.totals[0], 4);
        assert_eq!(stats.totals[3], 1);
    }

    #[test]
    fn test_brevity_penalty() {
        let cand = toks("a b c d");
        let reference = toks("a b c d e f g h");
        let stats = BleuStats::from_pair(&cand, &reference);
        assert!((stats.brevity_penalty() - (-1.0f64).exp()).abs() < 1e-12);
        let score = sentence_bleu(&cand, &reference, Smoothing::None);
        assert!((score - (-1.0f64).exp()).abs() < 1e-12);
    }

    #[test]
    fn test_partial_match_known_value() {
        // 1-grams 5/6, 2-grams 3/5, 3-grams 2/4, 4-grams 1/3, equal lengths.
        let cand = toks("a b c d x f");
        let reference = toks("a b c d e f");
        let expected = ((5.0f64 / 6.0).ln() + (3.0f64 / 5.0).ln() + 0.5f64.ln() + (1.0f64 / 3.0).ln())
            / 4.0;
        let score = sentence_bleu(&cand, &reference, Smoothing::None);
        assert!((score - expected.exp()).abs() < 1e-12);
    }

    #[test]
    fn test_corpus_bleu_pools_counts_not_mean() {
        let long: Vec<String> = (0..20).map(|i| format!("t{i}")).collect();
        let long: Vec<&str> = long.iter().map(String::as_str).collect();
        let short_cand = toks("a b c d e");
        let short_ref = toks("a b x d e");

        let s1 = sentence_bleu(&long, &long, Smoothing::None);
        let s2 = sentence_bleu(&short_cand, &short_ref, Smoothing::None);
        let mean = (s1 + s2) / 2.0;
        assert!((mean - 0.5).abs() < 1e-12);

        let corpus = corpus_bleu(
            [
                (long.as_slice(), long.as_slice()),
                (short_cand.as_slice(), short_ref.as_slice()),
            ],
            Smoothing::None,
        );
        let expected = ((24.0f64 / 25.0).ln()
            + (21.0f64 / 23.0).ln()
            + (18.0f64 / 21.0).ln()
            + (17.0f64 / 19.0).ln())
            / 4.0;
        assert!((corpus - expected.exp()).abs() < 1e-12);
        assert!(corpus > 0.9);
    }

    #[test]
    fn test_corpus_bleu_empty_is_zero() {
        let pairs: Vec<(&[&str], &[&str])> = Vec::new();
        assert_eq!(corpus_bleu(pairs, Smoothing::None), 0.0);
    }
}
