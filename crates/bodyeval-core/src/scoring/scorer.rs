//! Per-pair and corpus-level scoring of aligned bodies.

use tracing::debug;

use crate::models::{AlignedPair, PairMetrics, ScoredPair, REQUIRED_OVERLAP_SIZES};
use crate::scoring::bleu::{BleuStats, Smoothing};
use crate::scoring::overlap::jaccard_overlap;
use crate::scoring::tokenizer::word_tokenize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoringOptions {
    pub ngram_sizes: Vec<usize>,
    pub smoothing: Smoothing,
}

impl Default for ScoringOptions {
    fn default() -> Self {
        Self {
            ngram_sizes: REQUIRED_OVERLAP_SIZES.to_vec(),
            smoothing: Smoothing::None,
        }
    }
}

impl ScoringOptions {
    /// Configured sizes plus the required 5 and 10, sorted and deduplicated.
    pub fn overlap_sizes(&self) -> Vec<usize> {
        let mut sizes: Vec<usize> = self
            .ngram_sizes
            .iter()
            .copied()
            .chain(REQUIRED_OVERLAP_SIZES)
            .filter(|&k| k > 0)
            .collect();
        sizes.sort_unstable();
        sizes.dedup();
        sizes
    }
}

/// All scored pairs of a run plus the pooled corpus BLEU.
#[derive(Debug, Clone, Default)]
pub struct Scoring<'a> {
    pub scored: Vec<ScoredPair<'a>>,
    pub corpus_bleu: f64,
}

/// Score one aligned pair: prediction body as candidate, gold as reference.
pub fn score_pair<'a>(pair: AlignedPair<'a>, options: &ScoringOptions) -> ScoredPair<'a> {
    let gold = word_tokenize(&pair.gold.body_text);
    let pred = word_tokenize(&pair.prediction.body_text);

    let bleu_stats = BleuStats::from_pair(&pred, &gold);
    let sentence_bleu = if gold.is_empty() || pred.is_empty() {
        0.0
    } else {
        bleu_stats.score(options.smoothing)
    };

    let overlaps = options
        .overlap_sizes()
        .into_iter()
        .map(|k| (k, jaccard_overlap(&gold, &pred, k)))
        .collect();

    ScoredPair {
        pair,
        metrics: PairMetrics {
            exact_match: pair.gold.body_text == pair.prediction.body_text,
            sentence_bleu,
            overlaps,
            gold_tokens: gold.len(),
            pred_tokens: pred.len(),
            bleu_stats,
        },
    }
}

/// Pool BLEU statistics of the given pairs into one corpus score.
pub fn pooled_bleu<'p, 'a: 'p>(
    scored: impl IntoIterator<Item = &'p ScoredPair<'a>>,
    smoothing: Smoothing,
) -> f64 {
    let mut pooled = BleuStats::default();
    for pair in scored {
        pooled.add(&pair.metrics.bleu_stats);
    }
    pooled.score(smoothing)
}

/// Score every pair in order and compute corpus BLEU over all of them.
pub fn score_pairs<'a>(pairs: Vec<AlignedPair<'a>>, options: &ScoringOptions) -> Scoring<'a> {
    let scored: Vec<ScoredPair<'a>> = pairs
        .into_iter()
        .map(|pair| score_pair(pair, options))
        .collect();
    let corpus_bleu = pooled_bleu(&scored, options.smoothing);
    debug!(
        "Scored {} pairs, corpus_bleu={corpus_bleu:.4}",
        scored.len()
    );
    Scoring {
        scored,
        corpus_bleu,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::functions::extract_functions;
    use crate::models::FunctionRecord;
    use crate::scoring::bleu::{corpus_bleu, sentence_bleu};

    fn record(body: &str) -> FunctionRecord {
        FunctionRecord {
            repository: "repo".to_string(),
            path: "a/b.py".to_string(),
            name: "f".to_string(),
            line: 1,
            source_text: String::new(),
            doc_comment: "doc".to_string(),
            body_text: body.to_string(),
        }
    }

    fn pair<'a>(gold: &'a FunctionRecord, pred: &'a FunctionRecord) -> AlignedPair<'a> {
        AlignedPair {
            repository: &gold.repository,
            path: &gold.path,
            name: &gold.name,
            gold,
            prediction: pred,
        }
    }

    #[test]
    fn test_overlap_sizes_always_include_required() {
        let options = ScoringOptions {
            ngram_sizes: vec![3, 10, 3],
            smoothing: Smoothing::None,
        };
        assert_eq!(options.overlap_sizes(), vec![3, 5, 10]);
    }

    #[test]
    fn test_same_one_line_function_both_trees() {
        let src = "def f(): \"doc\"; return 1\n";
        let gold = extract_functions(src.to_string(), "repo", "a/b.py").unwrap();
        let pred = extract_functions(src.to_string(), "repo", "a/b.py").unwrap();
        let scored = score_pair(pair(&gold["f"], &pred["f"]), &ScoringOptions::default());
        assert!(scored.metrics.exact_match);
        // "return 1" has fewer than 5 tokens on both sides.
        assert_eq!(scored.metrics.overlap(5), Some(0.0));
        assert_eq!(scored.metrics.overlap(10), Some(0.0));
        assert_eq!(scored.metrics.gold_tokens, 2);
    }

    #[test]
    fn test_different_return_value() {
        let gold = record("return 1");
        let pred = record("return 2");
        let scored = score_pair(pair(&gold, &pred), &ScoringOptions::default());
        assert!(!scored.metrics.exact_match);
        assert_eq!(scored.metrics.overlap(5), Some(0.0));
        assert_eq!(scored.metrics.sentence_bleu, 0.0);
    }

    #[test]
    fn test_exact_match_long_body_full_overlap() {
        let body = "total = 0\nfor item in items :\n    total += item\nreturn total";
        let gold = record(body);
        let pred = record(body);
        let scored = score_pair(pair(&gold, &pred), &ScoringOptions::default());
        assert!(scored.metrics.exact_match);
        assert_eq!(scored.metrics.overlap(5), Some(1.0));
        assert_eq!(scored.metrics.overlap(10), Some(1.0));
        assert!((scored.metrics.sentence_bleu - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_body_scores_zero() {
        let gold = record("");
        let pred = record("return value");
        let scored = score_pair(pair(&gold, &pred), &ScoringOptions::default());
        assert_eq!(scored.metrics.sentence_bleu, 0.0);
        assert_eq!(scored.metrics.gold_tokens, 0);
        assert!(!scored.metrics.exact_match);
    }

    #[test]
    fn test_sentence_bleu_matches_bleu_module() {
        let gold = record("x = compute ( a , b )\nreturn x + 1");
        let pred = record("x = compute ( a , c )\nreturn x + 1");
        let scored = score_pair(pair(&gold, &pred), &ScoringOptions::default());
        let g = word_tokenize(&gold.body_text);
        let p = word_tokenize(&pred.body_text);
        assert_eq!(scored.metrics.sentence_bleu, sentence_bleu(&p, &g, Smoothing::None));
        assert!(scored.metrics.sentence_bleu > 0.0 && scored.metrics.sentence_bleu < 1.0);
    }

    #[test]
    fn test_corpus_bleu_pooled_over_pairs() {
        let long = (0..20).map(|i| format!("v{i} =")).collect::<Vec<_>>().join(" ");
        let gold_a = record(&long);
        let pred_a = record(&long);
        let gold_b = record("a b x d e");
        let pred_b = record("a b c d e");

        let scoring = score_pairs(
            vec![pair(&gold_a, &pred_a), pair(&gold_b, &pred_b)],
            &ScoringOptions::default(),
        );
        let mean = scoring
            .scored
            .iter()
            .map(|s| s.metrics.sentence_bleu)
            .sum::<f64>()
            / 2.0;

        let tokens = vec![
            (word_tokenize(&pred_a.body_text), word_tokenize(&gold_a.body_text)),
            (word_tokenize(&pred_b.body_text), word_tokenize(&gold_b.body_text)),
        ];
        let expected = corpus_bleu(
            tokens.iter().map(|(p, g)| (p.as_slice(), g.as_slice())),
            Smoothing::None,
        );
        assert!((scoring.corpus_bleu - expected).abs() < 1e-12);
        assert!((scoring.corpus_bleu - mean).abs() > 0.1);
    }
}
