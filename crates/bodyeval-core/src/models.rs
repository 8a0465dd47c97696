//! Shared typed models used across indexing, alignment, scoring, and reporting.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::scoring::bleu::BleuStats;

// ---------------------------------------------------------------------------
// Schema constants
// ---------------------------------------------------------------------------

/// N-gram window sizes that always appear as named columns in a [`ResultRow`].
pub const REQUIRED_OVERLAP_SIZES: [usize; 2] = [5, 10];

// ---------------------------------------------------------------------------
// 1. FunctionRecord
// ---------------------------------------------------------------------------

/// A documented function extracted from one source file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionRecord {
    pub repository: String,
    /// Path relative to the repository root, `/`-separated.
    pub path: String,
    pub name: String,
    /// 1-based line of the `def` keyword.
    pub line: usize,
    pub source_text: String,
    /// Cleaned doc-comment. Never empty.
    pub doc_comment: String,
    /// Canonical re-serialization of the body with the doc-comment removed.
    pub body_text: String,
}

/// Functions of one file keyed by name, in first-seen order.
///
/// A redefinition replaces the stored record but keeps the original slot,
/// so the last definition in traversal order wins.
pub type FileFunctions = IndexMap<String, FunctionRecord>;

// ---------------------------------------------------------------------------
// 2. TreeIndex
// ---------------------------------------------------------------------------

/// All documented functions of one repository, keyed by relative path.
///
/// The mapping is sparse: files without documented functions have no entry.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TreeIndex {
    pub repository: String,
    pub files: BTreeMap<String, FileFunctions>,
}

impl TreeIndex {
    pub fn new(repository: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            files: BTreeMap::new(),
        }
    }

    /// Record the functions of one file. Empty collections are dropped.
    pub fn insert_file(&mut self, path: impl Into<String>, functions: FileFunctions) {
        if functions.is_empty() {
            return;
        }
        self.files.insert(path.into(), functions);
    }

    pub fn get(&self, path: &str, name: &str) -> Option<&FunctionRecord> {
        self.files.get(path).and_then(|functions| functions.get(name))
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn function_count(&self) -> usize {
        self.files.values().map(IndexMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

// ---------------------------------------------------------------------------
// 3. AlignedPair / ScoredPair
// ---------------------------------------------------------------------------

/// A gold and prediction record sharing the same (repository, path, name) key.
#[derive(Clone, Copy, Debug)]
pub struct AlignedPair<'a> {
    pub repository: &'a str,
    pub path: &'a str,
    pub name: &'a str,
    pub gold: &'a FunctionRecord,
    pub prediction: &'a FunctionRecord,
}

/// Metrics computed for one aligned pair.
#[derive(Clone, Debug, PartialEq)]
pub struct PairMetrics {
    pub exact_match: bool,
    pub sentence_bleu: f64,
    /// `(window size, jaccard ratio)` sorted by window size.
    pub overlaps: Vec<(usize, f64)>,
    pub gold_tokens: usize,
    pub pred_tokens: usize,
    /// Counts pooled into corpus-level BLEU.
    pub bleu_stats: BleuStats,
}

impl PairMetrics {
    pub fn overlap(&self, size: usize) -> Option<f64> {
        self.overlaps
            .iter()
            .find(|(k, _)| *k == size)
            .map(|(_, ratio)| *ratio)
    }
}

#[derive(Clone, Debug)]
pub struct ScoredPair<'a> {
    pub pair: AlignedPair<'a>,
    pub metrics: PairMetrics,
}

// ---------------------------------------------------------------------------
// 4. ResultRow
// ---------------------------------------------------------------------------

/// One row of the exported dataset. Field names are a stable schema.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    pub repo: String,
    pub path: String,
    pub name: String,
    pub gold_doc_comment: String,
    pub pred_doc_comment: String,
    pub gold_body: String,
    pub pred_body: String,
    pub sentence_bleu: f64,
    pub ngram_overlap_5: f64,
    pub ngram_overlap_10: f64,
    pub exact_match: bool,
    #[serde(default)]
    pub gold_tokens: usize,
    #[serde(default)]
    pub pred_tokens: usize,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra_overlaps: BTreeMap<String, f64>,
}

impl From<&ScoredPair<'_>> for ResultRow {
    fn from(scored: &ScoredPair<'_>) -> Self {
        let metrics = &scored.metrics;
        let extra_overlaps = metrics
            .overlaps
            .iter()
            .filter(|(k, _)| !REQUIRED_OVERLAP_SIZES.contains(k))
            .map(|(k, ratio)| (format!("ngram_overlap_{k}"), *ratio))
            .collect();
        Self {
            repo: scored.pair.repository.to_string(),
            path: scored.pair.path.to_string(),
            name: scored.pair.name.to_string(),
            gold_doc_comment: scored.pair.gold.doc_comment.clone(),
            pred_doc_comment: scored.pair.prediction.doc_comment.clone(),
            gold_body: scored.pair.gold.body_text.clone(),
            pred_body: scored.pair.prediction.body_text.clone(),
            sentence_bleu: metrics.sentence_bleu,
            ngram_overlap_5: metrics.overlap(5).unwrap_or(0.0),
            ngram_overlap_10: metrics.overlap(10).unwrap_or(0.0),
            exact_match: metrics.exact_match,
            gold_tokens: metrics.gold_tokens,
            pred_tokens: metrics.pred_tokens,
            extra_overlaps,
        }
    }
}
