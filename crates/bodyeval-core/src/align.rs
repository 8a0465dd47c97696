//! Alignment of gold and prediction indexes.
//!
//! Pairs exist only where both sides define a function at the identical
//! (repository, path, name) key. Anything present on one side only is
//! dropped without error. Output order follows the gold side: repositories
//! by name, then paths in index order, then function names in first-seen
//! order within each file.

use serde::Serialize;
use tracing::debug;

use crate::models::{AlignedPair, TreeIndex};

/// Counts describing how much of the gold tree was aligned.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AlignmentStats {
    pub gold_functions: usize,
    pub prediction_functions: usize,
    pub aligned: usize,
    pub gold_repositories: usize,
    pub matched_repositories: usize,
}

impl AlignmentStats {
    /// Aligned pairs over gold functions; 0 when gold is empty.
    pub fn coverage(&self) -> f64 {
        if self.gold_functions == 0 {
            0.0
        } else {
            self.aligned as f64 / self.gold_functions as f64
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Alignment<'a> {
    pub pairs: Vec<AlignedPair<'a>>,
    pub stats: AlignmentStats,
}

/// Align two indexes of the same repository by path and function name.
///
/// The repository recorded on each pair is the gold index's.
pub fn align_index<'a>(gold: &'a TreeIndex, prediction: &'a TreeIndex) -> Vec<AlignedPair<'a>> {
    let mut pairs = Vec::new();
    for (path, gold_functions) in &gold.files {
        let Some(pred_functions) = prediction.files.get(path) else {
            continue;
        };
        for (name, gold_record) in gold_functions {
            if let Some(pred_record) = pred_functions.get(name) {
                pairs.push(AlignedPair {
                    repository: &gold.repository,
                    path,
                    name,
                    gold: gold_record,
                    prediction: pred_record,
                });
            }
        }
    }
    pairs
}

/// Align every repository present in both trees.
pub fn align<'a>(gold: &'a [TreeIndex], prediction: &'a [TreeIndex]) -> Alignment<'a> {
    let mut alignment = Alignment {
        pairs: Vec::new(),
        stats: AlignmentStats {
            gold_functions: gold.iter().map(TreeIndex::function_count).sum(),
            prediction_functions: prediction.iter().map(TreeIndex::function_count).sum(),
            gold_repositories: gold.len(),
            ..AlignmentStats::default()
        },
    };

    let mut gold_sorted: Vec<&TreeIndex> = gold.iter().collect();
    gold_sorted.sort_by(|a, b| a.repository.cmp(&b.repository));

    for gold_index in gold_sorted {
        let Some(pred_index) = prediction
            .iter()
            .find(|index| index.repository == gold_index.repository)
        else {
            debug!("Repository {} has no prediction tree", gold_index.repository);
            continue;
        };
        alignment.stats.matched_repositories += 1;
        let pairs = align_index(gold_index, pred_index);
        debug!(
            "Repository {}: {} aligned of {} gold functions",
            gold_index.repository,
            pairs.len(),
            gold_index.function_count()
        );
        alignment.pairs.extend(pairs);
    }

    alignment.stats.aligned = alignment.pairs.len();
    alignment
}
