//! One evaluation run: walk both trees, align, score, aggregate.

use std::time::Instant;

use tracing::{info, warn};

use crate::align::align;
use crate::config::{RepositoryLayout, RunConfig};
use crate::errors::{BodyEvalError, BodyEvalResult};
use crate::indexer::filesystem::repository_name;
use crate::indexer::pipeline::{walk_tree, WalkOptions};
use crate::report::{aggregate, Evaluation, FailureReport};
use crate::scoring::scorer::{score_pairs, ScoringOptions};

fn walk_options(config: &RunConfig) -> BodyEvalResult<WalkOptions> {
    // Both sides of a single-repository run share the gold root's name so
    // their records align even when the root directories are named apart.
    let repository_name = match config.layout {
        RepositoryLayout::Single => Some(repository_name(&config.gold_root).map_err(|source| {
            BodyEvalError::RootUnreadable {
                path: config.gold_root.clone(),
                source,
            }
        })?),
        RepositoryLayout::Multi => None,
    };
    Ok(WalkOptions {
        layout: config.layout,
        exclude_patterns: config.exclude_patterns.clone(),
        workers: config.workers,
        repository_name,
    })
}

/// Run a full evaluation described by `config`.
///
/// Fails only when either root cannot be read.
pub fn evaluate(config: &RunConfig) -> BodyEvalResult<Evaluation> {
    let started = Instant::now();
    let options = walk_options(config)?;

    let gold = walk_tree(&config.gold_root, &options)?;
    let prediction = walk_tree(&config.prediction_root, &options)?;
    for failure in gold.failures.iter().chain(&prediction.failures) {
        warn!(
            "Skipped {}/{} ({}): {}",
            failure.repository, failure.path, failure.stage, failure.message
        );
    }

    let alignment = align(&gold.indexes, &prediction.indexes);
    let scoring_options = ScoringOptions {
        ngram_sizes: config.ngram_sizes.clone(),
        smoothing: config.smoothing,
    };
    let scoring = score_pairs(alignment.pairs, &scoring_options);

    let failures = config
        .include_failed_parses_in_report
        .then(|| FailureReport {
            gold: gold.failures.clone(),
            prediction: prediction.failures.clone(),
        });
    let evaluation = aggregate(&scoring, &alignment.stats, config.smoothing, failures);

    info!(
        "Evaluated {} pairs ({} exact, corpus_bleu={:.4}) in {}ms",
        evaluation.summary.total_pairs,
        evaluation.summary.exact_matches,
        evaluation.summary.corpus_bleu,
        started.elapsed().as_millis()
    );
    Ok(evaluation)
}
