//! Result aggregation, dataset I/O, and text reports.
//!
//! The row dataset is the output boundary of a run. Downstream tools group
//! it by `repo` and `exact_match`; [`length_distribution`] is the text form
//! of that grouping.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::align::AlignmentStats;
use crate::config::OutputFormat;
use crate::errors::BodyEvalResult;
use crate::indexer::pipeline::ExtractionFailure;
use crate::models::{ResultRow, ScoredPair};
use crate::scoring::bleu::Smoothing;
use crate::scoring::scorer::{pooled_bleu, Scoring};
use crate::scoring::tokenizer::count_tokens;

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RepoSummary {
    pub repo: String,
    pub pairs: usize,
    pub exact_matches: usize,
    pub exact_match_rate: f64,
    pub corpus_bleu: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct FailureReport {
    pub gold: Vec<ExtractionFailure>,
    pub prediction: Vec<ExtractionFailure>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Summary {
    pub total_pairs: usize,
    pub exact_matches: usize,
    pub exact_match_rate: f64,
    pub corpus_bleu: f64,
    pub mean_sentence_bleu: f64,
    pub gold_functions: usize,
    pub prediction_functions: usize,
    pub coverage: f64,
    pub repositories: Vec<RepoSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failures: Option<FailureReport>,
}

/// Rows plus summary: everything a run hands to downstream consumers.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Evaluation {
    pub rows: Vec<ResultRow>,
    pub summary: Summary,
}

fn rate(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

fn repo_summaries(scored: &[ScoredPair<'_>], smoothing: Smoothing) -> Vec<RepoSummary> {
    let mut by_repo: BTreeMap<&str, Vec<&ScoredPair<'_>>> = BTreeMap::new();
    for pair in scored {
        by_repo.entry(pair.pair.repository).or_default().push(pair);
    }
    by_repo
        .into_iter()
        .map(|(repo, pairs)| {
            let exact_matches = pairs.iter().filter(|p| p.metrics.exact_match).count();
            RepoSummary {
                repo: repo.to_string(),
                pairs: pairs.len(),
                exact_matches,
                exact_match_rate: rate(exact_matches, pairs.len()),
                corpus_bleu: pooled_bleu(pairs.iter().copied(), smoothing),
            }
        })
        .collect()
}

/// Fold scored pairs into the exported rows and summary statistics.
pub fn aggregate(
    scoring: &Scoring<'_>,
    stats: &AlignmentStats,
    smoothing: Smoothing,
    failures: Option<FailureReport>,
) -> Evaluation {
    let rows: Vec<ResultRow> = scoring.scored.iter().map(ResultRow::from).collect();
    let total_pairs = rows.len();
    let exact_matches = rows.iter().filter(|row| row.exact_match).count();
    let mean_sentence_bleu = if total_pairs == 0 {
        0.0
    } else {
        rows.iter().map(|row| row.sentence_bleu).sum::<f64>() / total_pairs as f64
    };

    let summary = Summary {
        total_pairs,
        exact_matches,
        exact_match_rate: rate(exact_matches, total_pairs),
        corpus_bleu: scoring.corpus_bleu,
        mean_sentence_bleu,
        gold_functions: stats.gold_functions,
        prediction_functions: stats.prediction_functions,
        coverage: stats.coverage(),
        repositories: repo_summaries(&scoring.scored, smoothing),
        failures,
    };
    Evaluation { rows, summary }
}

/// Human-readable summary printed at the end of a run.
pub fn render_summary(summary: &Summary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Aligned pairs:     {}", summary.total_pairs);
    let _ = writeln!(
        out,
        "Gold functions:    {} (coverage {:.2}%)",
        summary.gold_functions,
        summary.coverage * 100.0
    );
    let _ = writeln!(out, "Pred functions:    {}", summary.prediction_functions);
    let _ = writeln!(
        out,
        "Exact matches:     {} ({:.2}%)",
        summary.exact_matches,
        summary.exact_match_rate * 100.0
    );
    let _ = writeln!(out, "Corpus BLEU:       {:.4}", summary.corpus_bleu);
    let _ = writeln!(out, "Mean sentence BLEU: {:.4}", summary.mean_sentence_bleu);

    if !summary.repositories.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "{:<32} {:>7} {:>7} {:>8} {:>8}",
            "repo", "pairs", "exact", "rate", "bleu"
        );
        for repo in &summary.repositories {
            let _ = writeln!(
                out,
                "{:<32} {:>7} {:>7} {:>7.2}% {:>8.4}",
                repo.repo,
                repo.pairs,
                repo.exact_matches,
                repo.exact_match_rate * 100.0,
                repo.corpus_bleu
            );
        }
    }

    if let Some(failures) = &summary.failures {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "Extraction failures: gold={} prediction={}",
            failures.gold.len(),
            failures.prediction.len()
        );
        for (side, list) in [("gold", &failures.gold), ("pred", &failures.prediction)] {
            for failure in list {
                let _ = writeln!(
                    out,
                    "  [{side}] {}/{} ({}): {}",
                    failure.repository, failure.path, failure.stage, failure.message
                );
            }
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Dataset I/O
// ---------------------------------------------------------------------------

pub fn write_rows(rows: &[ResultRow], path: &Path, format: OutputFormat) -> BodyEvalResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(path)?);
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut writer, rows)?;
            writeln!(writer)?;
        }
        OutputFormat::Jsonl => {
            for row in rows {
                serde_json::to_writer(&mut writer, row)?;
                writeln!(writer)?;
            }
        }
    }
    writer.flush()?;
    Ok(())
}

/// Read a dataset written by [`write_rows`] in either format.
pub fn read_rows(path: &Path) -> BodyEvalResult<Vec<ResultRow>> {
    let mut reader = BufReader::new(File::open(path)?);
    let starts_with_array = {
        let buf = reader.fill_buf()?;
        buf.iter()
            .find(|b| !b.is_ascii_whitespace())
            .is_some_and(|b| *b == b'[')
    };
    if starts_with_array {
        return Ok(serde_json::from_reader(reader)?);
    }
    let mut rows = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        rows.push(serde_json::from_str(&line)?);
    }
    Ok(rows)
}

pub fn write_summary(summary: &Summary, path: &Path) -> BodyEvalResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, summary)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Length distribution
// ---------------------------------------------------------------------------

/// Gold body length statistics for one (repo, exact_match) group.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LengthBucket {
    pub repo: String,
    pub exact_match: bool,
    pub count: usize,
    pub min: usize,
    pub median: f64,
    pub mean: f64,
    pub max: usize,
}

/// Group rows by repository and match status and summarize gold body length
/// in word tokens.
pub fn length_distribution(rows: &[ResultRow]) -> Vec<LengthBucket> {
    let mut groups: BTreeMap<(&str, bool), Vec<usize>> = BTreeMap::new();
    for row in rows {
        groups
            .entry((row.repo.as_str(), row.exact_match))
            .or_default()
            .push(count_tokens(&row.gold_body));
    }
    groups
        .into_iter()
        .map(|((repo, exact_match), mut lengths)| {
            lengths.sort_unstable();
            let count = lengths.len();
            let median = if count % 2 == 1 {
                lengths[count / 2] as f64
            } else {
                (lengths[count / 2 - 1] + lengths[count / 2]) as f64 / 2.0
            };
            LengthBucket {
                repo: repo.to_string(),
                exact_match,
                count,
                min: lengths[0],
                median,
                mean: lengths.iter().sum::<usize>() as f64 / count as f64,
                max: lengths[count - 1],
            }
        })
        .collect()
}

pub fn render_length_report(buckets: &[LengthBucket]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<32} {:>6} {:>6} {:>6} {:>8} {:>8} {:>6}",
        "repo", "match", "count", "min", "median", "mean", "max"
    );
    for bucket in buckets {
        let _ = writeln!(
            out,
            "{:<32} {:>6} {:>6} {:>6} {:>8.1} {:>8.1} {:>6}",
            bucket.repo,
            bucket.exact_match,
            bucket.count,
            bucket.min,
            bucket.median,
            bucket.mean,
            bucket.max
        );
    }
    out
}
