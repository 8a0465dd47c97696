//! Tree walking with Rayon-based per-file extraction.
//!
//! Files are extracted in parallel, then merged into the [`TreeIndex`] in
//! sorted relative-path order so every run over the same tree produces the
//! same index.

use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::RepositoryLayout;
use crate::errors::BodyEvalResult;
use crate::indexer::filesystem::{iter_source_files, list_repositories, relative_path};
use crate::indexer::functions::extract_file;
use crate::indexer::parser::{FailureStage, ParseFailure};
use crate::models::{FileFunctions, TreeIndex};

/// A file that contributed no records because it could not be read or parsed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionFailure {
    pub repository: String,
    pub path: String,
    pub stage: FailureStage,
    pub message: String,
}

#[derive(Clone, Debug)]
pub struct WalkOptions {
    pub layout: RepositoryLayout,
    pub exclude_patterns: Vec<String>,
    pub workers: usize,
    /// Repository name for [`RepositoryLayout::Single`]; defaults to the
    /// root directory's name.
    pub repository_name: Option<String>,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            layout: RepositoryLayout::Multi,
            exclude_patterns: Vec::new(),
            workers: 1,
            repository_name: None,
        }
    }
}

/// Result of walking one root: one index per repository plus failures.
#[derive(Clone, Debug, Default)]
pub struct WalkReport {
    /// Sorted by repository name.
    pub indexes: Vec<TreeIndex>,
    pub failures: Vec<ExtractionFailure>,
}

impl WalkReport {
    pub fn index(&self, repository: &str) -> Option<&TreeIndex> {
        self.indexes
            .iter()
            .find(|index| index.repository == repository)
    }

    pub fn function_count(&self) -> usize {
        self.indexes.iter().map(TreeIndex::function_count).sum()
    }

    pub fn file_count(&self) -> usize {
        self.indexes.iter().map(TreeIndex::file_count).sum()
    }
}

struct FileOutcome {
    path: String,
    result: Result<FileFunctions, ParseFailure>,
}

fn extract_file_worker(repository: &str, absolute: &Path, relative: String) -> FileOutcome {
    let result = extract_file(absolute, repository, &relative);
    FileOutcome {
        path: relative,
        result,
    }
}

fn parallel_extract(
    repository: &str,
    repo_root: &Path,
    files: Vec<PathBuf>,
    workers: usize,
) -> Vec<FileOutcome> {
    if files.is_empty() {
        return vec![];
    }

    let jobs: Vec<(PathBuf, String)> = files
        .into_iter()
        .map(|path| {
            let rel = relative_path(repo_root, &path);
            (path, rel)
        })
        .collect();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .build();

    let mut outcomes: Vec<FileOutcome> = match pool {
        Ok(pool) => pool.install(|| {
            jobs.into_par_iter()
                .map(|(path, rel)| extract_file_worker(repository, &path, rel))
                .collect()
        }),
        Err(e) => {
            warn!("Falling back to sequential extraction: {e}");
            jobs.into_iter()
                .map(|(path, rel)| extract_file_worker(repository, &path, rel))
                .collect()
        }
    };
    outcomes.sort_by(|a, b| a.path.cmp(&b.path));
    outcomes
}

/// Index a single repository root.
pub fn index_repository(
    repository: &str,
    repo_root: &Path,
    options: &WalkOptions,
) -> (TreeIndex, Vec<ExtractionFailure>) {
    let files = iter_source_files(repo_root, &options.exclude_patterns);
    let files_seen = files.len();
    let outcomes = parallel_extract(repository, repo_root, files, options.workers);

    let mut index = TreeIndex::new(repository);
    let mut failures = Vec::new();
    for outcome in outcomes {
        match outcome.result {
            Ok(functions) => {
                debug!(
                    "{repository}/{}: {} documented functions",
                    outcome.path,
                    functions.len()
                );
                index.insert_file(outcome.path, functions);
            }
            Err(failure) => {
                warn!("Skipping {repository}/{}: {failure}", outcome.path);
                failures.push(ExtractionFailure {
                    repository: repository.to_string(),
                    path: outcome.path,
                    stage: failure.stage,
                    message: failure.message,
                });
            }
        }
    }

    debug!(
        "Indexed repository {repository}: files_seen={files_seen} files_indexed={} functions={} failures={}",
        index.file_count(),
        index.function_count(),
        failures.len()
    );
    (index, failures)
}

/// Walk a root directory holding one or more repositories.
///
/// Only an unreadable root is an error; per-file problems are collected in
/// [`WalkReport::failures`].
pub fn walk_tree(root: &Path, options: &WalkOptions) -> BodyEvalResult<WalkReport> {
    let started = Instant::now();
    let repositories = list_repositories(
        root,
        options.layout,
        options.repository_name.as_deref(),
    )?;

    let mut report = WalkReport::default();
    for (name, repo_root) in repositories {
        let (index, failures) = index_repository(&name, &repo_root, options);
        report.indexes.push(index);
        report.failures.extend(failures);
    }

    info!(
        "Walked {}: repositories={} files={} functions={} failures={} elapsed_ms={}",
        root.display(),
        report.indexes.len(),
        report.file_count(),
        report.function_count(),
        report.failures.len(),
        started.elapsed().as_millis()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn multi(workers: usize) -> WalkOptions {
        WalkOptions {
            workers,
            ..WalkOptions::default()
        }
    }

    #[test]
    fn test_walk_multi_repository_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "alpha/a/b.py", "def f():\n    \"doc\"\n    return 1\n");
        write(root, "alpha/plain.py", "def g():\n    return 2\n");
        write(root, "beta/m.py", "def h():\n    '''h'''\n    pass\n");

        let report = walk_tree(root, &multi(2)).unwrap();
        assert_eq!(report.indexes.len(), 2);
        assert!(report.failures.is_empty());

        let alpha = report.index("alpha").unwrap();
        assert_eq!(alpha.file_count(), 1);
        assert!(alpha.files.get("plain.py").is_none());
        let f = alpha.get("a/b.py", "f").unwrap();
        assert_eq!(f.repository, "alpha");
        assert_eq!(f.body_text, "return 1");

        let beta = report.index("beta").unwrap();
        assert_eq!(beta.get("m.py", "h").unwrap().repository, "beta");
    }

    #[test]
    fn test_walk_single_repository_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "pkg/mod.py", "def f():\n    \"doc\"\n    return 1\n");

        let options = WalkOptions {
            layout: RepositoryLayout::Single,
            repository_name: Some("proj".to_string()),
            ..WalkOptions::default()
        };
        let report = walk_tree(root, &options).unwrap();
        assert_eq!(report.indexes.len(), 1);
        assert_eq!(report.indexes[0].repository, "proj");
        assert!(report.indexes[0].get("pkg/mod.py", "f").is_some());
    }

    #[test]
    fn test_invalid_file_is_reported_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "repo/bad.py", "def broken(:\n    \"doc\"\n");
        write(root, "repo/good.py", "def ok():\n    \"doc\"\n    return 0\n");

        let report = walk_tree(root, &multi(2)).unwrap();
        let index = report.index("repo").unwrap();
        assert_eq!(index.file_count(), 1);
        assert!(index.get("good.py", "ok").is_some());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].path, "bad.py");
        assert_eq!(report.failures[0].stage, FailureStage::Parse);
    }

    #[test]
    fn test_walk_is_idempotent_across_worker_counts() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        for i in 0..12 {
            write(
                root,
                &format!("repo/pkg{}/m{i}.py", i % 3),
                &format!("def f{i}():\n    \"doc {i}\"\n    return {i}\n"),
            );
        }

        let first = walk_tree(root, &multi(1)).unwrap();
        let second = walk_tree(root, &multi(4)).unwrap();
        assert_eq!(first.indexes, second.indexes);
        assert_eq!(first.function_count(), 12);
    }

    #[test]
    fn test_unreadable_root_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        assert!(walk_tree(&dir.path().join("missing"), &multi(1)).is_err());
    }
}
