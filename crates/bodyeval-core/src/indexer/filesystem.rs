//! Filesystem scanning helpers for indexing passes.

use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::RepositoryLayout;
use crate::errors::{BodyEvalError, BodyEvalResult};

const SOURCE_EXTENSIONS: &[&str] = &["py"];

const IMPLICIT_IGNORED_DIRS: &[&str] = &[".git", "__pycache__"];

/// Return true when `path` has a Python source extension.
pub fn is_python_source(path: &Path) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext.as_str()))
}

/// `/`-separated path of `path` relative to `root`.
pub fn relative_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(os) => Some(os.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Glob match over `/`-separated paths. `*` and `?` stay within one path
/// component; `**` also crosses `/`.
fn glob_match(text: &str, pattern: &str) -> bool {
    let t_chars: Vec<char> = text.chars().collect();
    let p_chars: Vec<char> = pattern.chars().collect();
    glob_match_from(&t_chars, &p_chars)
}

fn glob_match_from(text: &[char], pattern: &[char]) -> bool {
    match pattern.first() {
        None => text.is_empty(),
        Some('*') => {
            let crosses = pattern.get(1) == Some(&'*');
            let rest = if crosses { &pattern[2..] } else { &pattern[1..] };
            // Try every split of `text`, stopping at `/` for a single star.
            for skip in 0..=text.len() {
                if glob_match_from(&text[skip..], rest) {
                    return true;
                }
                if skip < text.len() && !crosses && text[skip] == '/' {
                    return false;
                }
            }
            false
        }
        Some('?') => {
            text.first().is_some_and(|c| *c != '/') && glob_match_from(&text[1..], &pattern[1..])
        }
        Some(p) => text.first() == Some(p) && glob_match_from(&text[1..], &pattern[1..]),
    }
}

/// Match against the whole relative path and against the final component.
pub fn matches_pattern(rel_path: &str, pattern: &str) -> bool {
    let pattern = pattern.trim().trim_start_matches("./").trim_end_matches('/');
    if pattern.is_empty() {
        return false;
    }
    let file_name = rel_path.rsplit('/').next().unwrap_or(rel_path);
    glob_match(rel_path, pattern)
        || glob_match(file_name, pattern)
        || rel_path.starts_with(&format!("{pattern}/"))
}

fn is_excluded(rel_path: &str, exclude_patterns: &[String]) -> bool {
    exclude_patterns
        .iter()
        .any(|pattern| matches_pattern(rel_path, pattern))
}

/// All Python files under `root`, sorted by relative path.
pub fn iter_source_files(root: &Path, exclude_patterns: &[String]) -> Vec<PathBuf> {
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            if entry.depth() == 0 {
                return true;
            }
            let name = entry.file_name().to_string_lossy();
            if entry.file_type().is_dir() && IMPLICIT_IGNORED_DIRS.contains(&name.as_ref()) {
                return false;
            }
            !is_excluded(&relative_path(root, entry.path()), exclude_patterns)
        });

    let mut files = Vec::new();
    for entry in walker {
        match entry {
            Ok(entry) => {
                if entry.file_type().is_file() && is_python_source(entry.path()) {
                    files.push(entry.into_path());
                }
            }
            Err(e) => warn!("Skipping unreadable entry under {}: {e}", root.display()),
        }
    }
    files.sort_by_key(|path| relative_path(root, path));
    files
}

/// Repository roots under `root` as `(name, path)`, sorted by name.
///
/// With [`RepositoryLayout::Single`] the root is the only repository and is
/// named `name_override` or, failing that, after the root directory.
pub fn list_repositories(
    root: &Path,
    layout: RepositoryLayout,
    name_override: Option<&str>,
) -> BodyEvalResult<Vec<(String, PathBuf)>> {
    let unreadable = |source: std::io::Error| BodyEvalError::RootUnreadable {
        path: root.to_path_buf(),
        source,
    };
    let entries = std::fs::read_dir(root).map_err(unreadable)?;

    match layout {
        RepositoryLayout::Single => {
            let name = match name_override {
                Some(name) => name.to_string(),
                None => repository_name(root).map_err(unreadable)?,
            };
            Ok(vec![(name, root.to_path_buf())])
        }
        RepositoryLayout::Multi => {
            let mut repos = Vec::new();
            for entry in entries {
                let entry = entry.map_err(unreadable)?;
                let path = entry.path();
                let name = entry.file_name().to_string_lossy().into_owned();
                if !path.is_dir() {
                    debug!("Ignoring loose file {} in multi-repository root", path.display());
                    continue;
                }
                if IMPLICIT_IGNORED_DIRS.contains(&name.as_str()) {
                    continue;
                }
                repos.push((name, path));
            }
            repos.sort();
            Ok(repos)
        }
    }
}

/// Name of a repository root directory, resolving `.` and similar.
pub fn repository_name(root: &Path) -> std::io::Result<String> {
    let canonical = root.canonicalize()?;
    Ok(canonical
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| canonical.to_string_lossy().into_owned()))
}
