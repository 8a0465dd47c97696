//! Python parsing wrapper used by extraction passes.
//!
//! Parsing goes through the native tree-sitter Python grammar. tree-sitter
//! always produces a tree, so a file counts as unparseable when that tree
//! contains ERROR or MISSING nodes.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tree_sitter::{Node, Tree};

/// Stage at which extraction of a file gave up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureStage {
    Read,
    Parse,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => f.write_str("read"),
            Self::Parse => f.write_str("parse"),
        }
    }
}

/// A file whose content could not be turned into a syntax tree.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{stage} failure: {message}")]
pub struct ParseFailure {
    pub stage: FailureStage,
    pub message: String,
}

impl ParseFailure {
    pub fn read(message: impl Into<String>) -> Self {
        Self {
            stage: FailureStage::Read,
            message: message.into(),
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self {
            stage: FailureStage::Parse,
            message: message.into(),
        }
    }
}

/// Parsed source unit holding the text and its tree.
#[derive(Debug)]
pub struct ParsedUnit {
    pub source: String,
    pub tree: Tree,
}

impl ParsedUnit {
    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }
}

/// Parse Python source text into a syntax tree.
pub fn parse_python(source: String) -> Result<ParsedUnit, ParseFailure> {
    let mut parser = tree_sitter::Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .map_err(|e| ParseFailure::parse(format!("Failed to set language: {e}")))?;

    let tree = parser
        .parse(source.as_bytes(), None)
        .ok_or_else(|| ParseFailure::parse("Parser returned no tree"))?;

    let root = tree.root_node();
    if root.has_error() {
        let message = match first_error(root) {
            Some(node) => {
                let at = node.start_position();
                let what = if node.is_missing() {
                    format!("missing {}", node.kind())
                } else {
                    "invalid syntax".to_string()
                };
                format!("{what} at line {}, column {}", at.row + 1, at.column + 1)
            }
            None => "invalid syntax".to_string(),
        };
        return Err(ParseFailure::parse(message));
    }

    Ok(ParsedUnit { source, tree })
}

/// Read a file as UTF-8 and parse it.
pub fn parse_file(path: &Path) -> Result<ParsedUnit, ParseFailure> {
    let source = std::fs::read_to_string(path)
        .map_err(|e| ParseFailure::read(format!("Failed to read {}: {e}", path.display())))?;
    parse_python(source)
}

fn first_error<'t>(node: Node<'t>) -> Option<Node<'t>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if let Some(found) = first_error(child) {
            return Some(found);
        }
    }
    None
}
