//! Documented-function extraction from Python source.
//!
//! Every `def` (methods and nested functions included) whose body opens
//! with a doc-comment becomes a [`FunctionRecord`]. Functions without one,
//! and `async def` functions, are skipped.

use std::collections::VecDeque;
use std::path::Path;

use tree_sitter::Node;

use crate::indexer::canonical::{block_statements, render_statements};
use crate::indexer::docstring::{doc_literal, docstring};
use crate::indexer::parser::{parse_file, parse_python, ParseFailure, ParsedUnit};
use crate::models::{FileFunctions, FunctionRecord};

/// Extract documented functions from already-loaded source text.
pub fn extract_functions(
    source: String,
    repository: &str,
    path: &str,
) -> Result<FileFunctions, ParseFailure> {
    let unit = parse_python(source)?;
    Ok(collect_documented(&unit, repository, path))
}

/// Read, parse and extract one file.
pub fn extract_file(
    absolute: &Path,
    repository: &str,
    path: &str,
) -> Result<FileFunctions, ParseFailure> {
    let unit = parse_file(absolute)?;
    Ok(collect_documented(&unit, repository, path))
}

/// Breadth-first traversal over statement scopes.
///
/// Depth is counted the way Python's own AST walk counts it: blocks,
/// `else`/`finally` clauses and decorators add no level, an `elif` nests
/// inside the branch before it, and `except`/`case` clauses are a level of
/// their own. Names are unique per file. When a name is defined more than
/// once, the definition visited last replaces the earlier record while
/// keeping its position in the map.
fn collect_documented(unit: &ParsedUnit, repository: &str, path: &str) -> FileFunctions {
    let mut functions = FileFunctions::new();
    let mut queue = VecDeque::from([unit.root()]);

    while let Some(node) = queue.pop_front() {
        if node.kind() == "function_definition" && !is_async(node) {
            if let Some(record) = documented_function(node, &unit.source, repository, path) {
                functions.insert(record.name.clone(), record);
            }
        }
        queue.extend(scope_children(node));
    }

    functions
}

/// `async def` is a different kind of definition and yields no record. Its
/// body is still walked.
fn is_async(node: Node<'_>) -> bool {
    node.child(0).is_some_and(|first| first.kind() == "async")
}

fn first_block(node: Node<'_>) -> Option<Node<'_>> {
    let mut cursor = node.walk();
    let block = node
        .named_children(&mut cursor)
        .find(|child| child.kind() == "block");
    block
}

fn push_statements<'t>(block: Option<Node<'t>>, out: &mut Vec<Node<'t>>) {
    let Some(block) = block else {
        return;
    };
    for statement in block_statements(block) {
        match statement.kind() {
            "decorated_definition" => out.extend(statement.child_by_field_name("definition")),
            _ => out.push(statement),
        }
    }
}

/// The `elif`/`else` that follows an `if` or `elif` branch.
fn next_branch(node: Node<'_>) -> Option<Node<'_>> {
    if node.kind() == "if_statement" {
        let mut cursor = node.walk();
        let branch = node
            .named_children(&mut cursor)
            .find(|child| matches!(child.kind(), "elif_clause" | "else_clause"));
        return branch;
    }
    let mut sibling = node.next_named_sibling();
    while let Some(candidate) = sibling {
        if matches!(candidate.kind(), "elif_clause" | "else_clause") {
            return Some(candidate);
        }
        if candidate.kind() != "comment" {
            return None;
        }
        sibling = candidate.next_named_sibling();
    }
    None
}

/// Nodes one scope level below `node`, in visiting order.
fn scope_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut out = Vec::new();
    match node.kind() {
        "module" => push_statements(Some(node), &mut out),
        "if_statement" | "elif_clause" => {
            push_statements(first_block(node), &mut out);
            match next_branch(node) {
                Some(branch) if branch.kind() == "elif_clause" => out.push(branch),
                Some(branch) => push_statements(first_block(branch), &mut out),
                None => {}
            }
        }
        "for_statement" | "while_statement" => {
            push_statements(first_block(node), &mut out);
            let alternative = node.child_by_field_name("alternative");
            push_statements(alternative.and_then(first_block), &mut out);
        }
        "try_statement" => {
            let mut cursor = node.walk();
            let clauses: Vec<Node<'_>> = node.named_children(&mut cursor).collect();
            for clause in clauses {
                match clause.kind() {
                    "block" => push_statements(Some(clause), &mut out),
                    "except_clause" | "except_group_clause" => out.push(clause),
                    "else_clause" | "finally_clause" => {
                        push_statements(first_block(clause), &mut out)
                    }
                    _ => {}
                }
            }
        }
        "match_statement" => {
            if let Some(body) = node.child_by_field_name("body") {
                let mut cursor = body.walk();
                out.extend(
                    body.named_children(&mut cursor)
                        .filter(|child| child.kind() == "case_clause"),
                );
            }
        }
        "function_definition" | "class_definition" | "with_statement" | "except_clause"
        | "except_group_clause" | "case_clause" => {
            push_statements(first_block(node), &mut out)
        }
        _ => {}
    }
    out
}

fn documented_function(
    node: Node<'_>,
    source: &str,
    repository: &str,
    path: &str,
) -> Option<FunctionRecord> {
    let name_node = node.child_by_field_name("name")?;
    let body = node.child_by_field_name("body")?;
    let statements = block_statements(body);
    let (first, rest) = statements.split_first()?;
    let literal = doc_literal(*first, source)?;
    let doc_comment = docstring(literal, source)?;

    Some(FunctionRecord {
        repository: repository.to_string(),
        path: path.to_string(),
        name: source[name_node.byte_range()].to_string(),
        line: node.start_position().row + 1,
        source_text: source[node.byte_range()].to_string(),
        doc_comment,
        body_text: render_statements(rest, source),
    })
}
