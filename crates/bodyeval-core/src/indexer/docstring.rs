//! Doc-comment detection and cleaning.
//!
//! A function is documented when the first statement of its body is a bare
//! string literal. The literal's value is cleaned the same way
//! `inspect.cleandoc` does: the first line is left-stripped, the common
//! indentation of the remaining lines is removed, and leading and trailing
//! blank lines are dropped. Whitespace-only lines count as blank.
//!
//! Escapes in non-raw literals are decoded, except `\N{...}` named escapes,
//! which are kept as written.

use tree_sitter::Node;

const TAB_SIZE: usize = 8;

/// Return the literal node if `statement` is a bare string expression that
/// can serve as a doc-comment.
pub fn doc_literal<'t>(statement: Node<'t>, source: &str) -> Option<Node<'t>> {
    if statement.kind() != "expression_statement" || statement.named_child_count() != 1 {
        return None;
    }
    let mut literal = statement.named_child(0)?;
    while literal.kind() == "parenthesized_expression" {
        literal = literal.named_child(0)?;
    }
    let accepted = match literal.kind() {
        "string" => is_text_literal(&source[literal.byte_range()]),
        "concatenated_string" => {
            let mut cursor = literal.walk();
            let parts: Vec<Node<'t>> = literal.named_children(&mut cursor).collect();
            parts
                .iter()
                .filter(|part| part.kind() == "string")
                .all(|part| is_text_literal(&source[part.byte_range()]))
        }
        _ => false,
    };
    accepted.then_some(literal)
}

/// Decoded value of a `string` or `concatenated_string` node.
pub fn literal_value(literal: Node<'_>, source: &str) -> String {
    if literal.kind() == "concatenated_string" {
        let mut cursor = literal.walk();
        return literal
            .named_children(&mut cursor)
            .filter(|part| part.kind() == "string")
            .map(|part| decode_literal(&source[part.byte_range()]))
            .collect();
    }
    decode_literal(&source[literal.byte_range()])
}

/// Cleaned doc-comment text, or `None` when it is empty after cleaning.
pub fn docstring(literal: Node<'_>, source: &str) -> Option<String> {
    let cleaned = clean_doc(&literal_value(literal, source));
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

/// Lowercased prefix letters (`r`, `b`, `f`, ...) of a `string` node.
pub fn string_prefix(string: Node<'_>, source: &str) -> String {
    split_prefix(&source[string.byte_range()]).0.to_ascii_lowercase()
}

fn split_prefix(text: &str) -> (&str, &str) {
    let idx = text
        .find(|c: char| c == '"' || c == '\'')
        .unwrap_or(text.len());
    (&text[..idx], &text[idx..])
}

/// Byte strings and f-strings never count as doc-comments.
fn is_text_literal(text: &str) -> bool {
    let (prefix, _) = split_prefix(text);
    !prefix
        .chars()
        .any(|c| matches!(c.to_ascii_lowercase(), 'b' | 'f' | 't'))
}

fn decode_literal(text: &str) -> String {
    let (prefix, quoted) = split_prefix(text);
    let quote = ["\"\"\"", "'''", "\"", "'"]
        .into_iter()
        .find(|q| quoted.starts_with(q) && quoted.len() >= 2 * q.len() && quoted.ends_with(q));
    let body = match quote {
        Some(q) => &quoted[q.len()..quoted.len() - q.len()],
        None => quoted,
    };
    let raw = prefix.chars().any(|c| c.eq_ignore_ascii_case(&'r'));
    if raw {
        body.to_string()
    } else {
        unescape(body)
    }
}

fn unescape(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.peek().copied() {
            Some('\n') => {
                chars.next();
            }
            Some(esc @ ('\\' | '\'' | '"' | 'a' | 'b' | 'f' | 'n' | 'r' | 't' | 'v')) => {
                chars.next();
                out.push(match esc {
                    'a' => '\x07',
                    'b' => '\x08',
                    'f' => '\x0c',
                    'n' => '\n',
                    'r' => '\r',
                    't' => '\t',
                    'v' => '\x0b',
                    other => other,
                });
            }
            Some('0'..='7') => {
                let mut code = 0u32;
                for _ in 0..3 {
                    match chars.peek().and_then(|d| d.to_digit(8)) {
                        Some(digit) => {
                            code = code * 8 + digit;
                            chars.next();
                        }
                        None => break,
                    }
                }
                out.extend(char::from_u32(code));
            }
            Some(kind @ ('x' | 'u' | 'U')) => {
                let width = match kind {
                    'x' => 2,
                    'u' => 4,
                    _ => 8,
                };
                let digits: String = chars.clone().skip(1).take(width).collect();
                let decoded = (digits.len() == width
                    && digits.chars().all(|d| d.is_ascii_hexdigit()))
                .then(|| u32::from_str_radix(&digits, 16).ok())
                .flatten()
                .and_then(char::from_u32);
                match decoded {
                    Some(decoded) => {
                        for _ in 0..=width {
                            chars.next();
                        }
                        out.push(decoded);
                    }
                    None => out.push('\\'),
                }
            }
            // Unknown escapes keep their backslash.
            _ => out.push('\\'),
        }
    }
    out
}

fn expand_tabs(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut column = 0;
    for c in line.chars() {
        if c == '\t' {
            let pad = TAB_SIZE - column % TAB_SIZE;
            out.extend(std::iter::repeat(' ').take(pad));
            column += pad;
        } else {
            out.push(c);
            column = if c == '\n' || c == '\r' { 0 } else { column + 1 };
        }
    }
    out
}

/// Clean up indentation of a doc-comment value.
pub fn clean_doc(doc: &str) -> String {
    let expanded = expand_tabs(doc);
    let mut lines: Vec<String> = expanded.split('\n').map(str::to_string).collect();

    let margin = lines
        .iter()
        .skip(1)
        .filter_map(|line| {
            let content = line.trim_start().chars().count();
            (content > 0).then(|| line.chars().count() - content)
        })
        .min();

    if let Some(first) = lines.first_mut() {
        *first = first.trim_start().to_string();
    }
    if let Some(margin) = margin {
        for line in lines.iter_mut().skip(1) {
            *line = line.chars().skip(margin).collect();
        }
    }

    while lines.last().is_some_and(|line| line.trim().is_empty()) {
        lines.pop();
    }
    let leading = lines.iter().take_while(|line| line.trim().is_empty()).count();
    lines.drain(..leading);

    lines.join("\n")
}
