//! Canonical re-serialization of statement lists.
//!
//! Two bodies that differ only in incidental formatting render to the same
//! text. Spacing, line breaks inside brackets, backslash continuations and
//! comments are dropped, as are redundant parentheses and trailing commas
//! before a closing bracket. Tokens are joined by a single space, every
//! simple statement and compound-statement header gets its own line, and
//! nested blocks are indented four spaces per level. String literals are
//! re-quoted from their decoded value; f-strings are kept verbatim.

use std::borrow::Cow;

use tree_sitter::Node;

use crate::indexer::docstring::{literal_value, string_prefix};

const INDENT: &str = "    ";

// Binding strength, weakest first, as in Python's own unparser.
const NAMED_EXPR: u8 = 1;
const YIELD: u8 = 3;
const TEST: u8 = 4;
const OR: u8 = 5;
const AND: u8 = 6;
const NOT: u8 = 7;
const CMP: u8 = 8;
const BOR: u8 = 9;
const BXOR: u8 = 10;
const BAND: u8 = 11;
const SHIFT: u8 = 12;
const ARITH: u8 = 13;
const TERM: u8 = 14;
const FACTOR: u8 = 15;
const POWER: u8 = 16;
const AWAIT: u8 = 17;
const ATOM: u8 = 18;

type Line<'s> = Vec<Cow<'s, str>>;

/// Statement nodes of a `block`, without comments.
pub fn block_statements<'t>(block: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = block.walk();
    block
        .named_children(&mut cursor)
        .filter(|child| !is_trivia(child))
        .collect()
}

/// Render a statement list at indentation depth zero.
pub fn render_statements<'t>(statements: &[Node<'t>], source: &str) -> String {
    let mut renderer = Renderer {
        source,
        lines: Vec::new(),
    };
    for statement in statements {
        renderer.statement(*statement, 0);
    }
    renderer.lines.join("\n")
}

fn is_trivia(node: &Node<'_>) -> bool {
    matches!(node.kind(), "comment" | "line_continuation")
}

fn operator(node: Node<'_>) -> Option<&'static str> {
    node.child_by_field_name("operator").map(|op| op.kind())
}

fn precedence(node: Node<'_>) -> u8 {
    match node.kind() {
        "named_expression" => NAMED_EXPR,
        "yield" => YIELD,
        "lambda" | "conditional_expression" => TEST,
        "boolean_operator" => match operator(node) {
            Some("and") => AND,
            _ => OR,
        },
        "not_operator" => NOT,
        "comparison_operator" => CMP,
        "binary_operator" => match operator(node) {
            Some("|") => BOR,
            Some("^") => BXOR,
            Some("&") => BAND,
            Some("<<" | ">>") => SHIFT,
            Some("+" | "-") => ARITH,
            Some("**") => POWER,
            _ => TERM,
        },
        "unary_operator" => FACTOR,
        "await" => AWAIT,
        _ => ATOM,
    }
}

/// Binding strength an expression needs to stand in `node`'s position
/// without parentheses.
fn required_precedence(node: Node<'_>) -> u8 {
    let Some(parent) = node.parent() else {
        return TEST;
    };
    let is_field = |field: &str| parent.child_by_field_name(field) == Some(node);
    match parent.kind() {
        "binary_operator" => {
            let own = precedence(parent);
            // Left-associative except `**`.
            if is_field("left") == (own == POWER) {
                own + 1
            } else {
                own
            }
        }
        "boolean_operator" | "comparison_operator" => precedence(parent) + 1,
        "not_operator" | "unary_operator" => precedence(parent),
        "await" => ATOM,
        "attribute" if is_field("object") => ATOM,
        "call" if is_field("function") => ATOM,
        "subscript" if is_field("value") => ATOM,
        "conditional_expression" => {
            let mut cursor = parent.walk();
            let orelse = parent
                .named_children(&mut cursor)
                .filter(|child| !is_trivia(child))
                .last();
            if orelse == Some(node) {
                TEST
            } else {
                OR
            }
        }
        "expression_statement" => YIELD,
        "parenthesized_expression" => 0,
        _ => TEST,
    }
}

/// Innermost expression under any number of parentheses.
fn strip_parens(mut node: Node<'_>) -> Node<'_> {
    while node.kind() == "parenthesized_expression" {
        let mut cursor = node.walk();
        let inner = node
            .named_children(&mut cursor)
            .find(|child| !is_trivia(child));
        match inner {
            Some(inner) => node = inner,
            None => break,
        }
    }
    node
}

fn drops_trailing_comma(node: Node<'_>) -> bool {
    match node.kind() {
        "argument_list" | "parameters" | "list" | "dict" | "set" | "import_from_statement" => true,
        // `(x,)` needs its comma.
        "tuple" => {
            let mut cursor = node.walk();
            let elements = node
                .named_children(&mut cursor)
                .filter(|child| !is_trivia(child))
                .count();
            elements > 1
        }
        _ => false,
    }
}

fn is_closing(node: &Node<'_>) -> bool {
    matches!(node.kind(), ")" | "]" | "}")
}

/// Quote `value` the way Python's `repr` does: single quotes unless the
/// value holds a single quote and no double quote.
fn quote_literal(value: &str) -> String {
    let quote = if value.contains('\'') && !value.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(value.len() + 2);
    out.push(quote);
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_control() => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

fn string_literal<'s>(node: Node<'_>, source: &'s str) -> Cow<'s, str> {
    let parts: Vec<Node<'_>> = if node.kind() == "string" {
        vec![node]
    } else {
        let mut cursor = node.walk();
        let parts = node
            .named_children(&mut cursor)
            .filter(|part| part.kind() == "string")
            .collect();
        parts
    };
    let prefixes: Vec<String> = parts
        .iter()
        .map(|part| string_prefix(*part, source))
        .collect();

    if prefixes.iter().any(|p| p.contains('f') || p.contains('t')) {
        let verbatim: Vec<&'s str> = parts
            .iter()
            .map(|part| &source[part.byte_range()])
            .collect();
        return Cow::Owned(verbatim.join(" "));
    }
    let quoted = quote_literal(&literal_value(node, source));
    if prefixes.iter().any(|p| p.contains('b')) {
        Cow::Owned(format!("b{quoted}"))
    } else {
        Cow::Owned(quoted)
    }
}

struct Renderer<'s> {
    source: &'s str,
    lines: Vec<String>,
}

impl<'s> Renderer<'s> {
    fn statement(&mut self, node: Node<'_>, depth: usize) {
        let mut line = Vec::new();
        self.emit(node, depth, &mut line);
        self.flush(depth, &mut line);
    }

    fn emit(&mut self, node: Node<'_>, depth: usize, line: &mut Line<'s>) {
        if is_trivia(&node) {
            return;
        }
        match node.kind() {
            "block" => {
                self.flush(depth, line);
                for statement in block_statements(node) {
                    self.statement(statement, depth + 1);
                }
            }
            "string" | "concatenated_string" => line.push(string_literal(node, self.source)),
            "parenthesized_expression" => {
                let inner = strip_parens(node);
                if precedence(inner) >= required_precedence(node) {
                    self.emit(inner, depth, line);
                } else {
                    line.push(Cow::Borrowed("("));
                    self.emit(inner, depth, line);
                    line.push(Cow::Borrowed(")"));
                }
            }
            "decorator" => {
                self.children(node, depth, line);
                self.flush(depth, line);
            }
            _ if node.child_count() == 0 => {
                let text = &self.source[node.byte_range()];
                if !text.is_empty() {
                    line.push(Cow::Borrowed(text));
                }
            }
            _ => self.children(node, depth, line),
        }
    }

    fn children(&mut self, node: Node<'_>, depth: usize, line: &mut Line<'s>) {
        let mut cursor = node.walk();
        let children: Vec<Node<'_>> = node
            .children(&mut cursor)
            .filter(|child| !is_trivia(child))
            .collect();
        let trim_comma = drops_trailing_comma(node);
        for (i, child) in children.iter().enumerate() {
            if trim_comma && child.kind() == "," && children.get(i + 1).is_some_and(is_closing) {
                continue;
            }
            self.emit(*child, depth, line);
        }
    }

    fn flush(&mut self, depth: usize, line: &mut Line<'s>) {
        if line.is_empty() {
            return;
        }
        self.lines
            .push(format!("{}{}", INDENT.repeat(depth), line.join(" ")));
        line.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::parser::parse_python;

    fn render_module(src: &str) -> String {
        let unit = parse_python(src.to_string()).unwrap();
        let statements = block_statements(unit.root());
        render_statements(&statements, &unit.source)
    }

    #[test]
    fn test_simple_statements_one_per_line() {
        assert_eq!(render_module("x = 1\nreturn x\n"), "x = 1\nreturn x");
    }

    #[test]
    fn test_whitespace_and_comments_normalized() {
        let a = render_module("y = f(a,b)  # call\n");
        let b = render_module("y=f( a ,\n      b )\n");
        let c = render_module("y = f(a, \\\n  b)\n");
        assert_eq!(a, "y = f ( a , b )");
        assert_eq!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn test_semicolon_statements_split() {
        assert_eq!(render_module("a = 1; b = 2\n"), "a = 1\nb = 2");
    }

    #[test]
    fn test_nested_blocks_indented() {
        let src = "if x:\n    y = 1\nelif z:\n  pass\nelse:\n        for i in r:\n            go(i)\n";
        let expected = "if x :\n    y = 1\nelif z :\n    pass\nelse :\n    for i in r :\n        go ( i )";
        assert_eq!(render_module(src), expected);
    }

    #[test]
    fn test_decorator_on_own_line() {
        let src = "@wrap(1)\ndef g():\n    return 2\n";
        assert_eq!(render_module(src), "@ wrap ( 1 )\ndef g ( ) :\n    return 2");
    }

    #[test]
    fn test_string_inner_whitespace_kept() {
        assert_eq!(render_module("s = 'a  b'\n"), "s = 'a  b'");
    }

    #[test]
    fn test_incidental_syntax_normalized() {
        let a = render_module("y = 'a'; return (g(x, 1,))\n");
        let b = render_module("y = \"a\"\nreturn g(x, 1)\n");
        assert_eq!(a, "y = 'a'\nreturn g ( x , 1 )");
        assert_eq!(a, b);
    }

    #[test]
    fn test_strings_requoted_from_value() {
        assert_eq!(render_module("s = \"it's\"\n"), "s = \"it's\"");
        assert_eq!(render_module("s = '''x\ny'''\n"), "s = 'x\\ny'");
        assert_eq!(render_module("s = 'a' \"b\"\n"), "s = 'ab'");
        assert_eq!(render_module("s = u'\\x41'\n"), render_module("s = 'A'\n"));
        assert_eq!(render_module("s = B\"k\"\n"), "s = b'k'");
        assert_eq!(render_module("s = f\"{x!r}\"\n"), "s = f\"{x!r}\"");
    }

    #[test]
    fn test_parentheses_kept_only_for_precedence() {
        assert_eq!(render_module("y = a + (b * c)\n"), "y = a + b * c");
        assert_eq!(render_module("y = (a - b) - c\n"), "y = a - b - c");
        assert_eq!(render_module("y = (a + b) * c\n"), "y = ( a + b ) * c");
        assert_eq!(render_module("y = a - (b - c)\n"), "y = a - ( b - c )");
        assert_eq!(render_module("y = (a ** b) ** c\n"), "y = ( a ** b ) ** c");
        assert_eq!(render_module("y = ((v)).attr\n"), "y = v . attr");
        assert_eq!(
            render_module("y = (a + b).bit_length()\n"),
            "y = ( a + b ) . bit_length ( )"
        );
        assert_eq!(render_module("x = (yield)\n"), "x = ( yield )");
        assert_eq!(render_module("if (ready):\n    go()\n"), "if ready :\n    go ( )");
    }

    #[test]
    fn test_trailing_commas_dropped() {
        assert_eq!(render_module("f(a, b,)\n"), render_module("f(a, b)\n"));
        assert_eq!(render_module("v = [1, 2,]\n"), "v = [ 1 , 2 ]");
        assert_eq!(render_module("v = {1: 2,}\n"), "v = { 1 : 2 }");
        assert_eq!(render_module("v = (1, 2,)\n"), "v = ( 1 , 2 )");
        assert_eq!(render_module("t = (1,)\n"), "t = ( 1 , )");
        assert_eq!(
            render_module("def g(a,\n      b,\n):\n    pass\n"),
            "def g ( a , b ) :\n    pass"
        );
    }

    #[test]
    fn test_render_is_stable() {
        let src = "try:\n    run()\nexcept E as e:\n    log(e)\nfinally:\n    done()\n";
        assert_eq!(render_module(src), render_module(src));
        assert_eq!(
            render_module(src),
            "try :\n    run ( )\nexcept E as e :\n    log ( e )\nfinally :\n    done ( )"
        );
    }
}
