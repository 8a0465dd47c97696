//! Word tokenization shared by BLEU, n-gram overlap, and length reports.

use regex::Regex;
use std::sync::LazyLock;

static WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+|[^\w\s]+").unwrap());

/// Split text into word and punctuation-run tokens.
pub fn word_tokenize(text: &str) -> Vec<&str> {
    WORD_RE.find_iter(text).map(|m| m.as_str()).collect()
}

pub fn count_tokens(text: &str) -> usize {
    WORD_RE.find_iter(text).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_tokenize_code() {
        assert_eq!(
            word_tokenize("return f ( a , b ) == 1"),
            vec!["return", "f", "(", "a", ",", "b", ")", "==", "1"]
        );
    }

    #[test]
    fn test_punctuation_runs_grouped() {
        assert_eq!(word_tokenize("x[0]+=1"), vec!["x", "[", "0", "]+=", "1"]);
    }

    #[test]
    fn test_empty_and_whitespace() {
        assert!(word_tokenize("").is_empty());
        assert!(word_tokenize(" \n\t ").is_empty());
        assert_eq!(count_tokens("  a  b "), 2);
    }
}
