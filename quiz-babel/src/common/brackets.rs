//! Balanced-delimiter extraction
//!
//! Both extractors return, for every occurrence of `pattern` that is directly
//! followed by `open`, the text between that opener and its balanced `close`.
//! Results come out in the order their closers are met, so nested calls are
//! reported innermost first.
//!
//! An unmatched closer empties the pending stack instead of failing; callers
//! treat unbalanced input as "nothing to extract here".
//!
//! Offsets are byte offsets. Delimiters are plain strings and may span several
//! characters (`[[` / `]]`, `<img` / `>`).

/// A pair of opening and closing delimiters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delimiters<'a> {
    pub open: &'a str,
    pub close: &'a str,
}

impl<'a> Delimiters<'a> {
    pub const PARENS: Delimiters<'static> = Delimiters {
        open: "(",
        close: ")",
    };

    pub const fn new(open: &'a str, close: &'a str) -> Self {
        Self { open, close }
    }
}

/// Byte offsets right after each non-overlapping match of `pattern`.
///
/// An empty pattern matches at every character boundary.
fn pattern_ends(text: &str, pattern: &str) -> Vec<usize> {
    text.match_indices(pattern)
        .map(|(start, matched)| start + matched.len())
        .collect()
}

fn starts_at(bytes: &[u8], at: usize, needle: &str) -> bool {
    !needle.is_empty()
        && bytes
            .get(at..)
            .is_some_and(|rest| rest.starts_with(needle.as_bytes()))
}

fn slice_between<'t>(text: &'t str, from: usize, to: usize) -> &'t str {
    if from > to {
        ""
    } else {
        &text[from..to]
    }
}

/// Stack every opener found anywhere in `text`; report a frame only when it
/// began right after a `pattern` match.
///
/// Parentheses inside a call's arguments are balanced against each other, so
/// `NUMERICAL(f(2), 0.1)` yields `f(2), 0.1`.
pub fn extract_balanced<'t>(text: &'t str, pattern: &str, delims: Delimiters<'_>) -> Vec<&'t str> {
    let valid = pattern_ends(text, pattern);
    let bytes = text.as_bytes();
    let mut pending: Vec<usize> = Vec::new();
    let mut found = Vec::new();

    for i in 0..bytes.len() {
        if starts_at(bytes, i, delims.open) {
            pending.push(i);
        }
        if starts_at(bytes, i, delims.close) {
            match pending.pop() {
                Some(start) => {
                    if valid.binary_search(&start).is_ok() {
                        found.push(slice_between(text, start + delims.open.len(), i));
                    }
                }
                None => pending.clear(),
            }
        }
    }
    found
}

/// Only openers directly after a `pattern` match start a frame; any closer
/// pops the latest frame.
///
/// Suited to structural scans where the delimiters also occur in unrelated
/// text, such as `<img ...>` tags or quoted attribute values where opener and
/// closer are the same character.
pub fn extract_anchored<'t>(text: &'t str, pattern: &str, delims: Delimiters<'_>) -> Vec<&'t str> {
    let valid = pattern_ends(text, pattern);
    let bytes = text.as_bytes();
    let mut pending: Vec<usize> = Vec::new();
    let mut found = Vec::new();

    let mut i = 0;
    while i < bytes.len() {
        if starts_at(bytes, i, delims.open) && valid.binary_search(&i).is_ok() {
            pending.push(i);
            i += delims.open.len();
        }
        if starts_at(bytes, i, delims.close) {
            match pending.pop() {
                Some(start) => found.push(slice_between(text, start + delims.open.len(), i)),
                None => pending.clear(),
            }
        }
        i += 1;
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_calls_resolve_innermost_first() {
        let text = "NUMERICAL(1,NUMERICAL(2))";
        assert_eq!(
            extract_balanced(text, "NUMERICAL", Delimiters::PARENS),
            vec!["2", "1,NUMERICAL(2)"]
        );
        assert_eq!(
            extract_anchored(text, "NUMERICAL", Delimiters::PARENS),
            vec!["2", "1,NUMERICAL(2)"]
        );
    }

    #[test]
    fn balanced_keeps_inner_parentheses() {
        let text = "Compute NUMERICAL((1+2)*3, 0.1) now";
        assert_eq!(
            extract_balanced(text, "NUMERICAL", Delimiters::PARENS),
            vec!["(1+2)*3, 0.1"]
        );
    }

    #[test]
    fn unrelated_brackets_are_ignored() {
        let text = "(aside) SHORTANSWER('x') (more)";
        assert_eq!(
            extract_balanced(text, "SHORTANSWER", Delimiters::PARENS),
            vec!["'x'"]
        );
    }

    #[test]
    fn unmatched_closer_resets_tracking() {
        let text = ") ) f(a)";
        assert_eq!(extract_balanced(text, "f", Delimiters::PARENS), vec!["a"]);
        assert_eq!(extract_anchored(text, "f", Delimiters::PARENS), vec!["a"]);
    }

    #[test]
    fn unclosed_opener_yields_nothing() {
        assert!(extract_balanced("f(a", "f", Delimiters::PARENS).is_empty());
    }

    #[test]
    fn multi_character_delimiters() {
        let text = "The [[1@cat]] sat on the [[2@mat]].";
        assert_eq!(
            extract_balanced(text, "", Delimiters::new("[[", "]]")),
            vec!["1@cat", "2@mat"]
        );
    }

    #[test]
    fn anchored_reads_quoted_attributes() {
        let tag = r#" src="a b.png" width="300" alt="""#;
        assert_eq!(
            extract_anchored(tag, "src=", Delimiters::new("\"", "\"")),
            vec!["a b.png"]
        );
        assert_eq!(
            extract_anchored(tag, "width=", Delimiters::new("\"", "\"")),
            vec!["300"]
        );
    }

    #[test]
    fn anchored_finds_every_tag() {
        let html = r#"<p>x<img src="a.png"> and <img src="b.png" width="20"></p>"#;
        let tags = extract_anchored(html, "", Delimiters::new("<img", ">"));
        assert_eq!(tags, vec![r#" src="a.png""#, r#" src="b.png" width="20""#]);
    }

    #[test]
    fn works_across_multibyte_text() {
        let text = "é f(ü) ñ";
        assert_eq!(extract_balanced(text, "f", Delimiters::PARENS), vec!["ü"]);
    }
}
