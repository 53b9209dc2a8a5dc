//! Math delimiters and literal dollar signs
//!
//! The text notation writes inline math as `$...$` and a literal dollar sign
//! as `DOLLAR_SIGN`. The XML side uses `\(...\)` and plain `$`.

use once_cell::sync::Lazy;
use regex::Regex;

/// How a literal `$` is spelled in the text notation.
pub const DOLLAR_SIGN: &str = "DOLLAR_SIGN";

static LONE_DOLLAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$+").expect("valid regex"));

/// `$a$ and $b$` becomes `\(a\) and \(b\)`; `DOLLAR_SIGN` becomes `$`.
pub fn dollars_to_delimiters(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    for (index, segment) in text.split('$').enumerate() {
        if index % 2 == 1 {
            out.push_str("\\(");
            out.push_str(segment);
            out.push_str("\\)");
        } else {
            out.push_str(segment);
        }
    }
    out.replace(DOLLAR_SIGN, "$")
}

/// Inverse of [`dollars_to_delimiters`].
///
/// A lone `$` is a literal and becomes `DOLLAR_SIGN`, `$$` display math is
/// folded to `$`, and `\(` / `\)` become `$`.
pub fn delimiters_to_dollars(text: &str) -> String {
    let text = LONE_DOLLAR.replace_all(text, |caps: &regex::Captures<'_>| {
        match caps[0].len() {
            1 => DOLLAR_SIGN.to_string(),
            _ => "$".to_string(),
        }
    });
    text.replace("\\(", "$").replace("\\)", "$")
}

/// Drop everything between `$` pairs.
pub fn strip_math(text: &str) -> String {
    text.split('$').step_by(2).collect()
}
