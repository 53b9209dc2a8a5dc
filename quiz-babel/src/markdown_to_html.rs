//! Markdown bodies to HTML, leaving math and image references untouched
//!
//! Inline math (`$...$`) and `![](...)` references are swapped for opaque
//! tokens before comrak sees the text and swapped back afterwards, so their
//! contents never pick up emphasis or escaping. Underscores are literal in
//! quiz bodies and are shielded the same way.

use comrak::{markdown_to_html as render, ComrakOptions};

use crate::common::images::replace_image_refs;
use crate::html_to_markdown::UNDERSCORE_SENTINEL;

fn default_comrak_options() -> ComrakOptions<'static> {
    let mut options = ComrakOptions::default();
    options.extension.table = true;
    options.extension.strikethrough = true;
    options.extension.autolink = true;
    options.render.unsafe_ = true;
    options
}

fn token(kind: &str, index: usize) -> String {
    format!("QZ{kind}{index}QZ")
}

/// Render a Markdown body to HTML. Math keeps its `$` delimiters.
pub fn markdown_to_html(text: &str) -> String {
    let mut math = Vec::new();
    let mut shielded = String::with_capacity(text.len());
    for (index, segment) in text.split('$').enumerate() {
        if index % 2 == 1 {
            shielded.push_str(&token("MATH", math.len()));
            math.push(segment.to_string());
        } else {
            shielded.push_str(segment);
        }
    }

    let mut images = Vec::new();
    let shielded = replace_image_refs::<std::convert::Infallible>(&shielded, |image| {
        let placeholder = token("IMAGE", images.len());
        images.push(image.raw.clone());
        Ok(placeholder)
    })
    .unwrap_or_else(|never| match never {});

    let html = render(
        &shielded.replace('_', UNDERSCORE_SENTINEL),
        &default_comrak_options(),
    );
    let mut html = html.replace(UNDERSCORE_SENTINEL, "_");

    for (index, raw) in images.iter().enumerate().rev() {
        html = html.replace(&token("IMAGE", index), raw);
    }
    for (index, segment) in math.iter().enumerate().rev() {
        html = html.replace(&token("MATH", index), &format!("${segment}$"));
    }
    html
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_emphasis_and_paragraphs() {
        assert_eq!(markdown_to_html("a *b*\n\nc"), "<p>a <em>b</em></p>\n<p>c</p>\n");
    }

    #[test]
    fn math_is_left_alone() {
        let html = markdown_to_html("area $a_1 * b_2 * c$ here");
        assert_eq!(html, "<p>area $a_1 * b_2 * c$ here</p>\n");
    }

    #[test]
    fn underscores_are_literal() {
        assert_eq!(markdown_to_html("_not emphasis_"), "<p>_not emphasis_</p>\n");
    }

    #[test]
    fn image_references_survive() {
        let html = markdown_to_html("see ![](my_pic.png){width=200}");
        assert_eq!(html, "<p>see ![](my_pic.png){width=200}</p>\n");
    }

    #[test]
    fn tables_render() {
        let html = markdown_to_html("|A|B|\n|---|---|\n|1|2|\n");
        assert!(html.contains("<table>"));
        assert!(html.contains("<td>1</td>"));
    }

    #[test]
    fn many_math_segments_restore_in_place() {
        let text: String = (0..12).map(|i| format!("${i}$ ")).collect();
        let html = markdown_to_html(&text);
        assert!(html.starts_with("<p>$0$ $1$"));
        assert!(html.contains("$10$ $11$"));
    }
}
