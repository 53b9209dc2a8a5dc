//! Image references in the text notation
//!
//! `![](path)` or `![](path){width=N}`. Paths never contain `)`.

use once_cell::sync::Lazy;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use regex::Regex;

static IMAGE_REF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"!\[\]\(([^)]*)\)(?:\{width=([^}]*)\})?").expect("valid regex")
});

/// One `![](...)` occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    /// The full matched text.
    pub raw: String,
    pub path: String,
    pub width: Option<String>,
}

impl ImageRef {
    pub fn render(path: &str, width: Option<&str>) -> String {
        match width {
            Some(width) => format!("![]({path}){{width={width}}}"),
            None => format!("![]({path})"),
        }
    }
}

pub fn find_image_refs(text: &str) -> Vec<ImageRef> {
    IMAGE_REF
        .captures_iter(text)
        .map(|caps| ImageRef {
            raw: caps[0].to_string(),
            path: caps[1].to_string(),
            width: caps.get(2).map(|m| m.as_str().trim().to_string()),
        })
        .collect()
}

/// Replace each image reference with whatever `f` returns for it.
pub fn replace_image_refs<E>(
    text: &str,
    mut f: impl FnMut(&ImageRef) -> Result<String, E>,
) -> Result<String, E> {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in IMAGE_REF.captures_iter(text) {
        let whole = caps.get(0).map_or(0..0, |m| m.range());
        let image = ImageRef {
            raw: caps[0].to_string(),
            path: caps[1].to_string(),
            width: caps.get(2).map(|m| m.as_str().trim().to_string()),
        };
        out.push_str(&text[last..whole.start]);
        out.push_str(&f(&image)?);
        last = whole.end;
    }
    out.push_str(&text[last..]);
    Ok(out)
}

/// File names on the server cannot hold `$` or `?`.
pub fn escape_file_name(name: &str) -> String {
    name.replace('$', "SsS").replace('?', "QqQ")
}

/// Characters of a file name that cannot appear raw in a `src` attribute.
const SRC_ESCAPES: &AsciiSet = &CONTROLS.add(b' ').add(b'"').add(b'%').add(b'<').add(b'>');

/// Escape a file name for a `src` attribute. Inverse of [`percent_decode`].
pub fn percent_encode(name: &str) -> String {
    utf8_percent_encode(name, SRC_ESCAPES).to_string()
}

/// Decode `%XX` escapes in a URL path segment. Invalid escapes are kept.
pub fn percent_decode(text: &str) -> String {
    percent_decode_str(text).decode_utf8_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_plain_and_sized_images() {
        let refs = find_image_refs("a ![](x.png) b ![](dir/y.png){width=300} c");
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].path, "x.png");
        assert_eq!(refs[0].width, None);
        assert_eq!(refs[1].path, "dir/y.png");
        assert_eq!(refs[1].width.as_deref(), Some("300"));
        assert_eq!(refs[1].raw, "![](dir/y.png){width=300}");
    }

    #[test]
    fn replaces_in_order() {
        let out: Result<String, ()> =
            replace_image_refs("![](a) and ![](b){width=2}", |img| Ok(format!("<{}>", img.path)));
        assert_eq!(out.unwrap(), "<a> and <b>");
    }

    #[test]
    fn escapes_server_names() {
        assert_eq!(escape_file_name("a$b?c.png"), "aSsSbQqQc.png");
    }

    #[test]
    fn decodes_percent_escapes() {
        assert_eq!(percent_decode("my%20file%2Bx.png"), "my file+x.png");
        assert_eq!(percent_decode("bad%zz"), "bad%zz");
        assert_eq!(percent_decode("end%2"), "end%2");
    }

    #[test]
    fn encoding_reverses_decoding() {
        let name = "my plot 100%.png";
        assert_eq!(percent_encode(name), "my%20plot%20100%25.png");
        assert_eq!(percent_decode(&percent_encode(name)), name);
        assert_eq!(percent_encode("a\"<b>.png"), "a%22%3Cb%3E.png");
        assert_eq!(percent_decode(&percent_encode("côté.png")), "côté.png");
    }
}
