//! Question text across the XML boundary
//!
//! Export turns a [`Body`] into the HTML the XML schema stores: Markdown is
//! rendered first, `$...$` becomes `\(...\)`, blank lines split paragraphs
//! and every local image reference becomes a base64 `<file>` attachment
//! addressed through `@@PLUGINFILE@@/`.
//!
//! Import undoes each step. Attachments and inline `data:` images are
//! written through the [`AssetStore`] when saving is enabled, remote images
//! are fetched when downloading is enabled, and the HTML is either rendered
//! to Markdown or stripped of its paragraph markup.

use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Local;
use once_cell::sync::Lazy;
use regex::Regex;

use super::XmlOptions;
use crate::assets::{is_remote, remote_file_name, AssetStore};
use crate::common::brackets::{extract_anchored, Delimiters};
use crate::common::images::{
    escape_file_name, percent_decode, percent_encode, replace_image_refs, ImageRef,
};
use crate::common::latex::{delimiters_to_dollars, dollars_to_delimiters};
use crate::error::{QuizError, Result};
use crate::html_to_markdown::MarkdownConverter;
use crate::markdown_to_html::markdown_to_html;
use crate::quiz::Body;

/// Prefix of attachment URLs in stored HTML.
pub const PLUGINFILE: &str = "@@PLUGINFILE@@/";

const QUOTES: Delimiters<'static> = Delimiters::new("\"", "\"");
const IMG_TAG: Delimiters<'static> = Delimiters::new("<img", ">");

static PARAGRAPH_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"<p\b[^>]*>").expect("valid regex"));
static PARAGRAPH_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"</?p\b[^>]*>").expect("valid regex"));
static LINE_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"<br\s*/?>").expect("valid regex"));
static BLANK_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("valid regex"));
static ENTITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[a-zA-Z]+);").expect("valid regex")
});

/// A base64 `<file>` element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub name: String,
    pub data: String,
}

/// The `<file>` children of one element.
///
/// The same path attached twice is stored once. Two paths that escape to
/// the same server name keep apart through a timestamp suffix.
#[derive(Debug, Default)]
pub struct Attachments {
    files: Vec<Attachment>,
    by_path: HashMap<String, String>,
}

impl Attachments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the file at `path` and return its server name.
    pub fn attach(&mut self, question: &str, path: &str, assets: &dyn AssetStore) -> Result<String> {
        if let Some(name) = self.by_path.get(path) {
            return Ok(name.clone());
        }
        let mut name = escape_file_name(path);
        if self.files.iter().any(|f| f.name == name) {
            let renamed = stamped(&name);
            tracing::warn!(
                question,
                file = %name,
                renamed = %renamed,
                "attachment name already taken, check this question by hand"
            );
            name = renamed;
        }
        let bytes = assets.read(path)?;
        self.files.push(Attachment {
            name: name.clone(),
            data: STANDARD.encode(bytes),
        });
        self.by_path.insert(path.to_string(), name.clone());
        Ok(name)
    }

    pub fn files(&self) -> &[Attachment] {
        &self.files
    }
}

/// `name` with a timestamp before its extension.
fn stamped(name: &str) -> String {
    let stamp = Local::now().format("%Y%m%d%H%M%S%6f");
    match name.rsplit_once('.') {
        Some((stem, extension)) if !stem.is_empty() && !extension.contains('/') => {
            format!("{stem}_{stamp}.{extension}")
        }
        _ => format!("{name}_{stamp}"),
    }
}

/// HTML for a question text. Images become attachments in `files`.
pub fn body_to_html(
    question: &str,
    body: &Body,
    files: &mut Attachments,
    assets: &dyn AssetStore,
) -> Result<String> {
    let text = if body.markdown {
        markdown_to_html(&body.text)
    } else {
        body.text.clone()
    };
    let html = format!(
        "<p>{}<br></p>",
        dollars_to_delimiters(&text).replace("\n\n", "</p><p>")
    );
    replace_image_refs(&html, |image| image_tag(question, image, files, assets))
}

fn image_tag(
    question: &str,
    image: &ImageRef,
    files: &mut Attachments,
    assets: &dyn AssetStore,
) -> Result<String> {
    let src = if is_remote(&image.path) {
        image.path.clone()
    } else {
        let name = files.attach(question, &image.path, assets)?;
        format!("{PLUGINFILE}{}", percent_encode(&name))
    };
    let width = image
        .width
        .as_deref()
        .map(|w| format!(" width=\"{w}\""))
        .unwrap_or_default();
    Ok(format!(
        "<img src=\"{src}\" alt=\"\" role=\"presentation\" class=\"img-fluid atto_image_button_text-bottom\"{width}>"
    ))
}

/// HTML for a one-line text such as an answer or a drag label.
pub fn inline_to_html(text: &str) -> String {
    dollars_to_delimiters(text)
}

/// Inverse of [`inline_to_html`], flattened to a single line.
pub fn inline_from_html(html: &str) -> String {
    let text = PARAGRAPH_TAG.replace_all(html, "");
    let text = LINE_BREAK.replace_all(&text, "");
    decode_entities(&delimiters_to_dollars(&text))
        .replace('\n', " ")
        .trim()
        .to_string()
}

/// Decode character references. Unknown names are left alone.
pub fn decode_entities(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let entity = &caps[1];
            let decoded = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .map(|hex| u32::from_str_radix(hex, 16).ok())
                    .unwrap_or_else(|| entity.strip_prefix('#').and_then(|d| d.parse().ok()))
                    .and_then(char::from_u32),
            };
            decoded.map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}

/// Right-trim lines, blank out lone `.` lines and collapse blank runs.
fn tidy(text: &str) -> String {
    let lines: Vec<&str> = text.lines().map(str::trim_end).collect();
    let joined = lines.join("\n").replace("\n.\n", "\n\n");
    BLANK_RUN.replace_all(&joined, "\n\n").trim().to_string()
}

/// Import side: turns stored HTML back into bodies and local image files.
pub struct BodyReader<'a> {
    options: &'a XmlOptions,
    converter: MarkdownConverter,
    assets: &'a mut dyn AssetStore,
    inline_images: usize,
}

impl<'a> BodyReader<'a> {
    pub fn new(options: &'a XmlOptions, assets: &'a mut dyn AssetStore) -> Result<Self> {
        Ok(BodyReader {
            converter: MarkdownConverter::new(options.converter.clone())?,
            options,
            assets,
            inline_images: 0,
        })
    }

    /// Store an attachment when saving is enabled and return its local name.
    pub fn save(&mut self, question: &str, file: &Attachment) -> Result<String> {
        let name = escape_file_name(&file.name);
        if !self.options.save_images {
            return Ok(name);
        }
        let encoded: String = file.data.split_whitespace().collect();
        let bytes = STANDARD.decode(encoded).map_err(|e| QuizError::Asset {
            path: name.clone(),
            message: e.to_string(),
        })?;
        self.store(question, name, &bytes)
    }

    fn store(&mut self, question: &str, name: String, bytes: &[u8]) -> Result<String> {
        let target = if self.assets.exists(&name) {
            let renamed = stamped(&name);
            tracing::warn!(
                question,
                file = %name,
                renamed = %renamed,
                "an image with this name already exists, check this question by hand"
            );
            renamed
        } else {
            name
        };
        self.assets.write(&target, bytes)?;
        Ok(target)
    }

    /// The body of a question from its stored HTML and attachments.
    pub fn read(&mut self, question: &str, html: &str, files: &[Attachment]) -> Result<Body> {
        let mut local = HashMap::new();
        for file in files {
            local.insert(escape_file_name(&file.name), self.save(question, file)?);
        }
        let html = self.inline_data_images(question, html)?;
        let html = self.image_references(question, &html, &local)?;

        let text = if self.options.markdown {
            self.converter.convert_literal(&delimiters_to_dollars(&html))
        } else {
            let text = PARAGRAPH_OPEN.replace_all(&html, "");
            let text = LINE_BREAK.replace_all(&text, "\n\n");
            decode_entities(&delimiters_to_dollars(&text.replace("</p>", "\n\n")))
        };
        Ok(Body::new(tidy(&text), self.options.markdown))
    }

    /// Replace `data:image/png;base64` sources with generated file names.
    fn inline_data_images(&mut self, question: &str, html: &str) -> Result<String> {
        let payloads: Vec<String> =
            extract_anchored(html, "<img src=\"data:image/png;ba", Delimiters::new("se64,", "\""))
                .into_iter()
                .map(str::to_string)
                .collect();

        let mut html = html.to_string();
        for payload in payloads {
            self.inline_images += 1;
            let name = format!(
                "img_{}_{}.png",
                Local::now().format("%Y%m%d%H%M%S"),
                self.inline_images
            );
            let name = if self.options.save_images {
                let encoded: String = payload.split_whitespace().collect();
                let bytes = STANDARD.decode(encoded).map_err(|e| QuizError::Asset {
                    path: name.clone(),
                    message: e.to_string(),
                })?;
                self.store(question, name, &bytes)?
            } else {
                tracing::warn!(question, file = %name, "embedded image was not saved");
                name
            };
            html = html.replace(
                &format!("<img src=\"data:image/png;base64,{payload}\""),
                &format!("<img src=\"{name}\""),
            );
        }
        Ok(html)
    }

    /// Turn every `<img>` tag into a `![](path)` reference.
    fn image_references(
        &mut self,
        question: &str,
        html: &str,
        local: &HashMap<String, String>,
    ) -> Result<String> {
        let tags: Vec<String> = extract_anchored(html, "", IMG_TAG)
            .into_iter()
            .map(str::to_string)
            .collect();

        let mut html = html.to_string();
        for tag in tags {
            let Some(src) = extract_anchored(&tag, "src=", QUOTES).first().map(|s| s.to_string())
            else {
                continue;
            };
            let path = self.local_path(question, &src, local)?;
            let width = extract_anchored(&tag, "width=", QUOTES)
                .first()
                .map(|w| w.to_string());
            html = html.replace(
                &format!("<img{tag}>"),
                &ImageRef::render(&path, width.as_deref()),
            );
        }
        Ok(html)
    }

    fn local_path(
        &mut self,
        question: &str,
        src: &str,
        local: &HashMap<String, String>,
    ) -> Result<String> {
        if is_remote(src) {
            if !self.options.download_images {
                return Ok(src.to_string());
            }
            let bytes = self.assets.fetch(src)?;
            let name = remote_file_name(src).unwrap_or_else(|| "image.png".to_string());
            return self.store(question, escape_file_name(&name), &bytes);
        }
        let decoded = percent_decode(src.strip_prefix(PLUGINFILE).unwrap_or(src));
        let base = decoded.split("?time").next().unwrap_or(&decoded);
        let name = escape_file_name(base);
        Ok(local.get(&name).cloned().unwrap_or(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::MemoryAssets;

    fn options(markdown: bool, save_images: bool) -> XmlOptions {
        XmlOptions {
            markdown,
            save_images,
            ..XmlOptions::default()
        }
    }

    #[test]
    fn plain_body_becomes_paragraphs() {
        let assets = MemoryAssets::new();
        let mut files = Attachments::new();
        let body = Body::new("Let $x$ be DOLLAR_SIGN5.\n\nNext", false);
        let html = body_to_html("q", &body, &mut files, &assets).unwrap();
        assert_eq!(html, "<p>Let \\(x\\) be $5.</p><p>Next<br></p>");
        assert!(files.files().is_empty());
    }

    #[test]
    fn images_become_attachments() {
        let assets = MemoryAssets::new().with_file("a b.png", b"png");
        let mut files = Attachments::new();
        let body = Body::new("![](a b.png){width=40} and ![](a b.png)", false);
        let html = body_to_html("q", &body, &mut files, &assets).unwrap();
        assert!(html.contains("src=\"@@PLUGINFILE@@/a%20b.png\""));
        assert!(html.contains("width=\"40\">"));
        assert_eq!(files.files().len(), 1);
        assert_eq!(files.files()[0].name, "a b.png");
        assert_eq!(files.files()[0].data, STANDARD.encode(b"png"));
    }

    #[test]
    fn colliding_server_names_are_stamped() {
        let assets = MemoryAssets::new()
            .with_file("a$.png", b"1")
            .with_file("aSsS.png", b"2");
        let mut files = Attachments::new();
        let first = files.attach("q", "a$.png", &assets).unwrap();
        let second = files.attach("q", "aSsS.png", &assets).unwrap();
        assert_eq!(first, "aSsS.png");
        assert_ne!(second, first);
        assert!(second.starts_with("aSsS_") && second.ends_with(".png"));
    }

    #[test]
    fn missing_image_is_an_asset_error() {
        let assets = MemoryAssets::new();
        let mut files = Attachments::new();
        let body = Body::new("![](gone.png)", false);
        assert!(matches!(
            body_to_html("q", &body, &mut files, &assets),
            Err(QuizError::Asset { .. })
        ));
    }

    #[test]
    fn plain_import_strips_paragraphs() {
        let options = options(false, false);
        let mut assets = MemoryAssets::new();
        let mut reader = BodyReader::new(&options, &mut assets).unwrap();
        let body = reader
            .read("q", "<p dir=\"ltr\">Let \\(x\\) &lt; 5 cost $3</p><p>Next<br /></p>", &[])
            .unwrap();
        assert_eq!(body.text, "Let $x$ < 5 cost DOLLAR_SIGN3\n\nNext");
        assert!(!body.markdown);
    }

    #[test]
    fn markdown_import_renders_emphasis() {
        let options = options(true, false);
        let mut assets = MemoryAssets::new();
        let mut reader = BodyReader::new(&options, &mut assets).unwrap();
        let body = reader
            .read("q", "<p><strong>Bold</strong> a_b</p><p>Two</p>", &[])
            .unwrap();
        assert_eq!(body.text, "**Bold** a_b\n\nTwo");
        assert!(body.markdown);
    }

    #[test]
    fn attachments_are_saved_and_referenced() {
        let options = options(false, true);
        let mut assets = MemoryAssets::new();
        let file = Attachment {
            name: "plot 1.png".into(),
            data: STANDARD.encode(b"img"),
        };
        let html = "<p><img src=\"@@PLUGINFILE@@/plot%201.png?time=123\" width=\"200\"></p>";
        let body = BodyReader::new(&options, &mut assets)
            .unwrap()
            .read("q", html, &[file])
            .unwrap();
        assert_eq!(body.text, "![](plot 1.png){width=200}");
        assert_eq!(assets.files.get("plot 1.png").map(Vec::as_slice), Some(&b"img"[..]));
    }

    #[test]
    fn existing_files_are_not_overwritten() {
        let options = options(false, true);
        let mut assets = MemoryAssets::new().with_file("p.png", b"old");
        let file = Attachment {
            name: "p.png".into(),
            data: STANDARD.encode(b"new"),
        };
        let body = BodyReader::new(&options, &mut assets)
            .unwrap()
            .read("q", "<img src=\"@@PLUGINFILE@@/p.png\">", &[file])
            .unwrap();
        assert_ne!(body.text, "![](p.png)");
        assert_eq!(assets.files["p.png"], b"old");
        assert_eq!(assets.files.len(), 2);
    }

    #[test]
    fn inline_data_images_get_file_names() {
        let options = options(false, true);
        let mut assets = MemoryAssets::new();
        let html = format!("<img src=\"data:image/png;base64,{}\">", STANDARD.encode(b"dot"));
        let body = BodyReader::new(&options, &mut assets)
            .unwrap()
            .read("q", &html, &[])
            .unwrap();
        assert!(body.text.starts_with("![](img_"), "{}", body.text);
        assert_eq!(assets.files.values().next().map(Vec::as_slice), Some(&b"dot"[..]));
    }

    #[test]
    fn remote_images_download_on_request() {
        let url = "https://example.org/media/chart%20a.png";
        let mut options = options(false, false);
        let mut assets = MemoryAssets::new().with_remote(url, b"chart");
        let html = format!("<img src=\"{url}\">");

        let kept = BodyReader::new(&options, &mut assets)
            .unwrap()
            .read("q", &html, &[])
            .unwrap();
        assert_eq!(kept.text, format!("![]({url})"));

        options.download_images = true;
        let fetched = BodyReader::new(&options, &mut assets)
            .unwrap()
            .read("q", &html, &[])
            .unwrap();
        assert_eq!(fetched.text, "![](chart a.png)");
        assert_eq!(assets.files["chart a.png"], b"chart");
    }

    #[test]
    fn inline_text_is_flattened() {
        assert_eq!(inline_from_html("<p>a \\(x\\)\n b<br></p>"), "a $x$  b");
        assert_eq!(inline_from_html(&inline_to_html("$y$ &amp; z")), "$y$ & z");
    }

    #[test]
    fn entities() {
        assert_eq!(decode_entities("&#65;&#x42;&amp;&unknown;"), "AB&&unknown;");
    }
}
