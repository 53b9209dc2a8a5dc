//! Moodle XML quiz export
//!
//! Each question is a `<question type="...">` element under `<quiz>`. Bodies
//! are stored as HTML in CDATA with `\(...\)` math; images are base64
//! `<file>` children referenced through `@@PLUGINFILE@@/`.
//!
//! | quiz model                       | XML                                      |
//! |----------------------------------|------------------------------------------|
//! | category path `A/B`              | `<category><text>$course$/A/B</text>`    |
//! | category body                    | `<info format="html">`                   |
//! | question body                    | `<questiontext format="html">`           |
//! | multichoice `single` / `shuffle` | `<single>` / `<shuffleanswers>` (words)  |
//! | calculated variables             | `<dataset_definitions>`                  |
//! | gap markers `[[1@cat]]`          | `[[n]]` plus `<selectoption>`/`<dragbox>` |
//! | drag items and zones             | `<drag>` / `<drop>`                      |
//!
//! Decoding writes attachments through the [`AssetStore`] only when
//! [`XmlOptions::save_images`] is set, and fetches remote images only when
//! [`XmlOptions::download_images`] is set.

mod body;
mod parser;
mod serializer;

use crate::assets::AssetStore;
use crate::error::Result;
use crate::format::Format;
use crate::html_to_markdown::ConverterOptions;
use crate::quiz::Quiz;

pub use body::{decode_entities, Attachment, PLUGINFILE};
pub use parser::parse_xml;
pub use serializer::serialize_xml;

/// Prefix of every category path in the XML.
pub const COURSE_PREFIX: &str = "$course$/";

/// Decoding switches.
#[derive(Debug, Clone)]
pub struct XmlOptions {
    /// Convert bodies to Markdown and mark them `MARKDOWN`; otherwise keep
    /// them as plain paragraphs.
    pub markdown: bool,
    pub save_images: bool,
    pub download_images: bool,
    /// Widen dataset ranges that do not cover their stored values.
    pub repair_ranges: bool,
    pub converter: ConverterOptions,
}

impl Default for XmlOptions {
    fn default() -> Self {
        XmlOptions {
            markdown: true,
            save_images: false,
            download_images: false,
            repair_ranges: false,
            converter: ConverterOptions::default(),
        }
    }
}

/// Format implementation for Moodle XML
#[derive(Debug, Clone, Default)]
pub struct XmlFormat {
    options: XmlOptions,
}

impl XmlFormat {
    pub fn new(options: XmlOptions) -> Self {
        XmlFormat { options }
    }

    pub fn options(&self) -> &XmlOptions {
        &self.options
    }
}

impl Format for XmlFormat {
    fn name(&self) -> &str {
        "xml"
    }

    fn description(&self) -> &str {
        "Moodle XML question export"
    }

    fn file_extensions(&self) -> &[&str] {
        &["xml"]
    }

    fn parse(&self, source: &str, assets: &mut dyn AssetStore) -> Result<Quiz> {
        parse_xml(source, &self.options, assets)
    }

    fn serialize(&self, quiz: &Quiz, assets: &mut dyn AssetStore) -> Result<String> {
        serialize_xml(quiz, &*assets)
    }
}
