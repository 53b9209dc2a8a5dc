//! HTML to Markdown rendering
//!
//! A depth-first walk over an [`HtmlTree`]: every node's children are
//! converted first, then the handler registered for the node's tag rewrites
//! the concatenated child text. Tags without a handler pass their children's
//! text through unchanged.
//!
//! Handlers are looked up in a table built once per converter from
//! [`TagHandler::TAGS`], filtered by the strip/convert lists in
//! [`ConverterOptions`].
//!
//! Two pieces of context flow down the walk:
//!
//! - `inline`: forced on below headings. Block handlers (headings, lists,
//!   paragraphs, block quotes, tables) return their child text untouched
//!   when it is set.
//! - the parent chain, which handlers consult for table cells, list depth
//!   and `pre` blocks.
//!
//! Output covers the subset of Markdown that quiz bodies need; it is not a
//! general purpose HTML renderer.

mod handlers;
mod options;
mod tree;

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::Result;

pub use handlers::TagHandler;
pub use options::{ConverterOptions, HeadingStyle};
pub use tree::{HtmlNode, HtmlTree, NodeId, NodeKind};

/// Stand-in for underscores already present in the source HTML.
pub const UNDERSCORE_SENTINEL: &str = "UNDERSCORECHAR";

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\t ]+").expect("valid regex"));

pub struct MarkdownConverter {
    options: ConverterOptions,
    handlers: HashMap<&'static str, TagHandler>,
}

impl MarkdownConverter {
    pub fn new(options: ConverterOptions) -> Result<Self> {
        options.validate()?;
        let handlers = TagHandler::TAGS
            .iter()
            .filter(|(tag, _)| options.allows(tag))
            .map(|(tag, handler)| (*tag, *handler))
            .collect();
        Ok(Self { options, handlers })
    }

    pub fn options(&self) -> &ConverterOptions {
        &self.options
    }

    /// Parse `html` and convert its body.
    pub fn convert(&self, html: &str) -> String {
        self.convert_tree(&HtmlTree::parse(html))
    }

    /// Like [`convert`](Self::convert), but underscores in `html` stay literal
    /// instead of being escaped.
    pub fn convert_literal(&self, html: &str) -> String {
        self.convert(&html.replace('_', UNDERSCORE_SENTINEL))
            .replace(UNDERSCORE_SENTINEL, "_")
    }

    /// Convert an already parsed body.
    pub fn convert_tree(&self, tree: &HtmlTree) -> String {
        self.process_node(tree, HtmlTree::ROOT, false, true)
    }

    fn process_node(&self, tree: &HtmlTree, id: NodeId, inline: bool, children_only: bool) -> String {
        let is_heading = tree.name(id).is_some_and(is_heading_tag);
        let children_inline = inline || (!children_only && is_heading);

        let mut text = String::new();
        for &child in tree.children(id) {
            match &tree.node(child).kind {
                NodeKind::Text(contents) => text.push_str(&self.process_text(tree, child, contents)),
                NodeKind::Element { .. } => {
                    text.push_str(&self.process_node(tree, child, children_inline, false))
                }
            }
        }

        if children_only {
            return text;
        }
        match tree.name(id).and_then(|name| self.handlers.get(name)) {
            Some(handler) => handler.render(&self.options, tree, id, text, inline),
            None => text,
        }
    }

    fn process_text(&self, tree: &HtmlTree, id: NodeId, contents: &str) -> String {
        let parent = tree.parent_name(id);
        let grandparent = tree.parent(id).and_then(|p| tree.parent_name(p));
        let preformatted = parent == Some("pre") || (parent == Some("code") && grandparent == Some("pre"));

        let mut text = if preformatted {
            contents.to_string()
        } else {
            WHITESPACE_RUN.replace_all(contents, " ").into_owned()
        };
        if parent != Some("code") {
            text = text.replace('_', "\\_");
        }
        if parent == Some("li") {
            let last_or_before_list = match tree.next_sibling(id) {
                None => true,
                Some(next) => matches!(tree.name(next), Some("ul") | Some("ol")),
            };
            if last_or_before_list {
                text.truncate(text.trim_end().len());
            }
        }
        text
    }
}

fn is_heading_tag(name: &str) -> bool {
    let bytes = name.as_bytes();
    bytes.len() == 2 && bytes[0] == b'h' && (b'1'..=b'6').contains(&bytes[1])
}

/// Convert `html`, keeping any underscore written in the source literal.
pub fn markdownify(html: &str, options: ConverterOptions) -> Result<String> {
    Ok(MarkdownConverter::new(options)?.convert_literal(html))
}
