//! Per-tag rendering rules

use super::options::{ConverterOptions, HeadingStyle};
use super::tree::{HtmlTree, NodeId};

/// Every tag the converter knows how to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagHandler {
    Link,
    Strong,
    Emphasis,
    Strikethrough,
    Code,
    Subscript,
    Superscript,
    BlockQuote,
    LineBreak,
    Heading(usize),
    Rule,
    Image,
    List,
    ListItem,
    Span,
    Paragraph,
    Preformatted,
    Table,
    Cell,
    Row,
}

impl TagHandler {
    pub const TAGS: &'static [(&'static str, TagHandler)] = &[
        ("a", TagHandler::Link),
        ("b", TagHandler::Strong),
        ("strong", TagHandler::Strong),
        ("em", TagHandler::Emphasis),
        ("i", TagHandler::Emphasis),
        ("del", TagHandler::Strikethrough),
        ("s", TagHandler::Strikethrough),
        ("code", TagHandler::Code),
        ("kbd", TagHandler::Code),
        ("samp", TagHandler::Code),
        ("sub", TagHandler::Subscript),
        ("sup", TagHandler::Superscript),
        ("blockquote", TagHandler::BlockQuote),
        ("br", TagHandler::LineBreak),
        ("h1", TagHandler::Heading(1)),
        ("h2", TagHandler::Heading(2)),
        ("h3", TagHandler::Heading(3)),
        ("h4", TagHandler::Heading(4)),
        ("h5", TagHandler::Heading(5)),
        ("h6", TagHandler::Heading(6)),
        ("hr", TagHandler::Rule),
        ("img", TagHandler::Image),
        ("ul", TagHandler::List),
        ("ol", TagHandler::List),
        ("li", TagHandler::ListItem),
        ("span", TagHandler::Span),
        ("p", TagHandler::Paragraph),
        ("pre", TagHandler::Preformatted),
        ("table", TagHandler::Table),
        ("td", TagHandler::Cell),
        ("th", TagHandler::Cell),
        ("tr", TagHandler::Row),
    ];

    pub fn render(
        self,
        options: &ConverterOptions,
        tree: &HtmlTree,
        id: NodeId,
        text: String,
        inline: bool,
    ) -> String {
        match self {
            TagHandler::Link => link(options, tree, id, &text, inline),
            TagHandler::Strong => {
                let symbol = options.strong_em_symbol.to_string().repeat(2);
                wrap(&text, &symbol, &symbol)
            }
            TagHandler::Emphasis => {
                let symbol = options.strong_em_symbol.to_string();
                wrap(&text, &symbol, &symbol)
            }
            TagHandler::Strikethrough => wrap(&text, "~~", "~~"),
            TagHandler::Code => {
                if tree.parent_name(id) == Some("pre") {
                    text
                } else {
                    wrap(&text, "`", "`")
                }
            }
            TagHandler::Subscript => wrap(&text, "<sub>", "</sub>"),
            TagHandler::Superscript => wrap(&text, "<sup>", "</sup>"),
            TagHandler::BlockQuote => {
                if inline || text.is_empty() {
                    text
                } else {
                    format!("\n{}\n\n", prefix_lines(&text, "> "))
                }
            }
            TagHandler::LineBreak => {
                if in_cell(tree, id) {
                    "<br>".to_string()
                } else {
                    "\n\n".to_string()
                }
            }
            TagHandler::Heading(level) => heading(options, level, text, inline),
            TagHandler::Rule => {
                if in_cell(tree, id) {
                    "<hr>".to_string()
                } else {
                    "\n\n---\n\n".to_string()
                }
            }
            TagHandler::Image => image(tree, id, inline),
            TagHandler::List => list(tree, id, text, inline),
            TagHandler::ListItem => list_item(options, tree, id, &text),
            TagHandler::Span => {
                if text.is_empty() {
                    text
                } else {
                    format!(" {text} ")
                }
            }
            TagHandler::Paragraph => {
                if inline || text.is_empty() {
                    text
                } else if in_cell(tree, id) {
                    format!("{text}<br>")
                } else {
                    format!("{text}\n\n")
                }
            }
            TagHandler::Preformatted => {
                if text.is_empty() {
                    text
                } else {
                    format!("\n```\n{text}\n```\n")
                }
            }
            TagHandler::Table => {
                if inline {
                    text
                } else {
                    format!("\n\n{text}\n")
                }
            }
            TagHandler::Cell => format!("{}|", text.replace('\n', " ")),
            TagHandler::Row => row(tree, id, &text),
        }
    }
}

/// Split a single leading and trailing space off `text` and trim the rest.
pub(crate) fn chomp(text: &str) -> (&'static str, &'static str, &str) {
    let prefix = if text.starts_with(' ') { " " } else { "" };
    let suffix = if text.ends_with(' ') { " " } else { "" };
    (prefix, suffix, text.trim())
}

fn wrap(text: &str, open: &str, close: &str) -> String {
    let (prefix, suffix, inner) = chomp(text);
    if inner.is_empty() {
        return String::new();
    }
    format!("{prefix}{open}{inner}{close}{suffix}")
}

/// Put `prefix` at the start of every line, including an empty last line.
pub(crate) fn prefix_lines(text: &str, prefix: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    format!("{prefix}{}", text.replace('\n', &format!("\n{prefix}")))
}

fn in_cell(tree: &HtmlTree, id: NodeId) -> bool {
    tree.has_ancestor(id, &["td", "th"])
}

fn quoted_title(title: &str) -> String {
    if title.is_empty() {
        String::new()
    } else {
        format!(" \"{}\"", title.replace('"', "\\\""))
    }
}

fn link(options: &ConverterOptions, tree: &HtmlTree, id: NodeId, text: &str, inline: bool) -> String {
    let (prefix, suffix, text) = chomp(text);
    if text.is_empty() {
        return String::new();
    }
    if inline {
        return text.to_string();
    }
    let href = tree.attr(id, "href").unwrap_or("");
    let mut title = tree.attr(id, "title").unwrap_or("").to_string();
    if options.autolinks
        && !href.is_empty()
        && text.replace("\\_", "_") == href
        && title.is_empty()
        && !options.default_title
    {
        return format!("<{href}>");
    }
    if options.default_title && title.is_empty() {
        title = href.to_string();
    }
    if href.is_empty() {
        return text.to_string();
    }
    format!("{prefix}[{text}]({href}{}){suffix}", quoted_title(&title))
}

fn heading(options: &ConverterOptions, level: usize, text: String, inline: bool) -> String {
    if inline {
        return text;
    }
    let text = text.trim_end();
    match options.heading_style {
        HeadingStyle::Underlined if level <= 2 => {
            if text.is_empty() {
                return String::new();
            }
            let pad = if level == 1 { "=" } else { "-" };
            format!("{text}\n{}\n\n", pad.repeat(text.chars().count()))
        }
        HeadingStyle::AtxClosed => {
            let hashes = "#".repeat(level);
            format!("{hashes} {text} {hashes}\n\n")
        }
        _ => format!("{} {text}\n\n", "#".repeat(level)),
    }
}

fn image(tree: &HtmlTree, id: NodeId, inline: bool) -> String {
    let alt = tree.attr(id, "alt").unwrap_or("");
    if inline {
        return alt.to_string();
    }
    let src = tree.attr(id, "src").unwrap_or("");
    let title = tree.attr(id, "title").unwrap_or("");
    format!("![{alt}]({src}{})", quoted_title(title))
}

fn is_list(tree: &HtmlTree, id: NodeId) -> bool {
    matches!(tree.name(id), Some("ul") | Some("ol"))
}

fn list(tree: &HtmlTree, id: NodeId, text: String, inline: bool) -> String {
    if inline {
        return text;
    }
    let nested = tree.has_ancestor(id, &["li"]);
    if nested {
        return format!("\n{}", prefix_lines(&text, "\t").trim_end());
    }
    let before_paragraph = tree
        .next_sibling(id)
        .is_some_and(|next| !is_list(tree, next));
    if before_paragraph {
        format!("{text}\n")
    } else {
        text
    }
}

fn list_item(options: &ConverterOptions, tree: &HtmlTree, id: NodeId, text: &str) -> String {
    let parent = tree.parent(id);
    let bullet = match parent {
        Some(ol) if tree.name(ol) == Some("ol") => {
            let start = tree
                .attr(ol, "start")
                .and_then(|s| s.trim().parse::<i64>().ok())
                .unwrap_or(1);
            format!("{}.", start + tree.index_in_parent(id) as i64)
        }
        _ => {
            let depth = std::iter::once(id)
                .chain(tree.ancestors(id))
                .filter(|&n| tree.name(n) == Some("ul"))
                .count()
                .saturating_sub(1);
            let palette: Vec<char> = options.bullets.chars().collect();
            palette
                .get(depth % palette.len().max(1))
                .copied()
                .unwrap_or('*')
                .to_string()
        }
    };
    format!("{bullet} {text}\n")
}

fn row(tree: &HtmlTree, id: NodeId, text: &str) -> String {
    let cells: Vec<NodeId> = tree
        .children(id)
        .iter()
        .copied()
        .filter(|&c| matches!(tree.name(c), Some("td") | Some("th")))
        .collect();
    let header_row = cells.iter().all(|&c| tree.name(c) == Some("th"));
    let first_row = tree.previous_sibling(id).is_none();

    let separator = format!("|{}\n", "---|".repeat(cells.len()));
    let mut out = String::new();
    if header_row && first_row {
        out.push('|');
        out.push_str(text);
        out.push('\n');
        out.push_str(&separator);
        return out;
    }
    if first_row && !table_has_head(tree, id) {
        out.push('|');
        out.push_str(&" |".repeat(cells.len()));
        out.push('\n');
        out.push_str(&separator);
    }
    out.push('|');
    out.push_str(text);
    out.push('\n');
    out
}

fn table_has_head(tree: &HtmlTree, row: NodeId) -> bool {
    tree.ancestors(row)
        .find(|&a| tree.name(a) == Some("table"))
        .is_some_and(|table| {
            tree.descendants(table)
                .into_iter()
                .any(|d| tree.name(d) == Some("thead"))
        })
}
