//! Owned, index-addressed view of a parsed HTML body
//!
//! The converter needs parent and sibling lookups in both directions, which
//! `markup5ever_rcdom` only offers through weak references. The DOM is copied
//! once into a flat arena; comments, doctypes and processing instructions are
//! dropped during the copy.

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom};

pub type NodeId = usize;

/// Tags whose whitespace-only text children are layout noise.
pub(crate) const STRUCTURAL_TAGS: &[&str] = &[
    "ol", "ul", "li", "table", "thead", "tbody", "tfoot", "tr", "td", "th",
];

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Element {
        name: String,
        attrs: Vec<(String, String)>,
    },
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct HtmlNode {
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub kind: NodeKind,
}

/// A parsed HTML body. Node `0` is the `body` element.
#[derive(Debug, Clone, PartialEq)]
pub struct HtmlTree {
    nodes: Vec<HtmlNode>,
}

impl HtmlTree {
    pub const ROOT: NodeId = 0;

    /// Parse an HTML document or fragment with html5ever.
    pub fn parse(html: &str) -> Self {
        let dom = parse_document(RcDom::default(), Default::default()).one(html);
        Self::from_dom(&dom)
    }

    /// Copy the `body` of an already parsed DOM.
    pub fn from_dom(dom: &RcDom) -> Self {
        let mut tree = HtmlTree {
            nodes: vec![HtmlNode {
                parent: None,
                children: Vec::new(),
                kind: NodeKind::Element {
                    name: "body".to_string(),
                    attrs: Vec::new(),
                },
            }],
        };
        if let Some(body) = find_element(&dom.document, "body") {
            for child in body.children.borrow().iter() {
                tree.append(Self::ROOT, child);
            }
        }
        tree.prune_structural_whitespace();
        tree
    }

    fn append(&mut self, parent: NodeId, handle: &Handle) {
        let kind = match &handle.data {
            NodeData::Element { name, attrs, .. } => NodeKind::Element {
                name: name.local.to_string(),
                attrs: attrs
                    .borrow()
                    .iter()
                    .map(|attr| (attr.name.local.to_string(), attr.value.to_string()))
                    .collect(),
            },
            NodeData::Text { contents } => NodeKind::Text(contents.borrow().to_string()),
            _ => return,
        };
        let id = self.nodes.len();
        self.nodes.push(HtmlNode {
            parent: Some(parent),
            children: Vec::new(),
            kind,
        });
        self.nodes[parent].children.push(id);

        if matches!(handle.data, NodeData::Element { .. }) {
            for child in handle.children.borrow().iter() {
                self.append(id, child);
            }
        }
    }

    /// Drop whitespace-only text directly inside list and table containers
    /// when it sits first, last, or next to another structural container.
    fn prune_structural_whitespace(&mut self) {
        for id in 0..self.nodes.len() {
            if !self.is_structural(id) {
                continue;
            }
            let original = std::mem::take(&mut self.nodes[id].children);
            let mut kept: Vec<NodeId> = Vec::with_capacity(original.len());
            for (index, &child) in original.iter().enumerate() {
                let blank = matches!(&self.nodes[child].kind, NodeKind::Text(t) if t.trim().is_empty());
                if blank {
                    let previous = kept.last().copied();
                    let next = original.get(index + 1).copied();
                    let at_boundary = previous.is_none()
                        || next.is_none()
                        || previous.is_some_and(|p| self.is_structural(p))
                        || next.is_some_and(|n| self.is_structural(n));
                    if at_boundary {
                        continue;
                    }
                }
                kept.push(child);
            }
            self.nodes[id].children = kept;
        }
    }

    fn is_structural(&self, id: NodeId) -> bool {
        self.name(id)
            .is_some_and(|name| STRUCTURAL_TAGS.contains(&name))
    }

    pub fn node(&self, id: NodeId) -> &HtmlNode {
        &self.nodes[id]
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id].children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].parent
    }

    /// Tag name of an element, `None` for text.
    pub fn name(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id].kind {
            NodeKind::Element { name, .. } => Some(name.as_str()),
            NodeKind::Text(_) => None,
        }
    }

    pub fn parent_name(&self, id: NodeId) -> Option<&str> {
        self.parent(id).and_then(|p| self.name(p))
    }

    pub fn attr(&self, id: NodeId, key: &str) -> Option<&str> {
        match &self.nodes[id].kind {
            NodeKind::Element { attrs, .. } => attrs
                .iter()
                .find(|(name, _)| name == key)
                .map(|(_, value)| value.as_str()),
            NodeKind::Text(_) => None,
        }
    }

    /// Position of `id` among its parent's children.
    pub fn index_in_parent(&self, id: NodeId) -> usize {
        self.parent(id)
            .and_then(|p| self.children(p).iter().position(|&c| c == id))
            .unwrap_or(0)
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id);
        index
            .checked_sub(1)
            .and_then(|i| self.children(parent).get(i).copied())
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        self.children(parent)
            .get(self.index_in_parent(id) + 1)
            .copied()
    }

    /// Strict ancestors, nearest first.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&p| self.parent(p))
    }

    pub fn has_ancestor(&self, id: NodeId, names: &[&str]) -> bool {
        self.ancestors(id)
            .any(|a| self.name(a).is_some_and(|n| names.contains(&n)))
    }

    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev());
        }
        out
    }
}

fn find_element(handle: &Handle, tag: &str) -> Option<Handle> {
    if let NodeData::Element { name, .. } = &handle.data {
        if name.local.as_ref() == tag {
            return Some(handle.clone());
        }
    }
    handle
        .children
        .borrow()
        .iter()
        .find_map(|child| find_element(child, tag))
}
