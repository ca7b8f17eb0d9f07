//! Arena-backed in-memory document and views.
//!
//! [`MemoryDocument`] is a small element/text tree that implements
//! [`DocumentSurface`] with the same splitting behavior as a DOM `Range`
//! extraction, so highlights can be placed headlessly (server-side
//! rendering, tests) exactly where the browser would place them. The list,
//! detail and popover types here are their plain-data counterparts.

use smol_str::SmolStr;

use crate::offset_map::{RawRange, TextFragment};
use crate::platform::{
    CreatePopover, DetailView, DocumentSurface, HIGHLIGHT_CLASS, HIGHLIGHT_ID_ATTR, HIGHLIGHT_TAG,
    HighlightMark, ListView, PULSE_CLASS, PlatformError,
};
use crate::types::AnnotationId;
use crate::views::{DetailContent, ListEntry, ListEntrySnapshot};

/// Handle to a node in a [`MemoryDocument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
enum NodeKind {
    Element {
        tag: SmolStr,
        attrs: Vec<(SmolStr, String)>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// An element/text tree rooted at a document container.
///
/// Detached nodes stay in the arena; they are simply unreachable from the
/// root.
#[derive(Debug, Clone)]
pub struct MemoryDocument {
    nodes: Vec<NodeData>,
    root: NodeId,
    revealed: Vec<NodeId>,
    selection_clears: usize,
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new("div")
    }
}

impl MemoryDocument {
    /// Create a document whose container element is `root_tag`.
    pub fn new(root_tag: &str) -> Self {
        Self {
            nodes: vec![NodeData {
                kind: NodeKind::Element {
                    tag: root_tag.into(),
                    attrs: Vec::new(),
                },
                parent: None,
                children: Vec::new(),
            }],
            root: NodeId(0),
            revealed: Vec::new(),
            selection_clears: 0,
        }
    }

    /// A container holding one text node per fragment.
    pub fn from_fragments<'a>(fragments: impl IntoIterator<Item = &'a str>) -> Self {
        let mut doc = Self::default();
        let root = doc.root();
        for fragment in fragments {
            doc.append_text(root, fragment);
        }
        doc
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    // === Building ===

    pub fn append_element(&mut self, parent: NodeId, tag: &str) -> NodeId {
        let id = self.alloc(NodeKind::Element {
            tag: tag.into(),
            attrs: Vec::new(),
        });
        self.append_child(parent, id);
        id
    }

    pub fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        let id = self.alloc(NodeKind::Text(text.to_string()));
        self.append_child(parent, id);
        id
    }

    /// Set an attribute on an element. No-op on text nodes.
    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        if let NodeKind::Element { attrs, .. } = &mut self.nodes[node.0].kind {
            match attrs.iter_mut().find(|(n, _)| n == name) {
                Some((_, v)) => *v = value.to_string(),
                None => attrs.push((name.into(), value.to_string())),
            }
        }
    }

    // === Inspection ===

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        match &self.nodes.get(node.0)?.kind {
            NodeKind::Element { attrs, .. } => attrs
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.as_str()),
            NodeKind::Text(_) => None,
        }
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.attribute(node, "class")
            .is_some_and(|c| c.split_ascii_whitespace().any(|c| c == class))
    }

    pub fn tag(&self, node: NodeId) -> Option<&str> {
        match &self.nodes.get(node.0)?.kind {
            NodeKind::Element { tag, .. } => Some(tag),
            NodeKind::Text(_) => None,
        }
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node.0)?.parent
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.nodes
            .get(node.0)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    /// Concatenated text of `node` and its descendants.
    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        for id in self.descendants(node) {
            if let NodeKind::Text(text) = &self.nodes[id.0].kind {
                out.push_str(text);
            }
        }
        out
    }

    /// Whether `node` is reachable from the root.
    pub fn is_attached(&self, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == self.root {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Simulate a click on `node`: the id of the innermost attached
    /// highlight containing it.
    pub fn activate(&self, node: NodeId) -> Option<AnnotationId> {
        if !self.is_attached(node) {
            return None;
        }
        std::iter::once(node)
            .chain(self.ancestors(node))
            .find(|&n| self.tag(n) == Some(HIGHLIGHT_TAG) && self.has_class(n, HIGHLIGHT_CLASS))
            .and_then(|n| self.attribute(n, HIGHLIGHT_ID_ATTR))
            .map(AnnotationId::from)
    }

    /// Spans revealed so far, oldest first.
    pub fn revealed(&self) -> &[NodeId] {
        &self.revealed
    }

    /// How many times the selection was cleared.
    pub fn selection_clears(&self) -> usize {
        self.selection_clears
    }

    /// Serialize the container's contents as HTML.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for &child in self.children(self.root) {
            self.write_html(child, &mut out);
        }
        out
    }

    fn write_html(&self, node: NodeId, out: &mut String) {
        match &self.nodes[node.0].kind {
            NodeKind::Text(text) => {
                for ch in text.chars() {
                    match ch {
                        '&' => out.push_str("&amp;"),
                        '<' => out.push_str("&lt;"),
                        '>' => out.push_str("&gt;"),
                        c => out.push(c),
                    }
                }
            }
            NodeKind::Element { tag, attrs } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attrs {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&value.replace('&', "&amp;").replace('"', "&quot;"));
                    out.push('"');
                }
                out.push('>');
                for &child in &self.nodes[node.0].children {
                    self.write_html(child, out);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }

    // === Tree plumbing ===

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        self.nodes.push(NodeData {
            kind,
            parent: None,
            children: Vec::new(),
        });
        NodeId(self.nodes.len() - 1)
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.insert(index, child);
    }

    fn index_in_parent(&self, node: NodeId) -> Option<(NodeId, usize)> {
        let parent = self.parent(node)?;
        let index = self.nodes[parent.0]
            .children
            .iter()
            .position(|&c| c == node)?;
        Some((parent, index))
    }

    /// Pre-order walk of `node`'s subtree, `node` included.
    fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.nodes[id.0].children.iter().rev().copied());
        }
        out
    }

    fn text_len(&self, node: NodeId) -> Option<usize> {
        match &self.nodes.get(node.0)?.kind {
            NodeKind::Text(text) => Some(text.chars().count()),
            NodeKind::Element { .. } => None,
        }
    }

    /// Split a text node at a char offset; the tail becomes a new next sibling.
    fn split_text(&mut self, node: NodeId, offset: usize) -> Result<NodeId, PlatformError> {
        let tail = match &mut self.nodes[node.0].kind {
            NodeKind::Text(text) => {
                let byte = text
                    .char_indices()
                    .nth(offset)
                    .map(|(b, _)| b)
                    .unwrap_or(text.len());
                text.split_off(byte)
            }
            NodeKind::Element { .. } => return Err("cannot split an element as text".into()),
        };
        let (parent, index) = self
            .index_in_parent(node)
            .ok_or("text node is detached")?;
        let new = self.alloc(NodeKind::Text(tail));
        self.insert_child(parent, index + 1, new);
        Ok(new)
    }

    /// Shallow copy of an element, detached.
    fn clone_element(&mut self, element: NodeId) -> NodeId {
        let kind = self.nodes[element.0].kind.clone();
        self.alloc(kind)
    }

    /// Move `from..` of `element`'s children into a shallow clone placed right after it.
    fn split_element(&mut self, element: NodeId, from: usize) -> Result<NodeId, PlatformError> {
        let (parent, index) = self
            .index_in_parent(element)
            .ok_or("element is detached")?;
        let clone = self.clone_element(element);
        let moved: Vec<NodeId> = self.nodes[element.0].children.drain(from..).collect();
        for child in moved {
            self.append_child(clone, child);
        }
        self.insert_child(parent, index + 1, clone);
        Ok(clone)
    }

    fn ancestors(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.parent(node);
        while let Some(id) = current {
            out.push(id);
            current = self.parent(id);
        }
        out
    }

    fn document_order(&self, node: NodeId) -> Option<usize> {
        self.descendants(self.root).iter().position(|&n| n == node)
    }
}

impl DocumentSurface for MemoryDocument {
    type Node = NodeId;

    fn text_fragments(&self) -> Vec<TextFragment<NodeId>> {
        self.descendants(self.root)
            .into_iter()
            .filter_map(|id| match &self.nodes[id.0].kind {
                NodeKind::Text(text) => Some(TextFragment::new(id, text.clone())),
                NodeKind::Element { .. } => None,
            })
            .collect()
    }

    fn highlight_spans(&self) -> Vec<(AnnotationId, NodeId)> {
        self.descendants(self.root)
            .into_iter()
            .filter(|&id| self.tag(id) == Some(HIGHLIGHT_TAG) && self.has_class(id, HIGHLIGHT_CLASS))
            .map(|id| {
                let span_id = self.attribute(id, HIGHLIGHT_ID_ATTR).unwrap_or_default();
                (AnnotationId::from(span_id), id)
            })
            .collect()
    }

    fn span_title(&self, span: &NodeId) -> Option<String> {
        self.attribute(*span, "title").map(str::to_string)
    }

    fn wrap_range(
        &mut self,
        range: &RawRange<NodeId>,
        mark: &HighlightMark,
    ) -> Result<NodeId, PlatformError> {
        let (start, end) = (&range.start, &range.end);
        for position in [start, end] {
            let len = self
                .text_len(position.node)
                .ok_or("range boundary is not a text node")?;
            if position.offset > len {
                return Err(format!("offset {} past end of text ({len})", position.offset).into());
            }
            if !self.is_attached(position.node) {
                return Err("range boundary is detached".into());
            }
        }

        let start_order = self.document_order(start.node);
        let end_order = self.document_order(end.node);
        if start_order > end_order || (start.node == end.node && start.offset > end.offset) {
            return Err("range end precedes its start".into());
        }

        // End first, so the start offset still refers to the original text.
        let end_len = self.text_len(end.node).unwrap_or(0);
        if end.offset < end_len {
            self.split_text(end.node, end.offset)?;
        }
        let first = if start.offset > 0 {
            self.split_text(start.node, start.offset)?
        } else {
            start.node
        };
        let last = if start.node == end.node {
            first
        } else {
            end.node
        };

        // Split partially covered ancestors until both ends hang off a
        // common ancestor.
        let last_ancestors = self.ancestors(last);
        let common = self
            .ancestors(first)
            .into_iter()
            .find(|a| last_ancestors.contains(a))
            .ok_or("range ends share no ancestor")?;

        let mut first = first;
        while let Some(parent) = self.parent(first).filter(|&p| p != common) {
            let (_, index) = self.index_in_parent(first).ok_or("node is detached")?;
            first = if index == 0 {
                parent
            } else {
                self.split_element(parent, index)?
            };
        }
        let mut last = last;
        while let Some(parent) = self.parent(last).filter(|&p| p != common) {
            let (_, index) = self.index_in_parent(last).ok_or("node is detached")?;
            if index + 1 < self.nodes[parent.0].children.len() {
                self.split_element(parent, index + 1)?;
            }
            last = parent;
        }

        let (_, first_index) = self.index_in_parent(first).ok_or("node is detached")?;
        let (_, last_index) = self.index_in_parent(last).ok_or("node is detached")?;

        let span = self.alloc(NodeKind::Element {
            tag: HIGHLIGHT_TAG.into(),
            attrs: Vec::new(),
        });
        self.set_attribute(span, "class", HIGHLIGHT_CLASS);
        self.set_attribute(span, HIGHLIGHT_ID_ATTR, mark.id.as_str());
        self.set_attribute(span, "style", &mark.style());
        if !mark.title.is_empty() {
            self.set_attribute(span, "title", &mark.title);
        }

        let moved: Vec<NodeId> = self.nodes[common.0]
            .children
            .drain(first_index..=last_index)
            .collect();
        for child in moved {
            self.append_child(span, child);
        }
        self.insert_child(common, first_index, span);

        Ok(span)
    }

    fn unwrap_span(&mut self, span: &NodeId) -> Result<(), PlatformError> {
        let (parent, index) = self
            .index_in_parent(*span)
            .ok_or("highlight span is detached")?;
        let children = std::mem::take(&mut self.nodes[span.0].children);
        self.nodes[parent.0].children.remove(index);
        self.nodes[span.0].parent = None;
        for (offset, child) in children.into_iter().enumerate() {
            self.insert_child(parent, index + offset, child);
        }
        Ok(())
    }

    fn reveal(&mut self, span: &NodeId) {
        let class = match self.attribute(*span, "class") {
            Some(class) if !self.has_class(*span, PULSE_CLASS) => format!("{class} {PULSE_CLASS}"),
            Some(class) => class.to_string(),
            None => PULSE_CLASS.to_string(),
        };
        self.set_attribute(*span, "class", &class);
        self.revealed.push(*span);
    }

    fn clear_selection(&mut self) {
        self.selection_clears += 1;
    }
}

/// Sidebar list kept as plain entries, newest first.
#[derive(Debug, Clone, Default)]
pub struct MemoryList {
    entries: Vec<ListEntry>,
}

impl MemoryList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[ListEntry] {
        &self.entries
    }

    /// Rewrite an entry's note in place, as a later edit would.
    pub fn set_note(&mut self, id: &AnnotationId, note: Option<String>) {
        if let Some(entry) = self.entries.iter_mut().find(|e| &e.id == id) {
            entry.note = note;
        }
    }
}

impl ListView for MemoryList {
    fn contains(&self, id: &AnnotationId) -> bool {
        self.entries.iter().any(|e| &e.id == id)
    }

    fn prepend(&mut self, entry: &ListEntry) -> Result<(), PlatformError> {
        self.entries.insert(0, entry.clone());
        Ok(())
    }

    fn remove(&mut self, id: &AnnotationId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| &e.id != id);
        self.entries.len() != before
    }

    fn snapshot(&self, id: &AnnotationId) -> Option<ListEntrySnapshot> {
        self.entries
            .iter()
            .find(|e| &e.id == id)
            .map(ListEntry::snapshot)
    }
}

/// Detail popup state.
#[derive(Debug, Clone, Default)]
pub struct MemoryDetail {
    shown: Option<DetailContent>,
}

impl MemoryDetail {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content(&self) -> Option<&DetailContent> {
        self.shown.as_ref()
    }
}

impl DetailView for MemoryDetail {
    fn show(&mut self, content: &DetailContent) {
        self.shown = Some(content.clone());
    }

    fn hide(&mut self) {
        self.shown = None;
    }

    fn shown_id(&self) -> Option<AnnotationId> {
        self.shown.as_ref().map(|c| c.id.clone())
    }
}

/// Create popover state.
#[derive(Debug, Clone, Default)]
pub struct MemoryPopover {
    open: bool,
    note: String,
    affordance_enabled: bool,
}

impl MemoryPopover {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn affordance_enabled(&self) -> bool {
        self.affordance_enabled
    }

    /// Type into the note field.
    pub fn type_note(&mut self, note: &str) {
        self.note = note.to_string();
    }
}

impl CreatePopover for MemoryPopover {
    fn open(&mut self) {
        self.open = true;
        self.note.clear();
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn note(&self) -> String {
        self.note.clone()
    }

    fn set_affordance_enabled(&mut self, enabled: bool) {
        self.affordance_enabled = enabled;
    }
}
