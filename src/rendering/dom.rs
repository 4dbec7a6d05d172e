//! A tiny arena-backed DOM used to build gallery cards.
//!
//! Nodes live in a `Document` and are addressed by `NodeId`. Elements carry
//! ordered attributes, an optional inline `display` value and a list of event
//! listeners. Listeners receive `&mut Document`, so a handler registered on one
//! node can freely restyle any other node it captured the id of.

use std::sync::Arc;

/// Handle to a node inside a `Document`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Inline `display` values the renderer needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Display {
    Block,
    None,
}

impl Display {
    pub fn as_css(&self) -> &'static str {
        match self {
            Display::Block => "block",
            Display::None => "none",
        }
    }
}

/// Pointer events a node can listen for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    PointerEnter,
    PointerLeave,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::PointerEnter => "pointerenter",
            EventKind::PointerLeave => "pointerleave",
        }
    }
}

type Listener = Arc<dyn Fn(&mut Document, NodeId) + Send + Sync>;

/// Element payload: tag, attributes in insertion order, inline display
#[derive(Debug, Clone, PartialEq)]
struct Element {
    tag: String,
    attrs: Vec<(String, String)>,
    display: Option<Display>,
}

#[derive(Debug, Clone, PartialEq)]
enum NodeKind {
    Element(Element),
    Text(String),
}

struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    listeners: Vec<(EventKind, Listener)>,
}

// Elements serialized without a closing tag
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

// Elements whose text children are serialized without escaping
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Owner of every node created while rendering
#[derive(Default)]
pub struct Document {
    nodes: Vec<NodeData>,
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document").field("nodes", &self.nodes.len()).finish()
    }
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            kind,
            parent: None,
            children: Vec::new(),
            listeners: Vec::new(),
        });
        id
    }

    /// Create a detached element with the given tag name
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeKind::Element(Element {
            tag: tag.to_ascii_lowercase(),
            attrs: Vec::new(),
            display: None,
        }))
    }

    /// Create a detached text node. The text is stored as-is and only escaped
    /// when serialized.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeKind::Text(text.to_string()))
    }

    /// Append `child` as the last child of `parent`, detaching it from any
    /// previous parent first. Appending a node to itself or to one of its
    /// own descendants is refused and leaves the tree unchanged.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if self.is_inclusive_ancestor(child, parent) {
            log::warn!("refusing to append {:?} under its descendant {:?}", child, parent);
            return;
        }
        if let Some(old) = self.nodes[child.0].parent.take() {
            self.nodes[old.0].children.retain(|c| *c != child);
        }
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cur = Some(node);
        while let Some(id) = cur {
            if id == ancestor {
                return true;
            }
            cur = self.parent(id);
        }
        false
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.0].children
    }

    fn element(&self, node: NodeId) -> Option<&Element> {
        match &self.nodes[node.0].kind {
            NodeKind::Element(el) => Some(el),
            NodeKind::Text(_) => None,
        }
    }

    fn element_mut(&mut self, node: NodeId) -> Option<&mut Element> {
        match &mut self.nodes[node.0].kind {
            NodeKind::Element(el) => Some(el),
            NodeKind::Text(_) => None,
        }
    }

    /// Tag name of an element, `None` for text nodes
    pub fn tag(&self, node: NodeId) -> Option<&str> {
        self.element(node).map(|el| el.tag.as_str())
    }

    /// Set (or replace) an attribute. Ignored on text nodes.
    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        if let Some(el) = self.element_mut(node) {
            match el.attrs.iter_mut().find(|(k, _)| k == name) {
                Some((_, v)) => *v = value.to_string(),
                None => el.attrs.push((name.to_string(), value.to_string())),
            }
        }
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.element(node)?
            .attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.attribute(node, "class")
            .map(|c| c.split_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    pub fn set_display(&mut self, node: NodeId, display: Option<Display>) {
        if let Some(el) = self.element_mut(node) {
            el.display = display;
        }
    }

    pub fn display(&self, node: NodeId) -> Option<Display> {
        self.element(node).and_then(|el| el.display)
    }

    /// Whether the node takes part in layout: false when the node or any of
    /// its ancestors is `display: none`.
    pub fn is_displayed(&self, node: NodeId) -> bool {
        let mut cur = Some(node);
        while let Some(id) = cur {
            if self.display(id) == Some(Display::None) {
                return false;
            }
            cur = self.parent(id);
        }
        true
    }

    /// Register a listener for `kind` on `node`. Listeners run in
    /// registration order.
    pub fn add_event_listener<F>(&mut self, node: NodeId, kind: EventKind, listener: F)
    where
        F: Fn(&mut Document, NodeId) + Send + Sync + 'static,
    {
        self.nodes[node.0].listeners.push((kind, Arc::new(listener)));
    }

    pub fn listener_count(&self, node: NodeId, kind: EventKind) -> usize {
        self.nodes[node.0]
            .listeners
            .iter()
            .filter(|(k, _)| *k == kind)
            .count()
    }

    /// Fire `kind` at `node`. Pointer enter/leave do not bubble, so only the
    /// target's own listeners run.
    pub fn dispatch(&mut self, node: NodeId, kind: EventKind) {
        let listeners: Vec<Listener> = self.nodes[node.0]
            .listeners
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, l)| l.clone())
            .collect();
        log::trace!("dispatch {} to {:?} ({} listeners)", kind.as_str(), node, listeners.len());
        for listener in listeners {
            listener(self, node);
        }
    }

    /// Concatenated text of the node and all of its descendants
    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(node, &mut out);
        out
    }

    fn collect_text(&self, node: NodeId, out: &mut String) {
        match &self.nodes[node.0].kind {
            NodeKind::Text(t) => out.push_str(t),
            NodeKind::Element(_) => {
                for child in &self.nodes[node.0].children {
                    self.collect_text(*child, out);
                }
            }
        }
    }

    /// All elements under `root` (inclusive) carrying `class`, in document order
    pub fn find_by_class(&self, root: NodeId, class: &str) -> Vec<NodeId> {
        self.descendants(root)
            .into_iter()
            .filter(|n| self.has_class(*n, class))
            .collect()
    }

    /// All elements under `root` (inclusive) with tag `tag`, in document order
    pub fn find_by_tag(&self, root: NodeId, tag: &str) -> Vec<NodeId> {
        self.descendants(root)
            .into_iter()
            .filter(|n| self.tag(*n) == Some(tag))
            .collect()
    }

    fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            out.push(node);
            for child in self.children(node).iter().rev() {
                stack.push(*child);
            }
        }
        out
    }

    /// Serialize the subtree rooted at `node` to HTML
    pub fn to_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_html(node, &mut out);
        out
    }

    fn write_html(&self, node: NodeId, out: &mut String) {
        match &self.nodes[node.0].kind {
            NodeKind::Text(t) => out.push_str(&escape_text(t)),
            NodeKind::Element(el) => {
                out.push('<');
                out.push_str(&el.tag);
                for (k, v) in &el.attrs {
                    out.push_str(&format!(" {}=\"{}\"", k, escape_attr(v)));
                }
                if let Some(display) = el.display {
                    out.push_str(&format!(" style=\"display: {}\"", display.as_css()));
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&el.tag.as_str()) {
                    return;
                }
                let raw = RAW_TEXT_ELEMENTS.contains(&el.tag.as_str());
                for child in &self.nodes[node.0].children {
                    match &self.nodes[child.0].kind {
                        NodeKind::Text(t) if raw => out.push_str(t),
                        _ => self.write_html(*child, out),
                    }
                }
                out.push_str(&format!("</{}>", el.tag));
            }
        }
    }
}

/// Escape text for use as HTML character data
pub fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

fn escape_attr(s: &str) -> String {
    escape_text(s).replace('"', "&quot;")
}
