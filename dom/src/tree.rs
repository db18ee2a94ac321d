use std::ops::Range;

use serde_json::Value;

use crate::event::ListenerStore;
use crate::node::{Element, Node, NodeId, NodeKind};
use crate::selector::Selector;

/// An arena of parsed nodes. Node 0 is always the document root.
#[derive(Debug, Clone)]
pub struct Dom {
    nodes: Vec<Node>,
    root: NodeId,
    pub(crate) listeners: ListenerStore,
    /// The source file ID (for error reporting with codespan-reporting).
    pub source_id: usize,
}

impl Default for Dom {
    fn default() -> Self {
        Dom::new()
    }
}

impl Dom {
    pub fn new() -> Self {
        let root = Node {
            parent: None,
            children: Vec::new(),
            kind: NodeKind::Document,
        };
        Dom {
            nodes: vec![root],
            root: NodeId(0),
            listeners: ListenerStore::default(),
            source_id: 0,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    fn create_node(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: Some(parent),
            children: Vec::new(),
            kind,
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn create_element(&mut self, parent: NodeId, element: Element) -> NodeId {
        self.create_node(parent, NodeKind::Element(element))
    }

    pub fn create_text(&mut self, parent: NodeId, text: impl Into<String>) -> NodeId {
        self.create_node(parent, NodeKind::Text(text.into()))
    }

    pub fn kind(&self, node_id: NodeId) -> &NodeKind {
        &self.nodes[node_id.0].kind
    }

    pub fn element(&self, node_id: NodeId) -> Option<&Element> {
        match &self.nodes[node_id.0].kind {
            NodeKind::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, node_id: NodeId) -> Option<&mut Element> {
        match &mut self.nodes[node_id.0].kind {
            NodeKind::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn tag_name(&self, node_id: NodeId) -> Option<&str> {
        self.element(node_id).map(|e| e.tag_name.as_str())
    }

    pub fn parent(&self, node_id: NodeId) -> Option<NodeId> {
        self.nodes[node_id.0].parent
    }

    pub fn children(&self, node_id: NodeId) -> &[NodeId] {
        &self.nodes[node_id.0].children
    }

    /// Child nodes that are elements, in document order.
    pub fn element_children(
        &self,
        node_id: NodeId,
    ) -> impl DoubleEndedIterator<Item = NodeId> + '_ {
        self.children(node_id)
            .iter()
            .copied()
            .filter(|child| self.element(*child).is_some())
    }

    /// Element siblings of `node_id`, excluding the node itself.
    pub fn siblings(&self, node_id: NodeId) -> Vec<NodeId> {
        match self.parent(node_id) {
            Some(parent) => self
                .element_children(parent)
                .filter(|sibling| *sibling != node_id)
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn attr(&self, node_id: NodeId, name: &str) -> Option<&str> {
        self.element(node_id).and_then(|e| e.attr(name))
    }

    pub fn has_class(&self, node_id: NodeId, class_name: &str) -> bool {
        self.element(node_id)
            .is_some_and(|e| e.has_class(class_name))
    }

    pub fn add_class(&mut self, node_id: NodeId, class_name: &str) {
        if let Some(element) = self.element_mut(node_id) {
            element.add_class(class_name);
        }
    }

    pub fn data(&self, node_id: NodeId, key: &str) -> Option<&Value> {
        self.element(node_id).and_then(|e| e.data(key))
    }

    pub fn set_data(&mut self, node_id: NodeId, key: &str, value: Value) {
        if let Some(element) = self.element_mut(node_id) {
            element.set_data(key, value);
        }
    }

    /// Byte span of the element's start tag in the parsed source.
    pub fn span(&self, node_id: NodeId) -> Option<Range<usize>> {
        self.element(node_id).map(|e| e.span.clone())
    }

    pub fn matches(&self, node_id: NodeId, selector: &Selector) -> bool {
        self.element(node_id).is_some_and(|e| selector.matches(e))
    }

    /// Concatenated text of every descendant text node.
    pub fn text_content(&self, node_id: NodeId) -> String {
        let mut out = String::new();
        let mut stack = vec![node_id];
        while let Some(current) = stack.pop() {
            match &self.nodes[current.0].kind {
                NodeKind::Text(text) => out.push_str(text),
                NodeKind::Document | NodeKind::Element(_) => {
                    stack.extend(self.children(current).iter().rev());
                }
            }
        }
        out
    }

    /// The nearest descendants matching `selector`: children are walked in
    /// document order, a matching child is returned without descending into
    /// it, and a non-matching child is searched.
    pub fn immediate_descendants(&self, node_id: NodeId, selector: &Selector) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.element_children(node_id).rev().collect();
        while let Some(current) = stack.pop() {
            if self.matches(current, selector) {
                out.push(current);
            } else {
                stack.extend(self.element_children(current).rev());
            }
        }
        out
    }

    /// First descendant (document order) matching `target`, never descending
    /// into an element that matches any of `boundaries`.
    pub fn find_first(
        &self,
        node_id: NodeId,
        target: &Selector,
        boundaries: &[Selector],
    ) -> Option<NodeId> {
        let mut stack: Vec<NodeId> = self.element_children(node_id).rev().collect();
        while let Some(current) = stack.pop() {
            if self.matches(current, target) {
                return Some(current);
            }
            if !boundaries.iter().any(|b| self.matches(current, b)) {
                stack.extend(self.element_children(current).rev());
            }
        }
        None
    }
}
