use std::collections::HashMap;
use std::fmt;
use std::ops::Range;

use serde_json::Value;

/// Handle to a node inside a [`Dom`](crate::Dom) arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// What a node holds.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// The fragment root. Holds no markup of its own.
    Document,
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) kind: NodeKind,
}

/// An element node.
///
/// Attributes keep source order so outer markup comes back in the order the
/// server rendered it. The data store is separate from the `data-*`
/// attributes: it holds values written at runtime (the `initialized` flag,
/// for example) and never shows up in serialized markup.
#[derive(Debug, Clone)]
pub struct Element {
    pub tag_name: String,
    attrs: Vec<(String, String)>,
    data: HashMap<String, Value>,
    /// Byte span of the start tag in the parsed source.
    pub span: Range<usize>,
}

impl Element {
    pub fn new(tag_name: impl Into<String>, attrs: Vec<(String, String)>, span: Range<usize>) -> Self {
        Element {
            tag_name: tag_name.into(),
            attrs,
            data: HashMap::new(),
            span,
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attrs.iter_mut().find(|(key, _)| key == name) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((name.to_string(), value)),
        }
    }

    pub fn attrs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attrs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or("").split_whitespace()
    }

    pub fn has_class(&self, class_name: &str) -> bool {
        self.classes().any(|c| c == class_name)
    }

    /// Append a class token unless it is already present.
    pub fn add_class(&mut self, class_name: &str) {
        if self.has_class(class_name) {
            return;
        }
        let classes = match self.attr("class").map(str::trim) {
            Some(existing) if !existing.is_empty() => format!("{} {}", existing, class_name),
            _ => class_name.to_string(),
        };
        self.set_attr("class", classes);
    }

    pub fn data(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn set_data(&mut self, key: &str, value: Value) {
        self.data.insert(key.to_string(), value);
    }
}
