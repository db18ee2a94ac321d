use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::node::{NodeId, NodeKind};
use crate::parser::{RAW_TEXT_TAGS, VOID_TAGS};
use crate::tree::Dom;

impl Dom {
    /// Serialize a node and its subtree back to markup.
    pub fn outer_html(&self, node_id: NodeId) -> String {
        let mut out = String::new();
        self.write_html(node_id, false, &mut out);
        out
    }

    /// Just the start tag of an element, e.g. `<div class="xblock">`. Empty
    /// for non-element nodes.
    pub fn start_tag(&self, node_id: NodeId) -> String {
        let Some(element) = self.element(node_id) else {
            return String::new();
        };
        let mut out = String::new();
        write_start_tag(&element.tag_name, element.attrs(), &mut out);
        out
    }

    fn write_html(&self, node_id: NodeId, raw: bool, out: &mut String) {
        let mut stack = vec![Step::Node(node_id, raw)];
        while let Some(step) = stack.pop() {
            let (node_id, raw) = match step {
                Step::Node(node_id, raw) => (node_id, raw),
                Step::Close(tag_name) => {
                    out.push_str("</");
                    out.push_str(tag_name);
                    out.push('>');
                    continue;
                }
            };
            match self.kind(node_id) {
                NodeKind::Document => {
                    let children = self.children(node_id).iter().rev();
                    stack.extend(children.map(|child| Step::Node(*child, false)));
                }
                NodeKind::Text(text) => {
                    if raw {
                        out.push_str(text);
                    } else {
                        out.push_str(&encode_text(text));
                    }
                }
                NodeKind::Element(element) => {
                    write_start_tag(&element.tag_name, element.attrs(), out);
                    if VOID_TAGS.contains(&element.tag_name.as_str()) {
                        continue;
                    }
                    stack.push(Step::Close(&element.tag_name));
                    let raw = RAW_TEXT_TAGS.contains(&element.tag_name.as_str());
                    let children = self.children(node_id).iter().rev();
                    stack.extend(children.map(|child| Step::Node(*child, raw)));
                }
            }
        }
    }

    /// Indented outline of the element tree, one element per line, for
    /// debugging output. Whitespace-only text is omitted.
    pub fn outline(&self, node_id: NodeId) -> String {
        let mut out = String::new();
        self.write_outline(node_id, &mut out);
        out
    }

    fn write_outline(&self, node_id: NodeId, out: &mut String) {
        let mut stack = vec![(node_id, 0usize)];
        while let Some((node_id, depth)) = stack.pop() {
            let pad = "  ".repeat(depth);
            match self.kind(node_id) {
                NodeKind::Document => {
                    out.push_str(&pad);
                    out.push_str("#document\n");
                }
                NodeKind::Text(text) => {
                    let text = text.trim();
                    if !text.is_empty() {
                        out.push_str(&format!("{}{:?}\n", pad, text));
                    }
                    continue;
                }
                NodeKind::Element(element) => {
                    out.push_str(&pad);
                    out.push('<');
                    out.push_str(&element.tag_name);
                    for (name, value) in element.attrs() {
                        out.push_str(&format!(" {}={:?}", name, value));
                    }
                    out.push_str(">\n");
                }
            }
            let children = self.children(node_id).iter().rev();
            stack.extend(children.map(|child| (*child, depth + 1)));
        }
    }
}

/// Pending work for the serializer's explicit stack.
enum Step<'a> {
    Node(NodeId, bool),
    Close(&'a str),
}

fn write_start_tag<'a>(
    tag_name: &str,
    attrs: impl Iterator<Item = (&'a str, &'a str)>,
    out: &mut String,
) {
    out.push('<');
    out.push_str(tag_name);
    for (name, value) in attrs {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        out.push_str(&encode_double_quoted_attribute(value));
        out.push('"');
    }
    out.push('>');
}
