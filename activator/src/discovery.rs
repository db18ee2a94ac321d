use dom::{Dom, NodeId, Selector};

use crate::attributes::{ASIDE_CLASS, REQUEST_TOKEN, XBLOCK_CLASS};

/// The two activatable element kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Block,
    Aside,
}

impl BlockKind {
    pub fn marker_class(self) -> &'static str {
        match self {
            BlockKind::Block => XBLOCK_CLASS,
            BlockKind::Aside => ASIDE_CLASS,
        }
    }

    pub fn selector(self, token: Option<&str>) -> Selector {
        let selector = Selector::class(self.marker_class());
        match token {
            Some(token) => selector.and_attr(REQUEST_TOKEN, token),
            None => selector,
        }
    }
}

/// Nearest descendants of `root` carrying the kind's marker class and, when a
/// token is given, that exact request token. Elements with the marker but a
/// different token are searched through, not returned.
pub fn discover(dom: &Dom, root: NodeId, kind: BlockKind, token: Option<&str>) -> Vec<NodeId> {
    let selector = kind.selector(token);
    let found = dom.immediate_descendants(root, &selector);
    log::debug!("discovered {} element(s) matching {} under {}", found.len(), selector, root);
    found
}

/// The token an activation call runs under: the explicit one, else the
/// element's own `data-request-token`.
pub fn effective_token(dom: &Dom, element: NodeId, token: Option<&str>) -> Option<String> {
    token
        .or_else(|| dom.attr(element, REQUEST_TOKEN))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}
