use std::fmt;
use std::ops::Range;

use dom::NodeId;

#[derive(Debug)]
pub enum ActivationError {
    /// No runtime factory registered under this class and version key.
    UndefinedRuntime { class: String, version: String },
    UndefinedConstructor(String),
    /// The embedded init-args JSON of `element` did not parse.
    InitArgs {
        element: String,
        source: serde_json::Error,
    },
    /// A constructor ran and reported failure.
    Constructor { name: String, message: String },
    AlreadyInitialized(String),
    NestingTooDeep(usize),
    NotAnElement(NodeId),
}

impl fmt::Display for ActivationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivationError::UndefinedRuntime { class, version } => {
                write!(f, "undefined runtime: {}.{}", class, version)
            }
            ActivationError::UndefinedConstructor(name) => {
                write!(f, "undefined constructor: {}", name)
            }
            ActivationError::InitArgs { element, source } => {
                write!(f, "invalid init args in {}: {}", element, source)
            }
            ActivationError::Constructor { name, message } => {
                write!(f, "constructor {} failed: {}", name, message)
            }
            ActivationError::AlreadyInitialized(element) => {
                write!(f, "block already initialized: {}", element)
            }
            ActivationError::NestingTooDeep(depth) => {
                write!(f, "blocks nested deeper than {} levels", depth)
            }
            ActivationError::NotAnElement(node) => write!(f, "{} is not an element", node),
        }
    }
}

impl std::error::Error for ActivationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ActivationError::InitArgs { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// A non-fatal problem found while activating, located at an element.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivationWarning {
    pub message: String,
    pub element: NodeId,
    /// Start-tag span of the element in the parsed source.
    pub span: Option<Range<usize>>,
    pub source_id: usize,
}

impl fmt::Display for ActivationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}
