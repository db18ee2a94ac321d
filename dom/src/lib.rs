pub mod event;
pub mod node;
pub mod parser;
pub mod selector;
mod serialize;
mod tree;

pub use event::Event;
pub use node::{Element, NodeId, NodeKind};
pub use selector::Selector;
pub use tree::Dom;
