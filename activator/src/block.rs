use std::any::Any;
use std::fmt;
use std::rc::Rc;

use dom::{Dom, NodeId};
use serde_json::Value;

use crate::discovery::BlockKind;
use crate::error::ActivationError;
use crate::runtime::Runtime;

/// An extra argument passed to a constructor after the runtime and element.
#[derive(Debug, Clone, PartialEq)]
pub enum InitArg {
    /// Parsed init args, `{}` when the element embeds none.
    Json(Value),
    /// The siblings an aside decorates. Empty when nothing matched.
    Elements(Vec<NodeId>),
}

pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// The object a constructor builds for one element.
pub trait BlockInstance: AsAny + fmt::Debug {
    /// Summary shown when reporting an activation tree.
    fn describe(&self) -> Value {
        Value::Null
    }
}

/// Everything a constructor receives: `(runtime, element, ...args)` plus
/// read access to the tree the element lives in.
pub struct ConstructContext<'a> {
    pub dom: &'a Dom,
    pub runtime: &'a Rc<dyn Runtime>,
    pub element: NodeId,
    pub args: &'a [InitArg],
}

impl ConstructContext<'_> {
    pub fn json_arg(&self, index: usize) -> Option<&Value> {
        match self.args.get(index)? {
            InitArg::Json(value) => Some(value),
            InitArg::Elements(_) => None,
        }
    }

    pub fn elements_arg(&self, index: usize) -> Option<&[NodeId]> {
        match self.args.get(index)? {
            InitArg::Elements(nodes) => Some(nodes),
            InitArg::Json(_) => None,
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.dom.attr(self.element, name)
    }
}

/// A named constructor, looked up by an element's `data-init`.
pub trait BlockConstructor {
    fn construct(
        &self,
        ctx: &ConstructContext<'_>,
    ) -> Result<Box<dyn BlockInstance>, ActivationError>;
}

/// The result of activating one element.
#[derive(Debug)]
pub struct Block {
    pub kind: BlockKind,
    pub element: NodeId,
    /// From `data-name`.
    pub name: Option<String>,
    /// From `data-block-type`.
    pub block_type: Option<String>,
    /// Present only when the element named a complete runtime.
    pub runtime: Option<Rc<dyn Runtime>>,
    /// The constructed object. `None` on the degraded no-runtime path, where
    /// no constructor runs.
    pub instance: Option<Box<dyn BlockInstance>>,
}

impl Block {
    pub fn is_degraded(&self) -> bool {
        self.instance.is_none()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        let instance: &dyn BlockInstance = self.instance.as_deref()?;
        AsAny::as_any(instance).downcast_ref::<T>()
    }
}

/// A block together with the blocks activated beneath it.
#[derive(Debug)]
pub struct ActivatedBlock {
    pub block: Block,
    /// Nested block results, document order.
    pub children: Vec<ActivatedBlock>,
    /// Aside results found beneath this block.
    pub asides: Vec<ActivatedBlock>,
}

impl ActivatedBlock {
    pub fn leaf(block: Block) -> Self {
        ActivatedBlock {
            block,
            children: Vec::new(),
            asides: Vec::new(),
        }
    }

    /// Every block in the tree in the order it was constructed: children,
    /// then asides, then the block itself.
    pub fn construction_order(&self) -> Vec<&Block> {
        let mut out = Vec::new();
        self.collect_post_order(&mut out);
        out
    }

    fn collect_post_order<'a>(&'a self, out: &mut Vec<&'a Block>) {
        for child in &self.children {
            child.collect_post_order(out);
        }
        for aside in &self.asides {
            aside.collect_post_order(out);
        }
        out.push(&self.block);
    }
}
