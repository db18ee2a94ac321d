use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use dom::{Dom, NodeId, Selector};
use serde_json::{Map, Value};

use crate::attributes::{
    ASIDE_CLASS, BLOCK_ID, BLOCK_TYPE, INIT, INIT_ARGS_CLASS, INITIALIZED_CLASS, INITIALIZED_DATA,
    INITIALIZED_EVENT, NAME, RUNTIME_CLASS, RUNTIME_VERSION, USAGE, XBLOCK_CLASS,
};
use crate::block::{ActivatedBlock, Block, ConstructContext, InitArg};
use crate::discovery::{self, BlockKind, effective_token};
use crate::error::{ActivationError, ActivationWarning};
use crate::registry::{Registry, version_key};
use crate::runtime::Runtime;

pub const MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivationOptions {
    /// Skip elements already marked initialized during bulk activation, and
    /// refuse to construct them twice.
    pub skip_initialized: bool,
    /// Deepest allowed nesting of blocks inside blocks.
    pub max_depth: usize,
}

impl Default for ActivationOptions {
    fn default() -> Self {
        ActivationOptions {
            skip_initialized: false,
            max_depth: MAX_DEPTH,
        }
    }
}

/// Blocks and asides activated under one root.
#[derive(Debug)]
pub struct PageActivation {
    pub blocks: Vec<ActivatedBlock>,
    pub asides: Vec<ActivatedBlock>,
}

/// Walks rendered markup and turns block elements into constructed blocks.
pub struct Activator<'r> {
    registry: &'r Registry,
    options: ActivationOptions,
    warnings: Vec<ActivationWarning>,
    depth: usize,
}

impl<'r> Activator<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self::with_options(registry, ActivationOptions::default())
    }

    pub fn with_options(registry: &'r Registry, options: ActivationOptions) -> Self {
        Activator {
            registry,
            options,
            warnings: Vec::new(),
            depth: 0,
        }
    }

    pub fn warnings(&self) -> &[ActivationWarning] {
        &self.warnings
    }

    pub fn take_warnings(&mut self) -> Vec<ActivationWarning> {
        std::mem::take(&mut self.warnings)
    }

    /// Discover `kind` elements under `root`, dropping already-initialized
    /// ones when `skip_initialized` is set.
    pub fn discover(
        &self,
        dom: &Dom,
        root: NodeId,
        kind: BlockKind,
        token: Option<&str>,
    ) -> Vec<NodeId> {
        let mut found = discovery::discover(dom, root, kind, token);
        if self.options.skip_initialized {
            found.retain(|element| {
                let done = is_initialized(dom, *element);
                if done {
                    log::debug!("skipping initialized {}", dom.start_tag(*element));
                }
                !done
            });
        }
        found
    }

    /// Resolve the runtime an element names.
    ///
    /// Returns `Ok(None)` and records a warning when any of the runtime
    /// class, runtime version or constructor name is missing or reads as false
    /// (`""`, `0`, `NaN`, `false`, `null`); the element is then activated
    /// without a runtime.
    pub fn element_runtime(
        &mut self,
        dom: &Dom,
        element: NodeId,
    ) -> Result<Option<Rc<dyn Runtime>>, ActivationError> {
        let node = dom
            .element(element)
            .ok_or(ActivationError::NotAnElement(element))?;
        let class = truthy(node.attr(RUNTIME_CLASS));
        let version = truthy(node.attr(RUNTIME_VERSION));
        let init = truthy(node.attr(INIT));

        match (class, version, init) {
            (Some(class), Some(version), Some(_)) => self
                .registry
                .create_runtime(class, version)
                .map(Some)
                .ok_or_else(|| ActivationError::UndefinedRuntime {
                    class: class.to_string(),
                    version: version_key(version),
                }),
            _ => {
                let message = format!(
                    "Block {} is missing data-runtime, data-runtime-version or data-init, and can't be initialized",
                    dom.outer_html(element)
                );
                log::warn!("{}", message);
                self.warnings.push(ActivationWarning {
                    message,
                    element,
                    span: dom.span(element),
                    source_id: dom.source_id,
                });
                Ok(None)
            }
        }
    }

    /// Build the block for `element` and mark the element initialized.
    ///
    /// `args` follow the runtime and element in the constructor call.
    pub fn construct_block(
        &mut self,
        dom: &mut Dom,
        kind: BlockKind,
        element: NodeId,
        args: Vec<InitArg>,
    ) -> Result<Block, ActivationError> {
        if self.options.skip_initialized && is_initialized(dom, element) {
            return Err(ActivationError::AlreadyInitialized(dom.start_tag(element)));
        }

        let runtime = self.element_runtime(dom, element)?;
        let node = dom
            .element(element)
            .ok_or(ActivationError::NotAnElement(element))?;
        let init_name = node.attr(INIT).unwrap_or_default().to_string();
        let name = node.attr(NAME).map(str::to_string);
        let block_type = node.attr(BLOCK_TYPE).map(str::to_string);

        let instance = match &runtime {
            Some(runtime) => {
                let constructor = self
                    .registry
                    .constructor(&init_name)
                    .ok_or_else(|| ActivationError::UndefinedConstructor(init_name.clone()))?;
                let ctx = ConstructContext {
                    dom: &*dom,
                    runtime,
                    element,
                    args: &args,
                };
                Some(constructor.construct(&ctx)?)
            }
            None => None,
        };

        log::debug!(
            "constructed {:?} {} with {}",
            kind,
            dom.start_tag(element),
            if instance.is_some() { init_name.as_str() } else { "no runtime" }
        );

        dom.trigger(element, INITIALIZED_EVENT);
        dom.set_data(element, INITIALIZED_DATA, Value::Bool(true));
        dom.add_class(element, INITIALIZED_CLASS);

        Ok(Block {
            kind,
            element,
            name,
            block_type,
            runtime,
            instance,
        })
    }

    /// Activate one block element: first every block and aside beneath it,
    /// then the element itself with its own init args.
    pub fn initialize_block(
        &mut self,
        dom: &mut Dom,
        element: NodeId,
        token: Option<&str>,
    ) -> Result<ActivatedBlock, ActivationError> {
        if self.depth >= self.options.max_depth {
            return Err(ActivationError::NestingTooDeep(self.options.max_depth));
        }
        let token = effective_token(dom, element, token);

        self.depth += 1;
        let nested = self.initialize_page(dom, element, token.as_deref());
        self.depth -= 1;
        let PageActivation { blocks, asides } = nested?;

        let args = init_args(dom, element)?;
        let block = self.construct_block(dom, BlockKind::Block, element, vec![InitArg::Json(args)])?;
        Ok(ActivatedBlock {
            block,
            children: blocks,
            asides,
        })
    }

    /// Activate one aside element against the siblings whose `data-usage`
    /// equals its `data-block_id`.
    pub fn initialize_aside(
        &mut self,
        dom: &mut Dom,
        element: NodeId,
    ) -> Result<ActivatedBlock, ActivationError> {
        let targets = match dom.attr(element, BLOCK_ID) {
            Some(block_id) => {
                let usage = Selector::attr(USAGE, block_id);
                dom.siblings(element)
                    .into_iter()
                    .filter(|sibling| dom.matches(*sibling, &usage))
                    .collect()
            }
            None => Vec::new(),
        };

        let args = init_args(dom, element)?;
        let block = self.construct_block(
            dom,
            BlockKind::Aside,
            element,
            vec![InitArg::Elements(targets), InitArg::Json(args)],
        )?;
        Ok(ActivatedBlock::leaf(block))
    }

    /// Activate every block under `root` rendered with `token`.
    pub fn initialize_xblocks(
        &mut self,
        dom: &mut Dom,
        root: NodeId,
        token: Option<&str>,
    ) -> Result<Vec<ActivatedBlock>, ActivationError> {
        let token = effective_token(dom, root, token);
        self.discover(dom, root, BlockKind::Block, token.as_deref())
            .into_iter()
            .map(|element| self.initialize_block(dom, element, token.as_deref()))
            .collect()
    }

    /// Activate every aside under `root` rendered with `token`.
    pub fn initialize_xblock_asides(
        &mut self,
        dom: &mut Dom,
        root: NodeId,
        token: Option<&str>,
    ) -> Result<Vec<ActivatedBlock>, ActivationError> {
        let token = effective_token(dom, root, token);
        self.discover(dom, root, BlockKind::Aside, token.as_deref())
            .into_iter()
            .map(|element| self.initialize_aside(dom, element))
            .collect()
    }

    /// Activate blocks, then asides, under `root`. Only the aside results are
    /// returned; use [`Activator::initialize_page`] to keep both.
    ///
    /// Every aside discovered under `root` is reported, including those a
    /// nested block already activated. Those are moved out of the block tree
    /// instead of being constructed a second time.
    pub fn initialize_blocks(
        &mut self,
        dom: &mut Dom,
        root: NodeId,
        token: Option<&str>,
    ) -> Result<Vec<ActivatedBlock>, ActivationError> {
        let mut blocks = self.initialize_xblocks(dom, root, token)?;
        let mut nested = HashMap::new();
        for block in &mut blocks {
            take_asides(block, &mut nested);
        }

        let token = effective_token(dom, root, token);
        self.discover(dom, root, BlockKind::Aside, token.as_deref())
            .into_iter()
            .map(|element| match nested.remove(&element) {
                Some(done) => Ok(done),
                None => self.initialize_aside(dom, element),
            })
            .collect()
    }

    /// Activate blocks, then asides, under `root`, keeping both result lists.
    ///
    /// Asides already activated by a nested block stay in that block's
    /// `asides`; `PageActivation::asides` holds only the remaining ones.
    pub fn initialize_page(
        &mut self,
        dom: &mut Dom,
        root: NodeId,
        token: Option<&str>,
    ) -> Result<PageActivation, ActivationError> {
        let blocks = self.initialize_xblocks(dom, root, token)?;
        let nested: HashSet<NodeId> = blocks
            .iter()
            .flat_map(ActivatedBlock::construction_order)
            .filter(|block| block.kind == BlockKind::Aside)
            .map(|block| block.element)
            .collect();

        let token = effective_token(dom, root, token);
        let pending: Vec<NodeId> = self
            .discover(dom, root, BlockKind::Aside, token.as_deref())
            .into_iter()
            .filter(|element| !nested.contains(element))
            .collect();
        let asides = pending
            .into_iter()
            .map(|element| self.initialize_aside(dom, element))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PageActivation { blocks, asides })
    }
}

/// Parse the JSON an element embeds for its constructor.
///
/// The holder is the first `xblock_json_init_args` element beneath `element`
/// that does not belong to a nested block or aside. A missing holder or an
/// empty body yields `{}`; any other body, whitespace included, must be JSON.
pub fn init_args(dom: &Dom, element: NodeId) -> Result<Value, ActivationError> {
    let boundaries = [Selector::class(XBLOCK_CLASS), Selector::class(ASIDE_CLASS)];
    let text = dom
        .find_first(element, &Selector::class(INIT_ARGS_CLASS), &boundaries)
        .map(|holder| dom.text_content(holder))
        .unwrap_or_default();
    if text.is_empty() {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_str(&text).map_err(|source| ActivationError::InitArgs {
        element: dom.start_tag(element),
        source,
    })
}

pub fn is_initialized(dom: &Dom, element: NodeId) -> bool {
    matches!(dom.data(element, INITIALIZED_DATA), Some(Value::Bool(true)))
}

/// Attribute values that read as false once data attributes are converted
/// to values: empty, `0`, `NaN`, `false` and `null`.
fn truthy(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !matches!(*v, "" | "0" | "NaN" | "false" | "null"))
}

/// Move every aside result out of `block`'s tree, keyed by element.
fn take_asides(block: &mut ActivatedBlock, into: &mut HashMap<NodeId, ActivatedBlock>) {
    for child in &mut block.children {
        take_asides(child, into);
    }
    for aside in block.asides.drain(..) {
        into.insert(aside.block.element, aside);
    }
}

// ---------------------------------------------------------------------------
// One-shot entry points
// ---------------------------------------------------------------------------

/// Activate blocks then asides under `root`, returning the aside results and
/// any warnings.
pub fn activate(
    dom: &mut Dom,
    root: NodeId,
    registry: &Registry,
    token: Option<&str>,
) -> Result<(Vec<ActivatedBlock>, Vec<ActivationWarning>), ActivationError> {
    let mut activator = Activator::new(registry);
    let asides = activator.initialize_blocks(dom, root, token)?;
    Ok((asides, activator.take_warnings()))
}

pub fn activate_blocks(
    dom: &mut Dom,
    root: NodeId,
    registry: &Registry,
    token: Option<&str>,
) -> Result<(Vec<ActivatedBlock>, Vec<ActivationWarning>), ActivationError> {
    let mut activator = Activator::new(registry);
    let blocks = activator.initialize_xblocks(dom, root, token)?;
    Ok((blocks, activator.take_warnings()))
}

pub fn activate_asides(
    dom: &mut Dom,
    root: NodeId,
    registry: &Registry,
    token: Option<&str>,
) -> Result<(Vec<ActivatedBlock>, Vec<ActivationWarning>), ActivationError> {
    let mut activator = Activator::new(registry);
    let asides = activator.initialize_xblock_asides(dom, root, token)?;
    Ok((asides, activator.take_warnings()))
}
