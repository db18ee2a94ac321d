use std::fmt::Write;

use activator::{
    ActivatedBlock, ActivationError, ActivationWarning, Activator, BlockInstance, BlockKind,
    PageActivation, Registry, Runtime,
};
use dom::{Dom, NodeId, Selector};
use serde::Deserialize;

/// Which bulk operation to run from the document root.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Blocks, then asides, reporting both
    #[default]
    All,
    /// Blocks only
    Blocks,
    /// Asides only
    Asides,
}

/// Activate everything under `root` and render the result tree.
pub fn activate_and_render(
    dom: &mut Dom,
    root: NodeId,
    registry: &Registry,
    mode: Mode,
    token: Option<&str>,
) -> Result<(String, Vec<ActivationWarning>), ActivationError> {
    let mut activator = Activator::new(registry);
    let rendered = match mode {
        Mode::All => render_page(&activator.initialize_page(dom, root, token)?),
        Mode::Blocks => render_blocks(&activator.initialize_xblocks(dom, root, token)?),
        Mode::Asides => render_blocks(&activator.initialize_xblock_asides(dom, root, token)?),
    };
    Ok((rendered, activator.take_warnings()))
}

pub fn render_page(page: &PageActivation) -> String {
    let mut out = String::new();
    for block in page.blocks.iter().chain(&page.asides) {
        write_block(block, 0, &mut out);
    }
    out
}

pub fn render_blocks(blocks: &[ActivatedBlock]) -> String {
    let mut out = String::new();
    for block in blocks {
        write_block(block, 0, &mut out);
    }
    out
}

/// One line per block:
/// `<kind> <name> [type=<type>] <runtime class.version | degraded> [<describe>]`.
fn write_block(activated: &ActivatedBlock, depth: usize, out: &mut String) {
    let block = &activated.block;
    let kind = match block.kind {
        BlockKind::Block => "block",
        BlockKind::Aside => "aside",
    };
    let _ = write!(
        out,
        "{}{} {}",
        "  ".repeat(depth),
        kind,
        block.name.as_deref().unwrap_or("-")
    );
    if let Some(block_type) = &block.block_type {
        let _ = write!(out, " type={}", block_type);
    }
    match (&block.runtime, &block.instance) {
        (Some(runtime), Some(instance)) => {
            let _ = write!(out, " {}.{}", runtime.class_name(), runtime.version());
            let summary = instance.describe();
            if !summary.is_null() {
                let _ = write!(out, " {}", summary);
            }
        }
        _ => out.push_str(" degraded"),
    }
    out.push('\n');

    for child in activated.children.iter().chain(&activated.asides) {
        write_block(child, depth + 1, out);
    }
}

/// Every block and aside element in the document, indented by how deeply
/// they nest inside one another. Nothing is activated.
pub fn list_candidates(dom: &Dom) -> String {
    let markers = [BlockKind::Block, BlockKind::Aside]
        .map(|kind| (kind, Selector::class(kind.marker_class())));
    let mut out = String::new();
    let mut stack: Vec<(NodeId, usize)> = dom
        .element_children(dom.root())
        .rev()
        .map(|child| (child, 0))
        .collect();
    while let Some((node, depth)) = stack.pop() {
        let kind = markers
            .iter()
            .find(|(_, selector)| dom.matches(node, selector))
            .map(|(kind, _)| *kind);
        let child_depth = match kind {
            Some(kind) => {
                let label = if kind == BlockKind::Block { "block" } else { "aside" };
                let _ = writeln!(out, "{}{} {}", "  ".repeat(depth), label, dom.start_tag(node));
                depth + 1
            }
            None => depth,
        };
        stack.extend(dom.element_children(node).rev().map(|child| (child, child_depth)));
    }
    out
}
