pub mod activator;
pub mod attributes;
pub mod block;
pub mod discovery;
pub mod error;
pub mod registry;
pub mod runtime;

pub use activator::{
    ActivationOptions, Activator, PageActivation, activate, activate_asides, activate_blocks,
    init_args,
};
pub use block::{ActivatedBlock, Block, BlockConstructor, BlockInstance, ConstructContext, InitArg};
pub use discovery::BlockKind;
pub use error::{ActivationError, ActivationWarning};
pub use registry::Registry;
pub use runtime::{NamedRuntime, Runtime};
