//! Names in the attribute contract between rendered markup and the activator.

pub const XBLOCK_CLASS: &str = "xblock";
pub const ASIDE_CLASS: &str = "xblock_asides-v1";
pub const INIT_ARGS_CLASS: &str = "xblock_json_init_args";
pub const INITIALIZED_CLASS: &str = "xblock-initialized";

pub const REQUEST_TOKEN: &str = "data-request-token";
pub const RUNTIME_CLASS: &str = "data-runtime-class";
pub const RUNTIME_VERSION: &str = "data-runtime-version";
pub const INIT: &str = "data-init";
pub const NAME: &str = "data-name";
pub const BLOCK_TYPE: &str = "data-block-type";
pub const BLOCK_ID: &str = "data-block_id";
pub const USAGE: &str = "data-usage";

/// Event triggered on an element once its block is constructed.
pub const INITIALIZED_EVENT: &str = "xblock-initialized";

/// Data-store key set to `true` once an element's block is constructed.
pub const INITIALIZED_DATA: &str = "initialized";
