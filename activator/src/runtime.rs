use std::fmt;

/// The host environment handed to a block constructor.
///
/// A fresh handle is created for every activated element from the factory
/// registered under the element's runtime class and version.
pub trait Runtime: fmt::Debug {
    fn class_name(&self) -> &str;

    /// Registry version key, e.g. `v1`.
    fn version(&self) -> &str;
}

/// A runtime with no services beyond its identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedRuntime {
    class_name: String,
    version: String,
}

impl NamedRuntime {
    pub fn new(class_name: impl Into<String>, version: impl Into<String>) -> Self {
        NamedRuntime {
            class_name: class_name.into(),
            version: version.into(),
        }
    }
}

impl Runtime for NamedRuntime {
    fn class_name(&self) -> &str {
        &self.class_name
    }

    fn version(&self) -> &str {
        &self.version
    }
}
