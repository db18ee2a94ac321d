use std::path::Path;

use activator::{
    ActivationError, BlockConstructor, BlockInstance, ConstructContext, InitArg, Registry,
};
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Debug, Deserialize)]
pub struct RuntimeEntry {
    /// Value matched against `data-runtime-class`.
    pub class: String,

    /// Value matched against `data-runtime-version`. Integer or string.
    pub version: toml::Value,
}

impl RuntimeEntry {
    pub fn version_string(&self) -> Result<String, String> {
        match &self.version {
            toml::Value::Integer(n) => Ok(n.to_string()),
            toml::Value::String(s) => Ok(s.clone()),
            other => Err(format!(
                "runtime {}: version must be an integer or string, got {}",
                self.class,
                other.type_str()
            )),
        }
    }
}

/// Runtimes and constructors to register before activating.
#[derive(Debug, Default, Deserialize)]
pub struct RegistryConfig {
    #[serde(default)]
    pub runtimes: Vec<RuntimeEntry>,

    /// Constructor names bound to a recording constructor.
    #[serde(default)]
    pub constructors: Vec<String>,

    /// Constructor names whose construction always fails.
    #[serde(default)]
    pub failing_constructors: Vec<String>,
}

impl RegistryConfig {
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read '{}': {}", path.display(), e))?;
        toml::from_str(&content).map_err(|e| format!("{}: {}", path.display(), e))
    }

    pub fn build(&self) -> Result<Registry, String> {
        let mut registry = Registry::new();
        for runtime in &self.runtimes {
            registry.register_named_runtime(&runtime.class, &runtime.version_string()?);
        }
        for name in &self.constructors {
            registry.register_constructor(name, Recording { name: name.clone() });
        }
        for name in &self.failing_constructors {
            registry.register_constructor(name, Failing { name: name.clone() });
        }
        log::debug!("built registry {:?}", registry);
        Ok(registry)
    }
}

/// Captures the arguments it was constructed with.
#[derive(Debug)]
pub struct RecordedBlock {
    pub constructor: String,
    pub args: Vec<Value>,
}

impl BlockInstance for RecordedBlock {
    fn describe(&self) -> Value {
        json!({ "constructor": self.constructor, "args": self.args })
    }
}

struct Recording {
    name: String,
}

impl BlockConstructor for Recording {
    fn construct(
        &self,
        ctx: &ConstructContext<'_>,
    ) -> Result<Box<dyn BlockInstance>, ActivationError> {
        let args = ctx
            .args
            .iter()
            .map(|arg| match arg {
                InitArg::Json(value) => value.clone(),
                // Aside targets are shown by the usage id they matched on.
                InitArg::Elements(nodes) => nodes
                    .iter()
                    .map(|node| Value::from(ctx.dom.attr(*node, "data-usage").unwrap_or_default()))
                    .collect(),
            })
            .collect();
        Ok(Box::new(RecordedBlock {
            constructor: self.name.clone(),
            args,
        }))
    }
}

struct Failing {
    name: String,
}

impl BlockConstructor for Failing {
    fn construct(
        &self,
        ctx: &ConstructContext<'_>,
    ) -> Result<Box<dyn BlockInstance>, ActivationError> {
        Err(ActivationError::Constructor {
            name: self.name.clone(),
            message: format!("refused {}", ctx.dom.start_tag(ctx.element)),
        })
    }
}
