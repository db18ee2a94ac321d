use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::block::BlockConstructor;
use crate::runtime::{NamedRuntime, Runtime};

type RuntimeFactory = Box<dyn Fn() -> Rc<dyn Runtime>>;

/// Runtime factories and block constructors an activator resolves names
/// against. Runtimes are keyed by class name, then by `v` + version.
#[derive(Default)]
pub struct Registry {
    runtimes: HashMap<String, HashMap<String, RuntimeFactory>>,
    constructors: HashMap<String, Box<dyn BlockConstructor>>,
}

/// The sub-registry key a `data-runtime-version` value selects.
pub fn version_key(version: &str) -> String {
    format!("v{}", version)
}

impl Registry {
    pub fn new() -> Self {
        Registry::default()
    }

    pub fn register_runtime<R, F>(&mut self, class_name: &str, version: &str, factory: F)
    where
        R: Runtime + 'static,
        F: Fn() -> R + 'static,
    {
        let factory: RuntimeFactory = Box::new(move || -> Rc<dyn Runtime> { Rc::new(factory()) });
        self.runtimes
            .entry(class_name.to_string())
            .or_default()
            .insert(version_key(version), factory);
    }

    /// Register a runtime that carries nothing but its class and version key.
    pub fn register_named_runtime(&mut self, class_name: &str, version: &str) {
        let runtime = NamedRuntime::new(class_name, version_key(version));
        self.register_runtime(class_name, version, move || runtime.clone());
    }

    pub fn register_constructor<C>(&mut self, name: &str, constructor: C)
    where
        C: BlockConstructor + 'static,
    {
        self.constructors
            .insert(name.to_string(), Box::new(constructor));
    }

    /// Create a fresh runtime handle for `class_name` at `version`.
    pub fn create_runtime(&self, class_name: &str, version: &str) -> Option<Rc<dyn Runtime>> {
        self.runtimes
            .get(class_name)?
            .get(&version_key(version))
            .map(|factory| factory())
    }

    pub fn constructor(&self, name: &str) -> Option<&dyn BlockConstructor> {
        self.constructors.get(name).map(|c| &**c)
    }

    /// Registered `(class, version key)` pairs, sorted.
    pub fn runtime_keys(&self) -> Vec<(&str, &str)> {
        let mut keys: Vec<(&str, &str)> = self
            .runtimes
            .iter()
            .flat_map(|(class, versions)| {
                versions
                    .keys()
                    .map(move |version| (class.as_str(), version.as_str()))
            })
            .collect();
        keys.sort();
        keys
    }

    pub fn constructor_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.constructors.keys().map(|s| s.as_str()).collect();
        names.sort();
        names
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("runtimes", &self.runtime_keys())
            .field("constructors", &self.constructor_names())
            .finish()
    }
}
