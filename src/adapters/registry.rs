//! Name-to-factory registry of adapters

use super::base::Adapter;
use crate::error::{Error, Result};
use crate::http::HttpClient;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Builds an adapter, sharing the given client or owning a fresh one
pub type AdapterFactory =
    Arc<dyn Fn(Option<Arc<HttpClient>>) -> Box<dyn Adapter> + Send + Sync>;

/// Explicit registry owned by the application
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    factories: BTreeMap<String, AdapterFactory>,
}

impl AdapterRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every bundled source
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        crate::sources::register_builtin(&mut registry);
        registry
    }

    /// Register a factory under `name`; names are unique
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> Result<()>
    where
        F: Fn(Option<Arc<HttpClient>>) -> Box<dyn Adapter> + Send + Sync + 'static,
    {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::config("name", "adapter name must not be empty"));
        }
        if self.factories.contains_key(&name) {
            return Err(Error::DuplicateAdapter { name });
        }
        self.factories.insert(name, Arc::new(factory));
        Ok(())
    }

    /// Instantiate the adapter registered as `name`
    pub fn create(&self, name: &str, client: Option<Arc<HttpClient>>) -> Result<Box<dyn Adapter>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| Error::AdapterNotFound {
                name: name.to_string(),
            })?;
        Ok(factory(client))
    }

    /// Registered names in sorted order
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("names", &self.names())
            .finish()
    }
}
