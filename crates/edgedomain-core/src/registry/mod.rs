//! Plugin-based backend registry
//!
//! The registry allows cloud backends to be registered dynamically at
//! runtime, so the binary picks the backend named in the configuration
//! without hardcoded if-else chains.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use edgedomain_core::registry::BackendRegistry;
//! use edgedomain_core::config::BackendConfig;
//!
//! let registry = BackendRegistry::new();
//! edgedomain_sim::register(&registry);
//!
//! let services = registry.create_backend(&BackendConfig::Memory).await?;
//! ```
//!
//! ## Registration
//!
//! Backend crates expose a `register` function:
//!
//! ```rust,ignore
//! pub fn register(registry: &BackendRegistry) {
//!     registry.register_backend("memory", Box::new(MemoryBackendFactory));
//! }
//! ```

use crate::config::BackendConfig;
use crate::error::{Error, Result};
use crate::traits::{CloudBackendFactory, CloudServices};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Backend registry for plugin-based service creation
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
#[derive(Default)]
pub struct BackendRegistry {
    /// Registered backend factories
    backends: RwLock<HashMap<String, Arc<dyn CloudBackendFactory>>>,
}

impl BackendRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend factory
    ///
    /// # Parameters
    ///
    /// - `name`: Backend type name (e.g., "memory", "file")
    /// - `factory`: Factory object for creating service bundles
    ///
    /// Registering an existing name replaces the previous factory.
    pub fn register_backend(&self, name: impl Into<String>, factory: Box<dyn CloudBackendFactory>) {
        let name = name.into();
        let mut backends = self
            .backends
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        backends.insert(name, Arc::from(factory));
    }

    /// Create the service bundle for `config`
    ///
    /// # Returns
    ///
    /// - `Ok(CloudServices)`: Created service bundle
    /// - `Err(Error)`: If the backend type is not registered or creation fails
    pub async fn create_backend(&self, config: &BackendConfig) -> Result<CloudServices> {
        let backend_type = config.type_name();

        let factory = {
            let backends = self
                .backends
                .read()
                .map_err(|_| Error::Other("backend registry lock poisoned".to_string()))?;
            backends
                .get(backend_type)
                .cloned()
                .ok_or_else(|| Error::config(format!("Unknown backend type: {}", backend_type)))?
        };

        // Lock is released before the async create
        factory.create(config).await
    }

    /// List all registered backend types
    pub fn list_backends(&self) -> Vec<String> {
        let backends = self
            .backends
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut names: Vec<String> = backends.keys().cloned().collect();
        names.sort();
        names
    }

    /// Check if a backend type is registered
    pub fn has_backend(&self, name: &str) -> bool {
        let backends = self
            .backends
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        backends.contains_key(name)
    }
}
