// # Backend Factories
//
// Factories for the two simulated backends, registered under the names the
// configuration uses:
//
// - "memory": fresh empty cloud for the lifetime of the process
// - "file": cloud loaded from and flushed to a JSON snapshot

use async_trait::async_trait;
use edgedomain_core::config::BackendConfig;
use edgedomain_core::registry::BackendRegistry;
use edgedomain_core::traits::{CloudBackendFactory, CloudServices};
use edgedomain_core::{Error, Result};

use crate::cloud::SimulatedCloud;

/// Factory for the in-memory backend
pub struct MemoryBackendFactory;

#[async_trait]
impl CloudBackendFactory for MemoryBackendFactory {
    async fn create(&self, config: &BackendConfig) -> Result<CloudServices> {
        match config {
            BackendConfig::Memory => Ok(SimulatedCloud::new().services()),
            other => Err(Error::config(format!(
                "memory backend cannot be created from {} configuration",
                other.type_name()
            ))),
        }
    }
}

/// Factory for the snapshot-file backend
pub struct FileBackendFactory;

#[async_trait]
impl CloudBackendFactory for FileBackendFactory {
    async fn create(&self, config: &BackendConfig) -> Result<CloudServices> {
        match config {
            BackendConfig::File { path } => Ok(SimulatedCloud::open(path).await?.services()),
            other => Err(Error::config(format!(
                "file backend cannot be created from {} configuration",
                other.type_name()
            ))),
        }
    }
}

/// Register both simulated backends
pub fn register(registry: &BackendRegistry) {
    registry.register_backend("memory", Box::new(MemoryBackendFactory));
    registry.register_backend("file", Box::new(FileBackendFactory));
}
