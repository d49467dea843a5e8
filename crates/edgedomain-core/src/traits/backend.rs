// # Cloud Backend
//
// A backend bundles one implementation of every capability interface. The
// core never talks to a provider SDK directly; it only sees `CloudServices`.

use async_trait::async_trait;
use std::sync::Arc;

use super::{FunctionService, HostedZoneService, RoleService, StackOutputs};
use crate::config::BackendConfig;
use crate::error::Result;

/// Hook for backends that keep local state and must write it out
#[async_trait]
pub trait BackendFlush: Send + Sync {
    /// Persist any buffered state
    async fn flush(&self) -> Result<()>;
}

/// The capability interfaces one lifecycle invocation works against
#[derive(Clone)]
pub struct CloudServices {
    pub zones: Arc<dyn HostedZoneService>,
    pub roles: Arc<dyn RoleService>,
    pub functions: Arc<dyn FunctionService>,
    pub stacks: Arc<dyn StackOutputs>,
    flusher: Option<Arc<dyn BackendFlush>>,
}

impl CloudServices {
    /// Bundle the four services
    pub fn new(
        zones: Arc<dyn HostedZoneService>,
        roles: Arc<dyn RoleService>,
        functions: Arc<dyn FunctionService>,
        stacks: Arc<dyn StackOutputs>,
    ) -> Self {
        Self {
            zones,
            roles,
            functions,
            stacks,
            flusher: None,
        }
    }

    /// Attach a flush hook, called by [`CloudServices::flush`]
    pub fn with_flusher(mut self, flusher: Arc<dyn BackendFlush>) -> Self {
        self.flusher = Some(flusher);
        self
    }

    /// Persist backend state, if the backend keeps any
    pub async fn flush(&self) -> Result<()> {
        match &self.flusher {
            Some(flusher) => flusher.flush().await,
            None => Ok(()),
        }
    }
}

/// Helper trait for constructing backends from configuration
#[async_trait]
pub trait CloudBackendFactory: Send + Sync {
    /// Create the service bundle described by `config`
    async fn create(&self, config: &BackendConfig) -> Result<CloudServices>;
}
