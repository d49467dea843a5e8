// # Stack Outputs
//
// Read-only view of a deployed infrastructure stack's outputs. The
// distribution's domain name is published there by the deployment tooling.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// One output of a deployed stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackOutput {
    pub key: String,
    pub value: String,
}

/// Trait for reading stack outputs
#[async_trait]
pub trait StackOutputs: Send + Sync {
    /// Return every output of the named stack
    async fn describe_outputs(&self, stack_name: &str) -> Result<Vec<StackOutput>, ProviderError>;
}
