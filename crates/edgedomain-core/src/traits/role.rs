// # Role Service
//
// Capability interface over the provider's identity service: the execution
// role an edge function runs as, and the managed policy bound to it.
//
// `get_role` is an existence probe: a missing role is `Ok(None)`, never an
// error. Every other call is a single remote operation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// An execution role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Role name
    pub name: String,
    /// Provider identifier of the role, passed to the function service
    pub arn: String,
    /// When the provider created the role
    pub created_at: DateTime<Utc>,
}

/// Trait for the provider's role/policy service
#[async_trait]
pub trait RoleService: Send + Sync {
    /// Look up a role by name
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Role))`: The role exists
    /// - `Ok(None)`: No role has that name
    /// - `Err(ProviderError)`: The lookup itself failed
    async fn get_role(&self, name: &str) -> Result<Option<Role>, ProviderError>;

    /// Create a role with the given trust (assume-role) policy document
    async fn create_role(
        &self,
        name: &str,
        trust_policy: &serde_json::Value,
    ) -> Result<Role, ProviderError>;

    /// Identifiers of the managed policies attached to a role
    async fn list_attached_policies(&self, name: &str) -> Result<Vec<String>, ProviderError>;

    /// Attach a managed policy to a role; attaching twice is not an error
    async fn attach_role_policy(&self, name: &str, policy_arn: &str) -> Result<(), ProviderError>;

    /// Detach a managed policy from a role
    async fn detach_role_policy(&self, name: &str, policy_arn: &str) -> Result<(), ProviderError>;

    /// Delete a role
    async fn delete_role(&self, name: &str) -> Result<(), ProviderError>;
}
