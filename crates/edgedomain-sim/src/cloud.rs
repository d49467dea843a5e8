//! Simulated cloud services
//!
//! [`SimulatedCloud`] implements every capability trait of the core over one
//! shared [`CloudState`]. A single instance backs all four services of a
//! [`CloudServices`] bundle, so a role created through `RoleService` is
//! visible to `FunctionService` immediately.
//!
//! When opened on a snapshot file, mutations mark the state dirty and
//! [`BackendFlush::flush`] writes it back.

use async_trait::async_trait;
use edgedomain_core::error::{Error, ProviderError};
use edgedomain_core::traits::{
    BackendFlush, ChangeBatch, CloudServices, CreateFunctionRequest, EdgeFunction,
    FunctionService, FunctionVersion, HostedZone, HostedZoneService, ResourceRecord, Role,
    RoleService, StackOutput, StackOutputs,
};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::snapshot::SnapshotFile;
use crate::state::CloudState;

struct Inner {
    state: CloudState,
    dirty: bool,
}

/// In-process stand-in for the cloud provider
#[derive(Clone)]
pub struct SimulatedCloud {
    inner: Arc<RwLock<Inner>>,
    snapshot: Option<SnapshotFile>,
}

impl SimulatedCloud {
    /// Create a cloud that lives only in memory
    pub fn new() -> Self {
        Self::with_state(CloudState::default())
    }

    /// Create an in-memory cloud starting from `state`
    pub fn with_state(state: CloudState) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                state,
                dirty: false,
            })),
            snapshot: None,
        }
    }

    /// Open a cloud persisted at `path`
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let snapshot = SnapshotFile::open(path).await?;
        let state = snapshot.load_with_recovery().await?;
        Ok(Self {
            snapshot: Some(snapshot),
            ..Self::with_state(state)
        })
    }

    /// Bundle this cloud as the four capability services
    pub fn services(&self) -> CloudServices {
        let shared = Arc::new(self.clone());
        CloudServices::new(shared.clone(), shared.clone(), shared.clone(), shared.clone())
            .with_flusher(shared)
    }

    /// A copy of the current state
    pub async fn state(&self) -> CloudState {
        self.inner.read().await.state.clone()
    }

    /// Mutate the state directly, e.g. to seed zones or stack outputs
    pub async fn update<R>(&self, f: impl FnOnce(&mut CloudState) -> R) -> R {
        let mut inner = self.inner.write().await;
        inner.dirty = true;
        f(&mut inner.state)
    }

    async fn read<R>(&self, f: impl FnOnce(&CloudState) -> R) -> R {
        f(&self.inner.read().await.state)
    }

    /// Run a provider operation that may change state
    async fn mutate<R>(
        &self,
        f: impl FnOnce(&mut CloudState) -> Result<R, ProviderError>,
    ) -> Result<R, ProviderError> {
        let mut inner = self.inner.write().await;
        let result = f(&mut inner.state);
        if result.is_ok() {
            inner.dirty = true;
        }
        result
    }
}

impl Default for SimulatedCloud {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BackendFlush for SimulatedCloud {
    async fn flush(&self) -> Result<(), Error> {
        let Some(snapshot) = &self.snapshot else {
            return Ok(());
        };

        let mut inner = self.inner.write().await;
        if !inner.dirty {
            return Ok(());
        }
        snapshot.write(&inner.state).await?;
        inner.dirty = false;
        tracing::debug!("Simulated cloud saved to {}", snapshot.path().display());
        Ok(())
    }
}

#[async_trait]
impl HostedZoneService for SimulatedCloud {
    async fn list_hosted_zones(&self) -> Result<Vec<HostedZone>, ProviderError> {
        Ok(self.read(CloudState::list_hosted_zones).await)
    }

    async fn change_record_sets(
        &self,
        zone_id: &str,
        batch: &ChangeBatch,
    ) -> Result<(), ProviderError> {
        self.mutate(|s| s.change_record_sets(zone_id, batch)).await
    }

    async fn list_record_sets(&self, zone_id: &str) -> Result<Vec<ResourceRecord>, ProviderError> {
        self.read(|s| s.list_record_sets(zone_id)).await
    }
}

#[async_trait]
impl RoleService for SimulatedCloud {
    async fn get_role(&self, name: &str) -> Result<Option<Role>, ProviderError> {
        Ok(self.read(|s| s.get_role(name)).await)
    }

    async fn create_role(
        &self,
        name: &str,
        trust_policy: &serde_json::Value,
    ) -> Result<Role, ProviderError> {
        self.mutate(|s| s.create_role(name, trust_policy)).await
    }

    async fn list_attached_policies(&self, name: &str) -> Result<Vec<String>, ProviderError> {
        self.read(|s| s.list_attached_policies(name)).await
    }

    async fn attach_role_policy(&self, name: &str, policy_arn: &str) -> Result<(), ProviderError> {
        self.mutate(|s| s.attach_role_policy(name, policy_arn)).await
    }

    async fn detach_role_policy(&self, name: &str, policy_arn: &str) -> Result<(), ProviderError> {
        self.mutate(|s| s.detach_role_policy(name, policy_arn)).await
    }

    async fn delete_role(&self, name: &str) -> Result<(), ProviderError> {
        self.mutate(|s| s.delete_role(name)).await
    }
}

#[async_trait]
impl FunctionService for SimulatedCloud {
    async fn get_function(&self, name: &str) -> Result<Option<EdgeFunction>, ProviderError> {
        Ok(self.read(|s| s.get_function(name)).await)
    }

    async fn create_function(
        &self,
        request: &CreateFunctionRequest,
    ) -> Result<EdgeFunction, ProviderError> {
        self.mutate(|s| s.create_function(request)).await
    }

    async fn publish_version(&self, name: &str) -> Result<FunctionVersion, ProviderError> {
        self.mutate(|s| s.publish_version(name)).await
    }

    async fn list_versions(&self, name: &str) -> Result<Vec<FunctionVersion>, ProviderError> {
        self.read(|s| s.list_versions(name)).await
    }

    async fn delete_function(&self, name: &str) -> Result<(), ProviderError> {
        self.mutate(|s| s.delete_function(name)).await
    }
}

#[async_trait]
impl StackOutputs for SimulatedCloud {
    async fn describe_outputs(&self, stack_name: &str) -> Result<Vec<StackOutput>, ProviderError> {
        self.read(|s| s.describe_outputs(stack_name)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn services_share_one_state() {
        let cloud = SimulatedCloud::new();
        let services = cloud.services();

        let role = services
            .roles
            .create_role("r", &serde_json::json!({ "Statement": [] }))
            .await
            .unwrap();
        assert_eq!(cloud.state().await.roles.len(), 1);
        assert!(services.roles.get_role("r").await.unwrap().is_some());
        assert!(role.arn.ends_with(":role/r"));
    }

    #[tokio::test]
    async fn flush_persists_only_file_backed_clouds() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cloud.json");

        let cloud = SimulatedCloud::open(&path).await.unwrap();
        cloud.update(|s| s.add_zone("ZEX", "example.com")).await;
        assert!(!path.exists());

        cloud.services().flush().await.unwrap();
        assert!(path.exists());

        let reopened = SimulatedCloud::open(&path).await.unwrap();
        assert_eq!(reopened.state().await.zones.len(), 1);

        SimulatedCloud::new().services().flush().await.unwrap();
    }

    #[tokio::test]
    async fn failed_mutation_leaves_state_clean() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cloud.json");
        let cloud = SimulatedCloud::open(&path).await.unwrap();

        let err = cloud.delete_role("missing").await.unwrap_err();
        assert!(err.is_not_found());

        cloud.flush().await.unwrap();
        assert!(!path.exists());
    }
}
