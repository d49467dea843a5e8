//! Edge function lifecycle
//!
//! Manages two resources that share one name: the execution role (with the
//! managed execution policy attached) and the edge function with a published
//! version. Every run re-probes both, so any of the four combinations of
//! {role present/absent} x {function present/absent} is a valid start.
//!
//! ## Ordering
//!
//! - Create: role first, then function (the function needs the role's id)
//! - Remove: function first, then role (the function depends on the role)
//!
//! ## Propagation delay
//!
//! A freshly created role is not immediately assumable by the edge runtime.
//! After attaching its policy the manager sleeps a fixed
//! `role_propagation_delay` before creating the function. This is a plain
//! timer, not a readiness poll.
//!
//! An existing role is checked for the execution policy, so a run that died
//! between creating the role and attaching the policy is repaired (and waits
//! out the delay) on the next run.

use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::error::{Error, ProviderError, Result};
use crate::package::FunctionPackage;
use crate::retry::BackoffRetrier;
use crate::traits::{
    CreateFunctionRequest, EdgeFunction, FunctionService, FunctionVersion, Role, RoleService,
};

/// Managed policy granting the function permission to write its logs
pub const EXECUTION_POLICY_ARN: &str =
    "arn:aws:iam::aws:policy/service-role/AWSLambdaBasicExecutionRole";

/// Service principals allowed to assume the execution role
pub const TRUSTED_PRINCIPALS: [&str; 2] = ["lambda.amazonaws.com", "edgelambda.amazonaws.com"];

/// Runtime the packaged handler is written for
pub const FUNCTION_RUNTIME: &str = "nodejs20.x";

/// Assume-role policy for the execution role
pub fn trust_policy() -> serde_json::Value {
    json!({
        "Version": "2012-10-17",
        "Statement": [
            {
                "Effect": "Allow",
                "Principal": { "Service": TRUSTED_PRINCIPALS },
                "Action": "sts:AssumeRole"
            }
        ]
    })
}

/// What a create run changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateOutcome {
    /// The role did not exist and was created
    pub role_created: bool,
    /// The function did not exist and was created
    pub function_created: bool,
    /// Version published by this run, if the function was created
    pub published_version: Option<FunctionVersion>,
}

/// What a remove run changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveOutcome {
    /// The function existed and was deleted
    pub function_deleted: bool,
    /// The role existed and was deleted
    pub role_deleted: bool,
}

/// Drives create/remove of the execution role and the edge function
#[derive(Clone)]
pub struct EdgeFunctionManager {
    roles: Arc<dyn RoleService>,
    functions: Arc<dyn FunctionService>,
    retrier: BackoffRetrier,
    name: String,
    description: String,
}

impl EdgeFunctionManager {
    /// Create a manager for the role and function called `name`
    pub fn new(
        roles: Arc<dyn RoleService>,
        functions: Arc<dyn FunctionService>,
        retrier: BackoffRetrier,
        name: impl Into<String>,
    ) -> Self {
        let name = name.into();
        Self {
            roles,
            functions,
            retrier,
            description: format!("Edge request handler {}", name),
            name,
        }
    }

    /// Set the description stored on a newly created function
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Name shared by the role and the function
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ensure the role and the function exist
    ///
    /// Each resource is created only if its probe finds it missing, so the
    /// call is safe to repeat after a failure at any step.
    pub async fn create(&self, package: &FunctionPackage) -> Result<CreateOutcome> {
        let (role, role_created) = match self.probe_role().await? {
            Some(role) => {
                info!("Role {} already exists, skipping...", self.name);
                (role, false)
            }
            None => (self.create_role().await?, true),
        };

        if role_created || !self.policy_attached().await? {
            self.attach_policy().await?;
        }

        let published_version = match self.probe_function().await? {
            Some(_) => {
                info!("Edge function {} already exists, skipping...", self.name);
                None
            }
            None => Some(self.create_function(&role, package).await?),
        };

        Ok(CreateOutcome {
            role_created,
            function_created: published_version.is_some(),
            published_version,
        })
    }

    /// Remove the function, then the role
    ///
    /// A function still replicated to a distribution aborts the run with
    /// [`Error::FunctionStillAttached`] and the role is left alone. Any failure
    /// on the role side, lookup included, is logged and reported through the
    /// outcome only.
    pub async fn remove(&self) -> Result<RemoveOutcome> {
        info!("Attempting to delete edge function {}...", self.name);
        let function_deleted = match self.probe_function().await? {
            Some(_) => {
                self.delete_function().await?;
                info!("Edge function {} has been deleted", self.name);
                true
            }
            None => {
                info!("Edge function {} doesn't exist, skipping.", self.name);
                false
            }
        };

        info!("Attempting to delete role {}...", self.name);
        let role_deleted = match self.probe_role().await {
            Ok(Some(_)) => match self.delete_role().await {
                Ok(()) => {
                    info!("Role {} has been deleted", self.name);
                    true
                }
                Err(e) => {
                    error!("Failed to delete role {}: {}", self.name, e);
                    false
                }
            },
            Ok(None) => {
                info!("Role {} doesn't exist, skipping.", self.name);
                false
            }
            Err(e) => {
                error!("{}; leaving the role in place", e);
                false
            }
        };

        Ok(RemoveOutcome {
            function_deleted,
            role_deleted,
        })
    }

    /// Identifier of the newest published version, for attaching to a
    /// distribution
    pub async fn published_version_arn(&self) -> Result<String> {
        let versions = match self
            .retrier
            .execute("list function versions", || {
                self.functions.list_versions(&self.name)
            })
            .await
        {
            Ok(versions) => versions,
            Err(e) if e.is_not_found() => Vec::new(),
            Err(e) => return Err(Error::provider("list versions of edge function", &self.name, e)),
        };

        versions
            .into_iter()
            .filter_map(|v| v.number().map(|n| (n, v)))
            .max_by_key(|(n, _)| *n)
            .map(|(_, v)| v.arn)
            .ok_or_else(|| Error::VersionNotFound {
                function_name: self.name.clone(),
            })
    }

    async fn probe_role(&self) -> Result<Option<Role>> {
        self.retrier
            .execute("get role", || self.roles.get_role(&self.name))
            .await
            .map_err(|e| Error::provider("look up role", &self.name, e))
    }

    async fn probe_function(&self) -> Result<Option<EdgeFunction>> {
        self.retrier
            .execute("get function", || self.functions.get_function(&self.name))
            .await
            .map_err(|e| Error::provider("look up edge function", &self.name, e))
    }

    async fn create_role(&self) -> Result<Role> {
        info!("Creating role {}...", self.name);
        let policy = trust_policy();
        let role = self
            .retrier
            .execute("create role", || self.roles.create_role(&self.name, &policy))
            .await
            .map_err(|e| Error::provider("create role", &self.name, e))?;

        info!("Role {} successfully created", self.name);
        Ok(role)
    }

    async fn policy_attached(&self) -> Result<bool> {
        let policies = self
            .retrier
            .execute("list attached role policies", || {
                self.roles.list_attached_policies(&self.name)
            })
            .await
            .map_err(|e| Error::provider("list policies of role", &self.name, e))?;

        let attached = policies.iter().any(|p| p == EXECUTION_POLICY_ARN);
        if !attached {
            warn!("Role {} is missing its execution policy", self.name);
        }
        Ok(attached)
    }

    /// Attach the execution policy and wait for the role to propagate
    async fn attach_policy(&self) -> Result<()> {
        info!("Attaching execution policy to role {}...", self.name);
        self.retrier
            .execute("attach role policy", || {
                self.roles.attach_role_policy(&self.name, EXECUTION_POLICY_ARN)
            })
            .await
            .map_err(|e| Error::provider("attach execution policy to role", &self.name, e))?;

        let delay = self.retrier.policy().role_propagation_delay();
        info!(
            "Policy attached, waiting {}s for the role to propagate...",
            delay.as_secs()
        );
        tokio::time::sleep(delay).await;

        Ok(())
    }

    async fn create_function(
        &self,
        role: &Role,
        package: &FunctionPackage,
    ) -> Result<FunctionVersion> {
        info!("Creating edge function {}...", self.name);
        let request = CreateFunctionRequest {
            name: self.name.clone(),
            description: self.description.clone(),
            role_arn: role.arn.clone(),
            runtime: FUNCTION_RUNTIME.to_string(),
            handler: package.entry_point().to_string(),
            code: package.code(),
        };

        self.retrier
            .execute("create function", || self.functions.create_function(&request))
            .await
            .map_err(|e| Error::provider("create edge function", &self.name, e))?;

        info!("Edge function created, publishing version...");
        let version = self
            .retrier
            .execute("publish version", || self.functions.publish_version(&self.name))
            .await
            .map_err(|e| Error::provider("publish a version of edge function", &self.name, e))?;

        info!("Published version {} ({})", version.version, version.arn);
        Ok(version)
    }

    async fn delete_function(&self) -> Result<()> {
        match self
            .retrier
            .execute("delete function", || self.functions.delete_function(&self.name))
            .await
        {
            Ok(()) => Ok(()),
            Err(e) if e.is_replicated_function() => {
                error!("Edge function {} is still replicated: {}", self.name, e);
                Err(Error::FunctionStillAttached {
                    function_name: self.name.clone(),
                })
            }
            Err(e) if e.is_not_found() => {
                info!("Edge function {} disappeared before deletion", self.name);
                Ok(())
            }
            Err(e) => Err(Error::provider("delete edge function", &self.name, e)),
        }
    }

    async fn delete_role(&self) -> std::result::Result<(), ProviderError> {
        match self
            .retrier
            .execute("detach role policy", || {
                self.roles.detach_role_policy(&self.name, EXECUTION_POLICY_ARN)
            })
            .await
        {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        match self
            .retrier
            .execute("delete role", || self.roles.delete_role(&self.name))
            .await
        {
            Err(e) if e.is_not_found() => Ok(()),
            other => other,
        }
    }
}
