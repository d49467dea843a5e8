// # Function Service
//
// Capability interface over the provider's function service, restricted to
// what the edge-function lifecycle needs: probe, create, publish, list
// versions and delete.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// Version label the provider uses for the mutable, unpublished code
pub const LATEST_VERSION: &str = "$LATEST";

/// A deployed function
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeFunction {
    pub name: String,
    pub arn: String,
    pub role_arn: String,
    pub runtime: String,
    pub handler: String,
    pub description: String,
}

/// One version of a function
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionVersion {
    /// `$LATEST` or a decimal version number
    pub version: String,
    /// Qualified identifier of this version
    pub arn: String,
}

impl FunctionVersion {
    /// Numeric version, `None` for `$LATEST`
    pub fn number(&self) -> Option<u64> {
        self.version.parse().ok()
    }
}

/// Parameters of a function creation call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateFunctionRequest {
    pub name: String,
    pub description: String,
    /// Identifier of the execution role
    pub role_arn: String,
    pub runtime: String,
    /// Invocation entry point, `<file stem>.<export>`
    pub handler: String,
    /// Packaged code artifact
    pub code: Vec<u8>,
}

/// Trait for the provider's function service
#[async_trait]
pub trait FunctionService: Send + Sync {
    /// Look up a function by name; a missing function is `Ok(None)`
    async fn get_function(&self, name: &str) -> Result<Option<EdgeFunction>, ProviderError>;

    /// Create a function
    async fn create_function(
        &self,
        request: &CreateFunctionRequest,
    ) -> Result<EdgeFunction, ProviderError>;

    /// Publish an immutable version of the function's current code
    async fn publish_version(&self, name: &str) -> Result<FunctionVersion, ProviderError>;

    /// List all versions of a function, `$LATEST` included
    async fn list_versions(&self, name: &str) -> Result<Vec<FunctionVersion>, ProviderError>;

    /// Delete a function and all its versions
    async fn delete_function(&self, name: &str) -> Result<(), ProviderError>;
}
