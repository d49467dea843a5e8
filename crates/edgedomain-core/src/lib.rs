// # edgedomain-core
//
// Core library for attaching a custom domain and an edge request handler to
// an already deployed content distribution.
//
// ## Architecture Overview
//
// - **HostedZoneService / RoleService / FunctionService / StackOutputs**:
//   Narrow capability traits over the cloud provider
// - **BackoffRetrier**: Jittered backoff around every provider call
// - **ZoneResolver**: Most specific hosted zone owning a domain
// - **RecordReconciler**: Atomic A/AAAA alias change batches
// - **EdgeFunctionManager**: Execution role and edge function lifecycle
// - **FunctionPackage**: Handler source rendered from configuration
// - **BackendRegistry**: Plugin-based registry for cloud backends
// - **WebsiteDomain**: Entry point tying the pieces to one configuration
//
// ## Design Principles
//
// 1. **Idempotency**: Every operation probes current state and only changes
//    what is missing, so a failed run is fixed by running it again
// 2. **Plugin-Based**: Backends are registered dynamically, no hard-coded if-else
// 3. **Library-First**: The CLI is a thin wrapper over `WebsiteDomain`

pub mod config;
pub mod domain;
pub mod edge;
pub mod error;
pub mod handler;
pub mod package;
pub mod records;
pub mod registry;
pub mod retry;
pub mod traits;
pub mod zone;

// Re-export core types for convenience
pub use config::{BackendConfig, EdgeConfig, RedirectRule, RetryPolicy, WebsiteDomainConfig};
pub use domain::{DomainOutcome, WebsiteDomain};
pub use edge::{CreateOutcome, EdgeFunctionManager, RemoveOutcome};
pub use error::{Error, ProviderError, Result};
pub use handler::{EdgeDecision, EdgeRequest, HandlerSettings};
pub use package::FunctionPackage;
pub use records::{DomainRecordSet, RecordReconciler};
pub use registry::BackendRegistry;
pub use retry::BackoffRetrier;
pub use traits::{CloudServices, FunctionService, HostedZoneService, RoleService, StackOutputs};
pub use zone::ZoneResolver;
