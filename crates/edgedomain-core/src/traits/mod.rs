//! Capability interfaces for the edgedomain system
//!
//! Each provider service is represented by a narrow trait exposing only the
//! operations the reconciliation engine consumes, so tests can substitute
//! doubles without reproducing a full SDK surface.
//!
//! - [`HostedZoneService`]: List zones, list records, submit change batches
//! - [`RoleService`]: Execution role and managed policy attachment
//! - [`FunctionService`]: Edge function and its published versions
//! - [`StackOutputs`]: Outputs of the deployed stack

pub mod backend;
pub mod function;
pub mod hosted_zone;
pub mod role;
pub mod stack;

pub use backend::{BackendFlush, CloudBackendFactory, CloudServices};
pub use function::{
    CreateFunctionRequest, EdgeFunction, FunctionService, FunctionVersion, LATEST_VERSION,
};
pub use hosted_zone::{
    AliasTarget, ChangeAction, ChangeBatch, HostedZone, HostedZoneService, RecordChange,
    RecordType, ResourceRecord,
};
pub use role::{Role, RoleService};
pub use stack::{StackOutput, StackOutputs};
