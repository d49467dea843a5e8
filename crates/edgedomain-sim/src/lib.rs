// # edgedomain-sim
//
// Simulated cloud backend for edgedomain.
//
// Implements the hosted zone, role, function and stack output services with
// the provider's observable semantics (error codes, atomic change batches,
// version publishing, replicated-function deletion guard) over a local
// model. The model lives in memory or in a JSON snapshot file, so the CLI
// can be driven end to end and every lifecycle intent can be exercised
// without credentials.
//
// ## Usage
//
// ```rust,ignore
// let registry = edgedomain_core::BackendRegistry::new();
// edgedomain_sim::register(&registry);
// let services = registry.create_backend(&config.backend).await?;
// ```

pub mod cloud;
pub mod factory;
pub mod snapshot;
pub mod state;

pub use cloud::SimulatedCloud;
pub use factory::{FileBackendFactory, MemoryBackendFactory, register};
pub use snapshot::SnapshotFile;
pub use state::CloudState;
