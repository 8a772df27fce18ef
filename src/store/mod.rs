//! Module kind catalog and flow persistence records.
pub mod error;
pub mod registry;
pub mod snapshot;

pub use error::SnapshotError;
pub use registry::{ModuleCatalog, ModuleFactory, ModuleKind};
pub use snapshot::{FlowSnapshot, LinkRecord, ModuleRecord};
