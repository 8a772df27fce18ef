//! Read-only analyses over types and flows.
pub mod compatibility;
pub mod topology;

pub use compatibility::find_assignment;
pub use topology::{dependency_graph, downstream_of, execution_levels, execution_order, DependencyGraph};
