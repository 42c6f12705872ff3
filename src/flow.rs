//! Flow plumbing: dependency ordering and the execution backend.
pub mod executor;
pub mod graph;

pub use executor::Executor;
pub use graph::FlowGraph;
