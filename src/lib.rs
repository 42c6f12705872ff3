//! Step-based matrix workflow with staged artifacts and manifest tracking.
//!
//! The pipeline generates random matrices, inverts them, reduces each to a
//! sorted cumulative-sum vector, and charts the results. Steps communicate
//! only through CSV manifests and `.npy` files in a local staging tree; a
//! small flow layer orders them by their declared upstreams and a registry
//! backs the push/checkout/pull/clean data verbs.
pub mod all;
pub mod array;
pub mod cli;
pub mod config;
pub mod flow;
pub mod manifest;
pub mod staging;
pub mod steps;

pub use all::All;
pub use manifest::Manifest;
pub use staging::{Registry, StagingPaths};
pub use steps::{RunParams, Step, StepContext};
