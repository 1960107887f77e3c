//! SciCD Core
//!
//! Types shared by the orchestrator and the in-pod runner.
//!
//! This crate contains:
//! - Domain types: the pipeline descriptor and its phase definitions
//! - Contract: where the configuration object lands inside the build pod
//!
//! The orchestrator and runner never call each other. The phase document
//! serialized here is the only thing they exchange.

pub mod contract;
pub mod domain;
