//! SciCD Orchestrator library
//!
//! Launch logic behind the `scicd-orchestrator` binary.

pub mod cluster;
pub mod config;
pub mod error;
pub mod quantity;
pub mod service;
pub mod settle;
