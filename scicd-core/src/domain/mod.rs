//! Core domain types
//!
//! The pipeline descriptor is what a caller submits to the orchestrator.
//! Its `phases` sub-document is what the runner executes.

pub mod pipeline;
