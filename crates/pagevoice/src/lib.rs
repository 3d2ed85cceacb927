//! `pagevoice` crate (library surface).
//!
//! The primary entrypoint for end users is the `pagevoice` binary. This library module
//! exists to support embedding without depending on internal crate layout.

pub use pagevoice_core as core;
pub use pagevoice_local as local;
