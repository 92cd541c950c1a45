//! Infrastructure implementations.
//!
//! Contains port trait implementations for external dependencies.

pub mod backend;
pub mod clock;
pub mod config;
pub mod ports;
pub mod snapshot;
