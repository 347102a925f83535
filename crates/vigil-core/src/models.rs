//! Domain models for VIGIL.
//!
//! These are the core types shared across all crates.

pub mod audit;
pub mod compliance;
pub mod security;
pub mod vulnerability;
