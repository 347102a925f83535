//! VIGIL Core — domain models and pure logic for the security audit
//! and risk-monitoring engine.
//!
//! This crate provides:
//! - Domain models ([`models`]): audit events, security events,
//!   compliance reports, vulnerability findings
//! - The retention policy ([`retention`]) and risk scorers ([`risk`]),
//!   both pure and deterministic
//! - Store and oracle trait definitions ([`store`]) implemented by the
//!   database crate and swappable collaborators
//! - Error types ([`error`])

pub mod error;
pub mod metadata;
pub mod models;
pub mod retention;
pub mod risk;
pub mod store;

pub use error::{VigilError, VigilResult};
pub use metadata::Metadata;
