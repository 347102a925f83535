//! VIGIL Database — SurrealDB connection management and store
//! implementations.
//!
//! This crate provides:
//! - Connection management ([`DbConfig`], [`DbManager`])
//! - Schema initialization and migrations ([`run_migrations`])
//! - Store trait implementations for the `vigil-core` traits
//! - Error types ([`DbError`])

mod connection;
mod error;
mod schema;
pub mod store;

pub use connection::{DbConfig, DbManager};
pub use error::DbError;
pub use schema::{run_migrations, schema_v1};
