//! SQLite backend for the Padron registry.
//!
//! One [`SqliteStore`] type serves both roles: the primary persona store
//! (with its copy of the audit journal) and the dedicated secondary log
//! store. All database access goes through [`tokio_rusqlite`] so queries
//! run on a dedicated thread without blocking the async runtime.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
