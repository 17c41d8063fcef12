//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The core domain
//! depends only on these traits, not on concrete implementations.
//!
//! - [`Repository`]: persistence, implemented by the DuckDB adapter
//! - [`RecordStore`]: the record operations callers use, implemented by the
//!   local and remote adapters

mod record_store;
mod repository;

pub use record_store::RecordStore;
pub use repository::Repository;
