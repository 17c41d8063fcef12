//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - DuckDB for the Repository port
//! - In-process services for the RecordStore port (local backend)
//! - reqwest HTTP client for the RecordStore port (remote backend)

pub mod duckdb;
pub mod local;
pub mod remote;

pub use local::LocalStore;
pub use remote::RemoteStore;
