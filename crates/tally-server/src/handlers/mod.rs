//! HTTP request handlers organized by domain
//!
//! Each submodule contains handlers for a specific API area.

pub mod health;
pub mod ingest;
pub mod query;
pub mod summary;

// Re-export all handlers for use in router
pub use health::*;
pub use ingest::*;
pub use query::*;
pub use summary::*;
