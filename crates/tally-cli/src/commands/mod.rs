//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Init and shared utilities (open_db, load_config)
//! - `import` - CSV ingest and ingest history
//! - `ask` - Question answering
//! - `summary` - Monthly report
//! - `serve` - Web server command

pub mod ask;
pub mod core;
pub mod import;
pub mod serve;
pub mod summary;

// Re-export command functions for main.rs
pub use ask::*;
pub use core::*;
pub use import::*;
pub use serve::*;
pub use summary::*;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
