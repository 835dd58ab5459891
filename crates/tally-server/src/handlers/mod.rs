//! HTTP request handlers organized by domain
//!
//! Each submodule contains handlers for a specific API area.

pub mod analytics;
pub mod categories;
pub mod expenses;
pub mod health;

// Re-export all handlers for use in router
pub use analytics::*;
pub use categories::*;
pub use expenses::*;
pub use health::*;
