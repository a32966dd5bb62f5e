/*!
 * Core Module
 * Fundamental allocator types and constants
 */

pub mod limits;
pub mod types;

// Re-export for convenience
pub use types::*;
