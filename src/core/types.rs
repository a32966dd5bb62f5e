/*!
 * Core Types
 * Common types used across the allocator
 */

/// Address type for region arithmetic
pub type Address = usize;

/// Size type for byte counts
pub type Size = usize;
