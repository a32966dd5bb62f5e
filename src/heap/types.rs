/*!
 * Heap Types
 * Common types for the heap allocator
 */

use crate::core::limits::CHUNK_SIZE;
use crate::core::types::{Address, Size};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Heap operation result
pub type HeapResult<T> = Result<T, HeapError>;

/// Heap errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HeapError {
    #[error("zero-sized request: the heap does not issue empty blocks")]
    ZeroSized,

    #[error("out of memory: requested {requested} bytes, available {available} bytes ({used} used / {capacity} capacity)")]
    OutOfMemory {
        requested: Size,
        available: Size,
        used: Size,
        capacity: Size,
    },

    #[error("heap corruption detected at 0x{0:x}")]
    CorruptionDetected(Address),
}

impl From<super::arena::ArenaExhausted> for HeapError {
    fn from(e: super::arena::ArenaExhausted) -> Self {
        HeapError::OutOfMemory {
            requested: e.requested,
            available: e.available,
            used: e.used,
            capacity: e.capacity,
        }
    }
}

/// Fit policy selector, fixed at construction time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FitKind {
    /// Take the first block that satisfies the request
    First,
    /// Take the smallest satisfying block
    Best,
    /// Resume scanning after the previous hit, wrapping around
    Next,
}

impl std::fmt::Display for FitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            FitKind::First => write!(f, "first-fit"),
            FitKind::Best => write!(f, "best-fit"),
            FitKind::Next => write!(f, "next-fit"),
        }
    }
}

/// Heap configuration
///
/// All fields have sensible defaults; set at construction via `with_config`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HeapConfig {
    /// Search strategy used by the fit selector
    pub fit: FitKind,
    /// Minimum region extension, amortizing arena calls
    pub chunk_size: Size,
}

impl Default for HeapConfig {
    fn default() -> Self {
        Self {
            fit: FitKind::First,
            chunk_size: CHUNK_SIZE,
        }
    }
}

/// Heap statistics, computed by one full region scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeapStats {
    /// Arena reservation ceiling
    pub capacity: Size,
    /// Bytes of the reservation the region has grown into
    pub region_bytes: Size,
    /// Sum of allocated block sizes, sentinels excluded
    pub allocated_bytes: Size,
    /// Sum of free block sizes
    pub free_bytes: Size,
    /// Live allocated blocks
    pub allocated_blocks: usize,
    /// Free blocks in the index
    pub free_blocks: usize,
    /// Largest single free block (0 when none)
    pub largest_free_block: Size,
    /// Allocated share of the region, 0.0 to 100.0
    pub utilization: f64,
}
