/*!
 * segfit
 * Boundary-tag heap allocator with a segregated explicit free list
 *
 * A single-threaded `malloc`-style free-space manager over one contiguous,
 * monotonically growable region. All bookkeeping lives inside the region:
 * every block carries matching header and footer tags, and free blocks
 * thread the segregated size-class lists through their own payloads.
 */

pub mod core;
pub mod heap;

// Re-export for convenience
pub use crate::core::limits::{ALIGNMENT, CHUNK_SIZE, MIN_BLOCK_SIZE};
pub use crate::core::types::{Address, Size};
pub use heap::{
    Arena, ArenaExhausted, FitKind, FixedArena, Heap, HeapConfig, HeapError, HeapResult,
    HeapStats, LockedHeap,
};
