/*!
 * Allocator Limits and Constants
 *
 * Centralized location for the allocator's tuning knobs and layout constants.
 * All values include rationale comments explaining WHY they exist.
 * Performance-critical constants are marked with [PERF].
 */

use super::types::Size;

// =============================================================================
// BLOCK LAYOUT
// =============================================================================

/// Boundary tag width (one machine word)
/// Headers and footers each store `size | allocated_bit` in a single word
pub const WORD: Size = std::mem::size_of::<usize>();

/// Double word (16 bytes)
/// Region extensions are rounded to this so block starts keep word parity
pub const DOUBLE_WORD: Size = 2 * WORD;

/// Payload alignment guarantee (8 bytes)
/// Every payload address and every block size is a multiple of this;
/// it also frees the low 3 bits of each tag for flags
pub const ALIGNMENT: Size = 8;

/// Per-block bookkeeping cost: one header plus one footer
pub const BOUNDARY_TAG_OVERHEAD: Size = 2 * WORD;

/// Smallest block the placer will ever create (32 bytes)
/// A free block must hold header + footer + the two list links that are
/// overlaid on its payload, so four words is the floor
pub const MIN_BLOCK_SIZE: Size = 4 * WORD;

/// Prologue block size: header + footer with no payload
/// The prologue and the zero-size epilogue bound every coalescing walk
pub const PROLOGUE_SIZE: Size = 2 * WORD;

// =============================================================================
// REGION GROWTH
// =============================================================================

/// Default region extension quantum (4KB)
/// Requests that miss the free lists grow the region by at least this much
/// [PERF] Amortizes arena calls across many small allocations; one page
pub const CHUNK_SIZE: Size = 1 << 12;

// =============================================================================
// FREE-LIST INDEX
// =============================================================================

/// Number of segregated size classes
/// Class 0 holds minimum-size blocks, each class doubles the range, and the
/// last class is unbounded above (~512KB+), so any block size maps somewhere
pub const SIZE_CLASS_COUNT: usize = 16;
