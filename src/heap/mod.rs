/*!
 * Heap
 * Explicit allocator context over one growable region
 *
 * ## Architecture
 * - **Block layout**: boundary tags (header + footer words) around every
 *   payload, free-list links overlaid on free payloads
 * - **Free-list index**: segregated doubling size classes, LIFO membership
 * - **Coalescer**: eager 4-case merging bounded by sentinel blocks
 * - **Fit selector**: first/best/next-fit strategy fixed at construction
 * - **Arena**: backing reservation growing at the break, never relocating
 *
 * The `Heap` is an explicit context object; nothing lives in globals. All
 * metadata sits inside the region itself, so the allocator's own footprint
 * is a few words of bookkeeping.
 */

mod alloc;
mod arena;
mod check;
mod coalesce;
mod free_list;
mod layout;
mod locked;
mod policy;
mod types;

pub use arena::{Arena, ArenaExhausted, FixedArena};
pub use locked::LockedHeap;
pub use types::{FitKind, HeapConfig, HeapError, HeapResult, HeapStats};

use crate::core::limits::{ALIGNMENT, MIN_BLOCK_SIZE, PROLOGUE_SIZE, WORD};
use crate::core::types::Address;
use free_list::SegregatedFreeList;
use layout::{BlockPtr, RegionIter};
use policy::FitPolicy;
use std::ptr::NonNull;

/// Boundary-tag heap allocator with a segregated explicit free list.
///
/// One logical owner drives it through `&mut self`; wrap it in
/// [`LockedHeap`] to share across threads.
pub struct Heap<A: Arena> {
    arena: A,
    index: SegregatedFreeList,
    policy: Box<dyn FitPolicy>,
    config: HeapConfig,
    prologue: BlockPtr,
}

impl<A: Arena> Heap<A> {
    /// Build a heap with the default configuration.
    pub fn new(arena: A) -> HeapResult<Self> {
        Self::with_config(arena, HeapConfig::default())
    }

    /// Build a heap with an explicit configuration.
    ///
    /// Writes the prologue and epilogue sentinels at the arena's base, then
    /// grows the region by one chunk so the heap starts with a single free
    /// block. Fails with `OutOfMemory` when the arena cannot cover that.
    pub fn with_config(mut arena: A, config: HeapConfig) -> HeapResult<Self> {
        let base = arena.extend(PROLOGUE_SIZE + WORD)?;
        debug_assert!(
            base.as_ptr() as usize % ALIGNMENT == 0,
            "arena base must be ALIGNMENT-aligned"
        );

        // SAFETY: the bootstrap words were just reserved; the prologue's
        // header/footer and the initial epilogue tile them exactly.
        let prologue = unsafe {
            let prologue = BlockPtr::from_payload(NonNull::new_unchecked(base.as_ptr().add(WORD)));
            prologue.write_tags(PROLOGUE_SIZE, true);
            prologue.next().write_header(0, true);
            prologue
        };

        let mut heap = Self {
            arena,
            index: SegregatedFreeList::new(),
            policy: config.fit.build(),
            config,
            prologue,
        };
        // SAFETY: sentinels are in place; the extension recycles the epilogue.
        unsafe {
            heap.extend_heap(config.chunk_size.max(MIN_BLOCK_SIZE))?;
        }
        log::info!(
            "heap initialized: {} over a {}-byte reservation, {}-byte chunks",
            heap.policy.name(),
            heap.arena.capacity(),
            heap.config.chunk_size
        );
        Ok(heap)
    }

    /// Statistics from one full region scan. O(blocks).
    pub fn stats(&self) -> HeapStats {
        let mut stats = HeapStats {
            capacity: self.arena.capacity(),
            region_bytes: self.arena.used(),
            allocated_bytes: 0,
            free_bytes: 0,
            allocated_blocks: 0,
            free_blocks: 0,
            largest_free_block: 0,
            utilization: 0.0,
        };
        // SAFETY: structural invariants hold between operations.
        unsafe {
            for block in RegionIter::new(self.prologue) {
                let size = block.size();
                if block.is_allocated() {
                    stats.allocated_bytes += size;
                    stats.allocated_blocks += 1;
                } else {
                    stats.free_bytes += size;
                    stats.free_blocks += 1;
                    stats.largest_free_block = stats.largest_free_block.max(size);
                }
            }
        }
        if stats.region_bytes > 0 {
            stats.utilization = stats.allocated_bytes as f64 / stats.region_bytes as f64 * 100.0;
        }
        stats
    }

    /// The live span as `(lo, hi)`; grows at `hi`, never relocates.
    pub fn region_bounds(&self) -> (Address, Address) {
        (self.arena.lo(), self.arena.hi())
    }

    /// The configuration this heap was built with.
    pub fn config(&self) -> HeapConfig {
        self.config
    }
}

impl<A: Arena> std::fmt::Debug for Heap<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Heap")
            .field("lo", &format_args!("{:#x}", self.arena.lo()))
            .field("hi", &format_args!("{:#x}", self.arena.hi()))
            .field("policy", &self.policy.name())
            .field("indexed_free_blocks", &self.index.len())
            .finish()
    }
}
