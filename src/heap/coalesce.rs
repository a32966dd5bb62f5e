/*!
 * Coalescer
 * Eager merging of adjacent free blocks
 *
 * Runs on every release and extension, so no two free blocks are ever
 * adjacent. The allocated prologue and epilogue sentinels bound each merge;
 * a probe can reach them but never passes them.
 */

use super::arena::Arena;
use super::layout::BlockPtr;
use super::Heap;
use crate::core::limits::WORD;

impl<A: Arena> Heap<A> {
    /// Merge a free, unindexed block with whichever neighbors are free and
    /// insert the result into the index. Returns the merged block.
    ///
    /// Four mutually exclusive cases by neighbor state: both allocated
    /// (keep as-is), free successor (absorb forward), free predecessor
    /// (absorb backward), both free (absorb both).
    ///
    /// # Safety
    /// `block` must be a free-tagged, unindexed block inside the live
    /// region, with both sentinels intact.
    pub(super) unsafe fn coalesce(&mut self, block: BlockPtr) -> BlockPtr {
        let prev = block.prev();
        let next = block.next();
        debug_assert!(prev.addr() >= self.arena.lo() + WORD, "probe below the prologue");
        debug_assert!(next.addr() <= self.arena.hi(), "probe past the epilogue");

        let original_size = block.size();
        let merged = match (prev.is_allocated(), next.is_allocated()) {
            (true, true) => block,
            (true, false) => {
                self.index.remove(next);
                block.write_tags(block.size() + next.size(), false);
                block
            }
            (false, true) => {
                self.index.remove(prev);
                prev.write_tags(prev.size() + block.size(), false);
                prev
            }
            (false, false) => {
                self.index.remove(prev);
                self.index.remove(next);
                prev.write_tags(prev.size() + block.size() + next.size(), false);
                prev
            }
        };

        if merged.size() != original_size {
            log::debug!(
                "coalesced neighbors into {} bytes at {:#x}",
                merged.size(),
                merged.addr()
            );
        }
        self.index.insert(merged);
        merged
    }
}
