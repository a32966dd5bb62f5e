/*!
 * Consistency Checker
 * Full-region audit of the structural invariants
 *
 * One pass over the region, one pass over the index, and a set comparison
 * between them. The walk validates each block before navigating past it, so
 * a corrupt size field is reported instead of followed.
 */

use super::arena::Arena;
use super::free_list::class_of;
use super::layout::BlockPtr;
use super::types::{HeapError, HeapResult};
use super::Heap;
use crate::core::limits::{ALIGNMENT, MIN_BLOCK_SIZE, PROLOGUE_SIZE, SIZE_CLASS_COUNT, WORD};
use crate::core::types::Address;
use std::ptr::NonNull;

impl<A: Arena> Heap<A> {
    /// Audit every structural invariant: intact sentinels, agreeing boundary
    /// tags, aligned in-bounds sizes, no adjacent free blocks, and exact
    /// agreement between the region's free blocks and the index.
    ///
    /// O(region) scan; returns the first violation with the offending
    /// payload address.
    pub fn check(&self) -> HeapResult<()> {
        // SAFETY: reads are validated before any derived navigation.
        unsafe {
            let free_blocks = self.check_region()?;
            self.check_index(&free_blocks)
        }
    }

    /// Walk prologue to epilogue validating each block, collecting the
    /// payload addresses of the free ones in region order.
    unsafe fn check_region(&self) -> HeapResult<Vec<Address>> {
        let lo = self.arena.lo();
        let hi = self.arena.hi();

        let prologue = self.prologue;
        if prologue.size() != PROLOGUE_SIZE
            || !prologue.is_allocated()
            || prologue.header() != prologue.footer()
        {
            return Err(HeapError::CorruptionDetected(prologue.addr()));
        }

        let mut free_blocks = Vec::new();
        let mut prev_free = false;
        let mut block = prologue.next();
        loop {
            let addr = block.addr();
            let size = block.size();

            if size == 0 {
                // Epilogue: allocated header in the region's last word
                if !block.is_allocated() || addr != hi {
                    return Err(HeapError::CorruptionDetected(addr));
                }
                break;
            }
            if addr < lo + 3 * WORD
                || size % ALIGNMENT != 0
                || size < MIN_BLOCK_SIZE
                || addr + size > hi
            {
                return Err(HeapError::CorruptionDetected(addr));
            }
            if block.header() != block.footer() {
                return Err(HeapError::CorruptionDetected(addr));
            }
            if block.is_allocated() {
                prev_free = false;
            } else {
                if prev_free {
                    // Two adjacent free blocks escaped the coalescer
                    return Err(HeapError::CorruptionDetected(addr));
                }
                free_blocks.push(addr);
                prev_free = true;
            }
            block = block.next();
        }
        Ok(free_blocks)
    }

    /// Verify the index against the region scan: every listed block is a
    /// free block of the right class with symmetric links, and every free
    /// block in the region is listed exactly where `class_of` says.
    unsafe fn check_index(&self, region_free: &[Address]) -> HeapResult<()> {
        let lo = self.arena.lo();
        let hi = self.arena.hi();

        let mut listed_total = 0usize;
        for class in 0..SIZE_CLASS_COUNT {
            let mut walked = 0usize;
            let mut expected_pred: Option<BlockPtr> = None;
            for block in self.index.iter_class(class) {
                let addr = block.addr();
                if addr < lo + 3 * WORD || addr >= hi {
                    return Err(HeapError::CorruptionDetected(addr));
                }
                if block.is_allocated()
                    || class_of(block.size()) != class
                    || block.pred() != expected_pred
                {
                    return Err(HeapError::CorruptionDetected(addr));
                }
                if !region_free.contains(&addr) {
                    // Listed but not found free in the region
                    return Err(HeapError::CorruptionDetected(addr));
                }
                walked += 1;
                if walked > region_free.len() {
                    // More links than free blocks: the list must cycle
                    return Err(HeapError::CorruptionDetected(addr));
                }
                expected_pred = Some(block);
                listed_total += 1;
            }
            if walked != self.index.class_len(class) {
                return Err(HeapError::CorruptionDetected(lo));
            }
        }

        for &addr in region_free {
            let block = BlockPtr::from_payload(NonNull::new_unchecked(addr as *mut u8));
            let class = class_of(block.size());
            if self.index.find_in_class(class, addr).is_none() {
                return Err(HeapError::CorruptionDetected(addr));
            }
        }
        debug_assert_eq!(listed_total, region_free.len());
        Ok(())
    }
}
