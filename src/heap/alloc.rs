/*!
 * Allocator Façade
 * allocate / release / resize over the segregated index
 *
 * Requests are padded with tag overhead and aligned, searched through the
 * fit policy, and placed with splitting. A miss grows the region by at
 * least one chunk and retries the search exactly once; the retry cannot
 * miss, since the extension produced a fitting free block.
 */

use super::arena::{Arena, ArenaExhausted};
use super::layout::{align_up, BlockPtr};
use super::types::{HeapError, HeapResult};
use super::Heap;
use crate::core::limits::{ALIGNMENT, BOUNDARY_TAG_OVERHEAD, DOUBLE_WORD, MIN_BLOCK_SIZE};
use crate::core::types::Size;
use std::ptr::NonNull;

/// Block size covering an `n`-byte payload: tag overhead added, rounded up
/// to ALIGNMENT, floored at MIN_BLOCK_SIZE. None when `n` is so large the
/// padding overflows the address space.
#[inline]
pub(super) fn adjusted_size(n: Size) -> Option<Size> {
    if n > Size::MAX - (BOUNDARY_TAG_OVERHEAD + ALIGNMENT) {
        return None;
    }
    Some(align_up(n + BOUNDARY_TAG_OVERHEAD, ALIGNMENT).max(MIN_BLOCK_SIZE))
}

impl<A: Arena> Heap<A> {
    /// Hand out a block with at least `size` payload bytes.
    ///
    /// The payload is ALIGNMENT-aligned and uninitialized. Zero-size
    /// requests are refused; exhaustion comes back as a typed error with
    /// the heap untouched.
    pub fn allocate(&mut self, size: Size) -> HeapResult<NonNull<u8>> {
        if size == 0 {
            return Err(HeapError::ZeroSized);
        }
        let Some(asize) = adjusted_size(size) else {
            log::error!("allocation of {size} bytes overflows the address space");
            return Err(self.out_of_memory(size));
        };

        // SAFETY: construction wrote the sentinels; every mutation below
        // re-establishes the structural invariants it relies on.
        unsafe {
            if let Some(block) = self.policy.find_fit(&self.index, asize) {
                self.place(block, asize);
                log::debug!(
                    "allocated {} bytes at {:#x} (requested {})",
                    asize,
                    block.addr(),
                    size
                );
                return Ok(block.payload());
            }

            let request = asize.max(self.config.chunk_size);
            self.extend_heap(request).map_err(|e| {
                log::error!("{e}; allocation of {size} bytes failed");
                HeapError::OutOfMemory {
                    requested: size,
                    available: e.available,
                    used: e.used,
                    capacity: e.capacity,
                }
            })?;

            let Some(block) = self.policy.find_fit(&self.index, asize) else {
                unreachable!("a fresh {request}-byte extension must satisfy a {asize}-byte fit");
            };
            self.place(block, asize);
            log::debug!(
                "allocated {} bytes at {:#x} after extension (requested {})",
                asize,
                block.addr(),
                size
            );
            Ok(block.payload())
        }
    }

    /// Return a block to the free space.
    ///
    /// # Safety
    /// `ptr` must have come from this heap's `allocate` or `resize` and not
    /// have been released since. The layout cannot distinguish a foreign or
    /// stale pointer from a live payload, so violations are undefined
    /// behavior; debug builds catch the detectable ones.
    pub unsafe fn release(&mut self, ptr: NonNull<u8>) {
        let block = BlockPtr::from_payload(ptr);
        self.debug_check_live(block);

        let size = block.size();
        block.write_tags(size, false);
        self.coalesce(block);
        log::debug!("released {} bytes at {:#x}", size, block.addr());
    }

    /// Grow or shrink a block to `new_size` payload bytes.
    ///
    /// Shrinking returns the same pointer unchanged. Growth first tries to
    /// absorb a free successor in place (no bytes move); otherwise the
    /// payload moves to a fresh block and the old one is released. On
    /// failure the old block is fully intact.
    ///
    /// # Safety
    /// Same contract as [`release`](Self::release).
    pub unsafe fn resize(&mut self, ptr: NonNull<u8>, new_size: Size) -> HeapResult<NonNull<u8>> {
        if new_size == 0 {
            return Err(HeapError::ZeroSized);
        }
        let block = BlockPtr::from_payload(ptr);
        self.debug_check_live(block);

        let Some(asize) = adjusted_size(new_size) else {
            log::error!("resize to {new_size} bytes overflows the address space");
            return Err(self.out_of_memory(new_size));
        };
        let current = block.size();

        if asize <= current {
            return Ok(ptr);
        }

        let next = block.next();
        if !next.is_allocated() && current + next.size() >= asize {
            self.index.remove(next);
            block.write_tags(current + next.size(), true);
            log::debug!(
                "resized in place to {} bytes at {:#x}",
                block.size(),
                block.addr()
            );
            return Ok(ptr);
        }

        let new_ptr = self.allocate(new_size)?;
        let moved = new_size.min(block.payload_capacity());
        std::ptr::copy_nonoverlapping(ptr.as_ptr(), new_ptr.as_ptr(), moved);
        self.release(ptr);
        log::debug!(
            "resized {} -> {} bytes, payload moved {:#x} -> {:#x}",
            current,
            asize,
            ptr.as_ptr() as usize,
            new_ptr.as_ptr() as usize
        );
        Ok(new_ptr)
    }

    /// Whether `ptr` lies strictly inside this heap's region.
    pub fn owns(&self, ptr: NonNull<u8>) -> bool {
        let addr = ptr.as_ptr() as usize;
        addr > self.arena.lo() && addr < self.arena.hi()
    }

    /// Grow the region and carve the fresh space into one free block. The
    /// block's header recycles the old epilogue word, a new epilogue is
    /// written at the new end, and the block is coalesced with any free tail.
    ///
    /// # Safety
    /// Sentinels must be intact; the arena must advance its break by exactly
    /// the rounded size.
    pub(super) unsafe fn extend_heap(&mut self, bytes: Size) -> Result<BlockPtr, ArenaExhausted> {
        if bytes > Size::MAX - DOUBLE_WORD {
            return Err(self.arena.exhausted(bytes));
        }
        let size = align_up(bytes, DOUBLE_WORD);
        let payload = self.arena.extend(size)?;
        let block = BlockPtr::from_payload(payload);
        block.write_tags(size, false);
        block.next().write_header(0, true); // fresh epilogue
        log::info!(
            "region extended by {} bytes to {} in use",
            size,
            self.arena.used()
        );
        Ok(self.coalesce(block))
    }

    /// Carve `asize` bytes off the front of a fitting free block. The
    /// remainder becomes its own free block when it can stand alone,
    /// otherwise the whole block is handed out.
    ///
    /// # Safety
    /// `block` must be indexed, free, and at least `asize` bytes.
    pub(super) unsafe fn place(&mut self, block: BlockPtr, asize: Size) {
        let whole = block.size();
        debug_assert!(whole >= asize, "placement into an undersized block");
        self.index.remove(block);

        if whole - asize >= MIN_BLOCK_SIZE {
            block.write_tags(asize, true);
            let remainder = block.next();
            remainder.write_tags(whole - asize, false);
            self.index.insert(remainder);
            log::debug!(
                "split {} bytes: kept {}, indexed a {}-byte remainder",
                whole,
                asize,
                whole - asize
            );
        } else {
            block.write_tags(whole, true);
        }
    }

    fn out_of_memory(&self, requested: Size) -> HeapError {
        let e = self.arena.exhausted(requested);
        HeapError::OutOfMemory {
            requested,
            available: e.available,
            used: e.used,
            capacity: e.capacity,
        }
    }

    /// Best-effort misuse detection on the unsafe entry points.
    ///
    /// # Safety
    /// `block` must at least point into addressable memory.
    unsafe fn debug_check_live(&self, block: BlockPtr) {
        debug_assert!(
            block.addr() % ALIGNMENT == 0,
            "payload pointer is misaligned"
        );
        debug_assert!(self.owns(block.payload()), "pointer from another region");
        debug_assert!(block.is_allocated(), "block is not live");
        debug_assert!(
            block.header() == block.footer(),
            "boundary tags disagree at {:#x}",
            block.addr()
        );
    }
}
