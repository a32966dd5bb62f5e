/*!
 * Arena
 * Backing-memory collaborator: a contiguous reservation that grows at the
 * break and never relocates
 */

use super::layout::align_up;
use crate::core::limits::{ALIGNMENT, WORD};
use crate::core::types::{Address, Size};
use std::alloc::{alloc, dealloc, handle_alloc_error, Layout};
use std::ptr::NonNull;
use thiserror::Error;

/// Arena refusal: the reservation cannot cover the requested extension
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("arena exhausted: requested {requested} bytes, available {available} bytes ({used} used / {capacity} capacity)")]
pub struct ArenaExhausted {
    pub requested: Size,
    pub available: Size,
    pub used: Size,
    pub capacity: Size,
}

/// Backing memory for one heap.
///
/// The span `[lo, hi)` is the live region. `extend` moves the break up and
/// hands back the previous break; the span never relocates and never shrinks.
///
/// Implementations must advance the break by exactly `bytes` on success:
/// the heap's extension arithmetic recycles the word just below the old
/// break, so any slack would orphan it.
pub trait Arena {
    /// Grow the region by `bytes` (a positive word multiple) and return the
    /// old break on success. Fresh contents are unspecified. On refusal the
    /// break is unchanged.
    fn extend(&mut self, bytes: Size) -> Result<NonNull<u8>, ArenaExhausted>;

    /// First address of the region, `ALIGNMENT`-aligned.
    fn lo(&self) -> Address;

    /// Current break, one past the last usable byte.
    fn hi(&self) -> Address;

    /// Reservation ceiling in bytes.
    fn capacity(&self) -> Size;

    /// Bytes the region currently occupies.
    fn used(&self) -> Size {
        self.hi() - self.lo()
    }

    /// Bytes still available for extension.
    fn available(&self) -> Size {
        self.capacity() - self.used()
    }

    /// Build the refusal record for a `requested` extension.
    fn exhausted(&self, requested: Size) -> ArenaExhausted {
        ArenaExhausted {
            requested,
            available: self.available(),
            used: self.used(),
            capacity: self.capacity(),
        }
    }
}

/// Fixed-capacity arena: one up-front reservation with a break pointer.
///
/// The whole capacity is reserved at construction, so `extend` is a bounds
/// check and a pointer bump. Fresh bytes are uninitialized; the heap writes
/// boundary tags before it ever reads them.
pub struct FixedArena {
    base: NonNull<u8>,
    capacity: Size,
    brk: Size,
}

// One owner; the reservation is reachable only through `base`.
unsafe impl Send for FixedArena {}

impl FixedArena {
    /// Reserve `bytes` (rounded up to a word multiple) of backing memory.
    ///
    /// Panics when `bytes` exceeds the address space a `Layout` can describe.
    pub fn with_capacity(bytes: Size) -> Self {
        assert!(
            bytes <= isize::MAX as Size - ALIGNMENT - WORD,
            "arena capacity exceeds the address space"
        );
        let capacity = align_up(bytes, WORD);
        if capacity == 0 {
            return Self {
                base: NonNull::dangling(),
                capacity: 0,
                brk: 0,
            };
        }
        // Word-rounded and in range per the assert above, so the layout is
        // valid and lo() satisfies the trait's alignment guarantee.
        let layout = unsafe { Layout::from_size_align_unchecked(capacity, ALIGNMENT) };
        let base = unsafe { alloc(layout) };
        let Some(base) = NonNull::new(base) else {
            handle_alloc_error(layout);
        };
        Self {
            base,
            capacity,
            brk: 0,
        }
    }
}

impl Arena for FixedArena {
    fn extend(&mut self, bytes: Size) -> Result<NonNull<u8>, ArenaExhausted> {
        debug_assert!(bytes > 0 && bytes % WORD == 0, "extension must be a positive word multiple");
        if bytes > self.available() {
            return Err(self.exhausted(bytes));
        }
        let old_break = unsafe { NonNull::new_unchecked(self.base.as_ptr().add(self.brk)) };
        self.brk += bytes;
        Ok(old_break)
    }

    fn lo(&self) -> Address {
        self.base.as_ptr() as Address
    }

    fn hi(&self) -> Address {
        self.lo() + self.brk
    }

    fn capacity(&self) -> Size {
        self.capacity
    }
}

impl Drop for FixedArena {
    fn drop(&mut self) {
        if self.capacity > 0 {
            unsafe {
                let layout = Layout::from_size_align_unchecked(self.capacity, ALIGNMENT);
                dealloc(self.base.as_ptr(), layout);
            }
        }
    }
}

impl std::fmt::Debug for FixedArena {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("FixedArena")
            .field("lo", &format_args!("{:#x}", self.lo()))
            .field("brk", &self.brk)
            .field("capacity", &self.capacity)
            .finish()
    }
}
