/*!
 * Block Layout
 * Boundary-tag encoding and block navigation
 *
 * The only module that performs raw pointer arithmetic on region memory.
 * A block is `[header | payload | footer]`; header and footer each hold one
 * word packing `size | allocated_bit`, where `size` counts the whole block.
 * A free block overlays its first two payload words with the PRED and SUCC
 * free-list links, so the same storage is payload when allocated and links
 * when free. Everything here is O(1) address arithmetic; callers keep the
 * structural invariants (sentinels intact, tags written before reads).
 */

use crate::core::limits::{ALIGNMENT, WORD};
use crate::core::types::{Address, Size};
use std::ptr::NonNull;

/// Low-bit flag marking a block as allocated
const ALLOCATED_BIT: usize = 0x1;

/// Mask clearing the three flag bits from a tag
const SIZE_MASK: usize = !0x7;

/// Pack a block size and allocated flag into one tag word.
///
/// Sizes are ALIGNMENT-multiples, so the low three bits are free for flags.
#[inline]
pub(crate) const fn pack(size: Size, allocated: bool) -> usize {
    size | (allocated as usize)
}

/// Size stored in a tag word.
#[inline]
pub(crate) const fn size_of_tag(tag: usize) -> Size {
    tag & SIZE_MASK
}

/// Allocated flag stored in a tag word.
#[inline]
pub(crate) const fn is_allocated_tag(tag: usize) -> bool {
    tag & ALLOCATED_BIT != 0
}

/// Round `x` up to the next multiple of power-of-two `align`.
#[inline]
pub(crate) const fn align_up(x: Size, align: Size) -> Size {
    (x + align - 1) & !(align - 1)
}

/// Handle to one block, addressed by its payload word.
///
/// Copyable raw handle; validity is a caller obligation. Every operation
/// assumes the handle points at the payload of a block whose header has been
/// written and whose storage is inside a live region.
#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) struct BlockPtr(NonNull<u8>);

impl BlockPtr {
    /// Wrap a payload pointer handed out by this heap.
    ///
    /// # Safety
    /// `payload` must point at the payload word of a block inside a live
    /// region (the word after a written header).
    #[inline]
    pub unsafe fn from_payload(payload: NonNull<u8>) -> Self {
        debug_assert!(payload.as_ptr() as usize % ALIGNMENT == 0);
        Self(payload)
    }

    /// The payload pointer callers see.
    #[inline]
    pub fn payload(self) -> NonNull<u8> {
        self.0
    }

    /// Payload address, for ordering and diagnostics.
    #[inline]
    pub fn addr(self) -> Address {
        self.0.as_ptr() as Address
    }

    #[inline]
    fn header_ptr(self) -> *mut usize {
        unsafe { self.0.as_ptr().sub(WORD) as *mut usize }
    }

    /// Read the header tag.
    ///
    /// # Safety
    /// The block's header must be inside the live region.
    #[inline]
    pub unsafe fn header(self) -> usize {
        self.header_ptr().read()
    }

    /// Block size from the header, whole block including both tags.
    ///
    /// # Safety
    /// Same as [`header`](Self::header).
    #[inline]
    pub unsafe fn size(self) -> Size {
        size_of_tag(self.header())
    }

    /// Allocated flag from the header.
    ///
    /// # Safety
    /// Same as [`header`](Self::header).
    #[inline]
    pub unsafe fn is_allocated(self) -> bool {
        is_allocated_tag(self.header())
    }

    /// Read the footer tag.
    ///
    /// # Safety
    /// The header must be written and the whole block inside the live region;
    /// the footer position is derived from the header's size.
    #[inline]
    pub unsafe fn footer(self) -> usize {
        self.footer_ptr().read()
    }

    #[inline]
    unsafe fn footer_ptr(self) -> *mut usize {
        self.0.as_ptr().add(self.size() - 2 * WORD) as *mut usize
    }

    /// Write only the header tag. Used for the epilogue, which has no footer.
    ///
    /// # Safety
    /// The header word must be inside the live region.
    #[inline]
    pub unsafe fn write_header(self, size: Size, allocated: bool) {
        self.header_ptr().write(pack(size, allocated));
    }

    /// Write matching header and footer tags. The footer position follows
    /// the new size, so this also moves the footer when resizing a block.
    ///
    /// # Safety
    /// The whole `size`-byte span starting at the header must be inside the
    /// live region.
    #[inline]
    pub unsafe fn write_tags(self, size: Size, allocated: bool) {
        debug_assert!(size % ALIGNMENT == 0, "block sizes are ALIGNMENT multiples");
        self.write_header(size, allocated);
        self.footer_ptr().write(pack(size, allocated));
    }

    /// The block immediately after this one.
    ///
    /// # Safety
    /// This block's header must be written; the successor exists as long as
    /// the region ends with the epilogue sentinel.
    #[inline]
    pub unsafe fn next(self) -> BlockPtr {
        BlockPtr(NonNull::new_unchecked(self.0.as_ptr().add(self.size())))
    }

    /// The block immediately before this one, located through its footer.
    ///
    /// # Safety
    /// A predecessor block with a written footer must exist; the prologue
    /// sentinel guarantees one for every block after it.
    #[inline]
    pub unsafe fn prev(self) -> BlockPtr {
        let prev_footer = self.0.as_ptr().sub(2 * WORD) as *mut usize;
        let prev_size = size_of_tag(prev_footer.read());
        BlockPtr(NonNull::new_unchecked(self.0.as_ptr().sub(prev_size)))
    }

    /// Usable payload bytes of this block.
    ///
    /// # Safety
    /// Same as [`header`](Self::header).
    #[inline]
    pub unsafe fn payload_capacity(self) -> Size {
        self.size() - 2 * WORD
    }

    #[inline]
    fn pred_slot(self) -> *mut usize {
        self.0.as_ptr() as *mut usize
    }

    #[inline]
    fn succ_slot(self) -> *mut usize {
        unsafe { self.0.as_ptr().add(WORD) as *mut usize }
    }

    /// Free-list predecessor link.
    ///
    /// # Safety
    /// The block must be free with links written; on an allocated block these
    /// words are payload and reading them as links is a logic error.
    #[inline]
    pub unsafe fn pred(self) -> Option<BlockPtr> {
        debug_assert!(!self.is_allocated(), "link read on an allocated block");
        NonNull::new(self.pred_slot().read() as *mut u8).map(BlockPtr)
    }

    /// Free-list successor link.
    ///
    /// # Safety
    /// Same as [`pred`](Self::pred).
    #[inline]
    pub unsafe fn succ(self) -> Option<BlockPtr> {
        debug_assert!(!self.is_allocated(), "link read on an allocated block");
        NonNull::new(self.succ_slot().read() as *mut u8).map(BlockPtr)
    }

    /// Set the free-list predecessor link.
    ///
    /// # Safety
    /// Same as [`pred`](Self::pred).
    #[inline]
    pub unsafe fn set_pred(self, pred: Option<BlockPtr>) {
        debug_assert!(!self.is_allocated(), "link write on an allocated block");
        self.pred_slot().write(pred.map_or(0, BlockPtr::addr));
    }

    /// Set the free-list successor link.
    ///
    /// # Safety
    /// Same as [`pred`](Self::pred).
    #[inline]
    pub unsafe fn set_succ(self, succ: Option<BlockPtr>) {
        debug_assert!(!self.is_allocated(), "link write on an allocated block");
        self.succ_slot().write(succ.map_or(0, BlockPtr::addr));
    }
}

impl std::fmt::Debug for BlockPtr {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "BlockPtr({:#x})", self.addr())
    }
}

/// Forward walk over the real blocks of a region, prologue and epilogue
/// excluded. Stops at the zero-size epilogue header.
pub(crate) struct RegionIter {
    cursor: BlockPtr,
}

impl RegionIter {
    /// # Safety
    /// `prologue` must be the prologue sentinel of a region whose structural
    /// invariants hold for the duration of the walk.
    pub unsafe fn new(prologue: BlockPtr) -> Self {
        Self {
            cursor: prologue.next(),
        }
    }
}

impl Iterator for RegionIter {
    type Item = BlockPtr;

    fn next(&mut self) -> Option<BlockPtr> {
        unsafe {
            if self.cursor.size() == 0 {
                return None;
            }
            let block = self.cursor;
            self.cursor = block.next();
            Some(block)
        }
    }
}
