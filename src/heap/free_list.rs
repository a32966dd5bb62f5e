/*!
 * Segregated Free List
 * Size-class index over free blocks, threaded through their payloads
 *
 * The index itself stores only one head pointer per class; the PRED/SUCC
 * links live inside the free blocks. Classes double in range so lookups
 * start close to the request size, and membership is LIFO: a freed block is
 * pushed at its class head.
 */

use super::layout::BlockPtr;
use crate::core::limits::{MIN_BLOCK_SIZE, SIZE_CLASS_COUNT};
use crate::core::types::{Address, Size};

/// Size class for a block size: class 0 holds minimum-size blocks, each
/// class doubles the upper bound, the last class is unbounded above.
#[inline]
pub(crate) fn class_of(size: Size) -> usize {
    debug_assert!(size >= MIN_BLOCK_SIZE);
    // Clamp before rounding: every size past the last class boundary lands
    // in the unbounded class, and next_power_of_two overflows above 2^63.
    let size = size.min(MIN_BLOCK_SIZE << (SIZE_CLASS_COUNT - 1));
    let bucket = size.next_power_of_two().trailing_zeros() - MIN_BLOCK_SIZE.trailing_zeros();
    (bucket as usize).min(SIZE_CLASS_COUNT - 1)
}

/// Segregated free-list index.
pub(crate) struct SegregatedFreeList {
    heads: [Option<BlockPtr>; SIZE_CLASS_COUNT],
    counts: [usize; SIZE_CLASS_COUNT],
}

impl SegregatedFreeList {
    pub fn new() -> Self {
        Self {
            heads: [None; SIZE_CLASS_COUNT],
            counts: [0; SIZE_CLASS_COUNT],
        }
    }

    /// Free blocks currently indexed.
    pub fn len(&self) -> usize {
        self.counts.iter().sum()
    }

    pub fn class_len(&self, class: usize) -> usize {
        self.counts[class]
    }

    /// Push a free block at its class head.
    ///
    /// # Safety
    /// `block` must be a free-tagged block inside the live region, not
    /// already in any list.
    pub unsafe fn insert(&mut self, block: BlockPtr) {
        let class = class_of(block.size());
        block.set_pred(None);
        block.set_succ(self.heads[class]);
        if let Some(head) = self.heads[class] {
            head.set_pred(Some(block));
        }
        self.heads[class] = Some(block);
        self.counts[class] += 1;
    }

    /// Unlink a listed block in O(1) through its own links.
    ///
    /// # Safety
    /// `block` must currently be in the index, with the same size it was
    /// inserted under.
    pub unsafe fn remove(&mut self, block: BlockPtr) {
        let class = class_of(block.size());
        let pred = block.pred();
        let succ = block.succ();
        match pred {
            Some(p) => p.set_succ(succ),
            None => {
                debug_assert!(self.heads[class] == Some(block), "unlisted block removal");
                self.heads[class] = succ;
            }
        }
        if let Some(s) = succ {
            s.set_pred(pred);
        }
        block.set_pred(None);
        block.set_succ(None);
        self.counts[class] -= 1;
    }

    /// Walk one class list from its head.
    ///
    /// # Safety
    /// The list must stay unmodified for the iterator's lifetime.
    pub unsafe fn iter_class(&self, class: usize) -> ClassIter {
        ClassIter {
            cursor: self.heads[class],
        }
    }

    /// Find the listed block with the given payload address, if any.
    ///
    /// # Safety
    /// Same as [`iter_class`](Self::iter_class).
    pub unsafe fn find_in_class(&self, class: usize, addr: Address) -> Option<BlockPtr> {
        self.iter_class(class).find(|b| b.addr() == addr)
    }
}

/// Forward iterator over one class list.
pub(crate) struct ClassIter {
    cursor: Option<BlockPtr>,
}

impl Iterator for ClassIter {
    type Item = BlockPtr;

    fn next(&mut self) -> Option<BlockPtr> {
        let block = self.cursor?;
        // SAFETY: constructor contract: the list is consistent and unmodified.
        self.cursor = unsafe { block.succ() };
        Some(block)
    }
}
