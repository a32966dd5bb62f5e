/*!
 * Fit Selector
 * Search strategies over the segregated index
 *
 * One strategy object is built at heap construction and consulted on every
 * allocation. The contract is completeness, never placement quality: if any
 * indexed block satisfies the request, a block comes back. Blocks below the
 * request's own class cannot satisfy it (their class upper bound is smaller),
 * so every scan starts at `class_of(asize)`.
 */

use super::free_list::{class_of, SegregatedFreeList};
use super::layout::BlockPtr;
use super::types::FitKind;
use crate::core::limits::SIZE_CLASS_COUNT;
use crate::core::types::{Address, Size};

/// Search strategy seam for the allocator façade.
pub(crate) trait FitPolicy {
    /// Find a free block with `size >= asize`, or none.
    ///
    /// # Safety
    /// The index and every listed block must be consistent for the duration
    /// of the search.
    unsafe fn find_fit(&mut self, index: &SegregatedFreeList, asize: Size) -> Option<BlockPtr>;

    fn name(&self) -> &'static str;
}

impl FitKind {
    /// Build the strategy object this selector names.
    pub(crate) fn build(self) -> Box<dyn FitPolicy> {
        match self {
            FitKind::First => Box::new(FirstFit),
            FitKind::Best => Box::new(BestFit),
            FitKind::Next => Box::new(NextFit::new()),
        }
    }
}

/// First satisfying block in one class list, scanning from its head.
///
/// # Safety
/// Same contract as [`FitPolicy::find_fit`].
unsafe fn scan_class(
    index: &SegregatedFreeList,
    class: usize,
    asize: Size,
) -> Option<BlockPtr> {
    for block in index.iter_class(class) {
        if block.size() >= asize {
            return Some(block);
        }
    }
    None
}

/// Take the first block that fits, scanning classes upward.
#[derive(Default)]
pub(crate) struct FirstFit;

impl FitPolicy for FirstFit {
    unsafe fn find_fit(&mut self, index: &SegregatedFreeList, asize: Size) -> Option<BlockPtr> {
        for class in class_of(asize)..SIZE_CLASS_COUNT {
            if let Some(block) = scan_class(index, class, asize) {
                return Some(block);
            }
        }
        None
    }

    fn name(&self) -> &'static str {
        "first-fit"
    }
}

/// Take the smallest block that fits.
///
/// Classes partition sizes, so once any class yields a candidate no later
/// class can hold a smaller one; the scan stops at the end of that class.
#[derive(Default)]
pub(crate) struct BestFit;

impl FitPolicy for BestFit {
    unsafe fn find_fit(&mut self, index: &SegregatedFreeList, asize: Size) -> Option<BlockPtr> {
        let mut best: Option<(Size, BlockPtr)> = None;
        for class in class_of(asize)..SIZE_CLASS_COUNT {
            for block in index.iter_class(class) {
                let size = block.size();
                if size < asize {
                    continue;
                }
                if size == asize {
                    return Some(block);
                }
                if best.map_or(true, |(b, _)| size < b) {
                    best = Some((size, block));
                }
            }
            if best.is_some() {
                break;
            }
        }
        best.map(|(_, block)| block)
    }

    fn name(&self) -> &'static str {
        "best-fit"
    }
}

/// Resume position inside the index: the list slot the next search starts at.
#[derive(Clone, Copy)]
struct Cursor {
    class: usize,
    addr: Address,
}

/// Resume scanning after the previous hit, wrapping around.
///
/// The cursor records the hit's list successor by class and address and is
/// validated on use: if that block has left the index since, the search
/// falls back to a plain ascending scan. A resumed search still visits every
/// block of every eligible class exactly once, so staleness can never turn
/// into a false negative.
pub(crate) struct NextFit {
    cursor: Option<Cursor>,
}

impl NextFit {
    pub fn new() -> Self {
        Self { cursor: None }
    }

    /// Remember the slot after `block` so the next search resumes there.
    ///
    /// # Safety
    /// `block` must be listed and consistent.
    unsafe fn note_hit(&mut self, class: usize, block: BlockPtr) -> Option<BlockPtr> {
        self.cursor = block.succ().map(|s| Cursor {
            class,
            addr: s.addr(),
        });
        Some(block)
    }
}

impl FitPolicy for NextFit {
    unsafe fn find_fit(&mut self, index: &SegregatedFreeList, asize: Size) -> Option<BlockPtr> {
        let start = class_of(asize);

        if let Some(cur) = self.cursor {
            if cur.class >= start {
                if let Some(resume) = index.find_in_class(cur.class, cur.addr) {
                    // Cursor block to the end of its class
                    let mut slot = Some(resume);
                    while let Some(block) = slot {
                        if block.size() >= asize {
                            return self.note_hit(cur.class, block);
                        }
                        slot = block.succ();
                    }
                    // Classes above the cursor's
                    for class in cur.class + 1..SIZE_CLASS_COUNT {
                        if let Some(block) = scan_class(index, class, asize) {
                            return self.note_hit(class, block);
                        }
                    }
                    // Wrap: eligible classes below the cursor's
                    for class in start..cur.class {
                        if let Some(block) = scan_class(index, class, asize) {
                            return self.note_hit(class, block);
                        }
                    }
                    // Cursor-class prefix, head up to the cursor slot
                    for block in index.iter_class(cur.class) {
                        if block.addr() == cur.addr {
                            break;
                        }
                        if block.size() >= asize {
                            return self.note_hit(cur.class, block);
                        }
                    }
                    self.cursor = None;
                    return None;
                }
                // Cursor block left the index since the last hit
                self.cursor = None;
            }
        }

        for class in start..SIZE_CLASS_COUNT {
            if let Some(block) = scan_class(index, class, asize) {
                return self.note_hit(class, block);
            }
        }
        None
    }

    fn name(&self) -> &'static str {
        "next-fit"
    }
}
