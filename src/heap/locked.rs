/*!
 * Locked Heap
 * Coarse-grained sharing wrapper
 *
 * The core data structures have no internal concurrency control, so a
 * shared heap serializes every call through one mutex held for the whole
 * operation. This is the only sanctioned multi-threaded entry.
 */

use super::arena::Arena;
use super::types::{HeapResult, HeapStats};
use super::Heap;
use crate::core::types::Size;
use parking_lot::Mutex;
use std::ptr::NonNull;

/// A heap behind one coarse mutex.
pub struct LockedHeap<A: Arena> {
    inner: Mutex<Heap<A>>,
}

impl<A: Arena> LockedHeap<A> {
    pub fn new(heap: Heap<A>) -> Self {
        Self {
            inner: Mutex::new(heap),
        }
    }

    /// See [`Heap::allocate`].
    pub fn allocate(&self, size: Size) -> HeapResult<NonNull<u8>> {
        self.inner.lock().allocate(size)
    }

    /// See [`Heap::release`].
    ///
    /// # Safety
    /// Same contract as [`Heap::release`].
    pub unsafe fn release(&self, ptr: NonNull<u8>) {
        self.inner.lock().release(ptr);
    }

    /// See [`Heap::resize`].
    ///
    /// # Safety
    /// Same contract as [`Heap::resize`].
    pub unsafe fn resize(&self, ptr: NonNull<u8>, new_size: Size) -> HeapResult<NonNull<u8>> {
        self.inner.lock().resize(ptr, new_size)
    }

    /// See [`Heap::stats`].
    pub fn stats(&self) -> HeapStats {
        self.inner.lock().stats()
    }

    /// See [`Heap::check`].
    pub fn check(&self) -> HeapResult<()> {
        self.inner.lock().check()
    }

    /// Unwrap the heap for single-owner use again.
    pub fn into_inner(self) -> Heap<A> {
        self.inner.into_inner()
    }
}

// SAFETY: the heap owns its region exclusively and the mutex serializes
// every entry point, so the raw handles inside never race.
unsafe impl<A: Arena + Send> Send for LockedHeap<A> {}
unsafe impl<A: Arena + Send> Sync for LockedHeap<A> {}
