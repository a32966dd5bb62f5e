/*!
 * Allocation Test
 * Verifies alignment, splitting, reuse, and typed exhaustion errors
 */

use pretty_assertions::assert_eq;
use segfit::{FixedArena, Heap, HeapError, ALIGNMENT};
use std::ptr::NonNull;

/// Prologue plus epilogue cost, the only region bytes outside real blocks.
const SENTINEL_BYTES: usize = 24;

fn fresh_heap(capacity: usize) -> Heap<FixedArena> {
    Heap::new(FixedArena::with_capacity(capacity)).expect("heap construction")
}

fn fill(ptr: NonNull<u8>, byte: u8, len: usize) {
    unsafe { std::ptr::write_bytes(ptr.as_ptr(), byte, len) }
}

#[test]
fn test_allocate_returns_aligned_in_bounds_pointers() {
    let mut heap = fresh_heap(1 << 16);
    let mut live = Vec::new();

    for size in 1..=200usize {
        let ptr = heap.allocate(size).expect("allocation");
        let addr = ptr.as_ptr() as usize;
        let (lo, hi) = heap.region_bounds();

        assert_eq!(addr % ALIGNMENT, 0, "payload must be aligned");
        assert!(addr >= lo && addr + size <= hi, "payload must be in bounds");

        // Every byte of the payload is writable
        fill(ptr, (size % 251) as u8, size);
        live.push(ptr);
        heap.check().expect("consistent after allocation");
    }

    // Releasing everything must fold the region back into one free block
    for ptr in live {
        unsafe { heap.release(ptr) };
    }
    heap.check().expect("consistent after full release");
    let stats = heap.stats();
    assert_eq!(stats.allocated_blocks, 0);
    assert_eq!(stats.free_blocks, 1);
    assert_eq!(stats.free_bytes, stats.region_bytes - SENTINEL_BYTES);
}

#[test]
fn test_small_request_splits_initial_chunk() {
    let mut heap = fresh_heap(1 << 16);
    let before = heap.stats();
    assert_eq!(before.free_bytes, 4096, "construction grows by one chunk");
    assert_eq!(before.free_blocks, 1);

    let ptr = heap.allocate(24).expect("allocation");
    let (lo, _) = heap.region_bounds();
    assert_eq!(ptr.as_ptr() as usize, lo + SENTINEL_BYTES, "first payload");

    // 24 bytes plus two tags, aligned: a 40-byte block and a 4056 remainder
    let stats = heap.stats();
    assert_eq!(stats.allocated_blocks, 1);
    assert_eq!(stats.allocated_bytes, 40);
    assert_eq!(stats.free_blocks, 1);
    assert_eq!(stats.free_bytes, 4056);
    assert_eq!(stats.largest_free_block, 4056);
    heap.check().expect("consistent after split");
}

#[test]
fn test_minimum_block_floor() {
    let mut heap = fresh_heap(1 << 16);
    heap.allocate(1).expect("allocation");
    assert_eq!(heap.stats().allocated_bytes, 32, "one-byte payloads still get a whole minimum block");
}

#[test]
fn test_release_then_allocate_reuses_address() {
    let mut heap = fresh_heap(1 << 16);
    let first = heap.allocate(48).expect("first");
    let _guard = heap.allocate(48).expect("guard");

    unsafe { heap.release(first) };
    heap.check().expect("consistent after release");

    let again = heap.allocate(48).expect("again");
    assert_eq!(again, first, "a same-size request must reuse the freed block");
    heap.check().expect("consistent after reuse");
}

#[test]
fn test_zero_sized_request_refused() {
    let mut heap = fresh_heap(1 << 16);
    let before = heap.stats();

    assert_eq!(heap.allocate(0), Err(HeapError::ZeroSized));
    assert_eq!(heap.stats(), before, "a refused request must not disturb the heap");
}

#[test]
fn test_exhaustion_reports_typed_error_and_leaves_heap_usable() {
    // Capacity covers exactly the sentinels plus one chunk; nothing to extend
    let mut heap = fresh_heap(4096 + SENTINEL_BYTES);
    let before = heap.stats();

    let err = heap.allocate(4096).expect_err("no room for tags on a full-chunk request");
    assert_eq!(
        err,
        HeapError::OutOfMemory {
            requested: 4096,
            available: 0,
            used: 4120,
            capacity: 4120,
        }
    );
    assert_eq!(heap.stats(), before, "a failed request must not disturb the heap");

    // Smaller requests still succeed out of the untouched free block
    let ptr = heap.allocate(100).expect("fitting allocation");
    fill(ptr, 0x5a, 100);
    heap.check().expect("consistent after recovery");
}

#[test]
fn test_address_space_scale_requests_are_refused() {
    let mut heap = fresh_heap(4096 + SENTINEL_BYTES);
    let before = heap.stats();

    // Requests at this scale miss every size class and can never be served;
    // each must come back as a typed refusal with the heap untouched.
    for request in [1usize << 63, usize::MAX - 24, usize::MAX] {
        let err = heap.allocate(request).expect_err("request dwarfs the reservation");
        assert_eq!(
            err,
            HeapError::OutOfMemory {
                requested: request,
                available: 0,
                used: 4120,
                capacity: 4120,
            }
        );
        assert_eq!(heap.stats(), before, "a refused request must not disturb the heap");
    }

    // The same refusal through resize leaves the live block fully intact
    let ptr = heap.allocate(48).expect("fitting allocation");
    fill(ptr, 0x6b, 48);
    let err = unsafe { heap.resize(ptr, 1 << 63) }.expect_err("growth dwarfs the reservation");
    assert_eq!(
        err,
        HeapError::OutOfMemory {
            requested: 1 << 63,
            available: 0,
            used: 4120,
            capacity: 4120,
        }
    );
    let payload = unsafe { std::slice::from_raw_parts(ptr.as_ptr(), 48) };
    assert!(payload.iter().all(|&b| b == 0x6b), "failed growth must leave the payload intact");
    heap.check().expect("consistent after refusals");
}

#[test]
fn test_miss_extends_region_by_one_chunk() {
    let mut heap = fresh_heap(1 << 16);
    let (lo_before, hi_before) = heap.region_bounds();

    // Consume the initial chunk exactly, then force a miss
    let big = heap.allocate(4080).expect("whole-chunk allocation");
    assert_eq!(heap.stats().free_blocks, 0);

    let small = heap.allocate(10).expect("allocation after extension");
    let (lo_after, hi_after) = heap.region_bounds();
    assert_eq!(hi_after - hi_before, 4096, "a miss grows the region by the chunk size");
    assert_eq!(lo_after, lo_before, "the region never relocates");

    let stats = heap.stats();
    assert_eq!(stats.allocated_bytes, 4096 + 32);
    assert_eq!(stats.free_bytes, 4096 - 32);
    heap.check().expect("consistent after extension");

    unsafe {
        heap.release(big);
        heap.release(small);
    }
    heap.check().expect("consistent after release");
}

#[test]
fn test_extension_merges_with_free_tail() {
    let mut heap = fresh_heap(1 << 16);
    let first = heap.allocate(4080).expect("whole-chunk allocation");
    let first_addr = first.as_ptr() as usize;
    unsafe { heap.release(first) };

    // 5000 bytes fit neither the free 4096 block nor a bare 4096 extension;
    // the fresh extension must merge with the free tail and serve from there.
    let big = heap.allocate(5000).expect("allocation spanning the old break");
    assert_eq!(big.as_ptr() as usize, first_addr, "merged space starts at the old block");

    let stats = heap.stats();
    assert_eq!(stats.region_bytes, 4120 + 5024);
    assert_eq!(stats.allocated_bytes, 5016);
    assert_eq!(stats.free_bytes, 4104);
    heap.check().expect("consistent after merged extension");
}
