/*!
 * Property Test
 * Randomized operation interleavings against the structural invariants
 */

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use segfit::{FixedArena, Heap};
use serial_test::serial;
use std::ptr::NonNull;

fn fresh_heap() -> Heap<FixedArena> {
    Heap::new(FixedArena::with_capacity(1 << 20)).expect("heap construction")
}

fn stamp_payload(ptr: NonNull<u8>, stamp: u8, len: usize) {
    unsafe { std::ptr::write_bytes(ptr.as_ptr(), stamp, len) };
}

fn payload_holds(ptr: NonNull<u8>, stamp: u8, len: usize) -> bool {
    (0..len).all(|off| unsafe { ptr.as_ptr().add(off).read() } == stamp)
}

proptest! {
    #[test]
    #[serial]
    fn test_random_interleavings_keep_the_heap_consistent(
        ops in prop::collection::vec((any::<u8>(), 1usize..512), 1..64),
    ) {
        let mut heap = fresh_heap();
        let mut live: Vec<(NonNull<u8>, usize, u8)> = Vec::new();
        let mut stamp: u8 = 1;

        for (sel, size) in ops {
            match sel % 3 {
                1 if !live.is_empty() => {
                    let (ptr, len, mark) = live.swap_remove(sel as usize % live.len());
                    prop_assert!(
                        payload_holds(ptr, mark, len),
                        "payload of {} bytes at {:#x} was trampled",
                        len,
                        ptr.as_ptr() as usize
                    );
                    unsafe { heap.release(ptr) };
                }
                2 if !live.is_empty() => {
                    let idx = sel as usize % live.len();
                    let (ptr, len, mark) = live[idx];
                    let new_ptr = unsafe { heap.resize(ptr, size) }.expect("resize");
                    prop_assert!(
                        payload_holds(new_ptr, mark, len.min(size)),
                        "resize lost the surviving payload prefix"
                    );
                    stamp = stamp.wrapping_add(1).max(1);
                    stamp_payload(new_ptr, stamp, size);
                    live[idx] = (new_ptr, size, stamp);
                }
                _ => {
                    let ptr = heap.allocate(size).expect("allocation");
                    stamp = stamp.wrapping_add(1).max(1);
                    stamp_payload(ptr, stamp, size);
                    live.push((ptr, size, stamp));
                }
            }
            heap.check().expect("invariants after every operation");
        }

        // Live payloads never overlap
        let mut spans: Vec<(usize, usize)> = live
            .iter()
            .map(|&(ptr, len, _)| (ptr.as_ptr() as usize, len))
            .collect();
        spans.sort_unstable();
        for pair in spans.windows(2) {
            prop_assert!(
                pair[0].0 + pair[0].1 <= pair[1].0,
                "payloads at {:#x} and {:#x} overlap",
                pair[0].0,
                pair[1].0
            );
        }

        for (ptr, len, mark) in live.drain(..) {
            prop_assert!(payload_holds(ptr, mark, len));
            unsafe { heap.release(ptr) };
        }
        heap.check().expect("invariants after the final release");
        let stats = heap.stats();
        prop_assert_eq!(stats.allocated_blocks, 0);
        prop_assert_eq!(stats.free_blocks, 1);
    }
}

#[test]
#[serial]
fn test_shuffled_release_orders_always_coalesce() {
    let _ = env_logger::builder().is_test(true).try_init();

    for seed in 0..8u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut heap = fresh_heap();

        let mut ptrs: Vec<NonNull<u8>> = (1..=32usize)
            .map(|i| heap.allocate(i * 17 % 300 + 1).expect("allocation"))
            .collect();
        ptrs.shuffle(&mut rng);

        for ptr in ptrs {
            unsafe { heap.release(ptr) };
            heap.check().expect("invariants after each release");
        }

        let stats = heap.stats();
        assert_eq!(stats.allocated_blocks, 0, "seed {}", seed);
        assert_eq!(
            stats.free_blocks, 1,
            "seed {}: any release order must fold the region into one span",
            seed
        );
    }
}
