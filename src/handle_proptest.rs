#![cfg(test)]

// Property tests for the handle algebra, kept inside the crate so they can
// read the per-thread block tally in `fault` without a feature gate.

use crate::fault;
use crate::make::make_shared;
use crate::shared::Shared;
use crate::weak::Weak;
use proptest::prelude::*;
use std::cell::Cell;
use std::rc::Rc;

struct Tracked(Rc<Cell<usize>>);

impl Drop for Tracked {
    fn drop(&mut self) {
        self.0.set(self.0.get() + 1);
    }
}

fn pick(len: usize, raw: usize) -> Option<usize> {
    (len > 0).then(|| raw % len)
}

fn pair_mut<T>(v: &mut [T], i: usize, j: usize) -> (&mut T, &T) {
    assert_ne!(i, j);
    if i < j {
        let (l, r) = v.split_at_mut(j);
        (&mut l[i], &r[0])
    } else {
        let (l, r) = v.split_at_mut(i);
        (&mut r[0], &l[j])
    }
}

// Property: for any sequence of handle operations derived from one
// allocation, the payload is destroyed exactly once, when the last strong
// handle goes away, and the block is freed exactly once, when the last
// handle of either kind goes away.
// Invariants checked after every step:
// - drops == 0 while any Shared is non-empty, 1 afterwards.
// - live blocks == 1 while any handle of either kind is non-empty.
// - use_count/weak_count on every non-empty handle equal the model counts.
// - Weak::expired iff the model strong count is zero.
// - Weak::lock succeeds iff not expired and adds exactly one strong count.
proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]
    #[test]
    fn prop_payload_and_block_released_once(
        ops in proptest::collection::vec((0u8..=10u8, 0usize..64, 0usize..64), 1..80)
    ) {
        let base = fault::live_blocks();
        let drops = Rc::new(Cell::new(0));
        let mut shared: Vec<Shared<Tracked>> = vec![make_shared(Tracked(drops.clone()))];
        let mut weak: Vec<Weak<Tracked>> = Vec::new();

        for (op, a, b) in ops {
            match op {
                // Copy a shared handle.
                0 => if let Some(i) = pick(shared.len(), a) {
                    let c = shared[i].clone();
                    shared.push(c);
                },
                // Drop a shared handle.
                1 => if let Some(i) = pick(shared.len(), a) {
                    drop(shared.swap_remove(i));
                },
                // Move out of a shared handle, leaving it empty.
                2 => if let Some(i) = pick(shared.len(), a) {
                    let moved = Shared::take(&mut shared[i]);
                    prop_assert!(Shared::is_null(&shared[i]));
                    shared.push(moved);
                },
                // Reset a shared handle in place.
                3 => if let Some(i) = pick(shared.len(), a) {
                    Shared::reset(&mut shared[i]);
                },
                // Copy-assign one shared handle onto another.
                4 => if let (Some(i), Some(j)) = (pick(shared.len(), a), pick(shared.len(), b)) {
                    if i != j {
                        let (dst, src) = pair_mut(&mut shared, i, j);
                        dst.clone_from(src);
                    }
                },
                // Downgrade.
                5 => if let Some(i) = pick(shared.len(), a) {
                    weak.push(Shared::downgrade(&shared[i]));
                },
                // Copy a weak handle.
                6 => if let Some(i) = pick(weak.len(), a) {
                    let c = weak[i].clone();
                    weak.push(c);
                },
                // Drop a weak handle.
                7 => if let Some(i) = pick(weak.len(), a) {
                    drop(weak.swap_remove(i));
                },
                // Copy-assign one weak handle onto another.
                8 => if let (Some(i), Some(j)) = (pick(weak.len(), a), pick(weak.len(), b)) {
                    if i != j {
                        let (dst, src) = pair_mut(&mut weak, i, j);
                        dst.clone_from(src);
                    }
                },
                // Point a weak handle at a shared handle's block.
                9 => if let (Some(i), Some(j)) = (pick(weak.len(), a), pick(shared.len(), b)) {
                    weak[i].assign(&shared[j]);
                },
                // Promote.
                10 => if let Some(i) = pick(weak.len(), a) {
                    let before = shared.iter().filter(|s| !Shared::is_null(s)).count();
                    let alive = weak[i].weak_count() > 0 && before > 0;
                    prop_assert_eq!(weak[i].expired(), !alive);
                    let s = weak[i].lock();
                    if alive {
                        prop_assert_eq!(Shared::use_count(&s), before + 1);
                    } else {
                        prop_assert!(Shared::is_null(&s));
                    }
                    shared.push(s);
                },
                _ => unreachable!(),
            }

            let strong = shared.iter().filter(|s| !Shared::is_null(s)).count();
            let observers = weak.iter().filter(|w| w.weak_count() > 0).count();
            let all = strong + observers;

            prop_assert_eq!(drops.get(), usize::from(strong == 0));
            prop_assert_eq!(fault::live_blocks() - base, usize::from(all > 0));
            for s in shared.iter().filter(|s| !Shared::is_null(s)) {
                prop_assert_eq!(Shared::use_count(s), strong);
                prop_assert_eq!(Shared::weak_count(s), all);
            }
            for w in weak.iter().filter(|w| w.weak_count() > 0) {
                prop_assert_eq!(w.expired(), strong == 0);
                prop_assert_eq!(w.use_count(), strong);
                prop_assert_eq!(w.weak_count(), all);
            }
        }

        drop(shared);
        drop(weak);
        prop_assert_eq!(drops.get(), 1);
        prop_assert_eq!(fault::live_blocks(), base);
    }
}
