// Shared/Weak property tests through the public API.
//
// Property: payload liveness matches outstanding strong handles.
//  - Model: number of non-empty Shared handles per allocation.
//  - Invariant: payload dropped iff the model count reached zero, and
//    dropped exactly once; use_count on every handle equals the model.
//  - Operations: make, clone, drop, downgrade, lock, drop weak.
use proptest::prelude::*;
use rc_block::{make_shared, Shared, Weak};
use std::cell::Cell;
use std::rc::Rc;

struct Tracked(Rc<Cell<usize>>);

impl Drop for Tracked {
    fn drop(&mut self) {
        self.0.set(self.0.get() + 1);
    }
}

proptest! {
    #[test]
    fn prop_liveness_matches_strong_handles(
        slots in 1usize..=4,
        ops in proptest::collection::vec((0u8..=5u8, 0usize..100usize), 1..120)
    ) {
        let drops: Vec<Rc<Cell<usize>>> = (0..slots).map(|_| Rc::new(Cell::new(0))).collect();
        let mut strong: Vec<Vec<Shared<Tracked>>> = (0..slots).map(|_| Vec::new()).collect();
        let mut weak: Vec<Vec<Weak<Tracked>>> = (0..slots).map(|_| Vec::new()).collect();
        // Whether slot k has ever been allocated; each slot is allocated at most once.
        let mut made = vec![false; slots];

        for (op, raw) in ops {
            let k = raw % slots;
            match op {
                // Allocate the slot's payload once.
                0 => if !made[k] {
                    strong[k].push(make_shared(Tracked(drops[k].clone())));
                    made[k] = true;
                },
                // Clone a strong handle.
                1 => if let Some(s) = strong[k].last() {
                    let c = s.clone();
                    strong[k].push(c);
                },
                // Drop a strong handle.
                2 => { strong[k].pop(); },
                // Downgrade.
                3 => if let Some(s) = strong[k].last() {
                    weak[k].push(Shared::downgrade(s));
                },
                // Promote the newest weak handle.
                4 => if let Some(w) = weak[k].last() {
                    let p = w.lock();
                    prop_assert_eq!(Shared::is_null(&p), strong[k].is_empty());
                    if !Shared::is_null(&p) {
                        strong[k].push(p);
                    }
                },
                // Drop a weak handle.
                5 => { weak[k].pop(); },
                _ => unreachable!(),
            }

            let n = strong[k].len();
            let expected_drops = usize::from(made[k] && n == 0);
            prop_assert_eq!(drops[k].get(), expected_drops);
            for s in &strong[k] {
                prop_assert_eq!(Shared::use_count(s), n);
            }
            for w in &weak[k] {
                prop_assert_eq!(w.expired(), n == 0);
                prop_assert_eq!(w.use_count(), n);
            }
        }

        drop(strong);
        drop(weak);
        for (k, d) in drops.iter().enumerate() {
            prop_assert_eq!(d.get(), usize::from(made[k]));
        }
    }
}
