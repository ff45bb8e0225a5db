// Shared handle test suite.
//
// Each test documents what behavior is being verified and which
// invariants are assumed or asserted. The core invariants exercised:
// - Liveness: the payload is alive iff there exists >=1 non-empty Shared.
// - Counting: use_count equals the number of live Shared handles on the
//   block, zero for an empty handle.
// - Aliasing: a projected handle keeps the whole payload alive while
//   dereferencing to a sub-object.
// - Identity: equality and hashing follow the payload address.
use rc_block::{make_shared, try_make_shared_with, Shared, TryMakeError};
use std::cell::Cell;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::ptr::NonNull;
use std::rc::Rc;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

struct Tracked {
    name: &'static str,
    drops: Rc<Cell<usize>>,
}

impl Tracked {
    fn new(name: &'static str, drops: &Rc<Cell<usize>>) -> Self {
        Self {
            name,
            drops: drops.clone(),
        }
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.drops.set(self.drops.get() + 1);
    }
}

// Test: copy/destroy scenario on a single allocation.
// Assumes: make_shared returns the only handle (count 1).
// Verifies: counts follow copies and drops; payload destroyed at 1 -> 0.
#[test]
fn copy_then_destroy_both() {
    init_logging();
    let drops = Rc::new(Cell::new(0));
    let first = make_shared(Tracked::new("p", &drops));
    assert_eq!(Shared::use_count(&first), 1);

    let second = first.clone();
    assert_eq!(Shared::use_count(&first), 2);
    assert_eq!(Shared::use_count(&second), 2);

    drop(first);
    assert_eq!(Shared::use_count(&second), 1);
    assert_eq!(second.name, "p");
    assert_eq!(drops.get(), 0);

    drop(second);
    assert_eq!(drops.get(), 1);
}

// Test: moving out of a handle.
// Assumes: Shared::take is the explicit move that empties its source.
// Verifies: counts unchanged by the move; the source is empty and inert.
#[test]
fn take_moves_without_touching_counts() {
    let drops = Rc::new(Cell::new(0));
    let mut a = make_shared(Tracked::new("m", &drops));
    let keep = a.clone();
    let b = Shared::take(&mut a);
    assert!(Shared::is_null(&a));
    assert_eq!(Shared::use_count(&a), 0);
    assert_eq!(Shared::use_count(&b), 2);
    assert!(b == keep);
    drop(a);
    assert_eq!(Shared::use_count(&keep), 2);
}

// Test: reset on shared handles.
// Assumes: reset on an empty handle is a no-op.
// Verifies: resetting the last handle destroys the payload once.
#[test]
fn reset_releases_and_empties() {
    let drops = Rc::new(Cell::new(0));
    let mut s = make_shared(Tracked::new("r", &drops));
    Shared::reset(&mut s);
    assert!(Shared::is_null(&s));
    assert_eq!(drops.get(), 1);
    Shared::reset(&mut s);
    assert_eq!(drops.get(), 1);
}

// Test: aliasing construction.
// Assumes: project shares the owner's block.
// Verifies: the owner's strong count goes up; the alias dereferences to
// the field, independent of the owner's pointer; the payload outlives
// the owner handle.
#[test]
fn projection_keeps_owner_alive() {
    struct Pair {
        _left: Tracked,
        right: u64,
    }
    let drops = Rc::new(Cell::new(0));
    let owner = make_shared(Pair {
        _left: Tracked::new("left", &drops),
        right: 99,
    });
    let right: Shared<u64> = Shared::project(&owner, |p| &p.right);
    assert_eq!(Shared::use_count(&owner), 2);
    assert_eq!(*right, 99);
    assert_eq!(Shared::as_ptr(&right), Some(NonNull::from(&owner.right)));

    drop(owner);
    assert_eq!(drops.get(), 0);
    assert_eq!(Shared::use_count(&right), 1);
    // Projecting from an alias stays on the same block.
    let again = Shared::project(&right, |r| r);
    assert_eq!(Shared::use_count(&again), 2);
    drop((again, right));
    assert_eq!(drops.get(), 1);
}

// Test: projection to a trait object.
// Assumes: project covers upcasts to unsized targets.
// Verifies: dyn dispatch through the alias, same block.
#[test]
fn projection_to_trait_object() {
    let s = make_shared(String::from("dyn"));
    let d: Shared<dyn std::fmt::Display> = Shared::project(&s, |s| s as &dyn std::fmt::Display);
    assert_eq!(d.to_string(), "dyn");
    assert_eq!(Shared::use_count(&s), 2);
}

// Test: raw pointer construction with a custom deleter.
// Assumes: the deleter is invoked once with the original pointer.
// Verifies: deleter runs at the last strong release, not before.
#[test]
fn raw_pointer_with_deleter() {
    let calls = Rc::new(Cell::new(0));
    let raw = Box::into_raw(Box::new(17u32));
    let c = calls.clone();
    let s = unsafe {
        Shared::from_raw_with(raw, move |p: NonNull<u32>| {
            assert_eq!(p.as_ptr(), raw);
            c.set(c.get() + 1);
            drop(Box::from_raw(p.as_ptr()));
        })
    }
    .expect("block allocation");
    let s2 = s.clone();
    drop(s);
    assert_eq!(calls.get(), 0);
    assert_eq!(*s2, 17);
    drop(s2);
    assert_eq!(calls.get(), 1);
}

// Test: boxed and unsized payloads.
// Verifies: from_box adopts slices; indexing works through Deref.
#[test]
fn boxed_slice_indexing() {
    let s: Shared<[u16]> = Shared::from_box(vec![3, 5, 7].into_boxed_slice()).unwrap();
    assert_eq!(s[1], 5);
    assert_eq!(s.len(), 3);
    assert_eq!(Shared::use_count(&s), 1);
}

// Test: identity semantics.
// Assumes: Eq/Hash derive from the payload address, not the value.
// Verifies: clones are equal and hash alike; equal values in different
// allocations are not equal; empties are equal to each other.
#[test]
fn equality_and_hash_by_address() {
    let a = make_shared(5u32);
    let a2 = a.clone();
    let b = make_shared(5u32);
    assert!(a == a2);
    assert!(a != b);

    let mut h1 = DefaultHasher::new();
    a.hash(&mut h1);
    let mut h2 = DefaultHasher::new();
    a2.hash(&mut h2);
    assert_eq!(h1.finish(), h2.finish());

    let e1: Shared<u32> = Shared::null();
    let e2: Shared<u32> = Shared::default();
    assert!(e1 == e2);
    assert!(e1 != a);
}

// Test: fallible in-place construction.
// Verifies: an initializer error surfaces as TryMakeError::Init and no
// handle is produced.
#[test]
fn try_make_with_propagates_init_error() {
    let ok: Shared<i64> = try_make_shared_with(|| "-12".parse::<i64>()).unwrap();
    assert_eq!(*ok, -12);
    let err = try_make_shared_with(|| "x".parse::<i64>()).unwrap_err();
    assert!(matches!(err, TryMakeError::Init(_)));
    assert!(err.to_string().starts_with("payload initialization failed"));
}

// Test: accessors on an empty handle.
// Verifies: get/as_ptr return None; Display prints "null".
#[test]
fn empty_accessors() {
    let s: Shared<String> = Shared::null();
    assert!(Shared::get(&s).is_none());
    assert!(Shared::as_ptr(&s).is_none());
    assert_eq!(s.to_string(), "null");
    assert_eq!(format!("{:p}", s), format!("{:p}", std::ptr::null::<u8>()));
}
