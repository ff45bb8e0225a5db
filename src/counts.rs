//! Strong and weak counters of a control block.
//!
//! The counters are plain `Cell<usize>`s. A block must never be touched
//! from two threads at once; the handle types are `!Send + !Sync`, so safe
//! code cannot do it.

use core::cell::Cell;

/// Counter pair stored in every control block header.
///
/// `weak` counts handles of both kinds: a strong reference is also a weak
/// reference. Hence `weak >= strong`, and `weak == 0` implies
/// `strong == 0`.
#[derive(Debug, Default)]
pub(crate) struct Counts {
    strong: Cell<usize>,
    weak: Cell<usize>,
}

impl Counts {
    /// Both counters start at zero; the handle that adopts a new block
    /// performs the first `inc_shared`.
    pub(crate) const fn new() -> Self {
        Self {
            strong: Cell::new(0),
            weak: Cell::new(0),
        }
    }

    #[inline]
    pub(crate) fn strong(&self) -> usize {
        self.strong.get()
    }

    #[inline]
    pub(crate) fn weak(&self) -> usize {
        self.weak.get()
    }

    #[inline]
    pub(crate) fn inc_shared(&self) {
        inc(&self.strong);
        inc(&self.weak);
    }

    #[inline]
    pub(crate) fn inc_weak(&self) {
        inc(&self.weak);
    }

    /// Returns true if the strong count is now zero.
    #[inline]
    pub(crate) fn dec_strong(&self) -> bool {
        dec(&self.strong, "strong")
    }

    /// Returns true if the weak count is now zero.
    #[inline]
    pub(crate) fn dec_weak(&self) -> bool {
        debug_assert!(
            self.weak.get() > self.strong.get() || self.strong.get() == 0,
            "weak count would drop below strong count"
        );
        dec(&self.weak, "weak")
    }
}

#[inline]
fn inc(c: &Cell<usize>) {
    let n = c.get().wrapping_add(1);
    c.set(n);
    if n == 0 {
        // Follow Rc semantics: abort on overflow rather than continue unsafely.
        std::process::abort();
    }
}

#[inline]
fn dec(c: &Cell<usize>, which: &str) -> bool {
    let n = c.get();
    assert!(n > 0, "{which} count underflow");
    c.set(n - 1);
    n == 1
}
