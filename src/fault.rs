//! Test hooks for the block allocator.
//!
//! Compiled for this crate's own tests and, with the `fault_injection`
//! feature, for downstream test suites. Both hooks are per thread, which
//! matches the handles: a block is always allocated and freed on the
//! thread that owns its handles. Without the feature every hook is an
//! inlined no-op.

#[cfg(any(test, feature = "fault_injection"))]
use core::cell::Cell;

#[cfg(any(test, feature = "fault_injection"))]
thread_local! {
    static FAIL_NEXT: Cell<usize> = const { Cell::new(0) };
    static LIVE_BLOCKS: Cell<usize> = const { Cell::new(0) };
}

/// Make the next `n` control block allocations on this thread fail.
#[cfg(any(test, feature = "fault_injection"))]
pub fn fail_next_allocations(n: usize) {
    FAIL_NEXT.with(|f| f.set(n));
}

/// Number of control blocks allocated on this thread and not yet freed.
#[cfg(any(test, feature = "fault_injection"))]
pub fn live_blocks() -> usize {
    LIVE_BLOCKS.with(Cell::get)
}

#[cfg(any(test, feature = "fault_injection"))]
pub(crate) fn take_injected_failure() -> bool {
    FAIL_NEXT.with(|f| {
        let n = f.get();
        if n > 0 {
            f.set(n - 1);
        }
        n > 0
    })
}

#[cfg(any(test, feature = "fault_injection"))]
pub(crate) fn note_block_allocated() {
    LIVE_BLOCKS.with(|c| c.set(c.get() + 1));
}

#[cfg(any(test, feature = "fault_injection"))]
pub(crate) fn note_block_freed() {
    LIVE_BLOCKS.with(|c| {
        debug_assert!(c.get() > 0, "freed more blocks than were allocated");
        c.set(c.get().wrapping_sub(1))
    });
}

#[cfg(not(any(test, feature = "fault_injection")))]
#[inline(always)]
pub(crate) fn take_injected_failure() -> bool {
    false
}

#[cfg(not(any(test, feature = "fault_injection")))]
#[inline(always)]
pub(crate) fn note_block_allocated() {}

#[cfg(not(any(test, feature = "fault_injection")))]
#[inline(always)]
pub(crate) fn note_block_freed() {}
