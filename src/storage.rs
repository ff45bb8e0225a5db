//! Memory for control blocks, taken from the global allocator.
//!
//! Allocation goes through `allocator_api2`'s fallible `Allocator` API so
//! that an exhausted heap surfaces as a `BlockAllocError` instead of an
//! abort. Only the block memory is handled here; payloads handed over as
//! raw pointers stay with their deleters.

use crate::error::BlockAllocError;
use crate::fault;
use allocator_api2::alloc::{Allocator, Global};
use core::alloc::Layout;
use core::ptr::NonNull;

/// Obtain uninitialized storage for one `B`.
pub(crate) fn allocate_block<B>() -> Result<NonNull<B>, BlockAllocError> {
    let layout = Layout::new::<B>();
    if fault::take_injected_failure() {
        return Err(BlockAllocError::new(layout));
    }
    let block = Global
        .allocate(layout)
        .map_err(|_| BlockAllocError::new(layout))?;
    fault::note_block_allocated();
    Ok(block.cast::<B>())
}

/// Return storage obtained from [`allocate_block`].
///
/// # Safety
///
/// `block` must come from `allocate_block::<B>()` and must not be used
/// afterwards. Nothing in it is dropped.
pub(crate) unsafe fn deallocate_block<B>(block: NonNull<B>) {
    fault::note_block_freed();
    unsafe { Global.deallocate(block.cast::<u8>(), Layout::new::<B>()) }
}
