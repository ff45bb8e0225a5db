//! Control block for a separately allocated payload.

use crate::block::{BlockHeader, ControlBlock};
use crate::error::BlockAllocError;
use crate::storage::allocate_block;
use core::cell::UnsafeCell;
use core::mem::ManuallyDrop;
use core::ptr::NonNull;

/// Counts plus a pointer to a payload living elsewhere and the deleter
/// that disposes of it.
#[repr(C)]
pub(crate) struct PointingBlock<T: ?Sized, D> {
    header: BlockHeader,
    payload: NonNull<T>,
    // Taken by `destroy_payload`; never dropped in place.
    deleter: UnsafeCell<ManuallyDrop<D>>,
}

unsafe impl<T, D> ControlBlock for PointingBlock<T, D>
where
    T: ?Sized,
    D: FnOnce(NonNull<T>),
{
    unsafe fn destroy_payload(&self) {
        // SAFETY: called once, so the deleter is still present.
        let deleter = unsafe { ManuallyDrop::take(&mut *self.deleter.get()) };
        deleter(self.payload);
    }
}

impl<T, D> PointingBlock<T, D>
where
    T: ?Sized,
    D: FnOnce(NonNull<T>),
{
    /// Take ownership of `payload` and its deleter in a new block, counts
    /// at 0/0.
    ///
    /// If the block cannot be allocated the deleter runs on `payload`
    /// before the error is returned, so the payload is never left without
    /// an owner.
    pub(crate) fn adopt(
        payload: NonNull<T>,
        deleter: D,
    ) -> Result<NonNull<BlockHeader>, BlockAllocError> {
        match allocate_block::<Self>() {
            Ok(block) => {
                let init = Self {
                    header: BlockHeader::new::<Self>(),
                    payload,
                    deleter: UnsafeCell::new(ManuallyDrop::new(deleter)),
                };
                unsafe { block.as_ptr().write(init) };
                Ok(block.cast::<BlockHeader>())
            }
            Err(e) => {
                log::debug!("{e}; deleting adopted payload {:p}", payload);
                deleter(payload);
                Err(e)
            }
        }
    }
}

/// Deleter for payloads that came out of a `Box`.
pub(crate) fn box_delete<T: ?Sized>(payload: NonNull<T>) {
    // SAFETY: only installed for pointers produced by `Box::into_raw` or
    // `Box::leak` (see `Shared::from_box` and `Shared::from_raw`).
    drop(unsafe { Box::from_raw(payload.as_ptr()) });
}
