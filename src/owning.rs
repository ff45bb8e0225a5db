//! Control block that stores its payload inline.

use crate::block::{BlockHeader, ControlBlock};
use crate::error::TryMakeError;
use crate::storage::{allocate_block, deallocate_block};
use core::cell::UnsafeCell;
use core::mem::{self, MaybeUninit};
use core::ptr::{self, NonNull};

/// One allocation holding the counts and the payload.
///
/// The payload slot never drops on its own: `destroy_payload` runs the
/// destructor in place and the slot's memory goes away with the block.
#[repr(C)]
pub(crate) struct OwningBlock<T> {
    header: BlockHeader,
    payload: UnsafeCell<MaybeUninit<T>>,
}

unsafe impl<T> ControlBlock for OwningBlock<T> {
    unsafe fn destroy_payload(&self) {
        // SAFETY: the payload was written by `emplace_with` and the strong
        // count just reached zero, so nobody can reach it any more.
        unsafe { ptr::drop_in_place(self.payload.get().cast::<T>()) }
    }
}

/// Returns the storage if the payload initializer fails or unwinds.
struct StorageGuard<T>(NonNull<OwningBlock<T>>);

impl<T> Drop for StorageGuard<T> {
    fn drop(&mut self) {
        // Only the header was written, and it has nothing to drop.
        unsafe { deallocate_block(self.0) }
    }
}

impl<T> OwningBlock<T> {
    /// Allocate a block, then build the payload into it with `init`.
    ///
    /// Returns the block and a pointer to the payload, counts at 0/0. If
    /// the storage cannot be obtained `init` is not called; if `init`
    /// fails or panics the storage is returned before the failure
    /// propagates.
    pub(crate) fn emplace_with<E, F>(
        init: F,
    ) -> Result<(NonNull<BlockHeader>, NonNull<T>), TryMakeError<E>>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let block = allocate_block::<Self>()?;
        let raw = block.as_ptr();
        // SAFETY: `raw` is valid for writes of `Self`; the fields are
        // addressed without creating references to uninitialized memory.
        unsafe { ptr::addr_of_mut!((*raw).header).write(BlockHeader::new::<Self>()) };
        let guard = StorageGuard(block);

        let value = init().map_err(TryMakeError::Init)?;

        let slot = unsafe { ptr::addr_of_mut!((*raw).payload) }.cast::<T>();
        unsafe { slot.write(value) };
        mem::forget(guard);
        // SAFETY: derived from the non-null block pointer.
        let payload = unsafe { NonNull::new_unchecked(slot) };
        Ok((block.cast::<BlockHeader>(), payload))
    }
}
