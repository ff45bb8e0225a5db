//! Control block header and the type-erased operations on it.
//!
//! Every control block variant is `#[repr(C)]` with a [`BlockHeader`] as
//! its first field, so a `NonNull<BlockHeader>` can stand for any block.
//! Variant-specific work goes through the two function pointers the header
//! carries, filled in from the variant's [`ControlBlock`] impl.

use crate::counts::Counts;
use crate::storage::deallocate_block;
use core::ptr::NonNull;

/// A concrete control block variant.
///
/// # Safety
///
/// Implementors must be `#[repr(C)]`, have a `BlockHeader` built with
/// `BlockHeader::new::<Self>()` as their first field, and live in storage
/// obtained from `storage::allocate_block::<Self>()`.
pub(crate) unsafe trait ControlBlock: Sized {
    /// Destroy the payload in place without freeing the block.
    ///
    /// # Safety
    ///
    /// Called at most once per block, when the strong count reaches zero.
    unsafe fn destroy_payload(&self);
}

#[derive(Clone, Copy)]
struct BlockOps {
    destroy_payload: unsafe fn(NonNull<BlockHeader>),
    free: unsafe fn(NonNull<BlockHeader>),
}

unsafe fn destroy_payload_erased<B: ControlBlock>(header: NonNull<BlockHeader>) {
    // SAFETY: the header is the first field of a live `B` (ControlBlock contract).
    unsafe { header.cast::<B>().as_ref().destroy_payload() }
}

unsafe fn free_erased<B: ControlBlock>(header: NonNull<BlockHeader>) {
    // Variants keep their payload and deleter in non-dropping wrappers, and
    // both are gone by now; only the storage is left to return.
    unsafe { deallocate_block(header.cast::<B>()) }
}

#[repr(C)]
pub(crate) struct BlockHeader {
    counts: Counts,
    ops: BlockOps,
}

impl BlockHeader {
    /// Header for a fresh block of type `B`, counts at 0/0.
    pub(crate) fn new<B: ControlBlock>() -> Self {
        Self {
            counts: Counts::new(),
            ops: BlockOps {
                destroy_payload: destroy_payload_erased::<B>,
                free: free_erased::<B>,
            },
        }
    }

    #[inline]
    pub(crate) fn strong_count(&self) -> usize {
        self.counts.strong()
    }

    #[inline]
    pub(crate) fn weak_count(&self) -> usize {
        self.counts.weak()
    }

    #[inline]
    pub(crate) fn add_shared(&self) {
        self.counts.inc_shared();
    }

    #[inline]
    pub(crate) fn add_weak(&self) {
        self.counts.inc_weak();
    }

    #[inline]
    pub(crate) fn should_free(&self) -> bool {
        self.counts.weak() == 0
    }

    /// Give up one strong reference, destroying the payload if it was the
    /// last one. The block itself is never freed here.
    ///
    /// The implicit weak reference is released only after the payload is
    /// gone, so a payload destructor that drops handles to this block
    /// cannot bring the weak count to zero underneath us.
    ///
    /// # Safety
    ///
    /// `this` must be a live block on which the caller holds a strong
    /// reference it is giving up.
    pub(crate) unsafe fn release_shared(this: NonNull<Self>) {
        let header = unsafe { this.as_ref() };
        if header.counts.dec_strong() {
            unsafe { (header.ops.destroy_payload)(this) };
            log::trace!("control block {:p}: payload destroyed", this);
        }
        header.counts.dec_weak();
    }

    /// Give up one weak reference. The caller decides whether to free.
    ///
    /// # Safety
    ///
    /// `this` must be a live block on which the caller holds a weak
    /// reference it is giving up.
    pub(crate) unsafe fn release_weak(this: NonNull<Self>) {
        unsafe { this.as_ref() }.counts.dec_weak();
    }

    /// Return the block's memory.
    ///
    /// # Safety
    ///
    /// The weak count must be zero and `this` must not be used afterwards.
    pub(crate) unsafe fn free(this: NonNull<Self>) {
        let free = unsafe { this.as_ref() }.ops.free;
        log::trace!("control block {:p}: freed", this);
        unsafe { free(this) }
    }

    /// Release a strong reference and free the block if nothing refers to
    /// it any more. This is the whole drop path of a `Shared`.
    ///
    /// # Safety
    ///
    /// Same as [`BlockHeader::release_shared`].
    pub(crate) unsafe fn drop_shared(this: NonNull<Self>) {
        unsafe {
            Self::release_shared(this);
            if this.as_ref().should_free() {
                Self::free(this);
            }
        }
    }

    /// Release a weak reference and free the block if it was the last one.
    ///
    /// # Safety
    ///
    /// Same as [`BlockHeader::release_weak`].
    pub(crate) unsafe fn drop_weak(this: NonNull<Self>) {
        unsafe {
            Self::release_weak(this);
            if this.as_ref().should_free() {
                Self::free(this);
            }
        }
    }
}
