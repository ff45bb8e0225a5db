//! Strong-owning handle.

use crate::block::BlockHeader;
use crate::error::{BlockAllocError, TryMakeError};
use crate::make;
use crate::pointing::{box_delete, PointingBlock};
use crate::weak::Weak;
use core::fmt;
use core::hash::{Hash, Hasher};
use core::marker::PhantomData;
use core::ops::Deref;
use core::ptr::NonNull;

/// Block plus the pointer a handle dereferences.
///
/// The two are kept separately so an aliasing handle can share a block
/// while pointing at a sub-object of its payload.
pub(crate) struct Parts<T: ?Sized> {
    pub(crate) block: NonNull<BlockHeader>,
    pub(crate) ptr: NonNull<T>,
}

impl<T: ?Sized> Clone for Parts<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: ?Sized> Copy for Parts<T> {}

impl<T: ?Sized> Parts<T> {
    #[inline]
    pub(crate) fn header(&self) -> &BlockHeader {
        // SAFETY: a handle holding `Parts` holds a reference on the block.
        unsafe { self.block.as_ref() }
    }
}

/// A shared, strong reference to a payload managed by a control block.
///
/// Cloning increments the strong count; dropping the last `Shared`
/// destroys the payload, and the block is freed once no [`Weak`] remains
/// either. A `Shared` may be empty (see [`Shared::null`]); dereferencing
/// an empty handle panics, so check [`Shared::is_null`] or use
/// [`Shared::get`] when emptiness is possible.
///
/// Not thread-safe: `Shared` is `!Send` and `!Sync`.
pub struct Shared<T: ?Sized> {
    raw: Option<Parts<T>>,
    _owns: PhantomData<T>,
    // !Send + !Sync: the counts are plain cells.
    _nosend: PhantomData<*mut ()>,
}

impl<T: ?Sized> Shared<T> {
    /// An empty handle: no block, no payload.
    pub const fn null() -> Self {
        Self {
            raw: None,
            _owns: PhantomData,
            _nosend: PhantomData,
        }
    }

    /// Wrap a freshly built block, performing its first `add_shared`.
    ///
    /// # Safety
    ///
    /// `block` must be new (counts 0/0) and `ptr` must point at its
    /// constructed payload.
    pub(crate) unsafe fn adopt_block(block: NonNull<BlockHeader>, ptr: NonNull<T>) -> Self {
        let parts = Parts { block, ptr };
        parts.header().add_shared();
        Self::from_parts(parts)
    }

    /// Take a new strong reference on a block whose payload is alive.
    ///
    /// # Safety
    ///
    /// The caller must hold a reference on `parts.block`, its strong count
    /// must be non-zero and `parts.ptr` must stay valid while the payload
    /// lives.
    pub(crate) unsafe fn share(parts: Parts<T>) -> Self {
        debug_assert!(parts.header().strong_count() > 0);
        parts.header().add_shared();
        Self::from_parts(parts)
    }

    fn from_parts(parts: Parts<T>) -> Self {
        Self {
            raw: Some(parts),
            _owns: PhantomData,
            _nosend: PhantomData,
        }
    }

    #[inline]
    pub(crate) fn parts(this: &Self) -> Option<Parts<T>> {
        this.raw
    }

    /// Move `value` out of its `Box` ownership into a new pointing block.
    ///
    /// On allocation failure the box is dropped and the error returned.
    pub fn from_box(value: Box<T>) -> Result<Self, BlockAllocError> {
        let ptr = Box::into_raw(value);
        // SAFETY: `ptr` came from `Box::into_raw`, which is what `box_delete` expects.
        unsafe { Self::adopt_raw(ptr, box_delete::<T>) }
    }

    /// Adopt a raw pointer produced by `Box::into_raw`.
    ///
    /// A null `ptr` gives an empty handle. On allocation failure the
    /// payload is dropped and the error returned.
    ///
    /// # Safety
    ///
    /// A non-null `ptr` must come from `Box::into_raw` and must not be
    /// owned by anything else.
    pub unsafe fn from_raw(ptr: *mut T) -> Result<Self, BlockAllocError> {
        unsafe { Self::adopt_raw(ptr, box_delete::<T>) }
    }

    /// Adopt a raw pointer together with the action that disposes of it.
    ///
    /// `deleter` is invoked exactly once with the pointer: when the last
    /// strong reference goes away or, if the block cannot be allocated,
    /// before this returns the error. A null `ptr` gives an empty handle
    /// and `deleter` is dropped without being called.
    ///
    /// # Safety
    ///
    /// `ptr` must stay valid for reads until `deleter` runs and must not
    /// be disposed of by anything but `deleter`.
    pub unsafe fn from_raw_with<D>(ptr: *mut T, deleter: D) -> Result<Self, BlockAllocError>
    where
        D: FnOnce(NonNull<T>) + 'static,
    {
        unsafe { Self::adopt_raw(ptr, deleter) }
    }

    // `box_delete` only drops a `T`, whose lifetime `Shared<T>` already
    // tracks, so it is exempt from the `'static` bound on user deleters.
    unsafe fn adopt_raw<D>(ptr: *mut T, deleter: D) -> Result<Self, BlockAllocError>
    where
        D: FnOnce(NonNull<T>),
    {
        let Some(ptr) = NonNull::new(ptr) else {
            return Ok(Self::null());
        };
        let block = PointingBlock::adopt(ptr, deleter)?;
        // SAFETY: fresh block that owns `ptr`.
        Ok(unsafe { Self::adopt_block(block, ptr) })
    }

    /// A handle that shares `owner`'s block but dereferences to `ptr`.
    ///
    /// The owner's payload stays alive at least as long as the returned
    /// handle. An empty `owner` gives an empty handle.
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for reads for as long as `owner`'s payload is
    /// alive, typically because it points into that payload.
    pub unsafe fn alias<U: ?Sized>(owner: &Shared<U>, ptr: NonNull<T>) -> Self {
        match owner.raw {
            // SAFETY: `owner` holds a strong reference; validity of `ptr`
            // is the caller's obligation.
            Some(parts) => unsafe {
                Self::share(Parts {
                    block: parts.block,
                    ptr,
                })
            },
            None => Self::null(),
        }
    }

    /// A handle to a part of the payload that keeps the whole payload
    /// alive.
    ///
    /// ```
    /// use rc_block::{make_shared, Shared};
    ///
    /// struct Config { name: String, port: u16 }
    ///
    /// let cfg = make_shared(Config { name: "edge".into(), port: 443 });
    /// let name: Shared<str> = Shared::project(&cfg, |c| c.name.as_str());
    /// drop(cfg);
    /// assert_eq!(&*name, "edge");
    /// assert_eq!(Shared::use_count(&name), 1);
    /// ```
    pub fn project<U, F>(this: &Self, f: F) -> Shared<U>
    where
        T: 'static,
        U: ?Sized,
        F: FnOnce(&T) -> &U,
    {
        match this.raw {
            Some(parts) => {
                // SAFETY: `this` keeps the payload alive.
                let target = NonNull::from(f(unsafe { parts.ptr.as_ref() }));
                // SAFETY: `target` points into the payload `this` keeps alive.
                unsafe {
                    Shared::share(Parts {
                        block: parts.block,
                        ptr: target,
                    })
                }
            }
            None => Shared::null(),
        }
    }

    /// Promote `weak`: a new strong reference if its payload is alive,
    /// otherwise an empty handle. Same as [`Weak::lock`].
    pub fn from_weak(weak: &Weak<T>) -> Self {
        weak.lock()
    }

    /// Create a [`Weak`] observer of this handle's block.
    pub fn downgrade(this: &Self) -> Weak<T> {
        match this.raw {
            // SAFETY: `this` holds a reference on the block.
            Some(parts) => unsafe { Weak::observe(parts) },
            None => Weak::new(),
        }
    }

    /// Move the handle out, leaving `this` empty. Counts are unchanged.
    pub fn take(this: &mut Self) -> Self {
        core::mem::take(this)
    }

    /// Drop this handle's reference and leave it empty. No-op when empty.
    pub fn reset(this: &mut Self) {
        drop(Self::take(this));
    }

    /// Release the current reference, then adopt `ptr` with `deleter`.
    ///
    /// The old payload may be destroyed before the new block is
    /// allocated. On allocation failure `this` is left empty and `deleter`
    /// has already run on `ptr`.
    ///
    /// # Safety
    ///
    /// Same as [`Shared::from_raw_with`].
    pub unsafe fn reset_to_raw<D>(
        this: &mut Self,
        ptr: *mut T,
        deleter: D,
    ) -> Result<(), BlockAllocError>
    where
        D: FnOnce(NonNull<T>) + 'static,
    {
        Self::reset(this);
        *this = unsafe { Self::from_raw_with(ptr, deleter)? };
        Ok(())
    }

    /// Release the current reference, then adopt `value`. On allocation
    /// failure `this` is left empty and `value` has been dropped.
    pub fn reset_to_box(this: &mut Self, value: Box<T>) -> Result<(), BlockAllocError> {
        Self::reset(this);
        *this = Self::from_box(value)?;
        Ok(())
    }

    /// The payload, or `None` for an empty handle.
    pub fn get(this: &Self) -> Option<&T> {
        // SAFETY: a strong reference keeps the payload alive.
        this.raw.map(|parts| unsafe { &*parts.ptr.as_ptr() })
    }

    /// The pointer this handle dereferences to, or `None` when empty.
    pub fn as_ptr(this: &Self) -> Option<NonNull<T>> {
        this.raw.map(|parts| parts.ptr)
    }

    /// Number of `Shared` handles on this block; zero when empty.
    pub fn use_count(this: &Self) -> usize {
        this.raw.map_or(0, |parts| parts.header().strong_count())
    }

    /// Number of handles of either kind on this block; zero when empty.
    pub fn weak_count(this: &Self) -> usize {
        this.raw.map_or(0, |parts| parts.header().weak_count())
    }

    pub fn is_null(this: &Self) -> bool {
        this.raw.is_none()
    }

    /// Whether both handles dereference to the same address. Two empty
    /// handles compare equal.
    pub fn ptr_eq<U: ?Sized>(this: &Self, other: &Shared<U>) -> bool {
        address(this.raw) == address(other.raw)
    }

    fn same_block(&self, other: &Self) -> bool {
        self.raw.map(|p| p.block) == other.raw.map(|p| p.block)
    }
}

#[inline]
pub(crate) fn address<T: ?Sized>(raw: Option<Parts<T>>) -> Option<NonNull<u8>> {
    raw.map(|parts| parts.ptr.cast::<u8>())
}

impl<T> Shared<T> {
    /// Same as [`make_shared`](crate::make_shared).
    pub fn new(value: T) -> Self {
        make::make_shared(value)
    }

    /// Same as [`try_make_shared`](crate::try_make_shared).
    pub fn try_new(value: T) -> Result<Self, BlockAllocError> {
        make::try_make_shared(value)
    }

    /// Same as [`try_make_shared_with`](crate::try_make_shared_with).
    pub fn try_new_with<E, F>(init: F) -> Result<Self, TryMakeError<E>>
    where
        F: FnOnce() -> Result<T, E>,
    {
        make::try_make_shared_with(init)
    }
}

impl<T: ?Sized> Default for Shared<T> {
    fn default() -> Self {
        Self::null()
    }
}

impl<T: ?Sized> Clone for Shared<T> {
    fn clone(&self) -> Self {
        match self.raw {
            // SAFETY: `self` holds a strong reference.
            Some(parts) => unsafe { Self::share(parts) },
            None => Self::null(),
        }
    }

    /// Copy-assignment: a handle on the same block only takes over the
    /// pointer, without touching the counts.
    fn clone_from(&mut self, source: &Self) {
        if self.same_block(source) {
            self.raw = source.raw;
        } else {
            *self = source.clone();
        }
    }
}

impl<T: ?Sized> Drop for Shared<T> {
    fn drop(&mut self) {
        if let Some(parts) = self.raw.take() {
            // SAFETY: this handle's strong reference is being given up.
            unsafe { BlockHeader::drop_shared(parts.block) }
        }
    }
}

impl<T: ?Sized> Deref for Shared<T> {
    type Target = T;

    #[track_caller]
    fn deref(&self) -> &T {
        match Shared::get(self) {
            Some(v) => v,
            None => empty_deref(),
        }
    }
}

#[cold]
#[track_caller]
fn empty_deref() -> ! {
    panic!("dereferenced an empty Shared handle")
}

impl<T> From<T> for Shared<T> {
    fn from(value: T) -> Self {
        make::make_shared(value)
    }
}

impl<T: ?Sized, U: ?Sized> PartialEq<Shared<U>> for Shared<T> {
    /// Identity comparison by payload address, not by value.
    fn eq(&self, other: &Shared<U>) -> bool {
        Shared::ptr_eq(self, other)
    }
}

impl<T: ?Sized> Eq for Shared<T> {}

impl<T: ?Sized> Hash for Shared<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        address(self.raw).hash(state);
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for Shared<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match Shared::get(self) {
            Some(v) => f
                .debug_struct("Shared")
                .field("data", &v)
                .field("strong", &Shared::use_count(self))
                .field("weak", &Shared::weak_count(self))
                .finish(),
            None => f.write_str("Shared(null)"),
        }
    }
}

impl<T: ?Sized + fmt::Display> fmt::Display for Shared<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match Shared::get(self) {
            Some(v) => fmt::Display::fmt(v, f),
            None => f.write_str("null"),
        }
    }
}

impl<T: ?Sized> fmt::Pointer for Shared<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match address(self.raw) {
            Some(p) => fmt::Pointer::fmt(&p, f),
            None => fmt::Pointer::fmt(&core::ptr::null::<u8>(), f),
        }
    }
}
