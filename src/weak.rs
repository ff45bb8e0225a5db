//! Non-owning observer handle.

use crate::block::BlockHeader;
use crate::shared::{address, Parts, Shared};
use core::fmt;
use core::marker::PhantomData;

/// An observer of a [`Shared`] payload.
///
/// A `Weak` keeps the control block alive but not the payload. It can
/// tell whether the payload is gone ([`Weak::expired`]) and, if not,
/// produce a new `Shared` ([`Weak::lock`]).
pub struct Weak<T: ?Sized> {
    raw: Option<Parts<T>>,
    _owns: PhantomData<T>,
    _nosend: PhantomData<*mut ()>,
}

impl<T: ?Sized> Weak<T> {
    /// An empty observer; always expired.
    pub const fn new() -> Self {
        Self {
            raw: None,
            _owns: PhantomData,
            _nosend: PhantomData,
        }
    }

    /// Take a weak reference on the block in `parts`.
    ///
    /// # Safety
    ///
    /// The caller must hold a reference (of either kind) on `parts.block`.
    pub(crate) unsafe fn observe(parts: Parts<T>) -> Self {
        parts.header().add_weak();
        Self {
            raw: Some(parts),
            _owns: PhantomData,
            _nosend: PhantomData,
        }
    }

    /// True if there is no block or its payload has been destroyed.
    pub fn expired(&self) -> bool {
        self.raw
            .map_or(true, |parts| parts.header().strong_count() == 0)
    }

    /// A new `Shared` if the payload is alive, otherwise an empty handle.
    ///
    /// The strong count is only incremented after the payload is known to
    /// be alive.
    pub fn lock(&self) -> Shared<T> {
        match self.raw {
            // SAFETY: we hold a weak reference and just saw strong > 0.
            Some(parts) if parts.header().strong_count() > 0 => unsafe { Shared::share(parts) },
            _ => Shared::null(),
        }
    }

    /// Number of `Shared` handles on the observed block; zero when empty.
    pub fn use_count(&self) -> usize {
        self.raw.map_or(0, |parts| parts.header().strong_count())
    }

    /// Number of handles of either kind on the observed block; zero when
    /// empty.
    pub fn weak_count(&self) -> usize {
        self.raw.map_or(0, |parts| parts.header().weak_count())
    }

    /// Observe `source`'s block instead of the current one.
    ///
    /// If both already refer to the same block only the pointer is taken
    /// over; nothing is released and re-acquired.
    pub fn assign(&mut self, source: &Shared<T>) {
        let incoming = Shared::parts(source);
        if self.raw.map(|p| p.block) == incoming.map(|p| p.block) {
            self.raw = incoming;
        } else {
            *self = Shared::downgrade(source);
        }
    }

    /// Move the observer out, leaving `self` empty.
    pub fn take(&mut self) -> Self {
        core::mem::take(self)
    }

    /// Stop observing. No-op when empty.
    pub fn reset(&mut self) {
        drop(self.take());
    }

    /// Whether both observers point at the same address. Two empty
    /// observers compare equal.
    pub fn ptr_eq<U: ?Sized>(&self, other: &Weak<U>) -> bool {
        address(self.raw) == address(other.raw)
    }
}

impl<T: ?Sized> Default for Weak<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> Clone for Weak<T> {
    fn clone(&self) -> Self {
        match self.raw {
            // SAFETY: `self` holds a weak reference on the block.
            Some(parts) => unsafe { Self::observe(parts) },
            None => Self::new(),
        }
    }

    /// Same block: take over the pointer, leave the counts alone.
    fn clone_from(&mut self, source: &Self) {
        if self.raw.map(|p| p.block) == source.raw.map(|p| p.block) {
            self.raw = source.raw;
        } else {
            *self = source.clone();
        }
    }
}

impl<T: ?Sized> Drop for Weak<T> {
    fn drop(&mut self) {
        if let Some(parts) = self.raw.take() {
            // SAFETY: this observer's weak reference is being given up.
            unsafe { BlockHeader::drop_weak(parts.block) }
        }
    }
}

impl<T: ?Sized> From<&Shared<T>> for Weak<T> {
    fn from(shared: &Shared<T>) -> Self {
        Shared::downgrade(shared)
    }
}

impl<T: ?Sized> fmt::Debug for Weak<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(Weak)")
    }
}
