//! Error types for handle construction.

use core::alloc::Layout;
use core::fmt;

/// A control block could not be allocated.
///
/// When this is returned from a raw-pointer constructor, the payload's
/// deleter has already run.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct BlockAllocError {
    layout: Layout,
}

impl BlockAllocError {
    pub(crate) fn new(layout: Layout) -> Self {
        Self { layout }
    }

    /// Layout of the block that could not be allocated.
    pub fn layout(&self) -> Layout {
        self.layout
    }
}

impl fmt::Display for BlockAllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "failed to allocate a control block of {} bytes (align {})",
            self.layout.size(),
            self.layout.align()
        )
    }
}

impl std::error::Error for BlockAllocError {}

/// Failure of [`try_make_shared_with`](crate::try_make_shared_with).
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TryMakeError<E> {
    /// No storage for the block; the initializer was not called.
    Alloc(BlockAllocError),
    /// The initializer failed; the block storage has been released.
    Init(E),
}

impl<E: fmt::Display> fmt::Display for TryMakeError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TryMakeError::Alloc(e) => fmt::Display::fmt(e, f),
            TryMakeError::Init(e) => write!(f, "payload initialization failed: {e}"),
        }
    }
}

impl<E> std::error::Error for TryMakeError<E>
where
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TryMakeError::Alloc(e) => Some(e),
            TryMakeError::Init(e) => Some(e),
        }
    }
}

impl<E> From<BlockAllocError> for TryMakeError<E> {
    fn from(e: BlockAllocError) -> Self {
        TryMakeError::Alloc(e)
    }
}
