//! Allocation entry points: payload and counts in a single block.
//!
//! These are the only constructors that produce an `OwningBlock`.

use crate::error::{BlockAllocError, TryMakeError};
use crate::owning::OwningBlock;
use crate::shared::Shared;
use core::convert::Infallible;

/// Move `value` into a new co-located block and return the first handle.
///
/// Aborts through [`std::alloc::handle_alloc_error`] if the block cannot be
/// allocated, like `Box::new`. Use [`try_make_shared`] to handle that case.
pub fn make_shared<T>(value: T) -> Shared<T> {
    match try_make_shared(value) {
        Ok(shared) => shared,
        Err(e) => std::alloc::handle_alloc_error(e.layout()),
    }
}

/// Like [`make_shared`], but reports allocation failure. `value` is dropped
/// on failure.
pub fn try_make_shared<T>(value: T) -> Result<Shared<T>, BlockAllocError> {
    try_make_shared_with(|| Ok::<T, Infallible>(value)).map_err(|e| match e {
        TryMakeError::Alloc(e) => e,
        TryMakeError::Init(never) => match never {},
    })
}

/// Allocate a block, then build the payload into it with `init`.
///
/// No handle exists until `init` succeeds. If `init` returns an error or
/// panics, the block storage is released before the failure reaches the
/// caller.
///
/// ```
/// use rc_block::{try_make_shared_with, Shared, TryMakeError};
///
/// let port: Shared<u16> = try_make_shared_with(|| "8080".parse::<u16>()).unwrap();
/// assert_eq!(*port, 8080);
///
/// let bad = try_make_shared_with(|| "http".parse::<u16>());
/// assert!(matches!(bad, Err(TryMakeError::Init(_))));
/// ```
pub fn try_make_shared_with<T, E, F>(init: F) -> Result<Shared<T>, TryMakeError<E>>
where
    F: FnOnce() -> Result<T, E>,
{
    let (block, payload) = OwningBlock::emplace_with(init)?;
    // SAFETY: fresh block holding a constructed payload, counts at 0/0.
    Ok(unsafe { Shared::adopt_block(block, payload) })
}

#[cfg(test)]
mod tests {
    use super::{make_shared, try_make_shared, try_make_shared_with};
    use crate::error::TryMakeError;
    use crate::fault;
    use crate::shared::Shared;

    #[test]
    fn first_handle_starts_at_one_one() {
        let s = make_shared(String::from("p"));
        assert_eq!(Shared::use_count(&s), 1);
        assert_eq!(Shared::weak_count(&s), 1);
        assert_eq!(s.as_str(), "p");
    }

    #[test]
    fn try_make_shared_reports_alloc_failure() {
        let base = fault::live_blocks();
        fault::fail_next_allocations(1);
        let err = try_make_shared(vec![1u8, 2, 3]).unwrap_err();
        assert!(err.layout().size() > 0);
        assert_eq!(fault::live_blocks(), base);
    }

    #[test]
    fn try_make_shared_with_init_error() {
        let base = fault::live_blocks();
        let res: Result<Shared<u32>, _> = try_make_shared_with(|| Err("nope"));
        match res {
            Err(TryMakeError::Init(msg)) => assert_eq!(msg, "nope"),
            other => panic!("unexpected: {:?}", other.map(|s| *s)),
        }
        assert_eq!(fault::live_blocks(), base);
    }
}
