//! rc-block: single-threaded shared and weak handles whose reference
//! counts live in a separate control block.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: deterministic, non-intrusive shared ownership of heap values
//!   with an observer handle that can detect when the value is gone.
//! - Layers:
//!   - Counts: a strong/weak counter pair. Every `Shared` is also counted
//!     as a weak reference, so `weak >= strong` always holds.
//!   - Control blocks: a `BlockHeader` (counts plus two type-erased
//!     operations) followed by the variant's storage. `OwningBlock<T>`
//!     keeps the payload inline (one allocation for value and counts);
//!     `PointingBlock<T, D>` points at a separately allocated payload and
//!     owns the deleter that disposes of it.
//!   - Handles: `Shared<T>` keeps the payload alive; `Weak<T>` keeps only
//!     the block alive and can be promoted with `lock`.
//!
//! Block lifecycle
//! - live (strong > 0) -> payload destroyed, weak only (strong == 0,
//!   weak > 0) -> freed (weak == 0). No transition skips a state.
//! - The payload is destroyed at the strong 1 -> 0 transition, the block
//!   is freed at the weak 1 -> 0 transition. The counters alone decide
//!   both; there are no "already destroyed" flags.
//! - Releasing a strong reference destroys the payload *before* giving up
//!   its implicit weak reference. A payload whose destructor drops a
//!   `Weak` to its own block therefore never frees the block from under
//!   the release in progress.
//! - Counter mutation and the decision to free are separate steps: a
//!   block never deallocates itself from inside one of its own counter
//!   operations.
//!
//! Constraints
//! - Single-threaded: `!Send`/`!Sync` handles, plain `Cell` counters.
//!   Sharing a block across threads requires external synchronization,
//!   and the handle types make that impossible to do by accident.
//! - No cycle collection. A cycle of `Shared` handles leaks.
//! - Blocks are obtained from the global allocator. Failing to obtain a
//!   block is reported as `BlockAllocError`; if a raw payload was already
//!   handed over, its deleter runs before the error is returned.
//!
//! Overflow semantics
//! - Count overflow aborts the process, matching `Rc`. Underflow is a bug
//!   in this crate and panics.
//!
//! Notes
//! - Accessors on `Shared` are associated functions (`Shared::use_count(&s)`)
//!   so they never shadow methods of the payload reached through `Deref`.
//! - `Shared::project` builds an aliasing handle: it shares the owner's
//!   block but exposes a sub-object of the payload.

mod block;
mod counts;
mod error;
#[cfg(any(test, feature = "fault_injection"))]
pub mod fault;
#[cfg(not(any(test, feature = "fault_injection")))]
mod fault;
mod handle_proptest;
mod make;
mod owning;
mod pointing;
mod shared;
mod storage;
mod weak;

// Public surface
pub use error::{BlockAllocError, TryMakeError};
pub use make::{make_shared, try_make_shared, try_make_shared_with};
pub use shared::Shared;
pub use weak::Weak;
