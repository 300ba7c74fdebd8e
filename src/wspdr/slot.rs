//! Single-slot atomic transfer cell.
//!
//! The lock-free handoff underlying the steal protocol. Two uses:
//!
//! - **Loot cell**: a victim answering a steal request writes the stolen
//!   tasks into the requester's cell; the requester spins on it.
//! - **Mailbox**: an external thread injects a bootstrap task into a worker;
//!   the worker drains it at the top of its acquire loop.
//!
//! # Protocol
//!
//! ```text
//! writer: write payload under !full  →  Release-store full=true
//! reader: Acquire-load full==true    →  take payload  →  Release-store full=false
//! ```
//!
//! The Release/Acquire pair on `full` orders the payload write before the
//! payload read, and the reader's clearing store before the next writer's
//! check. Soundness additionally needs the callers' single-writer contract:
//!
//! - A loot cell has at most one active writer because a requester registers
//!   in at most one victim's request slot at a time, and that registration is
//!   exclusive (CAS).
//! - A mailbox has at most one active writer by the `send_task` usage
//!   contract (injection only into an idle worker, one pending at a time).
//!
//! A `put` against a still-full cell is a contract violation and asserts.

#[cfg(not(loom))]
use std::sync::atomic::{AtomicBool, Ordering};

#[cfg(loom)]
use loom::sync::atomic::{AtomicBool, Ordering};

use std::cell::UnsafeCell;

/// One-value handoff cell. See the module docs for the writer contract.
pub(crate) struct Slot<T> {
    full: AtomicBool,
    value: UnsafeCell<Option<T>>,
}

// SAFETY: the payload is only touched on one side of the `full` flag
// protocol above; the flag's Release/Acquire pairing makes those accesses
// happen-before ordered across threads.
unsafe impl<T: Send> Sync for Slot<T> {}
unsafe impl<T: Send> Send for Slot<T> {}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Slot<T> {
    pub(crate) fn new() -> Self {
        Self {
            full: AtomicBool::new(false),
            value: UnsafeCell::new(None),
        }
    }

    /// Publish a value. Panics if the previous value is unconsumed — that is
    /// a violation of the single-pending contract, not a recoverable state.
    pub(crate) fn put(&self, value: T) {
        assert!(
            !self.full.load(Ordering::Acquire),
            "slot handoff still pending"
        );
        // SAFETY: full==false and the callers' single-writer contract mean no
        // other thread touches the cell until we flip the flag below.
        unsafe {
            *self.value.get() = Some(value);
        }
        self.full.store(true, Ordering::Release);
    }

    /// Consume the pending value, if any. Reader side only.
    pub(crate) fn take(&self) -> Option<T> {
        if !self.full.load(Ordering::Acquire) {
            return None;
        }
        // SAFETY: we observed full==true with Acquire, so the writer's
        // payload store happens-before this read, and the writer will not
        // touch the cell again until it observes our clearing store.
        let value = unsafe { (*self.value.get()).take() };
        debug_assert!(value.is_some(), "full flag set on an empty slot");
        self.full.store(false, Ordering::Release);
        value
    }

    /// Whether a value is pending (Acquire read, reader or diagnostics).
    pub(crate) fn is_full(&self) -> bool {
        self.full.load(Ordering::Acquire)
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;

    #[test]
    fn put_take_round_trip() {
        let slot = Slot::new();
        assert!(!slot.is_full());
        assert_eq!(slot.take(), None);

        slot.put(vec![1, 2, 3]);
        assert!(slot.is_full());
        assert_eq!(slot.take(), Some(vec![1, 2, 3]));
        assert!(!slot.is_full());
        assert_eq!(slot.take(), None);
    }

    #[test]
    fn reusable_after_consumption() {
        let slot = Slot::new();
        for i in 0..10 {
            slot.put(i);
            assert_eq!(slot.take(), Some(i));
        }
    }

    #[test]
    #[should_panic(expected = "still pending")]
    fn double_put_asserts() {
        let slot = Slot::new();
        slot.put(1);
        slot.put(2);
    }
}
