//! Single-slot blocking handoff channel with sender backpressure.
//!
//! # Contract
//!
//! - Capacity exactly one; no buffering.
//! - [`Channel::try_send`] is non-blocking: if a parcel is already pending it
//!   fails fast and hands the value back, otherwise it stores the parcel and
//!   wakes one blocked receiver.
//! - [`Channel::recv`] is blocking: consumes a pending parcel immediately, or
//!   waits until one arrives.
//! - Exactly one `recv` pairs with each successful send. A single consumer
//!   per channel instance; concurrent receivers are not a supported use.
//!
//! This is the launch primitive of the statically partitioned pool
//! ([`SuapPool`](crate::SuapPool)) — the one place in the crate that blocks on
//! an OS primitive rather than spinning. The work-stealing hot path uses the
//! lock-free [`Slot`](crate::wspdr) cells instead.

use std::sync::{Condvar, Mutex};

/// Mutex-plus-condvar single-slot channel.
pub struct Channel<T> {
    parcel: Mutex<Option<T>>,
    available: Condvar,
}

impl<T> Default for Channel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Channel<T> {
    pub fn new() -> Self {
        Self {
            parcel: Mutex::new(None),
            available: Condvar::new(),
        }
    }

    /// Non-blocking send.
    ///
    /// # Errors
    ///
    /// Returns `Err(value)` without touching channel state if a parcel is
    /// already pending. The caller gets the value back and explicit
    /// backpressure feedback.
    pub fn try_send(&self, value: T) -> Result<(), T> {
        let mut slot = self.parcel.lock().expect("channel mutex poisoned");
        if slot.is_some() {
            return Err(value);
        }
        *slot = Some(value);
        self.available.notify_one();
        Ok(())
    }

    /// Blocking receive. Consumes the pending parcel, waiting if necessary.
    pub fn recv(&self) -> T {
        let mut slot = self.parcel.lock().expect("channel mutex poisoned");
        loop {
            if let Some(value) = slot.take() {
                return value;
            }
            slot = self
                .available
                .wait(slot)
                .expect("channel mutex poisoned");
        }
    }
}
