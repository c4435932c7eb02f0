//! Address-keyed wait queue for arena cells.
//!
//! Threads blocked on a [`Lock`](crate::Lock) park on the address of the
//! lock's `AtomicU32` cell. Every view of the same arena word resolves to
//! the same address, so waiters and wakers agree on the key no matter which
//! instance they went through.

#![allow(unsafe_code)]

use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot_core::{DEFAULT_PARK_TOKEN, DEFAULT_UNPARK_TOKEN};

fn key(cell: &AtomicU32) -> usize {
    cell as *const AtomicU32 as usize
}

/// Block the calling thread while `cell` holds `expected`.
///
/// Returns immediately if the cell already differs. May return spuriously;
/// callers re-check their condition in a loop.
pub(crate) fn wait_while(cell: &AtomicU32, expected: u32) {
    // SAFETY: the validate closure only loads an atomic, and the
    // before-sleep and timed-out closures do nothing; none of them panic or
    // call back into parking_lot_core. The key is the address of a live
    // cell borrowed for the duration of the call.
    unsafe {
        parking_lot_core::park(
            key(cell),
            || cell.load(Ordering::Acquire) == expected,
            || {},
            |_, _| {},
            DEFAULT_PARK_TOKEN,
            None,
        );
    }
}

/// Wake one thread parked on `cell`, if any.
pub(crate) fn wake_one(cell: &AtomicU32) {
    // SAFETY: the callback returns a token and does nothing else, so it
    // neither panics nor re-enters parking_lot_core.
    unsafe {
        parking_lot_core::unpark_one(key(cell), |_| DEFAULT_UNPARK_TOKEN);
    }
}
