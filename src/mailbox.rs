//! The bounded single-slot, latest-wins publication primitive the ISR uses
//! to hand telemetry off to the application thread (spec.md §4.5, §5).
//!
//! A brief `critical_section::with` guards each access instead of a lock:
//! on a single-core target this is just a short interrupt mask, matching
//! spec.md §5's "no locks on the hot path" — the ISR never waits on
//! anything, it just disables interrupts for the handful of instructions
//! needed to copy a `Copy` value in or out.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicBool, Ordering};

pub struct Mailbox<T: Copy> {
    value: UnsafeCell<Option<T>>,
    fresh: AtomicBool,
}

// SAFETY: all access to `value` goes through `critical_section::with`,
// which on every `critical-section` backend serializes access across
// cores/interrupts, so concurrent access by producer and consumer can
// never overlap.
unsafe impl<T: Copy + Send> Sync for Mailbox<T> {}

impl<T: Copy> Mailbox<T> {
    pub const fn new() -> Self {
        Self {
            value: UnsafeCell::new(None),
            fresh: AtomicBool::new(false),
        }
    }

    /// Overwrite the slot with `value` and mark it fresh. Called from the
    /// receive-complete ISR; never blocks.
    pub fn publish(&self, value: T) {
        critical_section::with(|_| {
            // SAFETY: exclusive access for the duration of the critical section.
            unsafe {
                *self.value.get() = Some(value);
            }
            self.fresh.store(true, Ordering::Release);
        });
    }

    /// Take the slot's value if it hasn't already been consumed, clearing
    /// the fresh flag. Returns `None` if nothing new arrived since the
    /// last call.
    pub fn take_fresh(&self) -> Option<T> {
        critical_section::with(|_| {
            if self.fresh.swap(false, Ordering::AcqRel) {
                // SAFETY: exclusive access for the duration of the critical section.
                unsafe { *self.value.get() }
            } else {
                None
            }
        })
    }
}

impl<T: Copy> Default for Mailbox<T> {
    fn default() -> Self {
        Self::new()
    }
}
