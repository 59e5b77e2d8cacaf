// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2026 VXD driver developers

//! Ticket spinlock with an RAII guard.  This is the only concurrency
//! primitive in the driver; the secure channel wraps its entire state in
//! one of these, which is what serializes every cross-boundary call.

use core::cell::UnsafeCell;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::{AtomicU64, Ordering};

/// A lock guard obtained from [`SpinLock::lock`].  The lock is released
/// when the guard goes out of scope.
#[derive(Debug)]
#[must_use = "if unused the SpinLock will immediately unlock"]
pub struct SpinLockGuard<'a, T> {
    holder: &'a AtomicU64,
    data: &'a mut T,
}

impl<T> Drop for SpinLockGuard<'_, T> {
    fn drop(&mut self) {
        self.holder.fetch_add(1, Ordering::Release);
    }
}

impl<T> Deref for SpinLockGuard<'_, T> {
    type Target = T;
    fn deref(&self) -> &T {
        self.data
    }
}

impl<T> DerefMut for SpinLockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.data
    }
}

/// A ticket lock: tickets are handed out in `lock` order, so acquisition
/// is FIFO-fair across callers.
#[derive(Debug, Default)]
pub struct SpinLock<T> {
    /// Next ticket to hand out.
    current: AtomicU64,
    /// Ticket currently allowed to hold the lock.
    holder: AtomicU64,
    data: UnsafeCell<T>,
}

// SAFETY: SpinLock guarantees mutually exclusive access to the wrapped
// data, so it can be shared across threads whenever the data itself can
// be sent between them.
unsafe impl<T: Send> Send for SpinLock<T> {}
// SAFETY: see above.
unsafe impl<T: Send> Sync for SpinLock<T> {}

impl<T> SpinLock<T> {
    pub const fn new(data: T) -> SpinLock<T> {
        SpinLock {
            current: AtomicU64::new(0),
            holder: AtomicU64::new(0),
            data: UnsafeCell::new(data),
        }
    }

    /// Blocks until the lock is available.  The only way out of a held
    /// lock is the current holder completing; there is no timeout.
    pub fn lock(&self) -> SpinLockGuard<'_, T> {
        let ticket = self.current.fetch_add(1, Ordering::Relaxed);
        while self.holder.load(Ordering::Acquire) != ticket {
            core::hint::spin_loop();
        }
        SpinLockGuard {
            holder: &self.holder,
            // SAFETY: the ticket check above guarantees exclusive access
            // until the guard drops and advances the holder.
            data: unsafe { &mut *self.data.get() },
        }
    }
}
