//! Draw/erase mutual exclusion
//!
//! [`DrawLock`] serializes stroke commits. Acquisition is always bounded:
//! the input path gives up after its timeout instead of blocking, and the
//! refresh path waits on the condvar until the holder releases.

use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tracing::trace;

/// A timed, non-reentrant lock around the draw commit path
#[derive(Debug, Default)]
pub struct DrawLock {
    held: Mutex<bool>,
    released: Condvar,
}

/// Releases the [`DrawLock`] and wakes waiters on drop
#[derive(Debug)]
pub struct DrawGuard<'a> {
    lock: &'a DrawLock,
}

impl DrawLock {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, bool> {
        self.held.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Take the lock, waiting at most `timeout`
    pub fn try_acquire_for(&self, timeout: Duration) -> Option<DrawGuard<'_>> {
        let deadline = Instant::now() + timeout;
        let mut held = self.state();
        while *held {
            let now = Instant::now();
            if now >= deadline {
                trace!("DrawLock: acquire timed out after {:?}", timeout);
                return None;
            }
            held = match self.released.wait_timeout(held, deadline - now) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
        *held = true;
        Some(DrawGuard { lock: self })
    }

    /// Wait until nobody holds the lock, without taking it.
    /// Returns false if it was still held after `timeout`.
    pub fn wait_until_free(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut held = self.state();
        while *held {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            held = match self.released.wait_timeout(held, deadline - now) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
        true
    }

    pub fn is_held(&self) -> bool {
        *self.state()
    }

    fn release(&self) {
        *self.state() = false;
        self.released.notify_all();
    }
}

impl Drop for DrawGuard<'_> {
    fn drop(&mut self) {
        self.lock.release();
    }
}
