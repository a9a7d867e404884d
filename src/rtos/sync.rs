//! Critical-section access to scheduler state.
//!
//! The scheduler state is touched from two contexts: the timer interrupt and
//! the main loop. `SharedState` is the scoped-guard seam between them: the
//! closure passed to `with_mut` is the critical section, and exclusive access
//! ends when it returns.
//!
//! - [`InterruptMutex`] masks interrupts globally (AVR targets)
//! - [`LocalState`] uses a `RefCell` for single-context host use and tests

use core::cell::RefCell;

/// Platform-agnostic exclusive access to `T`.
pub trait SharedState<T> {
    /// Access state immutably inside a critical section.
    fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R;

    /// Access state mutably inside a critical section.
    ///
    /// Implementations must not allow `f` to be preempted by another user of
    /// the same state. The closure has to stay short: on AVR it runs with
    /// interrupts disabled.
    fn with_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut T) -> R;
}

// ============================================================================
// AVR implementation
// ============================================================================

#[cfg(target_arch = "avr")]
use avr_device::interrupt::{self, Mutex};

/// State guarded by the global interrupt flag.
///
/// `avr_device::interrupt::free` saves SREG, clears the I flag and restores
/// it on exit, so this is safe to enter from the timer ISR as well as from
/// the main loop.
#[cfg(target_arch = "avr")]
pub struct InterruptMutex<T> {
    inner: Mutex<RefCell<T>>,
}

#[cfg(target_arch = "avr")]
impl<T> InterruptMutex<T> {
    pub const fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(value)),
        }
    }
}

#[cfg(target_arch = "avr")]
impl<T> SharedState<T> for InterruptMutex<T> {
    fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        interrupt::free(|cs| f(&self.inner.borrow(cs).borrow()))
    }

    fn with_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut T) -> R,
    {
        interrupt::free(|cs| f(&mut self.inner.borrow(cs).borrow_mut()))
    }
}

// ============================================================================
// Local implementation (host, tests, single-context use)
// ============================================================================

/// Unsynchronized state for code that never preempts itself.
///
/// There is no interrupt masking here, so `tick` and `dispatch` must be
/// called from the same context. `LocalState` is not `Sync`, which keeps it
/// out of `static`s shared with an ISR.
///
/// # Panics
///
/// Panics if accessed re-entrantly from inside a `with_mut` closure.
pub struct LocalState<T> {
    inner: RefCell<T>,
}

impl<T> LocalState<T> {
    pub const fn new(value: T) -> Self {
        Self {
            inner: RefCell::new(value),
        }
    }

    /// Consume the wrapper and return the state.
    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }
}

impl<T> SharedState<T> for LocalState<T> {
    fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        f(&self.inner.borrow())
    }

    fn with_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut T) -> R,
    {
        f(&mut self.inner.borrow_mut())
    }
}
