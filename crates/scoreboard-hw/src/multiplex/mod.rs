//! Multiplexed seven-segment displays.
//!
//! Several digits share one set of segment lines and each digit has its own
//! enable line. A refresh loop lights the digits one after another.

mod bank;
mod device;
mod message;
mod worker;

pub use bank::SegmentBank;
pub use device::{MultiplexedDisplay, PinSnapshot, DEFAULT_REFRESH_DELAY};
pub use message::{Cell, DisplayMessage};

use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

// Lock helpers that recover from a poisoned lock.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
