//! A mutex that lives in arena bytes.
//!
//! [`Lock`] is an ordinary struct type with one 4-byte atomic cell, so any
//! instance bound to the same bytes sees the same state. Contended
//! acquisition parks on the cell's address; release wakes one waiter.
//! The lock is not reentrant and has no timeout.

use std::sync::atomic::{AtomicU32, Ordering};

use rawmem_core::MemError;

use crate::record::Struct;
use crate::wait;

const UNLOCKED: u32 = 0;
const LOCKED: u32 = 1;

crate::define_struct! {
    /// A mutex over one 4-byte aligned cell of shared memory.
    pub struct Lock {
        /// 0 when free, 1 when held.
        mutex: AtomicU32,
    }
}

impl Lock {
    /// Acquire the lock, blocking until it is free.
    ///
    /// Fails with [`MemError::MisalignedCell`] if the lock's bytes do not
    /// start on a 4-byte arena boundary.
    pub fn lock(&self) -> Result<LockGuard<'_>, MemError> {
        let cell = self.cell()?;
        while cell
            .compare_exchange(UNLOCKED, LOCKED, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            wait::wait_while(cell, LOCKED);
        }
        Ok(LockGuard { cell })
    }

    /// Acquire the lock if it is free, without blocking.
    pub fn try_lock(&self) -> Result<Option<LockGuard<'_>>, MemError> {
        let cell = self.cell()?;
        Ok(cell
            .compare_exchange(UNLOCKED, LOCKED, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| LockGuard { cell }))
    }

    /// Release the lock and wake one waiter.
    ///
    /// For callers that hold the lock without a guard, for example across
    /// instances bound to the same bytes. Releasing a free lock only wakes.
    pub fn unlock(&self) -> Result<(), MemError> {
        release(self.cell()?);
        Ok(())
    }

    /// Whether some holder currently owns the lock.
    pub fn is_locked(&self) -> bool {
        self.mutex().get() != UNLOCKED
    }

    fn cell(&self) -> Result<&AtomicU32, MemError> {
        let offset = Self::layout().descriptor("mutex").offset;
        self.view().cell(offset)
    }
}

/// Holds a [`Lock`] until dropped.
#[must_use = "the lock is released as soon as the guard is dropped"]
#[derive(Debug)]
pub struct LockGuard<'a> {
    cell: &'a AtomicU32,
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        release(self.cell);
    }
}

fn release(cell: &AtomicU32) {
    cell.store(UNLOCKED, Ordering::Release);
    wait::wake_one(cell);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Heap;

    #[test]
    fn lock_and_release() {
        let lock = Lock::scratch();
        assert!(!lock.is_locked());
        let guard = lock.lock().unwrap();
        assert!(lock.is_locked());
        assert!(lock.try_lock().unwrap().is_none());
        drop(guard);
        assert!(!lock.is_locked());
        assert!(lock.try_lock().unwrap().is_some());
    }

    #[test]
    fn aliased_instances_share_state() {
        let heap = Heap::with_capacity(64).unwrap();
        let lock = Lock::new_in(&heap).unwrap();
        let alias = Lock::from_struct(&lock).unwrap();
        let _guard = lock.lock().unwrap();
        assert!(alias.is_locked());
        assert!(alias.try_lock().unwrap().is_none());
    }

    #[test]
    fn explicit_unlock_releases_foreign_hold() {
        let lock = Lock::scratch();
        std::mem::forget(lock.lock().unwrap());
        assert!(lock.is_locked());
        lock.unlock().unwrap();
        assert!(!lock.is_locked());
    }

    #[test]
    fn misaligned_lock_is_rejected() {
        let heap = Heap::with_capacity(64).unwrap();
        let view = heap.slice(6, 4).unwrap();
        let lock = Lock::bind(view);
        assert!(matches!(
            lock.lock(),
            Err(MemError::MisalignedCell { offset: 6 })
        ));
    }
}
