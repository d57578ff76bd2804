use std::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::Error;

/// Locks a [`Mutex`], turning poisoning into an [`Error::Internal`] instead of panicking.
pub fn lock_mutex<'a, T>(lock: &'a Mutex<T>, context: &str) -> Result<MutexGuard<'a, T>, Error> {
    lock.lock()
        .map_err(|_| Error::internal(format!("mutex poisoned: {context}")))
}

/// Locks a [`RwLock`] for reading, turning poisoning into an [`Error::Internal`].
pub fn lock_rwlock_read<'a, T>(
    lock: &'a RwLock<T>,
    context: &str,
) -> Result<RwLockReadGuard<'a, T>, Error> {
    lock.read()
        .map_err(|_| Error::internal(format!("rwlock poisoned: {context}")))
}

/// Locks a [`RwLock`] for writing, turning poisoning into an [`Error::Internal`].
pub fn lock_rwlock_write<'a, T>(
    lock: &'a RwLock<T>,
    context: &str,
) -> Result<RwLockWriteGuard<'a, T>, Error> {
    lock.write()
        .map_err(|_| Error::internal(format!("rwlock poisoned: {context}")))
}
