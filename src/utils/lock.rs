//! Lock utilities for shared library state
//!
//! Registry, load-state and exports locks are only held for short critical
//! sections that never run loader routines or other user code. A poisoned
//! lock therefore still guards consistent data and is recovered rather than
//! propagated.

use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::warn;

/// Acquire a mutex, recovering from poison
pub fn lock<'a, T>(mutex: &'a Mutex<T>, context: &str) -> MutexGuard<'a, T> {
    mutex.lock().unwrap_or_else(|e| {
        warn!("{}: recovering poisoned lock", context);
        PoisonError::into_inner(e)
    })
}

/// Acquire a read lock, recovering from poison
pub fn read<'a, T>(rwlock: &'a RwLock<T>, context: &str) -> RwLockReadGuard<'a, T> {
    rwlock.read().unwrap_or_else(|e| {
        warn!("{}: recovering poisoned lock", context);
        PoisonError::into_inner(e)
    })
}

/// Acquire a write lock, recovering from poison
pub fn write<'a, T>(rwlock: &'a RwLock<T>, context: &str) -> RwLockWriteGuard<'a, T> {
    rwlock.write().unwrap_or_else(|e| {
        warn!("{}: recovering poisoned lock", context);
        PoisonError::into_inner(e)
    })
}

/// Execute a closure with a mutex held, automatically releasing it
pub fn with_lock<T, F, R>(mutex: &Mutex<T>, context: &str, f: F) -> R
where
    F: FnOnce(&mut T) -> R,
{
    let mut guard = lock(mutex, context);
    f(&mut guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_with_lock_releases() {
        let mutex = Mutex::new(1);
        let value = with_lock(&mutex, "counter", |v| {
            *v += 1;
            *v
        });
        assert_eq!(value, 2);
        assert_eq!(*lock(&mutex, "counter"), 2);
    }

    #[test]
    fn test_poisoned_lock_is_recovered() {
        let rwlock = Arc::new(RwLock::new(7));
        let clone = Arc::clone(&rwlock);
        let _ = std::thread::spawn(move || {
            let _guard = clone.write().unwrap();
            panic!("poison");
        })
        .join();

        assert!(rwlock.is_poisoned());
        assert_eq!(*read(&rwlock, "registry"), 7);
        *write(&rwlock, "registry") = 8;
        assert_eq!(*read(&rwlock, "registry"), 8);
    }
}
