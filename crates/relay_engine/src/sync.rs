use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Polls `cond` until it returns true, yielding to the runtime for
/// `interval` between attempts. `cond` runs once before the first wait.
pub async fn till<F>(mut cond: F, interval: Duration)
where
    F: FnMut() -> bool,
{
    while !cond() {
        tokio::time::sleep(interval).await;
    }
}

/// Locks a mutex, taking the data even if a panicking task poisoned it.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
